use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tracing::instrument;

use sfkit_client::security::soql;
use sfkit_client::{CancellationToken, RequestBuilder, RequestMethod, Transport};

use crate::describe::{DescribeGlobalResult, DescribeSObjectResult, GetDeletedResult, GetUpdatedResult};
use crate::error::{Error, ErrorKind, Result};

impl<T: Transport> super::SalesforceRestClient<T> {
    /// List every object kind visible to the user.
    #[instrument(skip(self, cancel))]
    pub async fn describe_global(&self, cancel: &CancellationToken) -> Result<DescribeGlobalResult> {
        let request = RequestBuilder::new(RequestMethod::Get, "sobjects/");
        Ok(self.transport.call_json(cancel, request).await?)
    }

    /// Fields and metadata of one object kind.
    #[instrument(skip(self, cancel))]
    pub async fn describe(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
    ) -> Result<DescribeSObjectResult> {
        let sobject = describable(sobject)?;
        let request = RequestBuilder::new(RequestMethod::Get, format!("sobjects/{sobject}/describe"));
        Ok(self.transport.call_json(cancel, request).await?)
    }

    /// Ids of records of `sobject` deleted between `start` and `end`.
    #[instrument(skip(self, cancel))]
    pub async fn get_deleted(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<GetDeletedResult> {
        self.changes(cancel, sobject, "deleted", start, end).await
    }

    /// Ids of records of `sobject` updated between `start` and `end`.
    #[instrument(skip(self, cancel))]
    pub async fn get_updated(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<GetUpdatedResult> {
        self.changes(cancel, sobject, "updated", start, end).await
    }

    async fn changes<R: DeserializeOwned + Send>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        feed: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<R> {
        let sobject = describable(sobject)?;
        let request = RequestBuilder::new(RequestMethod::Get, format!("sobjects/{sobject}/{feed}/"))
            .query("start", start.to_rfc3339_opts(SecondsFormat::Secs, true))
            .query("end", end.to_rfc3339_opts(SecondsFormat::Secs, true));
        Ok(self.transport.call_json(cancel, request).await?)
    }
}

fn describable(sobject: &str) -> Result<&str> {
    if soql::is_safe_sobject_name(sobject) {
        Ok(sobject)
    } else {
        Err(Error::new(ErrorKind::InvalidInput(format!(
            "invalid object name {sobject:?}"
        ))))
    }
}
