use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;

use sfkit_client::security::{soql, url as url_security};
use sfkit_client::{CancellationToken, RequestBuilder, RequestMethod, Transport};

use crate::error::{Error, ErrorKind, Result};
use crate::sobject::{CreateResult, SObject, UpsertResult};

impl<T: Transport> super::SalesforceRestClient<T> {
    /// Create a single record.
    #[instrument(skip(self, cancel, record), fields(sobject = record.sobject_name()))]
    pub async fn create<E: SObject + Serialize>(
        &self,
        cancel: &CancellationToken,
        record: &E,
    ) -> Result<CreateResult> {
        let sobject = checked_sobject(record.sobject_name())?;
        let request =
            RequestBuilder::new(RequestMethod::Post, format!("sobjects/{sobject}")).json(record)?;
        Ok(self.transport.call_json(cancel, request).await?)
    }

    /// Read a record by id. An empty `fields` returns every field.
    #[instrument(skip(self, cancel))]
    pub async fn get<R: DeserializeOwned + Send>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        id: &str,
        fields: &[&str],
    ) -> Result<R> {
        let sobject = checked_sobject(sobject)?;
        let id = checked_id(id)?;
        let request = with_fields(
            RequestBuilder::new(RequestMethod::Get, format!("sobjects/{sobject}/{id}")),
            fields,
        )?;
        Ok(self.transport.call_json(cancel, request).await?)
    }

    /// Read a record by the value of an external id field.
    #[instrument(skip(self, cancel))]
    pub async fn get_by_external_id<R: DeserializeOwned + Send>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        field: &str,
        value: &str,
        fields: &[&str],
    ) -> Result<R> {
        let sobject = checked_sobject(sobject)?;
        let field = checked_field(field)?;
        let path = format!(
            "sobjects/{sobject}/{field}/{}",
            url_security::encode_param(value)
        );
        let request = with_fields(RequestBuilder::new(RequestMethod::Get, path), fields)?;
        Ok(self.transport.call_json(cancel, request).await?)
    }

    /// Update the record `id` with the fields of `record`.
    #[instrument(skip(self, cancel, record), fields(sobject = record.sobject_name()))]
    pub async fn update<E: SObject + Serialize>(
        &self,
        cancel: &CancellationToken,
        record: &E,
        id: &str,
    ) -> Result<()> {
        let sobject = checked_sobject(record.sobject_name())?;
        let id = checked_id(id)?;
        let request =
            RequestBuilder::new(RequestMethod::Patch, format!("sobjects/{sobject}/{id}"))
                .json(record)?;
        self.transport.call(cancel, request).await?;
        Ok(())
    }

    /// Insert or update a record keyed on an external id field.
    #[instrument(skip(self, cancel, record), fields(sobject = record.sobject_name()))]
    pub async fn upsert<E: SObject + Serialize>(
        &self,
        cancel: &CancellationToken,
        record: &E,
        field: &str,
        value: &str,
    ) -> Result<UpsertResult> {
        let sobject = checked_sobject(record.sobject_name())?;
        let field = checked_field(field)?;
        let path = format!(
            "sobjects/{sobject}/{field}/{}",
            url_security::encode_param(value)
        );
        let request = RequestBuilder::new(RequestMethod::Patch, path).json(record)?;
        let body = self.transport.call(cancel, request).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            // 204: an existing record was updated
            return Ok(UpsertResult {
                success: true,
                ..UpsertResult::default()
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Delete a record by id.
    #[instrument(skip(self, cancel))]
    pub async fn delete(&self, cancel: &CancellationToken, sobject: &str, id: &str) -> Result<()> {
        let sobject = checked_sobject(sobject)?;
        let id = checked_id(id)?;
        let request = RequestBuilder::new(RequestMethod::Delete, format!("sobjects/{sobject}/{id}"));
        self.transport.call(cancel, request).await?;
        Ok(())
    }

    /// Read up to 2000 records of one kind by id. Records that no longer
    /// exist or are not visible are left out.
    #[instrument(skip(self, cancel, ids), fields(ids = ids.len()))]
    pub async fn retrieve<R: DeserializeOwned + Send>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        ids: &[&str],
        fields: &[&str],
    ) -> Result<Vec<R>> {
        let sobject = checked_sobject(sobject)?;
        if ids.is_empty() {
            return Err(Error::new(ErrorKind::ZeroRecords));
        }
        for id in ids {
            checked_id(id)?;
        }
        for field in fields {
            checked_field(field)?;
        }
        let request =
            RequestBuilder::new(RequestMethod::Post, format!("composite/sobjects/{sobject}"))
                .json(&serde_json::json!({ "ids": ids, "fields": fields }))?;
        let rows: Vec<Option<R>> = self.transport.call_json(cancel, request).await?;
        Ok(rows.into_iter().flatten().collect())
    }

    /// Follow a relationship of record `id`.
    ///
    /// A to-one relationship answers with the related record, or 404 when
    /// it is empty. A to-many relationship answers with a query page.
    #[instrument(skip(self, cancel))]
    pub async fn get_related<R: DeserializeOwned + Send>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        id: &str,
        relationship: &str,
        fields: &[&str],
    ) -> Result<R> {
        let path = related_path(sobject, id, relationship)?;
        let request = with_fields(RequestBuilder::new(RequestMethod::Get, path), fields)?;
        Ok(self.transport.call_json(cancel, request).await?)
    }

    /// Update the record behind a to-one relationship of record `id`.
    /// `record` must not carry an `Id`.
    #[instrument(skip(self, cancel, record))]
    pub async fn update_related<E: Serialize + Sync>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        id: &str,
        relationship: &str,
        record: &E,
    ) -> Result<()> {
        let path = related_path(sobject, id, relationship)?;
        let request = RequestBuilder::new(RequestMethod::Patch, path).json(record)?;
        self.transport.call(cancel, request).await?;
        Ok(())
    }

    /// Detach the record behind a to-one relationship of record `id`.
    #[instrument(skip(self, cancel))]
    pub async fn delete_related(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        id: &str,
        relationship: &str,
    ) -> Result<()> {
        let path = related_path(sobject, id, relationship)?;
        self.transport
            .call(cancel, RequestBuilder::new(RequestMethod::Delete, path))
            .await?;
        Ok(())
    }

    /// Download the binary content of a blob field, e.g.
    /// `ContentVersion.VersionData`.
    #[instrument(skip(self, cancel))]
    pub async fn get_blob(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        id: &str,
        field: &str,
    ) -> Result<Bytes> {
        let path = related_path(sobject, id, field)?;
        let request = RequestBuilder::new(RequestMethod::Get, path).header("Accept", "*/*");
        Ok(self.transport.call(cancel, request).await?)
    }

    /// Download the body of an `Attachment` record.
    pub async fn get_attachment(&self, cancel: &CancellationToken, id: &str) -> Result<Bytes> {
        self.get_blob(cancel, "Attachment", id, "Body").await
    }
}

fn checked_sobject(name: &str) -> Result<&str> {
    if soql::is_safe_sobject_name(name) {
        Ok(name)
    } else {
        Err(Error::new(ErrorKind::InvalidInput(format!(
            "invalid object name {name:?}"
        ))))
    }
}

fn checked_field(name: &str) -> Result<&str> {
    if soql::is_safe_field_name(name) {
        Ok(name)
    } else {
        Err(Error::new(ErrorKind::InvalidInput(format!(
            "invalid field name {name:?}"
        ))))
    }
}

fn checked_id(id: &str) -> Result<&str> {
    if url_security::is_valid_salesforce_id(id) {
        Ok(id)
    } else {
        Err(Error::new(ErrorKind::InvalidInput(format!(
            "invalid record id {id:?}"
        ))))
    }
}

/// `sobjects/{sobject}/{id}/{name}` for a relationship or blob field.
fn related_path(sobject: &str, id: &str, name: &str) -> Result<String> {
    Ok(format!(
        "sobjects/{}/{}/{}",
        checked_sobject(sobject)?,
        checked_id(id)?,
        checked_field(name)?
    ))
}

fn with_fields(request: RequestBuilder, fields: &[&str]) -> Result<RequestBuilder> {
    if fields.is_empty() {
        return Ok(request);
    }
    for field in fields {
        checked_field(field)?;
    }
    Ok(request.query("fields", fields.join(",")))
}
