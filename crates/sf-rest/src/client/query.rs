use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use sfkit_client::{CancellationToken, RequestBuilder, RequestMethod, Transport};

use crate::config::CallKind;
use crate::error::{Error, ErrorKind, Result};
use crate::query::{decode_page, QuerySummary, RecordSink};

enum Cursor {
    Fetching(String),
    Done,
}

impl<T: Transport> super::SalesforceRestClient<T> {
    /// Run a SOQL query, appending every row to `sink`.
    ///
    /// Pages are fetched in order until the server reports `done` or the
    /// configured row cap is reached, in which case `sink` is cut to the cap.
    ///
    /// # Security
    ///
    /// Escape user-provided values with
    /// `sfkit_client::security::soql::escape_string()` before splicing them
    /// into `soql`.
    #[instrument(skip(self, cancel, sink))]
    pub async fn query<S: RecordSink + Send>(
        &self,
        cancel: &CancellationToken,
        soql: &str,
        sink: &mut S,
    ) -> Result<QuerySummary> {
        self.read_pages(cancel, "query", soql, sink).await
    }

    /// Like [`query`](Self::query), including deleted and archived records.
    #[instrument(skip(self, cancel, sink))]
    pub async fn query_with_deleted<S: RecordSink + Send>(
        &self,
        cancel: &CancellationToken,
        soql: &str,
        sink: &mut S,
    ) -> Result<QuerySummary> {
        self.read_pages(cancel, "queryAll", soql, sink).await
    }

    /// Run a SOQL query and collect its rows into a new vector.
    pub async fn query_all<R: DeserializeOwned + Send>(
        &self,
        cancel: &CancellationToken,
        soql: &str,
    ) -> Result<Vec<R>> {
        let mut rows = Vec::new();
        self.query(cancel, soql, &mut rows).await?;
        Ok(rows)
    }

    async fn read_pages<S: RecordSink + Send>(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        soql: &str,
        sink: &mut S,
    ) -> Result<QuerySummary> {
        let page_size = self.config.max_batch_size(CallKind::Query);
        let max_rows = self.config.max_rows();
        let mut summary = QuerySummary::default();
        let mut cursor = Cursor::Fetching(format!("{endpoint}/?q={}", urlencoding::encode(soql)));

        loop {
            let path = match cursor {
                Cursor::Fetching(path) => path,
                Cursor::Done => break,
            };
            let request =
                RequestBuilder::new(RequestMethod::Get, path).sforce_query_options(page_size);
            let body = self.transport.call(cancel, request).await?;

            let before = sink.len();
            let page = match decode_page(&body, sink) {
                Ok(page) => page,
                Err(err) => {
                    sink.truncate(before);
                    return Err(err);
                }
            };
            summary.pages += 1;
            summary.total_size = page.total_size;
            debug!(
                page = summary.pages,
                rows = sink.len() - before,
                total = sink.len(),
                done = page.done,
                "query page decoded"
            );

            cursor = match max_rows {
                Some(max) if sink.len() >= max => {
                    summary.truncated = sink.len() > max || !page.done;
                    sink.truncate(max);
                    Cursor::Done
                }
                _ if page.done => Cursor::Done,
                _ => match page.next_records_url {
                    Some(next) => Cursor::Fetching(next),
                    None => {
                        return Err(Error::new(ErrorKind::MalformedResponse(
                            "page is not done and has no nextRecordsUrl".to_string(),
                        )))
                    }
                },
            };
        }

        Ok(summary)
    }
}
