//! The seam between API operations and the wire.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::request::RequestBuilder;

/// Performs one authenticated API call.
///
/// Implementations return the body of a 2xx response, or an error carrying
/// the status and decoded Salesforce error. A call must stop promptly once
/// `cancel` fires and report [`ErrorKind::Cancelled`](crate::ErrorKind::Cancelled).
pub trait Transport: Send + Sync {
    /// Send `request` and return the raw response body.
    fn call(
        &self,
        cancel: &CancellationToken,
        request: RequestBuilder,
    ) -> impl Future<Output = Result<Bytes>> + Send;

    /// Send `request` and decode the JSON body.
    fn call_json<R: DeserializeOwned + Send>(
        &self,
        cancel: &CancellationToken,
        request: RequestBuilder,
    ) -> impl Future<Output = Result<R>> + Send {
        async move {
            let body = self.call(cancel, request).await?;
            Ok(serde_json::from_slice(&body)?)
        }
    }
}

impl<T: Transport> Transport for Arc<T> {
    fn call(
        &self,
        cancel: &CancellationToken,
        request: RequestBuilder,
    ) -> impl Future<Output = Result<Bytes>> + Send {
        (**self).call(cancel, request)
    }
}

impl<T: Transport> Transport for &T {
    fn call(
        &self,
        cancel: &CancellationToken,
        request: RequestBuilder,
    ) -> impl Future<Output = Result<Bytes>> + Send {
        (**self).call(cancel, request)
    }
}
