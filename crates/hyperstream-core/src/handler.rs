//! Async data handlers invoked by the read loop.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::message::IncomingData;

/// Error returned by a user handler. Logged, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A registered `onData` / `onLibData` handler.
///
/// The read loop awaits the handler before reading the next frame, so a slow
/// handler delays ingestion of everything behind it.
#[derive(Clone)]
pub struct DataHandler {
    inner: Arc<dyn Fn(IncomingData) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>,
}

impl DataHandler {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(IncomingData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |data| -> BoxFuture<'static, Result<(), HandlerError>> {
                Box::pin(handler(data))
            }),
        }
    }

    pub async fn call(&self, data: IncomingData) -> Result<(), HandlerError> {
        (self.inner)(data).await
    }
}

impl std::fmt::Debug for DataHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataHandler")
    }
}
