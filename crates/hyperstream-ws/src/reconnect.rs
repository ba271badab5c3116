//! Background reconnect after an unexpected connection loss.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::time;
use tracing::{debug, info, warn};

use hyperstream_core::error::StreamError;

use crate::client::ClientInner;

/// Retry `connect` with exponential backoff until it succeeds, the attempt
/// budget runs out, or the caller connects or disconnects in the meantime.
///
/// Boxed so the connect → read loop → reconnect cycle has a nameable type.
pub(crate) fn run(inner: Arc<ClientInner>, lost_generation: u64) -> BoxFuture<'static, ()> {
    async move {
        let policy = inner.config.reconnect.policy();
        let mut attempt = 1u32;

        loop {
            let Some(delay) = policy.next_delay(attempt) else {
                warn!(attempts = attempt - 1, "giving up on reconnect");
                return;
            };
            debug!(attempt, "reconnecting in {delay:?}");
            time::sleep(delay).await;

            if !inner.session.is_current(lost_generation) {
                debug!("reconnect superseded");
                return;
            }

            match inner.connect(Some(lost_generation)).await {
                Ok(()) => {
                    info!(attempt, "stream session re-established");
                    return;
                }
                Err(StreamError::AlreadyConnected | StreamError::Cancelled) => {
                    debug!("reconnect superseded");
                    return;
                }
                Err(e) if !e.is_retryable() => {
                    warn!(attempt, error = %e, "giving up on reconnect");
                    return;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "reconnect attempt failed");
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
    .boxed()
}
