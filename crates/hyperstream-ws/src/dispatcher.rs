//! The read loop.
//!
//! One dispatcher task runs per online session. It pulls frames, decodes and
//! classifies them, appends them to the matching queue, awaits the matching
//! data handler and finally fires the event bus. Handlers run inline: a slow
//! handler holds up every frame behind it.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use hyperstream_core::message::{DataKind, IncomingData};
use hyperstream_core::queue::QueueKind;
use hyperstream_core::transport::FrameSource;

use crate::client::ClientInner;

/// Run until the transport fails or the session is torn down.
pub(crate) async fn run(
    inner: Arc<ClientInner>,
    mut source: Box<dyn FrameSource>,
    generation: u64,
    mut teardown: oneshot::Receiver<()>,
) {
    debug!(generation, "dispatcher started");

    loop {
        let frame = tokio::select! {
            _ = &mut teardown => {
                debug!(generation, "dispatcher stopped by teardown");
                return;
            }
            frame = source.next_frame() => frame,
        };

        let text = match frame {
            Ok(text) => text,
            Err(e) => {
                inner.connection_lost(generation, e).await;
                return;
            }
        };

        let item = match IncomingData::decode(&text) {
            Ok(item) => item,
            Err(e) => {
                warn!(generation, error = %e, "dropping malformed frame");
                continue;
            }
        };

        if !inner.session.is_current(generation) {
            debug!(generation, "stale dispatcher exiting");
            return;
        }

        dispatch(&inner, item).await;
    }
}

/// Route one decoded item.
pub(crate) async fn dispatch(inner: &ClientInner, item: IncomingData) {
    if item.kind.is_chain_data() {
        inner.session.observe_block(item.block_num);
    } else if item.kind == DataKind::LibUpdate {
        inner.session.observe_lib(item.block_num);
    }

    let queue = QueueKind::for_kind(&item.kind);
    match queue {
        Some(queue) => inner.queues.push(queue, item.clone()),
        None => debug!(tag = %item.kind, block_num = item.block_num, "control message not queued"),
    }

    let handler = match queue {
        Some(QueueKind::Lib) => inner.on_lib_data.read().clone(),
        Some(_) => inner.on_data.read().clone(),
        None => None,
    };
    if let Some(handler) = handler {
        if let Err(e) = handler.call(item.clone()).await {
            warn!(kind = %item.kind, block_num = item.block_num, error = %e, "data handler failed");
        }
    }

    inner.events.emit(item.kind.event_name(), &item);
}
