//! Hyperion stream client with request replay and optional auto-reconnect.

use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use hyperstream_core::config::ClientConfig;
use hyperstream_core::error::{StreamError, TransportError};
use hyperstream_core::events::EventBus;
use hyperstream_core::handler::{DataHandler, HandlerError};
use hyperstream_core::ledger::SavedRequest;
use hyperstream_core::message::{
    IncomingData, StreamActionsRequest, StreamDeltasRequest, SubscriptionRequest,
};
use hyperstream_core::queue::{DataQueues, QueueKind};
use hyperstream_core::transport::Connector;

use crate::dispatcher;
use crate::reconnect;
use crate::session::{Outbound, SessionState, SessionStatus};
use crate::transport::WsConnector;

/// State shared between the client handle and its background tasks.
pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    connector: Arc<dyn Connector>,
    pub(crate) session: SessionState,
    outbound: tokio::sync::Mutex<Outbound>,
    teardown: Mutex<Option<oneshot::Sender<()>>>,
    pub(crate) queues: DataQueues,
    pub(crate) events: EventBus,
    pub(crate) on_data: RwLock<Option<DataHandler>>,
    pub(crate) on_lib_data: RwLock<Option<DataHandler>>,
}

impl ClientInner {
    /// Open a session and replay the ledger.
    ///
    /// With `expected_generation` set, the connect is abandoned if any
    /// connect or disconnect happened since that generation was observed.
    pub(crate) async fn connect(
        self: &Arc<Self>,
        expected_generation: Option<u64>,
    ) -> Result<(), StreamError> {
        let endpoint = self
            .session
            .endpoint()
            .ok_or_else(|| StreamError::Configuration("endpoint undefined".into()))?;

        let ticket = {
            let _outbound = self.outbound.lock().await;
            if self.session.status() != SessionStatus::Offline {
                return Err(StreamError::AlreadyConnected);
            }
            let generation = self.session.generation();
            if expected_generation.is_some_and(|expected| expected != generation) {
                return Err(StreamError::Cancelled);
            }
            self.session.set_status(SessionStatus::Connecting);
            generation
        };

        info!(url = %endpoint, "connecting to stream endpoint");
        let opened = self.connector.open(&endpoint).await;

        let mut outbound = self.outbound.lock().await;
        if !self.session.is_current(ticket) {
            if let Ok(mut connection) = opened {
                let _ = connection.sink.close().await;
            }
            debug!(url = %endpoint, "connect superseded by disconnect");
            return Err(StreamError::Cancelled);
        }
        let connection = match opened {
            Ok(connection) => connection,
            Err(e) => {
                self.session.set_status(SessionStatus::Offline);
                warn!(url = %endpoint, error = %e, "stream connect failed");
                return Err(e.into());
            }
        };

        let generation = self.session.advance_generation();
        self.session.prepare_cursor(self.config.cursor_policy);

        let (teardown_tx, teardown_rx) = oneshot::channel();
        *self.teardown.lock() = Some(teardown_tx);
        outbound.attach(connection.sink);
        tokio::spawn(dispatcher::run(
            Arc::clone(self),
            connection.source,
            generation,
            teardown_rx,
        ));

        let pending = outbound.ledger().len();
        let replayed = outbound.replay().await;
        self.session.set_status(SessionStatus::Online);
        info!(url = %endpoint, generation, replayed, pending, "stream session online");
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        let mut outbound = self.outbound.lock().await;
        // Also cancels any pending auto-reconnect.
        self.session.advance_generation();
        if self.session.status() == SessionStatus::Offline {
            // A dropped connection keeps its ledger for reconnect; an explicit
            // disconnect still forgets it.
            self.session.reset_cursors();
            outbound.clear_ledger();
            info!("nothing to disconnect");
            return;
        }

        if let Some(tx) = self.teardown.lock().take() {
            let _ = tx.send(());
        }
        self.session.reset_cursors();
        outbound.close().await;
        outbound.clear_ledger();
        self.session.set_status(SessionStatus::Offline);
        info!("stream session closed");
    }

    /// Called by the dispatcher when its read fails.
    pub(crate) async fn connection_lost(self: &Arc<Self>, generation: u64, error: TransportError) {
        let mut outbound = self.outbound.lock().await;
        if !self.session.is_current(generation) {
            debug!(generation, error = %error, "read loop of a closed session ended");
            return;
        }

        warn!(generation, error = %error, "stream connection lost");
        self.teardown.lock().take();
        outbound.close().await;
        self.session.set_status(SessionStatus::Offline);
        drop(outbound);

        if self.config.reconnect.enabled {
            tokio::spawn(reconnect::run(Arc::clone(self), generation));
        }
    }

    async fn subscribe(&self, request: SubscriptionRequest) -> Result<(), StreamError> {
        if self.session.status() != SessionStatus::Online {
            return Err(StreamError::NotConnected);
        }
        let mut outbound = self.outbound.lock().await;
        if self.session.status() != SessionStatus::Online {
            return Err(StreamError::NotConnected);
        }
        outbound.subscribe(request).await?;
        debug!(saved = outbound.ledger().len(), "subscription request sent");
        Ok(())
    }
}

/// Streaming client for a Hyperion history endpoint.
///
/// Subscriptions issued while online are saved and re-sent, in order, on
/// every successful reconnect. Inbound data lands in three queues: live
/// actions and deltas, LIB updates, and fork notices.
///
/// # Usage
/// ```no_run
/// # async fn example() -> Result<(), hyperstream_core::StreamError> {
/// use hyperstream_core::{ClientConfig, StreamActionsRequest};
/// use hyperstream_ws::HyperionStreamClient;
///
/// let client = HyperionStreamClient::new(ClientConfig::new("wss://eos.hyperion.example/stream"));
/// client.on("action", |data| println!("action at block {}", data.block_num));
/// client.connect().await?;
/// client
///     .stream_actions(StreamActionsRequest::new("eosio.token", "transfer"))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct HyperionStreamClient {
    inner: Arc<ClientInner>,
}

impl HyperionStreamClient {
    /// Create a client that connects over WebSocket.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, WsConnector::new())
    }

    /// Create a client over a custom transport.
    pub fn with_connector(config: ClientConfig, connector: impl Connector) -> Self {
        let session = SessionState::new(config.endpoint.clone());
        Self {
            inner: Arc::new(ClientInner {
                config,
                connector: Arc::new(connector),
                session,
                outbound: tokio::sync::Mutex::new(Outbound::default()),
                teardown: Mutex::new(None),
                queues: DataQueues::new(),
                events: EventBus::new(),
                on_data: RwLock::new(None),
                on_lib_data: RwLock::new(None),
            }),
        }
    }

    /// Set the endpoint used by the next [`connect`](Self::connect).
    pub fn set_endpoint(&self, endpoint: impl Into<String>) {
        self.inner.session.set_endpoint(endpoint.into());
    }

    pub fn endpoint(&self) -> Option<String> {
        self.inner.session.endpoint()
    }

    /// Open the connection, start the read loop and replay saved requests.
    pub async fn connect(&self) -> Result<(), StreamError> {
        self.inner.connect(None).await
    }

    /// Close the connection and forget saved requests and block cursors.
    /// When already offline nothing is closed, but saved requests are still
    /// forgotten.
    ///
    /// Does not wait for the read loop to exit.
    pub async fn disconnect(&self) {
        self.inner.disconnect().await;
    }

    pub async fn stream_actions(&self, request: StreamActionsRequest) -> Result<(), StreamError> {
        self.inner.subscribe(request.into()).await
    }

    pub async fn stream_deltas(&self, request: StreamDeltasRequest) -> Result<(), StreamError> {
        self.inner.subscribe(request.into()).await
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.session.status()
    }

    pub fn is_online(&self) -> bool {
        self.status() == SessionStatus::Online
    }

    /// Highest block number seen on an action or delta.
    pub fn last_received_block(&self) -> u64 {
        self.inner.session.last_received_block()
    }

    /// Highest last-irreversible-block number seen.
    pub fn last_irreversible_block(&self) -> u64 {
        self.inner.session.last_irreversible_block()
    }

    /// Saved requests in issuance order.
    pub async fn saved_requests(&self) -> Vec<SavedRequest> {
        self.inner.outbound.lock().await.ledger().snapshot()
    }

    // ─── Queues ──────────────────────────────────────────────────────────────

    /// Snapshot of the live data queue.
    pub fn get_data_queue(&self) -> Vec<IncomingData> {
        self.inner.queues.snapshot(QueueKind::Data)
    }

    pub fn clear_data_queue(&self) {
        self.inner.queues.clear(QueueKind::Data);
    }

    /// Take everything in the live data queue, leaving it empty.
    pub fn drain_data_queue(&self) -> Vec<IncomingData> {
        self.inner.queues.drain(QueueKind::Data)
    }

    pub fn get_lib_data_queue(&self) -> Vec<IncomingData> {
        self.inner.queues.snapshot(QueueKind::Lib)
    }

    pub fn clear_lib_data_queue(&self) {
        self.inner.queues.clear(QueueKind::Lib);
    }

    pub fn get_reversible_buffer(&self) -> Vec<IncomingData> {
        self.inner.queues.snapshot(QueueKind::Reversible)
    }

    pub fn clear_reversible_buffer(&self) {
        self.inner.queues.clear(QueueKind::Reversible);
    }

    // ─── Listeners ───────────────────────────────────────────────────────────

    /// Listen for every item of a kind (`"action"`, `"delta"`,
    /// `"lib_update"`, `"fork"`, or a raw control tag).
    pub fn on<F>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(&IncomingData) + Send + Sync + 'static,
    {
        self.inner.events.on(event, listener);
    }

    /// Listen for the next item of a kind only.
    pub fn once<F>(&self, event: impl Into<String>, listener: F)
    where
        F: FnOnce(&IncomingData) + Send + 'static,
    {
        self.inner.events.once(event, listener);
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.events.listener_count(event)
    }

    /// Remove every listener registered for `event`.
    pub fn off(&self, event: &str) {
        self.inner.events.remove_all(event);
    }

    /// Set the handler for live data and fork notices, replacing any previous one.
    pub fn on_data<F, Fut>(&self, handler: F)
    where
        F: Fn(IncomingData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        *self.inner.on_data.write() = Some(DataHandler::new(handler));
    }

    /// Set the handler for LIB updates, replacing any previous one.
    pub fn on_lib_data<F, Fut>(&self, handler: F)
    where
        F: Fn(IncomingData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        *self.inner.on_lib_data.write() = Some(DataHandler::new(handler));
    }
}

impl Drop for HyperionStreamClient {
    fn drop(&mut self) {
        self.inner.session.advance_generation();
        if let Some(tx) = self.inner.teardown.lock().take() {
            let _ = tx.send(());
        }
    }
}

impl std::fmt::Debug for HyperionStreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperionStreamClient")
            .field("endpoint", &self.endpoint())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
