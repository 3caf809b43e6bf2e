//! Connection manager for the single live push connection
//!
//! State machine: `Idle -> Connecting -> Open`. Any transport error or
//! close moves to `Closed`, which waits a fixed delay and goes back to
//! `Connecting`. Failures are never surfaced as errors; the only outward
//! signal is the connectivity flag.

use super::decoder::decode_frame;
use super::transport::PushTransport;
use futures_util::StreamExt;
use hookscope_common::CapturedRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Lifecycle of the push connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never started
    Idle,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "connected",
            ConnectionState::Closed => "disconnected",
        }
    }
}

/// Read-only view of the connection state for display
#[derive(Debug, Clone)]
pub struct Connectivity {
    rx: watch::Receiver<ConnectionState>,
}

impl Connectivity {
    /// Wait for the next state change
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

#[cfg(test)]
impl Connectivity {
    pub fn state(&self) -> ConnectionState {
        *self.rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Wait until the state satisfies `f`
    pub async fn wait_for(&mut self, f: impl FnMut(&ConnectionState) -> bool) -> Option<ConnectionState> {
        self.rx.wait_for(f).await.ok().map(|state| *state)
    }
}

/// Owns the one push connection and its reconnect timer
pub struct ConnectionManager<T: PushTransport> {
    transport: Arc<T>,
    reconnect_delay: Duration,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events_tx: mpsc::Sender<CapturedRequest>,
    task: Option<JoinHandle<()>>,
}

impl<T: PushTransport> ConnectionManager<T> {
    /// Decoded requests are delivered, in arrival order, on `events_tx`
    pub fn new(
        transport: T,
        reconnect_delay: Duration,
        events_tx: mpsc::Sender<CapturedRequest>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            transport: Arc::new(transport),
            reconnect_delay,
            state_tx: Arc::new(state_tx),
            events_tx,
            task: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn connectivity(&self) -> Connectivity {
        Connectivity {
            rx: self.state_tx.subscribe(),
        }
    }

    /// Whether the connection task is alive (connected, connecting or
    /// waiting to reconnect)
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start the connection unless one is already running
    pub fn start(&mut self) {
        if self.is_running() {
            tracing::debug!("Live channel already running");
            return;
        }

        set_state(&self.state_tx, ConnectionState::Connecting);
        self.task = Some(tokio::spawn(run_connection(
            self.transport.clone(),
            self.state_tx.clone(),
            self.events_tx.clone(),
            self.reconnect_delay,
        )));
    }

    /// Close the connection and cancel any pending reconnect.
    ///
    /// Waits for the connection task to finish, so no state change or
    /// event can follow once this returns. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            tracing::info!("Live channel stopped");
        }

        if self.state() != ConnectionState::Idle {
            set_state(&self.state_tx, ConnectionState::Closed);
        }
    }
}

impl<T: PushTransport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Publish `state`, notifying watchers only on an actual change
fn set_state(tx: &watch::Sender<ConnectionState>, state: ConnectionState) {
    tx.send_if_modified(|current| {
        if *current == state {
            return false;
        }
        *current = state;
        true
    });
}

async fn run_connection<T: PushTransport>(
    transport: Arc<T>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events_tx: mpsc::Sender<CapturedRequest>,
    reconnect_delay: Duration,
) {
    loop {
        set_state(&state_tx, ConnectionState::Connecting);

        match transport.connect().await {
            Ok(mut frames) => {
                set_state(&state_tx, ConnectionState::Open);
                tracing::info!("Live channel connected");

                loop {
                    match frames.next().await {
                        Some(Ok(raw)) => {
                            let Some(request) = decode_frame(&raw) else {
                                continue;
                            };
                            if events_tx.send(request).await.is_err() {
                                tracing::debug!("Live event consumer gone, shutting down channel");
                                set_state(&state_tx, ConnectionState::Closed);
                                return;
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!("Live channel dropped: {}", e);
                            break;
                        }
                        None => {
                            tracing::warn!("Live channel closed by server");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Live channel connect failed: {}", e);
            }
        }

        set_state(&state_tx, ConnectionState::Closed);
        tracing::debug!("Reconnecting live channel in {:?}", reconnect_delay);
        tokio::time::sleep(reconnect_delay).await;
        tracing::info!("Live channel reconnecting...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LiveError;
    use crate::test_support::{new_request_frame, ScriptedTransport};
    use tokio::time::Instant;

    const DELAY: Duration = Duration::from_millis(3000);

    #[tokio::test(start_paused = true)]
    async fn test_connects_and_delivers_in_order() {
        let (transport, script) = ScriptedTransport::new();
        let frames = script.open();
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let mut manager = ConnectionManager::new(transport, DELAY, events_tx);
        let mut connectivity = manager.connectivity();

        assert_eq!(manager.state(), ConnectionState::Idle);
        manager.start();
        connectivity.wait_for(|s| *s == ConnectionState::Open).await;
        assert!(connectivity.is_connected());

        frames.send(Ok(new_request_frame(1, 1))).unwrap();
        frames.send(Ok("not json".to_string())).unwrap();
        frames.send(Ok(r#"{"type":"heartbeat","data":{}}"#.to_string())).unwrap();
        frames.send(Ok(new_request_frame(2, 3))).unwrap();

        assert_eq!(events_rx.recv().await.unwrap().id, 1);
        assert_eq!(events_rx.recv().await.unwrap().id, 2);

        // Bad frames leave the connection alone
        assert_eq!(manager.state(), ConnectionState::Open);
        assert_eq!(script.attempts(), 1);
        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_fixed_delay() {
        let (transport, script) = ScriptedTransport::new();
        let frames = script.open();
        let (events_tx, _events_rx) = mpsc::channel(16);
        let mut manager = ConnectionManager::new(transport, DELAY, events_tx);
        let mut connectivity = manager.connectivity();

        manager.start();
        connectivity.wait_for(|s| *s == ConnectionState::Open).await;

        drop(frames);
        connectivity.wait_for(|s| *s == ConnectionState::Closed).await;
        let closed_at = Instant::now();
        assert!(!connectivity.is_connected());

        connectivity.wait_for(|s| *s == ConnectionState::Connecting).await;
        let waited = closed_at.elapsed();
        assert!(waited >= DELAY, "reconnected after {:?}", waited);
        assert!(waited < DELAY + Duration::from_millis(100), "reconnected after {:?}", waited);
        assert_eq!(script.attempts(), 2);

        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_error_closes_and_retries_forever() {
        let (transport, script) = ScriptedTransport::new();
        let frames = script.open();
        script.fail();
        script.fail();
        let (events_tx, _events_rx) = mpsc::channel(16);
        let mut manager = ConnectionManager::new(transport, DELAY, events_tx);
        let mut connectivity = manager.connectivity();

        manager.start();
        connectivity.wait_for(|s| *s == ConnectionState::Open).await;
        frames
            .send(Err(LiveError::Dropped("connection reset".to_string())))
            .unwrap();
        connectivity.wait_for(|s| *s == ConnectionState::Closed).await;

        // Two failed connects, then the script hangs in Connecting
        tokio::time::sleep(DELAY * 3 + Duration::from_millis(10)).await;
        assert_eq!(script.attempts(), 4);
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert!(manager.is_running());

        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let (transport, script) = ScriptedTransport::new();
        let (events_tx, _events_rx) = mpsc::channel(16);
        let mut manager = ConnectionManager::new(transport, DELAY, events_tx);

        manager.start();
        manager.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(script.attempts(), 1);
        assert_eq!(manager.state(), ConnectionState::Connecting);
        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_reconnect() {
        let (transport, script) = ScriptedTransport::new();
        script.fail();
        let (events_tx, _events_rx) = mpsc::channel(16);
        let mut manager = ConnectionManager::new(transport, DELAY, events_tx);
        let mut connectivity = manager.connectivity();

        manager.start();
        connectivity.wait_for(|s| *s == ConnectionState::Closed).await;

        manager.stop().await;
        manager.stop().await;
        assert!(!manager.is_running());

        tokio::time::sleep(DELAY * 5).await;
        assert_eq!(script.attempts(), 1);
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_connecting() {
        let (transport, script) = ScriptedTransport::new();
        let (events_tx, _events_rx) = mpsc::channel(16);
        let mut manager = ConnectionManager::new(transport, DELAY, events_tx);

        manager.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.stop().await;
        assert_eq!(manager.state(), ConnectionState::Closed);

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert_eq!(script.attempts(), 1);

        // A stopped manager can be started again
        manager.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(script.attempts(), 2);
        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_start_is_noop() {
        let (transport, script) = ScriptedTransport::new();
        let (events_tx, _events_rx) = mpsc::channel(16);
        let mut manager = ConnectionManager::new(transport, DELAY, events_tx);

        manager.stop().await;
        assert_eq!(manager.state(), ConnectionState::Idle);
        assert_eq!(script.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_consumer_is_dropped() {
        let (transport, script) = ScriptedTransport::new();
        let frames = script.open();
        let (events_tx, events_rx) = mpsc::channel(16);
        let mut manager = ConnectionManager::new(transport, DELAY, events_tx);
        let mut connectivity = manager.connectivity();

        manager.start();
        connectivity.wait_for(|s| *s == ConnectionState::Open).await;

        drop(events_rx);
        frames.send(Ok(new_request_frame(1, 1))).unwrap();
        connectivity.wait_for(|s| *s == ConnectionState::Closed).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!manager.is_running());
    }
}
