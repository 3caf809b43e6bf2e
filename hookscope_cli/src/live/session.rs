//! Live session: wires the connection, scope and reconciler together
//!
//! Live events and snapshot results arrive on two queues; one consumer
//! (`next_update`) drains them and applies each to the reconciler in the
//! order it was received on its queue.

use super::connection::{ConnectionManager, ConnectionState, Connectivity};
use super::reconciler::Reconciler;
use super::scope::{Scope, ScopeTracker};
use super::snapshot::{SnapshotResult, SnapshotSource, SpawningLoader};
use super::transport::PushTransport;
use hookscope_common::{CapturedRequest, EndpointId, RequestId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Capacity of the live event queue
const EVENT_QUEUE_SIZE: usize = 256;

/// What `next_update` applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A live event was received; `accepted` if it entered the view
    LiveEvent { id: RequestId, accepted: bool },
    /// A snapshot result arrived; `applied` if it was still wanted
    Snapshot { endpoint: EndpointId, applied: bool },
    /// The push connection changed state
    Connectivity(ConnectionState),
}

/// One UI session's live view of the selected endpoint
pub struct LiveSession<T: PushTransport> {
    connection: ConnectionManager<T>,
    connectivity: Connectivity,
    scope: ScopeTracker,
    reconciler: Reconciler,
    events_rx: mpsc::Receiver<CapturedRequest>,
    snapshots_rx: mpsc::UnboundedReceiver<SnapshotResult>,
}

impl<T: PushTransport> LiveSession<T> {
    pub fn new<S: SnapshotSource>(transport: T, source: S, reconnect_delay: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let (snapshots_tx, snapshots_rx) = mpsc::unbounded_channel();

        let connection = ConnectionManager::new(transport, reconnect_delay, events_tx);
        let connectivity = connection.connectivity();
        let scope = ScopeTracker::new();
        let loader = SpawningLoader::new(Arc::new(source), snapshots_tx);
        let reconciler = Reconciler::new(scope.clone(), Box::new(loader));

        Self {
            connection,
            connectivity,
            scope,
            reconciler,
            events_rx,
            snapshots_rx,
        }
    }

    /// Open the push connection
    pub fn start(&mut self) {
        self.connection.start();
    }

    /// Close the push connection; nothing is applied from it afterwards
    pub async fn shutdown(&mut self) {
        self.connection.stop().await;
        // Drop anything decoded before the stop
        while self.events_rx.try_recv().is_ok() {}
    }

    /// The user picked a different endpoint (or none).
    ///
    /// Scope and view change together; selecting the current endpoint
    /// again reloads it.
    pub fn select(&mut self, scope: Scope) {
        self.scope.set_scope(scope);
        self.reconciler.on_scope_change(scope);
    }

    /// Reload the snapshot for the selected endpoint
    pub fn refresh(&mut self) {
        self.reconciler.refresh();
    }

    /// Forget the view after the server-side requests were cleared
    pub fn clear_view(&mut self) {
        self.reconciler.clear();
    }

    pub fn scope(&self) -> Scope {
        self.scope.current()
    }

    pub fn view(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Wait for the next queued item and apply it
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        tokio::select! {
            Some(request) = self.events_rx.recv() => {
                let id = request.id;
                let accepted = self.reconciler.on_live_event(request);
                Some(SessionUpdate::LiveEvent { id, accepted })
            }
            Some(result) = self.snapshots_rx.recv() => {
                let endpoint = result.ticket.endpoint;
                let applied = match result.outcome {
                    Ok(page) => self.reconciler.on_snapshot_loaded(result.ticket, page),
                    Err(error) => self.reconciler.on_snapshot_failed(result.ticket, error),
                };
                Some(SessionUpdate::Snapshot { endpoint, applied })
            }
            Some(state) = self.connectivity.changed() => {
                Some(SessionUpdate::Connectivity(state))
            }
            else => None,
        }
    }
}
