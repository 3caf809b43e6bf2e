//! Snapshot loading: the request/response half of the view

use crate::api::ApiClient;
use hookscope_common::{EndpointId, RequestsPage};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifies one snapshot request.
///
/// The generation increases on every request, so a result can be matched
/// against the most recent request for its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotTicket {
    pub endpoint: EndpointId,
    pub generation: u64,
}

/// Outcome of a snapshot fetch, posted back to the session queue
#[derive(Debug)]
pub struct SnapshotResult {
    pub ticket: SnapshotTicket,
    pub outcome: Result<RequestsPage, String>,
}

/// Receives the reconciler's request for a fresh snapshot
pub trait SnapshotLoader: Send + Sync {
    fn request_snapshot(&self, ticket: SnapshotTicket);
}

/// Something that can fetch the first page of an endpoint's requests
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch(&self, endpoint: EndpointId)
        -> impl Future<Output = anyhow::Result<RequestsPage>> + Send;
}

/// Loader that runs each fetch on its own task and queues the result
pub struct SpawningLoader<S> {
    source: Arc<S>,
    results_tx: mpsc::UnboundedSender<SnapshotResult>,
}

impl<S: SnapshotSource> SpawningLoader<S> {
    pub fn new(source: Arc<S>, results_tx: mpsc::UnboundedSender<SnapshotResult>) -> Self {
        Self { source, results_tx }
    }
}

impl<S: SnapshotSource> SnapshotLoader for SpawningLoader<S> {
    fn request_snapshot(&self, ticket: SnapshotTicket) {
        let source = self.source.clone();
        let results_tx = self.results_tx.clone();

        tokio::spawn(async move {
            let outcome = source
                .fetch(ticket.endpoint)
                .await
                .map_err(|e| format!("{:#}", e));

            if let Err(ref e) = outcome {
                tracing::warn!("Snapshot for endpoint {} failed: {}", ticket.endpoint, e);
            }

            // Session gone, nobody left to apply it
            let _ = results_tx.send(SnapshotResult { ticket, outcome });
        });
    }
}

/// Snapshot source backed by the REST API
pub struct ApiSnapshotSource {
    client: ApiClient,
    page_size: u32,
}

impl ApiSnapshotSource {
    pub fn new(client: ApiClient, page_size: u32) -> Self {
        Self { client, page_size }
    }
}

impl SnapshotSource for ApiSnapshotSource {
    fn fetch(
        &self,
        endpoint: EndpointId,
    ) -> impl Future<Output = anyhow::Result<RequestsPage>> + Send {
        let client = self.client.clone();
        let limit = self.page_size;
        async move { Ok(client.list_requests(endpoint, limit, 0).await?) }
    }
}
