//! Reconciliation of snapshot pages and live events into one request view
//!
//! The view is newest first and unique by request id. Snapshot fetches and
//! live events race each other with no ordering guarantee between them, so
//! every merge checks the scope at the moment it runs and skips ids that
//! are already present.

use super::scope::{Scope, ScopeTracker};
use super::snapshot::{SnapshotLoader, SnapshotTicket};
use hookscope_common::{CapturedRequest, EndpointId, RequestId, RequestsPage};
use std::collections::{HashSet, VecDeque};

/// Ordered, de-duplicated requests for the selected endpoint
pub struct Reconciler {
    scope: ScopeTracker,
    loader: Box<dyn SnapshotLoader>,
    view: VecDeque<CapturedRequest>,
    ids: HashSet<RequestId>,
    /// Entries at the front of `view` that arrived live since the latest
    /// snapshot request
    live_since_request: usize,
    generation: u64,
    pending: Option<SnapshotTicket>,
    total: Option<u64>,
    last_error: Option<String>,
}

impl Reconciler {
    pub fn new(scope: ScopeTracker, loader: Box<dyn SnapshotLoader>) -> Self {
        Self {
            scope,
            loader,
            view: VecDeque::new(),
            ids: HashSet::new(),
            live_since_request: 0,
            generation: 0,
            pending: None,
            total: None,
            last_error: None,
        }
    }

    /// Reset for a newly selected scope and ask for its snapshot.
    ///
    /// The view is emptied before anything else so entries from the old
    /// scope are never shown, even while the fetch is in flight.
    pub fn on_scope_change(&mut self, new_scope: Scope) {
        self.view.clear();
        self.ids.clear();
        self.live_since_request = 0;
        self.total = None;
        self.last_error = None;
        self.pending = None;

        if let Some(endpoint) = new_scope {
            self.request_snapshot(endpoint);
        }
    }

    /// Re-fetch the snapshot for the current scope, keeping the view on
    /// screen until the new page lands
    pub fn refresh(&mut self) {
        if let Some(endpoint) = self.scope.current() {
            self.request_snapshot(endpoint);
        }
    }

    fn request_snapshot(&mut self, endpoint: EndpointId) {
        self.generation += 1;
        self.live_since_request = 0;

        let ticket = SnapshotTicket {
            endpoint,
            generation: self.generation,
        };
        self.pending = Some(ticket);
        tracing::debug!("Requesting snapshot for endpoint {} (#{})", endpoint, ticket.generation);
        self.loader.request_snapshot(ticket);
    }

    /// Whether a result for `ticket` may still be applied
    fn is_wanted(&self, ticket: SnapshotTicket) -> bool {
        if !self.scope.is_current(ticket.endpoint) {
            tracing::debug!(
                "Discarding snapshot for endpoint {}: no longer selected",
                ticket.endpoint
            );
            return false;
        }
        if self.pending != Some(ticket) {
            tracing::debug!(
                "Discarding superseded snapshot #{} for endpoint {}",
                ticket.generation,
                ticket.endpoint
            );
            return false;
        }
        true
    }

    /// Merge a fetched page. Returns whether it was applied.
    ///
    /// Live events that arrived since the request stay in front; the page
    /// follows in server order with already-present ids skipped.
    pub fn on_snapshot_loaded(&mut self, ticket: SnapshotTicket, page: RequestsPage) -> bool {
        if !self.is_wanted(ticket) {
            return false;
        }

        self.view.truncate(self.live_since_request);
        self.ids = self.view.iter().map(|r| r.id).collect();

        for request in page.requests {
            if request.endpoint_id != ticket.endpoint {
                tracing::warn!(
                    "Snapshot for endpoint {} contained request {} of endpoint {}",
                    ticket.endpoint,
                    request.id,
                    request.endpoint_id
                );
                continue;
            }
            if self.ids.insert(request.id) {
                self.view.push_back(request);
            }
        }

        self.total = Some(page.total.max(self.view.len() as u64));
        self.live_since_request = 0;
        self.pending = None;
        self.last_error = None;
        true
    }

    /// Record a failed fetch. The current view is left in place.
    pub fn on_snapshot_failed(&mut self, ticket: SnapshotTicket, error: String) -> bool {
        if !self.is_wanted(ticket) {
            return false;
        }
        self.pending = None;
        self.last_error = Some(error);
        true
    }

    /// Prepend a live event. Returns whether the view changed.
    pub fn on_live_event(&mut self, request: CapturedRequest) -> bool {
        if !self.scope.is_current(request.endpoint_id) {
            tracing::trace!(
                "Live request {} is for endpoint {}, not the selected one",
                request.id,
                request.endpoint_id
            );
            return false;
        }
        if !self.ids.insert(request.id) {
            tracing::debug!("Live request {} already in view", request.id);
            return false;
        }

        self.view.push_front(request);
        self.live_since_request += 1;
        if let Some(total) = self.total.as_mut() {
            *total += 1;
        }
        true
    }

    /// Empty the view after the server-side requests were deleted.
    ///
    /// A snapshot requested before the clear may still list the deleted
    /// requests, so its ticket is dropped as well.
    pub fn clear(&mut self) {
        self.view.clear();
        self.ids.clear();
        self.live_since_request = 0;
        self.pending = None;
        if self.total.is_some() {
            self.total = Some(0);
        }
    }

    /// Requests in display order, newest first
    pub fn requests(&self) -> &VecDeque<CapturedRequest> {
        &self.view
    }

    pub fn find(&self, id: RequestId) -> Option<&CapturedRequest> {
        self.view.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// A snapshot request is outstanding
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Server-side request count for the scope, once a snapshot landed
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
