//! Tracking of the endpoint currently being viewed

use hookscope_common::EndpointId;
use std::sync::Arc;
use tokio::sync::watch;

/// Selected endpoint, or `None` when nothing is selected
pub type Scope = Option<EndpointId>;

/// Shared handle to the selected scope.
///
/// Clones share one cell, so a handler that keeps a clone always reads the
/// value at the moment it runs, never the value from when it was created.
#[derive(Debug, Clone)]
pub struct ScopeTracker {
    tx: Arc<watch::Sender<Scope>>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// The scope as of right now
    pub fn current(&self) -> Scope {
        *self.tx.borrow()
    }

    /// Whether `endpoint` is the selected scope
    pub fn is_current(&self, endpoint: EndpointId) -> bool {
        self.current() == Some(endpoint)
    }

    /// Replace the scope wholesale, returning the previous one
    pub fn set_scope(&self, scope: Scope) -> Scope {
        let previous = self.tx.send_replace(scope);
        tracing::debug!("Scope changed: {:?} -> {:?}", previous, scope);
        previous
    }
}

impl Default for ScopeTracker {
    fn default() -> Self {
        Self::new()
    }
}
