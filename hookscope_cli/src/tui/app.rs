//! TUI application state and key handling

use crate::live::ConnectionState;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use hookscope_common::{Endpoint, EndpointId, RequestId};

/// TUI view modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Detail(RequestId),
}

/// Which dashboard pane receives navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Endpoints,
    Requests,
}

/// Live stream status as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting,
    Online,
    Reconnecting,
    Offline,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Connecting => "connecting",
            LinkStatus::Online => "connected",
            LinkStatus::Reconnecting => "reconnecting",
            LinkStatus::Offline => "offline",
        }
    }
}

/// Side effects a key press asks the event loop to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Switch the live view to another endpoint (or none)
    Select(Option<EndpointId>),
    /// Reload endpoints and the selected endpoint's requests
    Refresh,
    /// Delete the endpoint's captured requests on the server
    ClearRequests(EndpointId),
    /// Turn capture on or off
    SetEnabled(EndpointId, bool),
}

/// TUI application state
pub struct TuiApp {
    pub view: View,
    pub focus: Focus,
    pub endpoints: Vec<Endpoint>,
    /// Highlighted row in the endpoint sidebar
    pub endpoint_index: usize,
    /// Endpoint whose requests are shown
    pub active: Option<EndpointId>,
    /// Highlighted row in the request list
    pub request_index: usize,
    pub link: LinkStatus,
    pub confirm_clear: bool,
    pub status_message: Option<String>,
    pub server_url: String,
    hook_base: String,
    pub version: String,
    pub should_quit: bool,
}

impl TuiApp {
    /// `hook_base` is the webhook URL prefix that slugs are appended to
    pub fn new(server_url: String, hook_base: String) -> Self {
        Self {
            view: View::Dashboard,
            focus: Focus::Endpoints,
            endpoints: Vec::new(),
            endpoint_index: 0,
            active: None,
            request_index: 0,
            link: LinkStatus::Connecting,
            confirm_clear: false,
            status_message: None,
            server_url,
            hook_base,
            version: env!("CARGO_PKG_VERSION").to_string(),
            should_quit: false,
        }
    }

    pub fn webhook_url(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.hook_base, endpoint.slug)
    }

    pub fn active_endpoint(&self) -> Option<&Endpoint> {
        let id = self.active?;
        self.endpoints.iter().find(|e| e.id == id)
    }

    /// Replace the endpoint list. Picks the first endpoint when nothing is
    /// selected, or drops the selection if its endpoint is gone.
    pub fn set_endpoints(&mut self, endpoints: Vec<Endpoint>) -> Option<Action> {
        self.endpoints = endpoints;
        self.endpoint_index = self.endpoint_index.min(self.endpoints.len().saturating_sub(1));

        let still_there = self
            .active
            .map(|id| self.endpoints.iter().any(|e| e.id == id))
            .unwrap_or(false);

        if still_there {
            if let Some(index) = self.endpoints.iter().position(|e| Some(e.id) == self.active) {
                self.endpoint_index = index;
            }
            return None;
        }

        let next = self.endpoints.first().map(|e| e.id);
        if next == self.active {
            return None;
        }
        self.endpoint_index = 0;
        Some(self.select(next))
    }

    /// Apply a server-side change to one endpoint
    pub fn update_endpoint(&mut self, endpoint: Endpoint) {
        if let Some(existing) = self.endpoints.iter_mut().find(|e| e.id == endpoint.id) {
            *existing = endpoint;
        }
    }

    pub fn on_connectivity(&mut self, state: ConnectionState) {
        self.link = match (state, self.link) {
            (ConnectionState::Open, _) => LinkStatus::Online,
            (ConnectionState::Idle, _) => LinkStatus::Offline,
            (ConnectionState::Connecting, LinkStatus::Connecting) => LinkStatus::Connecting,
            (ConnectionState::Connecting | ConnectionState::Closed, _) => LinkStatus::Reconnecting,
        };
    }

    /// A live request was added at the top of the list
    pub fn on_request_inserted(&mut self) {
        // Keep the same row highlighted
        if self.request_index > 0 {
            self.request_index += 1;
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    fn select(&mut self, endpoint: Option<EndpointId>) -> Action {
        self.active = endpoint;
        self.request_index = 0;
        self.confirm_clear = false;
        self.view = View::Dashboard;
        Action::Select(endpoint)
    }

    /// Handle a key press. `requests` are the ids currently listed for the
    /// active endpoint, newest first.
    pub fn handle_key(&mut self, key: KeyEvent, requests: &[RequestId]) -> Option<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }

        if self.confirm_clear {
            self.confirm_clear = false;
            return match (key.code, self.active) {
                (KeyCode::Char('y') | KeyCode::Char('Y'), Some(id)) => Some(Action::ClearRequests(id)),
                _ => {
                    self.set_status("Clear cancelled");
                    None
                }
            };
        }

        self.status_message = None;

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Esc => {
                match self.view {
                    View::Detail(_) => self.view = View::Dashboard,
                    View::Dashboard => self.focus = Focus::Endpoints,
                }
                None
            }
            KeyCode::Tab if self.view == View::Dashboard => {
                self.focus = match self.focus {
                    Focus::Endpoints => Focus::Requests,
                    Focus::Requests => Focus::Endpoints,
                };
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1, requests.len());
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1, requests.len());
                None
            }
            KeyCode::Enter => self.enter(requests),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('x') => {
                if self.active.is_some() {
                    self.confirm_clear = true;
                }
                None
            }
            KeyCode::Char('e') => self
                .active_endpoint()
                .map(|e| Action::SetEnabled(e.id, !e.enabled)),
            _ => None,
        }
    }

    fn move_selection(&mut self, delta: isize, request_count: usize) {
        let (index, len) = match (self.view, self.focus) {
            (View::Detail(_), _) => return,
            (View::Dashboard, Focus::Endpoints) => (&mut self.endpoint_index, self.endpoints.len()),
            (View::Dashboard, Focus::Requests) => (&mut self.request_index, request_count),
        };

        if len == 0 {
            *index = 0;
        } else if delta < 0 {
            *index = index.saturating_sub(1);
        } else {
            *index = (*index + 1).min(len - 1);
        }
    }

    fn enter(&mut self, requests: &[RequestId]) -> Option<Action> {
        match (self.view, self.focus) {
            (View::Dashboard, Focus::Endpoints) => {
                let id = self.endpoints.get(self.endpoint_index)?.id;
                self.focus = Focus::Requests;
                Some(self.select(Some(id)))
            }
            (View::Dashboard, Focus::Requests) => {
                let index = self.request_index.min(requests.len().checked_sub(1)?);
                self.view = View::Detail(requests[index]);
                None
            }
            (View::Detail(_), _) => None,
        }
    }
}
