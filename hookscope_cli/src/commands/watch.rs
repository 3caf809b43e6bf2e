//! Full-screen live dashboard

use super::{api_client, live_session};
use crate::api::ApiClient;
use crate::config::Config;
use crate::live::{LiveSession, SessionUpdate, SseTransport};
use crate::tui::{self, Action, TuiApp};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use hookscope_common::RequestId;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Run the dashboard until the user quits
pub async fn run(config: &Config) -> Result<()> {
    let client = api_client(config)?;

    // Fail before taking over the terminal if the server is unreachable
    let endpoints = client
        .list_endpoints()
        .await
        .with_context(|| format!("Failed to reach server at {}", config.server_url))?;

    let mut session = live_session(config, client.clone())?;
    let mut app = TuiApp::new(config.server_url.clone(), client.webhook_url(""));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    session.start();
    if let Some(action) = app.set_endpoints(endpoints) {
        apply(action, &mut app, &mut session, &client).await;
    }

    let result = event_loop(&mut terminal, &mut app, &mut session, &client).await;

    // Stop the live stream before handing the terminal back
    session.shutdown().await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Term,
    app: &mut TuiApp,
    session: &mut LiveSession<SseTransport>,
    client: &ApiClient,
) -> Result<()> {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(100));

    loop {
        terminal.draw(|f| tui::draw(f, app, session.view()))?;

        tokio::select! {
            _ = tick_interval.tick() => {
                while event::poll(Duration::from_millis(0))? {
                    let Event::Key(key) = event::read()? else { continue };
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }

                    let ids: Vec<RequestId> = session.view().requests().iter().map(|r| r.id).collect();
                    let action = app.handle_key(key, &ids);
                    if app.should_quit {
                        return Ok(());
                    }
                    if let Some(action) = action {
                        apply(action, app, session, client).await;
                    }
                }
            }

            Some(update) = session.next_update() => {
                match update {
                    SessionUpdate::LiveEvent { accepted: true, .. } => app.on_request_inserted(),
                    SessionUpdate::Connectivity(state) => app.on_connectivity(state),
                    _ => {}
                }
            }
        }
    }
}

/// Perform a key-triggered side effect. API failures are shown in the
/// footer instead of ending the session.
async fn apply(
    action: Action,
    app: &mut TuiApp,
    session: &mut LiveSession<SseTransport>,
    client: &ApiClient,
) {
    match action {
        Action::Select(scope) => {
            tracing::info!("Selected endpoint {:?}", scope);
            session.select(scope);
        }

        Action::Refresh => match client.list_endpoints().await {
            Ok(endpoints) => {
                match app.set_endpoints(endpoints) {
                    Some(Action::Select(scope)) => session.select(scope),
                    _ => session.refresh(),
                }
                app.set_status("Refreshed");
            }
            Err(e) => {
                tracing::warn!("Failed to refresh endpoints: {}", e);
                app.set_status(format!("Refresh failed: {}", e));
            }
        },

        Action::ClearRequests(endpoint) => match client.clear_requests(endpoint).await {
            Ok(deleted) => {
                if session.scope() == Some(endpoint) {
                    session.clear_view();
                }
                app.request_index = 0;
                app.set_status(format!("Cleared {} request(s)", deleted));
            }
            Err(e) => {
                tracing::warn!("Failed to clear requests of endpoint {}: {}", endpoint, e);
                app.set_status(format!("Clear failed: {}", e));
            }
        },

        Action::SetEnabled(endpoint, enabled) => {
            let update = hookscope_common::UpdateEndpoint {
                enabled: Some(enabled),
                ..Default::default()
            };
            match client.update_endpoint(endpoint, &update).await {
                Ok(updated) => {
                    let verb = if updated.enabled { "Enabled" } else { "Disabled" };
                    app.set_status(format!("{} {}", verb, updated.name));
                    app.update_endpoint(updated);
                }
                Err(e) => {
                    tracing::warn!("Failed to update endpoint {}: {}", endpoint, e);
                    app.set_status(format!("Update failed: {}", e));
                }
            }
        }
    }
}
