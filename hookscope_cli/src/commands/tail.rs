//! Stream an endpoint's webhook calls to the terminal

use super::{api_client, format_bytes, live_session, styled_method};
use crate::config::Config;
use crate::live::transport::PushTransport;
use crate::live::{ConnectionState, LiveSession, Reconciler, SessionUpdate};
use anyhow::{Context, Result};
use chrono::Local;
use console::style;
use hookscope_common::{CapturedRequest, EndpointId, RequestId};
use std::collections::HashSet;
use std::future::Future;

/// Print the latest requests, then every new one as it arrives
pub async fn run(config: &Config, endpoint: EndpointId) -> Result<()> {
    let client = api_client(config)?;
    let info = client
        .get_endpoint(endpoint)
        .await
        .context("Failed to fetch endpoint")?;

    println!(
        "Tailing {} {}",
        style(&info.name).bold(),
        style(client.webhook_url(&info.slug)).green()
    );
    if !info.enabled {
        println!("{}", style("Capture is disabled for this endpoint").yellow());
    }
    println!("{}", style("Press Ctrl+C to stop").dim());
    println!();

    let mut session = live_session(config, client)?;
    session.start();
    session.select(Some(endpoint));

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    follow(&mut session, ctrl_c).await;

    session.shutdown().await;
    Ok(())
}

/// Print updates until the session ends or `shutdown` resolves
async fn follow<T: PushTransport>(session: &mut LiveSession<T>, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);

    let mut log = TailLog::default();
    let mut was_connected = false;

    loop {
        tokio::select! {
            update = session.next_update() => {
                let Some(update) = update else { break };

                match update {
                    SessionUpdate::Snapshot { applied: true, .. } => {
                        if let Some(error) = session.view().last_error() {
                            eprintln!("{} {}", style("Failed to load requests:").red(), error);
                        }
                        for request in log.on_snapshot(session.view()) {
                            log_request(request);
                        }
                    }
                    SessionUpdate::LiveEvent { id, accepted: true } => {
                        if let Some(request) = log.on_live_event(session.view(), id) {
                            log_request(request);
                        }
                    }
                    SessionUpdate::Connectivity(state) => {
                        log_connectivity(state, &mut was_connected);
                    }
                    _ => {}
                }
            }
            _ = &mut shutdown => break,
        }
    }
}

/// Decides which view entries still need a line.
///
/// Live requests that arrive before the first snapshot settles are held
/// back and printed with it, oldest first, so the output stays in
/// chronological order.
#[derive(Debug, Default)]
struct TailLog {
    printed: HashSet<RequestId>,
    ready: bool,
}

impl TailLog {
    /// A snapshot was applied (or failed); everything unprinted, oldest first
    fn on_snapshot<'a>(&mut self, view: &'a Reconciler) -> Vec<&'a CapturedRequest> {
        self.ready = true;
        view.requests()
            .iter()
            .rev()
            .filter(|request| self.printed.insert(request.id))
            .collect()
    }

    fn on_live_event<'a>(&mut self, view: &'a Reconciler, id: RequestId) -> Option<&'a CapturedRequest> {
        if !self.ready {
            return None;
        }
        view.find(id).filter(|_| self.printed.insert(id))
    }
}

fn log_connectivity(state: ConnectionState, was_connected: &mut bool) {
    match state {
        ConnectionState::Open => {
            let verb = if *was_connected { "Reconnected" } else { "Connected" };
            println!("{} {}", timestamp(), style(verb).green());
            *was_connected = true;
        }
        ConnectionState::Closed => {
            println!("{} {}", timestamp(), style("Connection lost, retrying...").yellow());
        }
        ConnectionState::Connecting | ConnectionState::Idle => {
            tracing::debug!("Live stream {}", state.as_str());
        }
    }
}

fn timestamp() -> String {
    style(Local::now().format("%H:%M:%S").to_string()).dim().to_string()
}

fn log_request(request: &CapturedRequest) {
    let received = request.received_at.with_timezone(&Local);
    let time = style(received.format("%H:%M:%S").to_string()).dim();

    let content_type = if request.content_type.is_empty() {
        style("-".to_string()).dim()
    } else {
        style(request.content_type.clone()).white()
    };

    println!(
        "{} {} {} {:>9} {} {}",
        time,
        styled_method(&request.method),
        style(format!("#{:<6}", request.id)).cyan(),
        format_bytes(request.size_bytes()),
        content_type,
        style(request.display_path()).dim()
    );
}
