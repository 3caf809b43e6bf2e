//! CLI subcommands

pub mod endpoints;
pub mod requests;
pub mod settings;
pub mod tail;
pub mod watch;

use crate::api::ApiClient;
use crate::config::Config;
use crate::live::{ApiSnapshotSource, LiveSession, SseTransport};
use anyhow::{Context, Result};
use console::{style, StyledObject};

/// API client for the configured server
pub fn api_client(config: &Config) -> Result<ApiClient> {
    ApiClient::new(&config.server_url).context("Failed to build HTTP client")
}

/// Live session against the configured server; not started yet
pub fn live_session(config: &Config, client: ApiClient) -> Result<LiveSession<SseTransport>> {
    let transport = SseTransport::new(&config.server_url).context("Failed to build live stream client")?;
    let source = ApiSnapshotSource::new(client, config.page_size);
    Ok(LiveSession::new(transport, source, config.reconnect_delay()))
}

/// HTTP method padded and coloured for log lines
pub fn styled_method(method: &str) -> StyledObject<String> {
    let padded = format!("{:>7}", method);
    match method {
        "GET" => style(padded).green(),
        "POST" => style(padded).yellow(),
        "PUT" => style(padded).blue(),
        "PATCH" => style(padded).magenta(),
        "DELETE" => style(padded).red(),
        "HEAD" => style(padded).cyan(),
        _ => style(padded).white(),
    }
}

pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
