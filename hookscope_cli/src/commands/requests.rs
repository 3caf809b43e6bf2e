//! Captured request commands (requests, show, clear)

use super::{api_client, format_bytes, styled_method, truncate};
use crate::config::Config;
use anyhow::{Context, Result};
use chrono::Local;
use console::style;
use hookscope_common::{EndpointId, RequestId};

/// List one page of an endpoint's requests, newest first
pub async fn list(config: &Config, endpoint: EndpointId, limit: Option<u32>, offset: u32) -> Result<()> {
    let client = api_client(config)?;
    let page = client
        .list_requests(endpoint, limit.unwrap_or(config.page_size), offset)
        .await
        .context("Failed to fetch requests")?;

    if page.requests.is_empty() {
        if page.total == 0 {
            println!("No requests captured for endpoint {} yet.", endpoint);
        } else {
            println!("No requests at offset {} ({} in total).", offset, page.total);
        }
        return Ok(());
    }

    println!(
        "{:<8} {:<19} {:>7} {:<32} {:>9} {:<16}",
        "ID", "RECEIVED", "METHOD", "QUERY", "SIZE", "SOURCE"
    );
    println!("{}", "-".repeat(96));

    for request in &page.requests {
        println!(
            "{:<8} {:<19} {} {:<32} {:>9} {:<16}",
            request.id,
            request
                .received_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S"),
            styled_method(&request.method),
            truncate(&request.display_path(), 30),
            format_bytes(request.size_bytes()),
            request.source_ip
        );
    }

    let first = page.offset as u64 + 1;
    let last = page.offset as u64 + page.requests.len() as u64;
    println!();
    println!("{}", style(format!("Showing {}-{} of {}", first, last, page.total)).dim());

    Ok(())
}

/// Print one request in full
pub async fn show(config: &Config, id: RequestId) -> Result<()> {
    let client = api_client(config)?;
    let request = client
        .get_request(id)
        .await
        .context("Failed to fetch request")?;

    println!(
        "{} {} {}",
        styled_method(request.method.trim()).bold(),
        style(request.display_path()).white(),
        style(format!("#{}", request.id)).dim()
    );

    let endpoint = match &request.endpoint {
        Some(endpoint) => format!("{} ({})", endpoint.name, endpoint.slug),
        None => request.endpoint_id.to_string(),
    };
    println!("{} {}", style("Endpoint:").dim(), endpoint);
    println!(
        "{} {}",
        style("Received:").dim(),
        request.received_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S%.3f")
    );
    println!("{} {}", style("Source:  ").dim(), request.source_ip);
    println!("{} {}", style("Size:    ").dim(), format_bytes(request.size_bytes()));

    println!();
    println!("{}", style("Headers").cyan().bold());
    if request.headers.is_empty() {
        println!("  {}", style("(none)").dim());
    }
    for (name, value) in &request.headers {
        println!("  {}: {}", style(name).dim(), value);
    }

    if !request.query_params.is_empty() {
        println!();
        println!("{}", style("Query").cyan().bold());
        for pair in request.query_params.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            println!("  {} = {}", style(key).dim(), value);
        }
    }

    println!();
    println!("{}", style("Body").cyan().bold());
    if request.body.is_empty() {
        println!("  {}", style("(empty)").dim());
    } else {
        println!("{}", request.pretty_body());
    }

    Ok(())
}

/// Delete every captured request of an endpoint
pub async fn clear(config: &Config, endpoint: EndpointId) -> Result<()> {
    let client = api_client(config)?;
    let deleted = client
        .clear_requests(endpoint)
        .await
        .context("Failed to clear requests")?;

    println!("Cleared {} request(s) from endpoint {}", deleted, endpoint);
    Ok(())
}
