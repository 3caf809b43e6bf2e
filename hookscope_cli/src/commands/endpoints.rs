//! Endpoint management commands (endpoints, create, update, enable, disable, delete)

use super::{api_client, truncate};
use crate::api::ApiClient;
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use console::style;
use hookscope_common::{CreateEndpoint, Endpoint, EndpointId, UpdateEndpoint};
use std::collections::BTreeMap;

/// Response settings shared by `create` and `update`
#[derive(Debug, Clone, Default, Args)]
pub struct EndpointOptions {
    /// Secret callers must send in the X-Webhook-Secret header
    #[arg(long)]
    pub secret: Option<String>,

    /// Status code returned to callers
    #[arg(long, value_parser = clap::value_parser!(u16).range(100..=599))]
    pub status: Option<u16>,

    /// Response body returned to callers
    #[arg(long)]
    pub body: Option<String>,

    /// Response header, as "Name: value" (repeatable)
    #[arg(long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Delay before responding, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

/// List all endpoints
pub async fn list(config: &Config) -> Result<()> {
    let client = api_client(config)?;
    let endpoints = client
        .list_endpoints()
        .await
        .context("Failed to fetch endpoints")?;

    if endpoints.is_empty() {
        println!("No endpoints yet.");
        println!();
        println!("Create one with: hookscope create <NAME>");
        return Ok(());
    }

    println!(
        "{:<6} {:<24} {:<48} {:<8} {:<8}",
        "ID", "NAME", "WEBHOOK URL", "STATUS", "REPLY"
    );
    println!("{}", "-".repeat(96));

    for endpoint in &endpoints {
        let state = if endpoint.enabled {
            style(format!("{:<8}", "enabled")).green()
        } else {
            style(format!("{:<8}", "disabled")).dim()
        };

        println!(
            "{:<6} {:<24} {:<48} {} {:<8}",
            endpoint.id,
            truncate(&endpoint.name, 22),
            truncate(&client.webhook_url(&endpoint.slug), 46),
            state,
            endpoint.response_status
        );
    }

    Ok(())
}

/// Create an endpoint
pub async fn create(
    config: &Config,
    name: String,
    slug: Option<String>,
    disabled: bool,
    opts: EndpointOptions,
) -> Result<()> {
    let body = CreateEndpoint {
        name,
        slug,
        secret_key: opts.secret,
        response_status: opts.status,
        response_body: opts.body,
        response_headers: parse_headers(&opts.headers)?,
        delay_ms: opts.delay_ms,
        enabled: disabled.then_some(false),
    };

    let client = api_client(config)?;
    let endpoint = client
        .create_endpoint(&body)
        .await
        .context("Failed to create endpoint")?;

    println!("{} {}", style("Created endpoint").green(), style(&endpoint.name).bold());
    print_endpoint(&client, &endpoint);
    Ok(())
}

/// Change an endpoint's name or response settings
pub async fn update(
    config: &Config,
    id: EndpointId,
    name: Option<String>,
    opts: EndpointOptions,
) -> Result<()> {
    let body = UpdateEndpoint {
        name,
        secret_key: opts.secret,
        response_status: opts.status,
        response_body: opts.body,
        response_headers: parse_headers(&opts.headers)?,
        delay_ms: opts.delay_ms,
        enabled: None,
    };

    if body.is_empty() {
        anyhow::bail!("Nothing to update. Pass at least one option, see `hookscope update --help`.");
    }

    let client = api_client(config)?;
    let endpoint = client
        .update_endpoint(id, &body)
        .await
        .context("Failed to update endpoint")?;

    println!("{} {}", style("Updated endpoint").green(), style(&endpoint.name).bold());
    print_endpoint(&client, &endpoint);
    Ok(())
}

/// Turn webhook capture on or off
pub async fn set_enabled(config: &Config, id: EndpointId, enabled: bool) -> Result<()> {
    let client = api_client(config)?;
    let endpoint = client
        .update_endpoint(
            id,
            &UpdateEndpoint {
                enabled: Some(enabled),
                ..Default::default()
            },
        )
        .await
        .context("Failed to update endpoint")?;

    let verb = if endpoint.enabled { "Enabled" } else { "Disabled" };
    println!("{} {} ({})", verb, style(&endpoint.name).bold(), client.webhook_url(&endpoint.slug));
    Ok(())
}

/// Delete an endpoint and its captured requests
pub async fn delete(config: &Config, id: EndpointId) -> Result<()> {
    let client = api_client(config)?;
    client
        .delete_endpoint(id)
        .await
        .context("Failed to delete endpoint")?;

    println!("Deleted endpoint {}", id);
    Ok(())
}

fn print_endpoint(client: &ApiClient, endpoint: &Endpoint) {
    println!("  {} {}", style("ID:      ").dim(), endpoint.id);
    println!(
        "  {} {}",
        style("URL:     ").dim(),
        style(client.webhook_url(&endpoint.slug)).green().bold()
    );
    println!("  {} {}", style("Reply:   ").dim(), endpoint.response_status);
    if endpoint.delay_ms > 0 {
        println!("  {} {} ms", style("Delay:   ").dim(), endpoint.delay_ms);
    }
    for (name, value) in &endpoint.response_headers {
        println!("  {} {}: {}", style("Header:  ").dim(), name, value);
    }
    if endpoint.requires_secret() {
        println!(
            "  {} send {} with every call",
            style("Secret:  ").dim(),
            style(hookscope_common::constants::SECRET_HEADER).cyan()
        );
    }
    if !endpoint.enabled {
        println!("  {}", style("Capture is disabled").yellow());
    }
}

/// Parse repeated `Name: value` flags; `None` when none were given
fn parse_headers(raw: &[String]) -> Result<Option<BTreeMap<String, String>>> {
    if raw.is_empty() {
        return Ok(None);
    }

    let mut headers = BTreeMap::new();
    for header in raw {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("Invalid header {:?}, expected \"Name: value\"", header))?;

        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Invalid header {:?}, name is empty", header);
        }
        headers.insert(name.to_string(), value.trim().to_string());
    }

    Ok(Some(headers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        assert_eq!(parse_headers(&[]).unwrap(), None);

        let headers = parse_headers(&[
            "Content-Type: application/json".to_string(),
            "X-Trace:abc:def".to_string(),
        ])
        .unwrap()
        .unwrap();
        assert_eq!(headers["Content-Type"], "application/json");
        assert_eq!(headers["X-Trace"], "abc:def");
    }

    #[test]
    fn test_parse_headers_rejects_malformed() {
        assert!(parse_headers(&["no-colon".to_string()]).is_err());
        assert!(parse_headers(&[": value".to_string()]).is_err());
    }
}
