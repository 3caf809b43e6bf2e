//! Show or change saved settings

use crate::config::{config_file, Config, SERVER_ENV};
use anyhow::Result;
use console::style;

/// Values to persist; `None` leaves a setting unchanged
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub server_url: Option<String>,
    pub page_size: Option<u32>,
    pub reconnect_delay_ms: Option<u64>,
}

impl SettingsUpdate {
    fn is_empty(&self) -> bool {
        self.server_url.is_none() && self.page_size.is_none() && self.reconnect_delay_ms.is_none()
    }

    fn apply(self, config: &mut Config) {
        if let Some(url) = self.server_url {
            config.server_url = url.trim_end_matches('/').to_string();
        }
        if let Some(size) = self.page_size {
            config.page_size = size;
        }
        if let Some(delay) = self.reconnect_delay_ms {
            config.reconnect_delay_ms = delay;
        }
    }
}

pub async fn run(update: SettingsUpdate) -> Result<()> {
    // The file itself, without env or flag overrides
    let mut config = Config::load()?;

    if !update.is_empty() {
        update.apply(&mut config);
        config.save()?;
        println!("{} {}", style("Saved").green(), config_file().display());
    }

    println!("  {} {}", style("server_url:        ").dim(), config.server_url);
    println!("  {} {}", style("page_size:         ").dim(), config.page_size);
    println!("  {} {}", style("reconnect_delay_ms:").dim(), config.reconnect_delay_ms);

    if let Ok(server) = std::env::var(SERVER_ENV) {
        if !server.is_empty() {
            println!();
            println!("{} {} overrides server_url with {}", style("Note:").yellow(), SERVER_ENV, server);
        }
    }

    Ok(())
}
