//! REST API of the webhook-tester server

mod client;

pub use client::ApiClient;

use reqwest::StatusCode;
use thiserror::Error;

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} ({status})")]
    Server { status: StatusCode, message: String },
}
