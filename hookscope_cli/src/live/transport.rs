//! Push transport: the long-lived event-stream response

use super::sse::sse_frames;
use super::LiveError;
use futures_util::{Stream, StreamExt};
use hookscope_common::constants;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Raw message frames from one open connection. An `Err` item or the end
/// of the stream both mean the connection is gone.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, LiveError>> + Send>>;

/// Opens push connections. Implementations only connect; retry policy
/// belongs to the connection manager.
pub trait PushTransport: Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = Result<FrameStream, LiveError>> + Send;
}

/// Server-Sent Events over HTTP
pub struct SseTransport {
    client: Client,
    url: String,
}

impl SseTransport {
    pub fn new(server_url: &str) -> Result<Self, LiveError> {
        // No overall timeout: the response body is meant to stay open
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(LiveError::Client)?;

        Ok(Self {
            client,
            url: format!(
                "{}{}",
                server_url.trim_end_matches('/'),
                constants::LIVE_STREAM_PATH
            ),
        })
    }
}

impl PushTransport for SseTransport {
    fn connect(&self) -> impl Future<Output = Result<FrameStream, LiveError>> + Send {
        let request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");

        async move {
            let response = request.send().await.map_err(LiveError::Connect)?;

            let status = response.status();
            if !status.is_success() {
                return Err(LiveError::Status(status));
            }

            // Only unnamed events carry data; named ones (the server's
            // `connected` greeting) are informational
            let frames = sse_frames(Box::pin(response.bytes_stream())).filter_map(|frame| async move {
                match frame {
                    Ok(frame) if frame.is_message() => Some(Ok(frame.data)),
                    Ok(frame) => {
                        tracing::debug!("Live stream event {:?}: {}", frame.event, frame.data);
                        None
                    }
                    Err(e) => Some(Err(LiveError::Read(e))),
                }
            });

            Ok(Box::pin(frames) as FrameStream)
        }
    }
}
