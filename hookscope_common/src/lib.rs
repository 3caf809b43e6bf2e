//! Hookscope Common - Shared wire model for the webhook dashboard
//!
//! This crate contains the JSON shapes exchanged with the webhook-tester
//! server: endpoints, captured requests, snapshot pages and the frames
//! pushed over the live stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Server-side endpoint identifier
pub type EndpointId = u64;

/// Server-side captured request identifier
pub type RequestId = u64;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unsupported frame type: {0}")]
    UnsupportedType(String),
}

/// A webhook endpoint and its canned response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: EndpointId,

    pub name: String,

    /// URL path segment under `/hook/`
    pub slug: String,

    /// Required `X-Webhook-Secret` value, empty when auth is off
    #[serde(default)]
    pub secret_key: String,

    #[serde(default = "default_response_status")]
    pub response_status: u16,

    #[serde(default)]
    pub response_body: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub response_headers: BTreeMap<String, String>,

    #[serde(default)]
    pub delay_ms: u64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub created_at: DateTime<Utc>,
}

fn default_response_status() -> u16 {
    200
}

fn default_enabled() -> bool {
    true
}

impl Endpoint {
    /// Whether callers must present a secret header
    pub fn requires_secret(&self) -> bool {
        !self.secret_key.is_empty()
    }
}

/// One webhook call recorded by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub id: RequestId,

    /// Endpoint this call was received on
    pub endpoint_id: EndpointId,

    pub method: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub body: String,

    /// Raw query string without the leading `?`
    #[serde(default)]
    pub query_params: String,

    #[serde(default)]
    pub source_ip: String,

    #[serde(default)]
    pub content_type: String,

    pub received_at: DateTime<Utc>,

    /// Present only on single-request lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Box<Endpoint>>,
}

impl CapturedRequest {
    /// Path-ish label used in request lists
    pub fn display_path(&self) -> String {
        if self.query_params.is_empty() {
            "/".to_string()
        } else {
            format!("?{}", self.query_params)
        }
    }

    /// Body size in bytes
    pub fn size_bytes(&self) -> usize {
        self.body.len()
    }

    /// Body re-indented when it parses as JSON, otherwise returned as-is
    pub fn pretty_body(&self) -> String {
        match serde_json::from_str::<serde_json::Value>(&self.body) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| self.body.clone()),
            Err(_) => self.body.clone(),
        }
    }
}

/// Payload of a `new_request` frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveRequest {
    #[serde(flatten)]
    pub request: CapturedRequest,

    #[serde(default)]
    pub endpoint_slug: String,

    #[serde(default)]
    pub endpoint_name: String,
}

/// Raw frame pushed over the live stream: `{"type": ..., "data": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveFrame {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub data: serde_json::Value,
}

impl LiveFrame {
    /// Parse a frame from its JSON text
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Interpret the frame as a new-request notification
    pub fn into_new_request(self) -> Result<LiveRequest, ProtocolError> {
        if self.kind != constants::NEW_REQUEST_EVENT {
            return Err(ProtocolError::UnsupportedType(self.kind));
        }
        Ok(serde_json::from_value(self.data)?)
    }

    /// Build a new-request frame (used by tests and tooling)
    pub fn new_request(payload: &LiveRequest) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: constants::NEW_REQUEST_EVENT.to_string(),
            data: serde_json::to_value(payload)?,
        })
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One page of an endpoint's captured requests, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestsPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub requests: Vec<CapturedRequest>,

    pub total: u64,

    pub limit: u32,

    pub offset: u32,
}

/// Body for creating an endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateEndpoint {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Partial update of an endpoint; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateEndpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl UpdateEndpoint {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.secret_key.is_none()
            && self.response_status.is_none()
            && self.response_body.is_none()
            && self.response_headers.is_none()
            && self.delay_ms.is_none()
            && self.enabled.is_none()
    }
}

/// Error body returned by the server on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Response to clearing an endpoint's requests
#[derive(Debug, Clone, Deserialize)]
pub struct ClearedRequests {
    #[serde(default)]
    pub deleted: u64,
}

/// The server encodes empty Go maps and slices as `null`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Constants for the protocol
pub mod constants {
    /// Prefix of every REST route
    pub const API_PREFIX: &str = "/api";

    /// Path of the live push stream
    pub const LIVE_STREAM_PATH: &str = "/api/sse";

    /// Path prefix under which webhooks are received
    pub const HOOK_PREFIX: &str = "/hook";

    /// Frame type announcing a newly captured request
    pub const NEW_REQUEST_EVENT: &str = "new_request";

    /// Header carrying the endpoint secret
    pub const SECRET_HEADER: &str = "X-Webhook-Secret";

    /// Default snapshot page size
    pub const DEFAULT_PAGE_SIZE: u32 = 50;

    /// Largest page size the server honours
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Delay between a dropped live stream and the next attempt
    pub const RECONNECT_DELAY_MS: u64 = 3000;

    /// Port the webhook-tester server listens on by default
    pub const DEFAULT_SERVER_PORT: u16 = 9847;
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: &str = r#"{"type":"new_request","data":{"id":9,"endpoint_id":1,"method":"POST","headers":{"Content-Type":"application/json"},"body":"{\"a\":1}","query_params":"x=1","source_ip":"10.0.0.1","content_type":"application/json","received_at":"2024-05-01T12:30:00.123456789+02:00","endpoint_slug":"abc123","endpoint_name":"Stripe"}}"#;

    #[test]
    fn test_new_request_frame() {
        let live = LiveFrame::from_json(FRAME).unwrap().into_new_request().unwrap();

        assert_eq!(live.request.id, 9);
        assert_eq!(live.request.endpoint_id, 1);
        assert_eq!(live.request.method, "POST");
        assert_eq!(live.request.query_params, "x=1");
        assert_eq!(live.endpoint_slug, "abc123");
        assert_eq!(live.endpoint_name, "Stripe");
        assert_eq!(
            live.request.received_at.to_rfc3339(),
            "2024-05-01T10:30:00.123456789+00:00"
        );
    }

    #[test]
    fn test_unknown_frame_type() {
        let frame = LiveFrame::from_json(r#"{"type":"endpoint_deleted","data":{"id":3}}"#).unwrap();
        match frame.into_new_request() {
            Err(ProtocolError::UnsupportedType(kind)) => assert_eq!(kind, "endpoint_deleted"),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_frame() {
        assert!(matches!(
            LiveFrame::from_json("not json"),
            Err(ProtocolError::Decode(_))
        ));

        let frame = LiveFrame::from_json(r#"{"type":"new_request","data":{"id":"nope"}}"#).unwrap();
        assert!(matches!(frame.into_new_request(), Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_null_collections() {
        let json = r#"{"requests":null,"total":0,"limit":50,"offset":0}"#;
        let page: RequestsPage = serde_json::from_str(json).unwrap();
        assert!(page.requests.is_empty());

        let json = r#"{"id":1,"name":"n","slug":"s","secret_key":"","response_status":202,"response_body":"","response_headers":null,"delay_ms":0,"enabled":false,"created_at":"2024-05-01T12:00:00Z"}"#;
        let endpoint: Endpoint = serde_json::from_str(json).unwrap();
        assert!(endpoint.response_headers.is_empty());
        assert_eq!(endpoint.response_status, 202);
        assert!(!endpoint.enabled);
        assert!(!endpoint.requires_secret());
    }

    #[test]
    fn test_update_payload_skips_absent_fields() {
        let update = UpdateEndpoint {
            enabled: Some(false),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"enabled":false}"#);
        assert!(UpdateEndpoint::default().is_empty());
    }

    #[test]
    fn test_pretty_body() {
        let live = LiveFrame::from_json(FRAME).unwrap().into_new_request().unwrap();
        assert_eq!(live.request.pretty_body(), "{\n  \"a\": 1\n}");
        assert_eq!(live.request.display_path(), "?x=1");

        let mut plain = live.request.clone();
        plain.body = "hello".to_string();
        plain.query_params.clear();
        assert_eq!(plain.pretty_body(), "hello");
        assert_eq!(plain.display_path(), "/");
    }
}
