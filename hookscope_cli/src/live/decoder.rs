//! Decoding of raw live-stream frames into captured requests

use hookscope_common::{CapturedRequest, LiveFrame, ProtocolError};

/// Longest slice of a rejected frame echoed into the log
const PREVIEW_LEN: usize = 120;

/// Decode one raw frame.
///
/// Only `new_request` frames produce a request. Anything else, including
/// text that is not JSON at all, is logged and dropped so a bad frame can
/// never take the channel down.
pub fn decode_frame(raw: &str) -> Option<CapturedRequest> {
    let frame = match LiveFrame::from_json(raw) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, frame = preview(raw), "Discarding malformed live frame");
            return None;
        }
    };

    match frame.into_new_request() {
        Ok(live) => {
            tracing::debug!(
                "Live request {} on endpoint {} ({})",
                live.request.id,
                live.request.endpoint_id,
                live.endpoint_slug
            );
            Some(live.request)
        }
        Err(ProtocolError::UnsupportedType(kind)) => {
            tracing::debug!("Ignoring live frame of type {}", kind);
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, frame = preview(raw), "Discarding live frame with bad payload");
            None
        }
    }
}

fn preview(raw: &str) -> &str {
    match raw.char_indices().nth(PREVIEW_LEN) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}
