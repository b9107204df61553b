//! Composite request detection.

use crate::{COMPOSITE_PATH_SEGMENT, COMPOSITE_REQUEST_KEY};

/// Returns true if `url` and `body` describe a composite request.
///
/// Both must agree: the URL contains the composite path segment and the body
/// is a JSON object carrying the `compositeRequest` key. A body that is not
/// valid JSON is simply not composite.
pub fn is_composite(url: &str, body: &[u8]) -> bool {
    if !url.contains(COMPOSITE_PATH_SEGMENT) {
        return false;
    }

    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => map.contains_key(COMPOSITE_REQUEST_KEY),
        _ => false,
    }
}
