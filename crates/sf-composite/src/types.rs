//! Composite API wire types.

use serde::{Deserialize, Serialize};

use crate::FAILURE_STATUS_THRESHOLD;

/// A composite request containing multiple subrequests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeRequest {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    #[serde(rename = "compositeRequest")]
    pub subrequests: Vec<CompositeSubrequest>,
}

impl CompositeRequest {
    /// Create an empty composite request.
    pub fn new(all_or_none: bool) -> Self {
        Self {
            all_or_none,
            subrequests: Vec::new(),
        }
    }

    /// Append a subrequest.
    pub fn with_subrequest(mut self, subrequest: CompositeSubrequest) -> Self {
        self.subrequests.push(subrequest);
        self
    }

    /// Serialize to the JSON body sent to the composite endpoint.
    pub fn to_body(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// A single subrequest within a composite request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeSubrequest {
    pub method: String,
    pub url: String,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl CompositeSubrequest {
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            reference_id: reference_id.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response from a composite request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeResponse {
    #[serde(rename = "compositeResponse")]
    pub responses: Vec<CompositeSubresponse>,
}

/// Response from a single subrequest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSubresponse {
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(rename = "httpHeaders", default, skip_serializing_if = "Option::is_none")]
    pub http_headers: Option<serde_json::Value>,
    #[serde(rename = "httpStatusCode")]
    pub http_status_code: u16,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
}

impl CompositeSubresponse {
    /// Returns true if this sub-operation failed.
    pub fn is_failure(&self) -> bool {
        self.http_status_code >= FAILURE_STATUS_THRESHOLD
    }

    /// The error message carried by the body, if any.
    ///
    /// Object bodies yield their `message` field. Array bodies (the usual
    /// shape of a failed sub-request) yield the messages of their elements
    /// joined with `", "`.
    pub fn message(&self) -> Option<String> {
        match &self.body {
            serde_json::Value::Object(map) => map.get("message").map(render_message),
            serde_json::Value::Array(items) => {
                let messages: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("message"))
                    .map(render_message)
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join(", "))
                }
            }
            _ => None,
        }
    }
}

fn render_message(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Error object the platform returns when it rejects a whole request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeError {
    pub message: String,
    #[serde(rename = "errorCode", default)]
    pub error_code: String,
}
