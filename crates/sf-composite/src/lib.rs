//! # sf-composite
//!
//! Codec for the Salesforce Composite API as seen by a bridge client.
//!
//! A composite request carries several sub-requests in one call, and the
//! platform answers with one sub-response per `referenceId`. Some of those may
//! fail while others succeed, so a transport-level success can still hide
//! failed sub-operations. This crate:
//!
//! - detects whether an outgoing call is a composite request ([`is_composite`])
//! - classifies a composite response into failed and successful sub-responses
//!   ([`parse_composite_response`])
//! - renders the failures as one aggregate error value ([`CompositeErrors`])
//!
//! Everything here is pure: no I/O, no locking.
//!
//! ## Example
//!
//! ```rust
//! use thunder_sf_composite::{is_composite, parse_composite_response};
//!
//! let url = "/services/data/v62.0/composite";
//! let body = br#"{"allOrNone":false,"compositeRequest":[]}"#;
//! assert!(is_composite(url, body));
//!
//! let response = br#"{"compositeResponse":[
//!     {"body":{"id":"001xx"},"httpStatusCode":201,"referenceId":"NewAccount"},
//!     {"body":[{"message":"Required fields are missing: [LastName]","errorCode":"REQUIRED_FIELD_MISSING"}],
//!      "httpStatusCode":400,"referenceId":"NewContact"}
//! ]}"#;
//! let outcome = parse_composite_response(response).unwrap();
//! assert!(outcome.has_errors());
//! assert_eq!(outcome.partial_data()[0].reference_id, "NewAccount");
//! assert_eq!(
//!     outcome.to_string(),
//!     "composite request failed: ref NewContact: Required fields are missing: [LastName]"
//! );
//! ```

mod detect;
mod error;
mod errors;
mod parse;
mod types;

pub use detect::is_composite;
pub use error::{Error, ErrorKind, Result};
pub use errors::CompositeErrors;
pub use parse::parse_composite_response;
pub use types::{
    CompositeError, CompositeRequest, CompositeResponse, CompositeSubrequest,
    CompositeSubresponse,
};

/// Path segment identifying the composite endpoint.
pub const COMPOSITE_PATH_SEGMENT: &str = "/composite";

/// Top-level key of a composite request body.
pub const COMPOSITE_REQUEST_KEY: &str = "compositeRequest";

/// Reference id given to the synthetic sub-response built when the whole
/// batch was rejected before any sub-request ran.
pub const WHOLE_BATCH_REFERENCE_ID: &str = "composite";

/// Status code given to the synthetic whole-batch sub-response.
pub const WHOLE_BATCH_STATUS: u16 = 400;

/// Sub-responses at or above this status are failures.
pub const FAILURE_STATUS_THRESHOLD: u16 = 400;
