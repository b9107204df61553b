//! Composite response classification.

use tracing::trace;

use crate::error::{Error, ErrorKind, Result};
use crate::errors::CompositeErrors;
use crate::types::{CompositeError, CompositeResponse, CompositeSubresponse};
use crate::{WHOLE_BATCH_REFERENCE_ID, WHOLE_BATCH_STATUS};

/// Classify a composite response body.
///
/// Three shapes are recognized, in order:
///
/// 1. `{"compositeResponse": [...]}` with at least one sub-response: each one
///    is classified by its `httpStatusCode`.
/// 2. `{"message": ..., "errorCode": ...}`: the whole batch was rejected
///    before any sub-request ran. It becomes one synthetic failed
///    sub-response with reference id [`WHOLE_BATCH_REFERENCE_ID`].
/// 3. `[{"message": ..., "errorCode": ...}, ...]`: the same rejection in the
///    array form used by the REST API; one synthetic sub-response per element.
///
/// Anything else is [`ErrorKind::UnrecognizedResponse`].
pub fn parse_composite_response(data: &[u8]) -> Result<CompositeErrors> {
    if let Ok(response) = serde_json::from_slice::<CompositeResponse>(data) {
        if !response.responses.is_empty() {
            return Ok(CompositeErrors::from_responses(response.responses));
        }
        trace!("composite response carried no sub-responses");
    }

    if let Ok(error) = serde_json::from_slice::<CompositeError>(data) {
        if !error.message.is_empty() {
            return Ok(CompositeErrors::from_responses([whole_batch_failure(error)?]));
        }
    }

    if let Ok(errors) = serde_json::from_slice::<Vec<CompositeError>>(data) {
        if !errors.is_empty() && errors.iter().all(|e| !e.message.is_empty()) {
            let failures = errors
                .into_iter()
                .map(whole_batch_failure)
                .collect::<Result<Vec<_>>>()?;
            return Ok(CompositeErrors::from_responses(failures));
        }
    }

    Err(Error::new(ErrorKind::UnrecognizedResponse))
}

fn whole_batch_failure(error: CompositeError) -> Result<CompositeSubresponse> {
    Ok(CompositeSubresponse {
        body: serde_json::to_value(error)?,
        http_headers: None,
        http_status_code: WHOLE_BATCH_STATUS,
        reference_id: WHOLE_BATCH_REFERENCE_ID.to_string(),
    })
}
