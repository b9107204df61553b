//! Aggregate error for partially failed composite requests.

use std::fmt;

use crate::types::CompositeSubresponse;

/// Outcome of a composite request, split into failed and successful
/// sub-responses.
///
/// Every sub-response lands in exactly one of the two lists and keeps its
/// position relative to the others in the same list. The value doubles as an
/// error: callers that get one back can still apply the successes in
/// [`partial_data`](Self::partial_data) and report only the failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeErrors {
    errors: Vec<CompositeSubresponse>,
    partial_data: Vec<CompositeSubresponse>,
}

impl CompositeErrors {
    /// Partition sub-responses by status code.
    pub fn from_responses(responses: impl IntoIterator<Item = CompositeSubresponse>) -> Self {
        let (errors, partial_data): (Vec<_>, Vec<_>) =
            responses.into_iter().partition(|r| r.is_failure());
        Self {
            errors,
            partial_data,
        }
    }

    /// Returns true if at least one sub-operation failed.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Failed sub-responses, in input order.
    pub fn errors(&self) -> &[CompositeSubresponse] {
        &self.errors
    }

    /// Successful sub-responses, in input order.
    pub fn partial_data(&self) -> &[CompositeSubresponse] {
        &self.partial_data
    }

    /// Reference ids of the failed sub-operations.
    pub fn failed_reference_ids(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|r| r.reference_id.as_str())
    }

    /// Reference ids of the successful sub-operations.
    pub fn succeeded_reference_ids(&self) -> impl Iterator<Item = &str> {
        self.partial_data.iter().map(|r| r.reference_id.as_str())
    }

    /// Total number of sub-responses.
    pub fn len(&self) -> usize {
        self.errors.len() + self.partial_data.len()
    }

    /// Returns true if the response carried no sub-responses.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into `(errors, partial_data)`.
    pub fn into_parts(self) -> (Vec<CompositeSubresponse>, Vec<CompositeSubresponse>) {
        (self.errors, self.partial_data)
    }
}

impl fmt::Display for CompositeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("composite request failed");
        }

        let messages: Vec<String> = self
            .errors
            .iter()
            .filter_map(|sub| {
                sub.message()
                    .map(|message| format!("ref {}: {}", sub.reference_id, message))
            })
            .collect();

        if messages.is_empty() {
            write!(
                f,
                "composite request failed with {} errors",
                self.errors.len()
            )
        } else {
            write!(f, "composite request failed: {}", messages.join("; "))
        }
    }
}

impl std::error::Error for CompositeErrors {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sub(reference_id: &str, status: u16, body: serde_json::Value) -> CompositeSubresponse {
        CompositeSubresponse {
            body,
            http_headers: None,
            http_status_code: status,
            reference_id: reference_id.to_string(),
        }
    }

    #[test]
    fn test_empty_errors_display() {
        let errors = CompositeErrors::default();
        assert!(!errors.has_errors());
        assert_eq!(errors.to_string(), "composite request failed");
    }

    #[test]
    fn test_len_counts_both_partitions() {
        assert!(CompositeErrors::default().is_empty());

        let errors = CompositeErrors::from_responses(vec![
            sub("ok", 200, json!({})),
            sub("bad", 400, json!({"message": "nope"})),
        ]);
        assert_eq!(errors.len(), 2);
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_display_with_messages_in_input_order() {
        let errors = CompositeErrors::from_responses(vec![
            sub("ref1", 400, json!({"message": "Required fields are missing", "errorCode": "REQUIRED_FIELD_MISSING"})),
            sub("ok", 201, json!({"id": "001"})),
            sub("ref2", 404, json!({"message": "Invalid object type", "errorCode": "INVALID_TYPE"})),
        ]);

        assert_eq!(
            errors.to_string(),
            "composite request failed: ref ref1: Required fields are missing; ref ref2: Invalid object type"
        );
    }

    #[test]
    fn test_display_skips_errors_without_message() {
        let errors = CompositeErrors::from_responses(vec![
            sub("ref1", 500, json!({"detail": "no message here"})),
            sub("ref2", 400, json!({"message": "bad"})),
        ]);
        assert_eq!(errors.to_string(), "composite request failed: ref ref2: bad");
    }

    #[test]
    fn test_display_count_fallback() {
        let errors = CompositeErrors::from_responses(vec![
            sub("ref1", 500, json!(null)),
            sub("ref2", 503, json!("Service Unavailable")),
        ]);
        assert_eq!(errors.to_string(), "composite request failed with 2 errors");
    }

    #[test]
    fn test_partition_preserves_every_subresponse() {
        let statuses = [200u16, 400, 201, 404, 204, 500, 399];
        let responses: Vec<_> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| sub(&format!("ref{i}"), *s, json!({})))
            .collect();

        let errors = CompositeErrors::from_responses(responses);

        assert_eq!(errors.len(), statuses.len());
        assert_eq!(errors.errors().len(), 3);
        assert_eq!(errors.partial_data().len(), 4);
        assert_eq!(
            errors.failed_reference_ids().collect::<Vec<_>>(),
            vec!["ref1", "ref3", "ref5"]
        );
        assert_eq!(
            errors.succeeded_reference_ids().collect::<Vec<_>>(),
            vec!["ref0", "ref2", "ref4", "ref6"]
        );
    }

    #[test]
    fn test_all_successful() {
        let errors = CompositeErrors::from_responses(vec![
            sub("a", 200, json!({})),
            sub("b", 201, json!({})),
        ]);
        assert!(!errors.has_errors());
        assert!(errors.errors().is_empty());
        assert_eq!(errors.partial_data().len(), 2);
    }

    #[test]
    fn test_into_parts() {
        let errors = CompositeErrors::from_responses(vec![
            sub("a", 400, json!({})),
            sub("b", 200, json!({})),
        ]);
        let (failed, succeeded) = errors.into_parts();
        assert_eq!(failed[0].reference_id, "a");
        assert_eq!(succeeded[0].reference_id, "b");
    }
}
