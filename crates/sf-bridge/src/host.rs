//! The host boundary.
//!
//! The host runtime owns the network. It exposes one asynchronous entry point
//! per verb (`get`, `post`, `patch`, `delete`) that hands back a promise-like
//! object, plus callback-style metadata lookups. Everything the host hands
//! back arrives as a [`HostValue`] so the invoker can check its shape before
//! trusting it.

use serde_json::{json, Value};

/// HTTP verb of a REST call through the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Patch,
    Delete,
}

impl Verb {
    /// Name of the host entry point for this verb.
    pub fn function_name(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
        }
    }

    /// Whether calls with this verb send a request body.
    pub fn carries_body(self) -> bool {
        matches!(self, Verb::Post | Verb::Patch)
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        })
    }
}

/// One outbound REST call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCall {
    pub verb: Verb,
    pub url: String,
    pub body: Option<Vec<u8>>,
}

impl HostCall {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            verb: Verb::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            verb: Verb::Post,
            url: url.into(),
            body: Some(body.into()),
        }
    }

    pub fn patch(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            verb: Verb::Patch,
            url: url.into(),
            body: Some(body.into()),
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            verb: Verb::Delete,
            url: url.into(),
            body: None,
        }
    }
}

/// A metadata lookup served by the host's UI API adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataLookup {
    /// Describe an SObject.
    ObjectInfo { object_api_name: String },
    /// Picklist values of every field for one record type.
    PicklistValues {
        object_api_name: String,
        record_type_id: String,
    },
}

impl MetadataLookup {
    /// Name of the host entry point serving this lookup.
    pub fn function_name(&self) -> &'static str {
        match self {
            MetadataLookup::ObjectInfo { .. } => "getObjectInfo",
            MetadataLookup::PicklistValues { .. } => "getPicklistValuesByRecordType",
        }
    }

    /// The config object passed to the host entry point.
    pub fn config(&self) -> Value {
        match self {
            MetadataLookup::ObjectInfo { object_api_name } => {
                json!({ "objectApiName": object_api_name })
            }
            MetadataLookup::PicklistValues {
                object_api_name,
                record_type_id,
            } => json!({
                "objectApiName": object_api_name,
                "recordTypeId": record_type_id,
            }),
        }
    }
}

/// A value handed across the host boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Undefined,
    String(String),
    Json(Value),
}

impl HostValue {
    /// The host-side type name, for contract violation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Undefined => "undefined",
            HostValue::String(_) => "string",
            HostValue::Json(Value::Null) => "null",
            HostValue::Json(Value::Bool(_)) => "boolean",
            HostValue::Json(Value::Number(_)) => "number",
            HostValue::Json(Value::String(_)) => "string",
            HostValue::Json(Value::Array(_)) => "array",
            HostValue::Json(Value::Object(_)) => "object",
        }
    }

    /// The string payload, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) | HostValue::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way the host would stringify it.
    pub fn render(&self) -> String {
        match self {
            HostValue::Undefined => "undefined".to_string(),
            HostValue::String(s) | HostValue::Json(Value::String(s)) => s.clone(),
            HostValue::Json(other) => other.to_string(),
        }
    }

    /// True for `undefined` and `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, HostValue::Undefined | HostValue::Json(Value::Null))
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::String(s)
    }
}

impl From<Value> for HostValue {
    fn from(value: Value) -> Self {
        HostValue::Json(value)
    }
}

/// A callback registered with the host. Receives the host's arguments.
pub type HostCallback = Box<dyn FnOnce(Vec<HostValue>) + Send + 'static>;

/// A promise-like object returned by a host entry point.
pub trait HostPromise: Send {
    /// Register fulfil and reject callbacks.
    ///
    /// The host calls at most one of them, possibly from another thread and
    /// possibly after `then` returns. Dropping both without calling either is
    /// treated as a broken promise.
    fn then(self: Box<Self>, on_fulfilled: HostCallback, on_rejected: HostCallback);
}

/// What a host entry point handed back.
pub enum HostReturn {
    Promise(Box<dyn HostPromise>),
    Value(HostValue),
}

impl HostReturn {
    pub fn promise(promise: impl HostPromise + 'static) -> Self {
        HostReturn::Promise(Box::new(promise))
    }
}

impl std::fmt::Debug for HostReturn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostReturn::Promise(_) => f.write_str("Promise(..)"),
            HostReturn::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// The host runtime's network primitives.
pub trait HostBridge: Send + Sync + 'static {
    /// Issue a REST call. A well-behaved host returns a promise.
    fn call(&self, call: &HostCall) -> HostReturn;

    /// Issue a metadata lookup. The host calls `callback` once with a single
    /// `{data, error}` object.
    fn lookup(&self, lookup: &MetadataLookup, callback: HostCallback);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_function_names() {
        assert_eq!(Verb::Get.function_name(), "get");
        assert_eq!(Verb::Post.function_name(), "post");
        assert_eq!(Verb::Patch.function_name(), "patch");
        assert_eq!(Verb::Delete.function_name(), "delete");
        assert_eq!(Verb::Patch.to_string(), "PATCH");
    }

    #[test]
    fn test_only_post_and_patch_carry_body() {
        assert!(Verb::Post.carries_body());
        assert!(Verb::Patch.carries_body());
        assert!(!Verb::Get.carries_body());
        assert!(!Verb::Delete.carries_body());

        assert!(HostCall::get("/x").body.is_none());
        assert_eq!(HostCall::post("/x", "{}").body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_lookup_config() {
        let lookup = MetadataLookup::ObjectInfo {
            object_api_name: "Account".into(),
        };
        assert_eq!(lookup.function_name(), "getObjectInfo");
        assert_eq!(lookup.config(), json!({"objectApiName": "Account"}));

        let lookup = MetadataLookup::PicklistValues {
            object_api_name: "Account".into(),
            record_type_id: "012000000000000AAA".into(),
        };
        assert_eq!(lookup.function_name(), "getPicklistValuesByRecordType");
        assert_eq!(
            lookup.config(),
            json!({"objectApiName": "Account", "recordTypeId": "012000000000000AAA"})
        );
    }

    #[test]
    fn test_host_value_rendering() {
        assert_eq!(HostValue::Undefined.render(), "undefined");
        assert_eq!(HostValue::from("boom").render(), "boom");
        assert_eq!(HostValue::from(json!("boom")).render(), "boom");
        assert_eq!(HostValue::from(json!({"a": 1})).render(), r#"{"a":1}"#);
        assert_eq!(HostValue::from(json!(42)).type_name(), "number");
        assert!(HostValue::from(json!(null)).is_nullish());
        assert!(!HostValue::from(json!(0)).is_nullish());
    }
}
