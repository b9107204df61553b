//! Blocking invoker over the host's asynchronous primitives.

use std::sync::Arc;

use serde_json::Value;
use thunder_sf_composite::{is_composite, parse_composite_response};
use tracing::{debug, instrument, warn};

use crate::completion::{self, Completion, CompletionSlot};
use crate::config::InvokerConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::host::{HostBridge, HostCall, HostCallback, HostReturn, HostValue, MetadataLookup};
use crate::locks::{CallClass, CallLocks};

/// Turns host promise and callback primitives into blocking calls.
///
/// Each call goes through the gate for its [`CallClass`] while it is being
/// dispatched, then waits for the host on the calling thread. Clones share
/// the same host and the same gates.
///
/// The blocking methods drive a tokio runtime through a [`Handle`]. Call them
/// from plain threads or from inside `spawn_blocking`, never directly from an
/// async task.
///
/// [`Handle`]: tokio::runtime::Handle
#[derive(Clone)]
pub struct Invoker {
    host: Arc<dyn HostBridge>,
    locks: Arc<CallLocks>,
    config: InvokerConfig,
    handle: tokio::runtime::Handle,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Invoker {
    /// Create an invoker bound to the current tokio runtime.
    pub fn new(host: Arc<dyn HostBridge>) -> Result<Self> {
        Self::with_config(host, InvokerConfig::default())
    }

    /// Create an invoker with custom configuration, bound to the current
    /// tokio runtime.
    pub fn with_config(host: Arc<dyn HostBridge>, config: InvokerConfig) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::with_source(
                ErrorKind::Config("invoker must be created inside a tokio runtime".into()),
                e,
            )
        })?;
        Ok(Self::with_handle(host, config, handle))
    }

    /// Create an invoker that drives the given runtime.
    pub fn with_handle(
        host: Arc<dyn HostBridge>,
        config: InvokerConfig,
        handle: tokio::runtime::Handle,
    ) -> Self {
        Self {
            host,
            locks: Arc::new(CallLocks::new()),
            config,
            handle,
        }
    }

    /// Share dispatch gates with other invokers talking to the same host.
    pub fn with_locks(mut self, locks: Arc<CallLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn locks(&self) -> &Arc<CallLocks> {
        &self.locks
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// GET `url`.
    pub fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.invoke(HostCall::get(url))
    }

    /// POST `body` to `url`.
    pub fn post(&self, url: &str, body: impl Into<Vec<u8>>) -> Result<Vec<u8>> {
        self.invoke(HostCall::post(url, body))
    }

    /// PATCH `url` with `body`.
    pub fn patch(&self, url: &str, body: impl Into<Vec<u8>>) -> Result<Vec<u8>> {
        self.invoke(HostCall::patch(url, body))
    }

    /// DELETE `url`.
    pub fn delete(&self, url: &str) -> Result<Vec<u8>> {
        self.invoke(HostCall::delete(url))
    }

    /// Issue a REST call and block until the host settles it.
    ///
    /// For POST and PATCH calls against the composite endpoint, a response
    /// reporting failed sub-requests comes back as
    /// [`ErrorKind::PartialBatch`] carrying the full payload.
    #[instrument(skip(self, call), fields(verb = %call.verb, url = %call.url))]
    pub fn invoke(&self, call: HostCall) -> Result<Vec<u8>> {
        let operation = format!("{}()", call.verb.function_name());
        let (slot, signal) = completion::channel();

        {
            let _permit = self.locks.acquire(CallClass::Rest);
            let host = Arc::clone(&self.host);
            let dispatched = call.clone();
            self.handle
                .block_on(self.handle.spawn_blocking(move || dispatch_call(&*host, &dispatched, slot)))??;
            debug!("callbacks registered");
        }

        let completion = self.handle.block_on(signal.wait(
            &operation,
            self.config.liveness_interval,
            self.config.timeout,
        ))?;
        let payload = settle(completion)?;

        match call.body.as_deref() {
            Some(body) if call.verb.carries_body() && is_composite(&call.url, body) => {
                check_composite(payload)
            }
            _ => Ok(payload),
        }
    }

    /// Look up an SObject's metadata. Returns the raw JSON payload.
    pub fn object_info(&self, object_api_name: &str) -> Result<Vec<u8>> {
        self.lookup(MetadataLookup::ObjectInfo {
            object_api_name: object_api_name.to_string(),
        })
    }

    /// Look up picklist values for one record type. Returns the raw JSON
    /// payload.
    pub fn picklist_values(&self, object_api_name: &str, record_type_id: &str) -> Result<Vec<u8>> {
        self.lookup(MetadataLookup::PicklistValues {
            object_api_name: object_api_name.to_string(),
            record_type_id: record_type_id.to_string(),
        })
    }

    /// Issue a metadata lookup and block until the host answers.
    #[instrument(skip(self), fields(function = lookup.function_name()))]
    pub fn lookup(&self, lookup: MetadataLookup) -> Result<Vec<u8>> {
        let function = lookup.function_name();
        let (slot, signal) = completion::channel();

        {
            let _permit = self.locks.acquire(CallClass::Metadata);
            let host = Arc::clone(&self.host);
            let dispatched = lookup.clone();
            self.handle.block_on(self.handle.spawn_blocking(move || {
                host.lookup(&dispatched, lookup_callback(function, slot));
            }))?;
            debug!("callback registered");
        }

        let completion = self.handle.block_on(signal.wait(
            function,
            self.config.liveness_interval,
            self.config.timeout,
        ))?;
        settle(completion)
    }
}

fn dispatch_call(host: &dyn HostBridge, call: &HostCall, slot: CompletionSlot) -> Result<()> {
    match host.call(call) {
        HostReturn::Promise(promise) => {
            promise.then(fulfil_callback(slot.clone()), reject_callback(slot));
            Ok(())
        }
        HostReturn::Value(value) => Err(Error::contract(format!(
            "{}() returned {} instead of a promise",
            call.verb.function_name(),
            value.type_name()
        ))),
    }
}

fn fulfil_callback(slot: CompletionSlot) -> HostCallback {
    Box::new(move |args: Vec<HostValue>| {
        let completion = match args.as_slice() {
            [value] => match value.as_str() {
                Some(body) => Completion::Fulfilled(body.as_bytes().to_vec()),
                None => Completion::Violated(format!(
                    "fulfil callback expected a string, got {}",
                    value.type_name()
                )),
            },
            _ => Completion::Violated(format!(
                "fulfil callback expected 1 argument, got {}",
                args.len()
            )),
        };
        slot.deposit(completion);
    })
}

fn reject_callback(slot: CompletionSlot) -> HostCallback {
    Box::new(move |args: Vec<HostValue>| {
        let completion = match args.as_slice() {
            [reason] => Completion::Rejected(reason.render()),
            _ => Completion::Violated(format!(
                "reject callback expected 1 argument, got {}",
                args.len()
            )),
        };
        slot.deposit(completion);
    })
}

fn lookup_callback(function: &'static str, slot: CompletionSlot) -> HostCallback {
    Box::new(move |args: Vec<HostValue>| {
        let completion = match args.as_slice() {
            [HostValue::Json(Value::Object(result))] => {
                let field = |name: &str| result.get(name).filter(|v| !v.is_null());
                if let Some(error) = field("error") {
                    Completion::Rejected(HostValue::Json(error.clone()).render())
                } else if let Some(data) = field("data") {
                    match serde_json::to_vec(data) {
                        Ok(bytes) => Completion::Fulfilled(bytes),
                        Err(e) => Completion::Violated(format!("{function} data: {e}")),
                    }
                } else {
                    Completion::Rejected(format!("{function} returned no data"))
                }
            }
            [other] => Completion::Violated(format!(
                "{function} callback expected an object, got {}",
                other.type_name()
            )),
            _ => Completion::Violated(format!(
                "{function} callback expected 1 argument, got {}",
                args.len()
            )),
        };
        slot.deposit(completion);
    })
}

fn settle(completion: Completion) -> Result<Vec<u8>> {
    match completion {
        Completion::Fulfilled(payload) => Ok(payload),
        Completion::Rejected(message) => Err(Error::new(ErrorKind::Transport(message))),
        Completion::Violated(message) => Err(Error::contract(message)),
    }
}

fn check_composite(payload: Vec<u8>) -> Result<Vec<u8>> {
    match parse_composite_response(&payload) {
        Ok(errors) if errors.has_errors() => {
            warn!(
                failed = errors.errors().len(),
                succeeded = errors.partial_data().len(),
                "composite request partially failed"
            );
            Err(Error::new(ErrorKind::PartialBatch { payload, errors }))
        }
        Ok(_) => Ok(payload),
        Err(e) => {
            warn!(error = %e, "could not classify composite response, returning payload as is");
            Ok(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostPromise;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// How the fake host settles a promise.
    #[derive(Clone)]
    enum Script {
        Fulfil(Vec<HostValue>),
        Reject(Vec<HostValue>),
        Return(HostValue),
        Drop,
        Never,
    }

    struct ScriptedPromise {
        script: Script,
    }

    impl HostPromise for ScriptedPromise {
        fn then(self: Box<Self>, on_fulfilled: HostCallback, on_rejected: HostCallback) {
            match self.script {
                Script::Fulfil(args) => {
                    std::thread::spawn(move || on_fulfilled(args));
                }
                Script::Reject(args) => {
                    std::thread::spawn(move || on_rejected(args));
                }
                Script::Never => {
                    std::mem::forget(on_fulfilled);
                    std::mem::forget(on_rejected);
                }
                Script::Drop | Script::Return(_) => {}
            }
        }
    }

    struct FakeHost {
        script: Script,
        lookup_args: Vec<HostValue>,
        calls: Mutex<Vec<HostCall>>,
        lookups: Mutex<Vec<Value>>,
    }

    impl FakeHost {
        fn new(script: Script) -> Self {
            Self {
                script,
                lookup_args: Vec::new(),
                calls: Mutex::new(Vec::new()),
                lookups: Mutex::new(Vec::new()),
            }
        }

        fn with_lookup(args: Vec<HostValue>) -> Self {
            Self {
                lookup_args: args,
                ..Self::new(Script::Drop)
            }
        }
    }

    impl HostBridge for FakeHost {
        fn call(&self, call: &HostCall) -> HostReturn {
            self.calls.lock().unwrap().push(call.clone());
            match &self.script {
                Script::Return(value) => HostReturn::Value(value.clone()),
                script => HostReturn::promise(ScriptedPromise {
                    script: script.clone(),
                }),
            }
        }

        fn lookup(&self, lookup: &MetadataLookup, callback: HostCallback) {
            self.lookups.lock().unwrap().push(lookup.config());
            let args = self.lookup_args.clone();
            std::thread::spawn(move || callback(args));
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    fn invoker(rt: &tokio::runtime::Runtime, host: Arc<FakeHost>) -> Invoker {
        let config = InvokerConfig::builder()
            .with_liveness_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(5))
            .build();
        Invoker::with_handle(host, config, rt.handle().clone())
    }

    #[test]
    fn test_get_returns_fulfilled_body() {
        let rt = runtime();
        let host = Arc::new(FakeHost::new(Script::Fulfil(vec![
            r#"{"totalSize":0,"records":[]}"#.into(),
        ])));
        let invoker = invoker(&rt, Arc::clone(&host));

        let body = invoker.get("/services/data/v62.0/query?q=SELECT+Id+FROM+Account").unwrap();
        assert_eq!(body, br#"{"totalSize":0,"records":[]}"#);

        let calls = host.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].verb, crate::Verb::Get);
        assert!(calls[0].body.is_none());
    }

    #[test]
    fn test_rejection_is_transport_error() {
        let rt = runtime();
        let host = Arc::new(FakeHost::new(Script::Reject(vec!["Network failure".into()])));
        let err = invoker(&rt, host).delete("/services/data/v62.0/sobjects/Account/001").unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Network failure");
    }

    #[test]
    fn test_non_string_rejection_is_rendered() {
        let rt = runtime();
        let host = Arc::new(FakeHost::new(Script::Reject(vec![HostValue::Json(
            json!({"status": 500}),
        )])));
        let err = invoker(&rt, host).get("/x").unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), r#"{"status":500}"#);
    }

    #[test]
    fn test_non_promise_return_is_contract_violation() {
        let rt = runtime();
        let host = Arc::new(FakeHost::new(Script::Return(HostValue::Undefined)));
        let err = invoker(&rt, host).post("/x", "{}").unwrap_err();

        assert!(err.is_contract_violation());
        assert!(err.to_string().contains("post() returned undefined"));
    }

    #[test]
    fn test_wrong_callback_arity_is_contract_violation() {
        let rt = runtime();
        let host = Arc::new(FakeHost::new(Script::Fulfil(vec!["a".into(), "b".into()])));
        let err = invoker(&rt, host).get("/x").unwrap_err();
        assert!(err.is_contract_violation());
        assert!(err.to_string().contains("expected 1 argument, got 2"));

        let host = Arc::new(FakeHost::new(Script::Reject(Vec::new())));
        let err = invoker(&rt, host).get("/x").unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_non_string_body_is_contract_violation() {
        let rt = runtime();
        let host = Arc::new(FakeHost::new(Script::Fulfil(vec![HostValue::Json(json!(42))])));
        let err = invoker(&rt, host).get("/x").unwrap_err();
        assert!(err.is_contract_violation());
        assert!(err.to_string().contains("expected a string, got number"));
    }

    #[test]
    fn test_dropped_callbacks_are_contract_violation() {
        let rt = runtime();
        let host = Arc::new(FakeHost::new(Script::Drop));
        let err = invoker(&rt, host).get("/x").unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_unsettled_promise_times_out() {
        let rt = runtime();
        let host = Arc::new(FakeHost::new(Script::Never));
        let config = InvokerConfig::builder()
            .with_liveness_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_millis(50))
            .build();
        let invoker = Invoker::with_handle(host, config, rt.handle().clone());

        let err = invoker.get("/x").unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_composite_partial_failure_keeps_payload() {
        let rt = runtime();
        let response = json!({
            "compositeResponse": [
                {"body": {"id": "001"}, "httpStatusCode": 201, "referenceId": "newAccount"},
                {"body": [{"message": "Required fields are missing: [LastName]", "errorCode": "REQUIRED_FIELD_MISSING"}],
                 "httpStatusCode": 400, "referenceId": "newContact"}
            ]
        })
        .to_string();
        let host = Arc::new(FakeHost::new(Script::Fulfil(vec![response.clone().into()])));
        let request = json!({"allOrNone": false, "compositeRequest": []}).to_string();

        let err = invoker(&rt, host)
            .post("/services/data/v62.0/composite", request)
            .unwrap_err();

        assert!(err.is_partial_batch());
        assert_eq!(err.payload(), Some(response.as_bytes()));
        let errors = err.composite_errors().unwrap();
        assert_eq!(errors.failed_reference_ids().collect::<Vec<_>>(), vec!["newContact"]);
        assert_eq!(errors.succeeded_reference_ids().collect::<Vec<_>>(), vec!["newAccount"]);
        assert_eq!(
            err.to_string(),
            "composite request failed: ref newContact: Required fields are missing: [LastName]"
        );
    }

    #[test]
    fn test_composite_success_returns_payload() {
        let rt = runtime();
        let response = json!({
            "compositeResponse": [
                {"body": {"id": "001"}, "httpStatusCode": 201, "referenceId": "newAccount"}
            ]
        })
        .to_string();
        let host = Arc::new(FakeHost::new(Script::Fulfil(vec![response.clone().into()])));
        let request = json!({"compositeRequest": []}).to_string();

        let body = invoker(&rt, host)
            .patch("/services/data/v62.0/composite", request)
            .unwrap();
        assert_eq!(body, response.as_bytes());
    }

    #[test]
    fn test_unclassifiable_composite_response_passes_through() {
        let rt = runtime();
        let host = Arc::new(FakeHost::new(Script::Fulfil(vec!["OK".into()])));
        let request = json!({"compositeRequest": []}).to_string();

        let body = invoker(&rt, host)
            .post("/services/data/v62.0/composite", request)
            .unwrap();
        assert_eq!(body, b"OK");
    }

    #[test]
    fn test_non_composite_post_skips_classification() {
        let rt = runtime();
        // Looks like a failed batch, but the request was a plain create.
        let response = json!({"message": "X", "errorCode": "Y"}).to_string();
        let host = Arc::new(FakeHost::new(Script::Fulfil(vec![response.clone().into()])));

        let body = invoker(&rt, host)
            .post("/services/data/v62.0/sobjects/Account", r#"{"Name":"Acme"}"#)
            .unwrap();
        assert_eq!(body, response.as_bytes());
    }

    #[test]
    fn test_object_info_serializes_data() {
        let rt = runtime();
        let host = Arc::new(FakeHost::with_lookup(vec![HostValue::Json(json!({
            "data": {"apiName": "Account", "fields": {}},
            "error": null
        }))]));
        let invoker = invoker(&rt, Arc::clone(&host));

        let body = invoker.object_info("Account").unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["apiName"], "Account");
        assert_eq!(
            host.lookups.lock().unwrap()[0],
            json!({"objectApiName": "Account"})
        );
    }

    #[test]
    fn test_lookup_error_wins_over_data() {
        let rt = runtime();
        let host = Arc::new(FakeHost::with_lookup(vec![HostValue::Json(json!({
            "data": {"apiName": "Account"},
            "error": "INSUFFICIENT_ACCESS"
        }))]));

        let err = invoker(&rt, host)
            .picklist_values("Account", "012000000000000AAA")
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "INSUFFICIENT_ACCESS");
    }

    #[test]
    fn test_lookup_without_data_or_error() {
        let rt = runtime();
        let host = Arc::new(FakeHost::with_lookup(vec![HostValue::Json(json!({}))]));

        let err = invoker(&rt, host)
            .picklist_values("Account", "012000000000000AAA")
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(
            err.to_string(),
            "getPicklistValuesByRecordType returned no data"
        );
    }

    #[test]
    fn test_lookup_non_object_is_contract_violation() {
        let rt = runtime();
        let host = Arc::new(FakeHost::with_lookup(vec!["oops".into()]));

        let err = invoker(&rt, host).object_info("Account").unwrap_err();
        assert!(err.is_contract_violation());
        assert!(err.to_string().contains("expected an object, got string"));
    }

    #[test]
    fn test_new_outside_runtime_is_config_error() {
        let host: Arc<dyn HostBridge> = Arc::new(FakeHost::new(Script::Drop));
        let err = Invoker::new(host).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));
    }
}
