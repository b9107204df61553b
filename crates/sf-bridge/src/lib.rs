//! # sf-bridge
//!
//! Blocking access to Salesforce through a host runtime that only offers
//! asynchronous, promise-style network primitives.
//!
//! Worker-style code wants `let body = invoker.get(url)?;`. The host offers
//! `get(url)` returning a promise whose callbacks fire later, on the host's own
//! event loop. [`Invoker`] bridges the two: it dispatches the call on a
//! blocking worker, registers callbacks that deposit into a one-shot slot, and
//! parks the caller on that slot.
//!
//! ## Architecture
//!
//! ```text
//! caller thread             dispatch worker           host event loop
//! ─────────────             ───────────────           ───────────────
//! acquire gate(class)
//! spawn_blocking ─────────► host.call(HostCall)
//!                           promise.then(ok, err) ──► (in flight)
//! ◄──── registered ─────────
//! release gate
//! wait(slot) ... liveness ticks ...
//!                                                     ok(body) ─► slot
//! ◄──────────────────────────────────────────────────────────────────
//! composite? → classify → payload | PartialBatch
//! ```
//!
//! ## Concurrency
//!
//! The host keeps only a handful of connections open. [`CallLocks`] holds one
//! FIFO gate per [`CallClass`]; a caller holds its gate only while dispatching,
//! so a second call starts as soon as the first has registered its callbacks
//! and the waits overlap.
//!
//! ## Errors
//!
//! A host rejection is [`ErrorKind::Transport`]. A host that breaks its
//! contract (returns something other than a promise, calls a callback with the
//! wrong arguments, or drops both callbacks) is
//! [`ErrorKind::ContractViolation`], which is never worth retrying. A composite
//! call with failed sub-requests is [`ErrorKind::PartialBatch`], which keeps
//! the full payload.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use thunder_sf_bridge::{Invoker, InvokerConfig};
//!
//! let host = Arc::new(MyHost::new());
//! let invoker = Invoker::with_handle(host, InvokerConfig::default(), runtime.handle().clone());
//!
//! let body = invoker.get("/services/data/v62.0/limits")?;
//! let info = invoker.object_info("Account")?;
//! ```

mod completion;
mod config;
mod error;
mod host;
mod invoker;
mod locks;

pub use config::{InvokerConfig, InvokerConfigBuilder, MIN_LIVENESS_INTERVAL};
pub use error::{Error, ErrorKind, Result};
pub use host::{
    HostBridge, HostCall, HostCallback, HostPromise, HostReturn, HostValue, MetadataLookup, Verb,
};
pub use invoker::Invoker;
pub use locks::{CallClass, CallLocks, DispatchPermit};

pub use thunder_sf_composite::CompositeErrors;
