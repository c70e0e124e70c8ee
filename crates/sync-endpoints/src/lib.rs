//! Remote-facing sync endpoints.
//!
//! [`SyncEndpoints`] serves the methods a remote replica calls to pull
//! changes: check out a buffer of queued items, close it with the ids it
//! stored, inspect queue health, run consistency checks, and manage sync
//! settings. Each method is a plain async/sync function; [`SyncEndpoints::handle`]
//! routes a [`Request`] to it and turns failures into error [`Response`]s.
//!
//! Checkout contention is absorbed here: a busy buffer or a locked queue is
//! retried with backoff for a bounded budget before the caller sees
//! `buffer_busy`.

mod checkout;
mod close;
pub mod collaborators;
mod consistency;
mod endpoints;
mod error;
pub mod hooks;
mod object;
mod protocol;
pub mod schedule;
pub mod settings;
mod status;

#[cfg(test)]
mod tests;

pub use checkout::{CheckoutParams, CheckoutResponse};
pub use close::CloseParams;
pub use collaborators::{
    FullSyncScheduler, HistogramQuery, ReplicaStore, SettingsStore, SyncModules, SyncSender,
    Unconfigured,
};
pub use consistency::{HistogramParams, QueueLockGuard};
pub use endpoints::{
    validate_queue, EndpointConfig, RequestContext, SyncEndpoints, ALLOWED_QUEUES,
    FULL_SYNC_QUEUE, SYNC_QUEUE,
};
pub use error::{EndpointError, EndpointResult};
pub use hooks::{HookOutcome, HookRegistry};
pub use object::{NowParams, ObjectParams};
pub use protocol::{error_codes, ErrorInfo, Method, Request, Response};
pub use schedule::{ScheduleParams, StoreFullSyncScheduler};
pub use settings::StoreSettings;
