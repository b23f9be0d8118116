//! Application layer: admission, queueing, per-account execution and
//! completion routing.
//!
//! `LedgerEngine` is the entry point. It admits transactions onto the
//! `PendingQueue`, lets the `WorkerRegistry` route them to one `AccountWorker`
//! per account, and hands each submitter a handle resolved by the
//! `CompletionNotifier`.

pub mod engine;
pub mod notifier;
pub mod queue;
pub mod registry;
pub mod worker;
