//! Store adapters implementing `LedgerStore`.

pub mod fault_injection;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
