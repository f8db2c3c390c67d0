//! Adapters behind the domain ports: ledger backends and the payload decoder.

pub mod decoder;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sqlite;
