//! Adapters behind the domain ports: record stores and the tracing-backed
//! gateway used by the replay driver.

pub mod console;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
