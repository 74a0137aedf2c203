pub mod in_memory;
pub mod notify;
pub mod rates;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
