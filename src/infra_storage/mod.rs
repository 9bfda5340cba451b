mod file_kv_store;
mod kv_session_storage;
mod memory_kv_store;

pub use file_kv_store::*;
pub use kv_session_storage::*;
pub use memory_kv_store::*;
