// transport

mod http_transport;

pub use http_transport::*;

// storage

mod kv_store;
mod session_storage;

pub use kv_store::*;
pub use session_storage::*;

// hooks

mod sign_out;

pub use sign_out::*;
