//! Authenticated request gateway: bearer token attachment, single-flight
//! token refresh and replay of requests that failed with an expired token.

mod error;
mod gateway;
mod pending;

pub use error::*;
pub use gateway::*;
pub use pending::{PendingRequest, RefreshOutcome, RefreshState};
