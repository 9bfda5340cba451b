mod session_service;
mod workout_service;

pub use session_service::*;
pub use workout_service::*;
