mod session_service_impl;
mod workout_service_impl;

pub use session_service_impl::*;
pub use workout_service_impl::*;
