mod fake_gym_backend;
mod reqwest_transport;

pub use fake_gym_backend::*;
pub use reqwest_transport::*;
