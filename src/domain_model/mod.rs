mod exercise;
mod history;
mod request;
mod response;
mod session;
mod user;

pub use exercise::*;
pub use history::*;
pub use request::*;
pub use response::*;
pub use session::*;
pub use user::*;
