//! Domain models

pub mod session;
pub mod token;

pub use session::Session;
pub use token::{TokenPayload, TokenRecord, EXPIRES_DT_FORMAT};
