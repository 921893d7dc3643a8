//! Services layer - business logic

pub mod auth;
pub mod kiwoom;
pub mod session;
pub mod token_store;

pub use auth::{AuthService, AuthServiceError, AuthStatus, LoginSuccess};
pub use kiwoom::{KiwoomApiError, KiwoomAuthApi, KiwoomClient};
pub use session::SessionStore;
pub use token_store::{TokenStore, TokenStoreError};
