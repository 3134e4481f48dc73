//! Asynchronous client for the brokerage trading API.
//!
//! [`BrokerApi`] wraps an [`HttpTransport`] and a [`TokenManager`]; the
//! terminal application only talks to the broker through it.

pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod osi;
pub mod secrets;
pub mod transport;

pub use api::BrokerApi;
pub use auth::{CachedToken, FileTokenCache, TokenCache, TokenManager};
pub use error::ApiError;
pub use secrets::{FileSecretStore, SecretStore};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
