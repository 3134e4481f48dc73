//! Request and response bodies of the brokerage REST API.

mod account;
mod history;
mod instrument;
mod option;
mod order;
mod portfolio;
mod quote;

pub use account::*;
pub use history::*;
pub use instrument::*;
pub use option::*;
pub use order::*;
pub use portfolio::*;
pub use quote::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenRequest {
    pub secret: String,
    pub validity_in_minutes: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}
