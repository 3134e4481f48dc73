use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::instrument::Instrument;
use super::quote::Quote;

#[derive(Debug, Clone, Serialize)]
pub struct OptionExpirationsRequest {
    pub instrument: Instrument,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionExpirationsResponse {
    #[serde(default)]
    pub base_symbol: Option<String>,
    #[serde(default)]
    pub expirations: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChainRequest {
    pub instrument: Instrument,
    pub expiration_date: NaiveDate,
}

/// Calls and puts for one expiration, each sorted by strike by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "strict-serde", serde(deny_unknown_fields))]
pub struct OptionChain {
    #[serde(default)]
    pub base_symbol: Option<String>,
    #[serde(default)]
    pub calls: Vec<Quote>,
    #[serde(default)]
    pub puts: Vec<Quote>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Greeks {
    #[serde(default)]
    pub delta: Option<BigDecimal>,
    #[serde(default)]
    pub gamma: Option<BigDecimal>,
    #[serde(default)]
    pub theta: Option<BigDecimal>,
    #[serde(default)]
    pub vega: Option<BigDecimal>,
    #[serde(default)]
    pub rho: Option<BigDecimal>,
    #[serde(default)]
    pub implied_volatility: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OptionGreeks {
    pub symbol: String,
    #[serde(default)]
    pub greeks: Greeks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GreeksResponse {
    #[serde(default)]
    pub greeks: Vec<OptionGreeks>,
}
