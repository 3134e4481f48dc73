use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::instrument::Instrument;

/// Last/bid/ask snapshot for one instrument.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "strict-serde", serde(deny_unknown_fields))]
pub struct Quote {
    pub instrument: Instrument,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub last: Option<BigDecimal>,
    #[serde(default)]
    pub last_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bid: Option<BigDecimal>,
    #[serde(default)]
    pub bid_size: Option<u64>,
    #[serde(default)]
    pub ask: Option<BigDecimal>,
    #[serde(default)]
    pub ask_size: Option<u64>,
    #[serde(default)]
    pub volume: Option<u64>,
    #[serde(default)]
    pub open_interest: Option<u64>,
}

impl Quote {
    pub fn symbol(&self) -> &str {
        &self.instrument.symbol
    }

    /// The quote is usable unless the server flagged it as unknown.
    pub fn is_success(&self) -> bool {
        self.outcome
            .as_deref()
            .map_or(true, |o| o.eq_ignore_ascii_case("SUCCESS"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotesRequest {
    pub instruments: Vec<Instrument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotesResponse {
    #[serde(default)]
    pub quotes: Vec<Quote>,
}
