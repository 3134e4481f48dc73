use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "strict-serde", serde(deny_unknown_fields))]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub security_type: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub net_amount: Option<BigDecimal>,
    #[serde(default)]
    pub principal_amount: Option<BigDecimal>,
    #[serde(default)]
    pub quantity: Option<BigDecimal>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub fees: Option<BigDecimal>,
}

/// One page of account history. `next_token` is present while more pages exist.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub next_token: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl HistoryPage {
    pub fn has_more(&self) -> bool {
        self.next_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
