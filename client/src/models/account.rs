use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Brokerage account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        AccountId(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "strict-serde", serde(deny_unknown_fields))]
pub struct Account {
    pub account_id: AccountId,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub options_level: Option<String>,
    #[serde(default)]
    pub brokerage_account_type: Option<String>,
    #[serde(default)]
    pub trade_permissions: Option<String>,
}

impl Account {
    /// One-line label used by pickers.
    pub fn label(&self) -> String {
        match (&self.account_type, &self.options_level) {
            (Some(kind), Some(level)) => format!("{} · {} · options {}", self.account_id, kind, level),
            (Some(kind), None) => format!("{} · {}", self.account_id, kind),
            _ => self.account_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsResponse {
    #[serde(default)]
    pub accounts: Vec<Account>,
}
