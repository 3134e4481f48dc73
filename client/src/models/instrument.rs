use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

/// Security class of an instrument.
///
/// Unknown values coming from the server decode to [`InstrumentType::Other`]
/// instead of failing the whole response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum InstrumentType {
    #[default]
    Equity,
    Option,
    Crypto,
    Alt,
    Treasury,
    Bond,
    Index,
    Other,
}

impl From<String> for InstrumentType {
    fn from(raw: String) -> Self {
        InstrumentType::from_str(&raw).unwrap_or(InstrumentType::Other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    #[serde(rename = "type", default)]
    pub kind: InstrumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, kind: InstrumentType) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
            name: None,
        }
    }

    pub fn equity(symbol: impl Into<String>) -> Self {
        Self::new(symbol, InstrumentType::Equity)
    }

    pub fn option(osi_symbol: impl Into<String>) -> Self {
        Self::new(osi_symbol, InstrumentType::Option)
    }
}

/// Trading metadata for a single instrument.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "strict-serde", serde(deny_unknown_fields))]
pub struct InstrumentDetails {
    pub instrument: Instrument,
    #[serde(default)]
    pub trading: Option<String>,
    #[serde(default)]
    pub fractional_trading: Option<String>,
    #[serde(default)]
    pub option_trading: Option<String>,
    #[serde(default)]
    pub option_spread_trading: Option<String>,
}

impl InstrumentDetails {
    pub fn supports_options(&self) -> bool {
        match self.option_trading.as_deref() {
            None => false,
            Some(v) => !v.eq_ignore_ascii_case("DISABLED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_instrument_type_decodes_to_other() {
        let i: Instrument = serde_json::from_str(r#"{"symbol":"XYZ","type":"WARRANT"}"#).unwrap();
        assert_eq!(i.kind, InstrumentType::Other);
        let i: Instrument = serde_json::from_str(r#"{"symbol":"AAPL","type":"EQUITY"}"#).unwrap();
        assert_eq!(i.kind, InstrumentType::Equity);
    }

    #[test]
    fn instrument_serializes_screaming_case() {
        let json = serde_json::to_value(Instrument::option("AAPL250117C00175000")).unwrap();
        assert_eq!(json["type"], "OPTION");
        assert!(json.get("name").is_none());
    }

    #[test]
    fn options_support_follows_option_trading_flag() {
        let details: InstrumentDetails = serde_json::from_str(
            r#"{"instrument":{"symbol":"AAPL","type":"EQUITY"},"trading":"BUY_AND_SELL","optionTrading":"BUY_AND_SELL"}"#,
        )
        .unwrap();
        assert!(details.supports_options());

        let details: InstrumentDetails = serde_json::from_str(
            r#"{"instrument":{"symbol":"BRK.A","type":"EQUITY"},"optionTrading":"DISABLED"}"#,
        )
        .unwrap();
        assert!(!details.supports_options());
    }
}
