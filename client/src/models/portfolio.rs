use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::instrument::Instrument;
use super::order::Order;

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyingPower {
    #[serde(default)]
    pub cash_only_buying_power: Option<BigDecimal>,
    #[serde(default)]
    pub buying_power: Option<BigDecimal>,
    #[serde(default)]
    pub options_buying_power: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityComponent {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: BigDecimal,
    #[serde(default)]
    pub percentage_of_portfolio: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceStamp {
    pub last_price: BigDecimal,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gain {
    pub gain_value: BigDecimal,
    #[serde(default)]
    pub gain_percentage: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBasis {
    #[serde(default)]
    pub total_cost: Option<BigDecimal>,
    #[serde(default)]
    pub unit_cost: Option<BigDecimal>,
    #[serde(default)]
    pub gain_value: Option<BigDecimal>,
    #[serde(default)]
    pub gain_percentage: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "strict-serde", serde(deny_unknown_fields))]
pub struct Position {
    pub instrument: Instrument,
    pub quantity: BigDecimal,
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_value: Option<BigDecimal>,
    #[serde(default)]
    pub percent_of_portfolio: Option<BigDecimal>,
    #[serde(default)]
    pub last_price: Option<PriceStamp>,
    #[serde(default)]
    pub instrument_gain: Option<Gain>,
    #[serde(default)]
    pub position_daily_gain: Option<Gain>,
    #[serde(default)]
    pub cost_basis: Option<CostBasis>,
}

impl Position {
    pub fn symbol(&self) -> &str {
        &self.instrument.symbol
    }

    pub fn last(&self) -> Option<&BigDecimal> {
        self.last_price.as_ref().map(|p| &p.last_price)
    }
}

/// Account snapshot: balances, holdings and working orders.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "strict-serde", serde(deny_unknown_fields))]
pub struct Portfolio {
    pub account_id: AccountId,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub buying_power: BuyingPower,
    #[serde(default)]
    pub equity: Vec<EquityComponent>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl Portfolio {
    pub fn total_equity(&self) -> BigDecimal {
        self.equity
            .iter()
            .fold(BigDecimal::from(0), |acc, e| acc + &e.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "accountId": "5OPE1234",
        "accountType": "BROKERAGE",
        "buyingPower": {"cashOnlyBuyingPower": "1200.50", "buyingPower": "1200.50", "optionsBuyingPower": "1200.50"},
        "equity": [
            {"type": "CASH", "value": "1200.50", "percentageOfPortfolio": "10.0"},
            {"type": "STOCK", "value": "10804.50", "percentageOfPortfolio": "90.0"}
        ],
        "positions": [{
            "instrument": {"symbol": "AAPL", "name": "Apple Inc.", "type": "EQUITY"},
            "quantity": "10",
            "currentValue": "1754.20",
            "percentOfPortfolio": "14.61",
            "lastPrice": {"lastPrice": "175.42", "timestamp": "2025-01-10T15:59:59Z"},
            "instrumentGain": {"gainValue": "154.20", "gainPercentage": "9.63"},
            "positionDailyGain": {"gainValue": "-3.10", "gainPercentage": "-0.18"},
            "costBasis": {"totalCost": "1600.00", "unitCost": "160.00"}
        }],
        "orders": [{
            "orderId": "c0a8012e-0000-4000-8000-000000000001",
            "instrument": {"symbol": "MSFT", "type": "EQUITY"},
            "type": "LIMIT",
            "side": "BUY",
            "status": "NEW",
            "quantity": "2",
            "limitPrice": "390.00"
        }]
    }"#;

    #[test]
    fn decodes_portfolio_snapshot() {
        let p: Portfolio = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(p.account_id.as_str(), "5OPE1234");
        assert_eq!(p.positions.len(), 1);
        assert_eq!(p.positions[0].symbol(), "AAPL");
        assert_eq!(p.positions[0].last().unwrap().to_string(), "175.42");
        assert_eq!(p.orders[0].status, super::super::OrderStatus::New);
        assert_eq!(p.total_equity(), "12005.00".parse::<BigDecimal>().unwrap());
    }
}
