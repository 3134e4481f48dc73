use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};
use uuid::Uuid;

use super::instrument::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum OrderSide {
    #[default]
    Buy,
    Sell,
}

impl OrderSide {
    pub fn toggled(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum OrderType {
    #[default]
    Market,
    Limit,
    Stop,
    StopLimit,
    Other,
}

impl From<String> for OrderType {
    fn from(raw: String) -> Self {
        OrderType::from_str(&raw).unwrap_or(OrderType::Other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Pending,
    Filled,
    Cancelled,
    Queued,
    Rejected,
    Expired,
    Unknown,
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        // the API has used both spellings
        if raw.eq_ignore_ascii_case("CANCELED") {
            return OrderStatus::Cancelled;
        }
        OrderStatus::from_str(&raw).unwrap_or(OrderStatus::Unknown)
    }
}

impl OrderStatus {
    /// Only working orders can be cancelled.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            OrderStatus::New | OrderStatus::PartiallyFilled | OrderStatus::Pending
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    #[default]
    Day,
    Gtd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OpenCloseIndicator {
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderExpiration {
    pub time_in_force: TimeInForce,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<DateTime<Utc>>,
}

impl Default for OrderExpiration {
    fn default() -> Self {
        Self {
            time_in_force: TimeInForce::Day,
            expiration_time: None,
        }
    }
}

/// A working or historical order as reported by the portfolio endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "strict-serde", serde(deny_unknown_fields))]
pub struct Order {
    pub order_id: String,
    pub instrument: Instrument,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub status: OrderStatus,
    #[serde(default)]
    pub quantity: Option<BigDecimal>,
    #[serde(default)]
    pub notional_value: Option<BigDecimal>,
    #[serde(default)]
    pub expiration: Option<OrderExpiration>,
    #[serde(default)]
    pub limit_price: Option<BigDecimal>,
    #[serde(default)]
    pub stop_price: Option<BigDecimal>,
    #[serde(default)]
    pub filled_quantity: Option<BigDecimal>,
    #[serde(default)]
    pub average_price: Option<BigDecimal>,
}

/// Body of the order placement endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub order_id: Uuid,
    pub instrument: Instrument,
    pub order_side: OrderSide,
    pub order_type: OrderType,
    pub expiration: OrderExpiration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_close_indicator: Option<OpenCloseIndicator>,
}

impl PlaceOrderRequest {
    /// Day order with a fresh client-side id.
    pub fn day(
        instrument: Instrument,
        side: OrderSide,
        order_type: OrderType,
        quantity: BigDecimal,
        limit_price: Option<BigDecimal>,
    ) -> Self {
        let open_close_indicator = (instrument.kind == super::InstrumentType::Option)
            .then_some(OpenCloseIndicator::Open);
        Self {
            order_id: Uuid::new_v4(),
            instrument,
            order_side: side,
            order_type,
            expiration: OrderExpiration::default(),
            quantity: Some(quantity),
            limit_price,
            open_close_indicator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellable_statuses() {
        let cancellable: Vec<_> = [
            OrderStatus::New,
            OrderStatus::PartiallyFilled,
            OrderStatus::Pending,
            OrderStatus::Filled,
            OrderStatus::Cancelled,
            OrderStatus::Rejected,
            OrderStatus::Expired,
            OrderStatus::Queued,
            OrderStatus::Unknown,
        ]
        .into_iter()
        .filter(|s| s.is_cancellable())
        .collect();
        assert_eq!(
            cancellable,
            vec![OrderStatus::New, OrderStatus::PartiallyFilled, OrderStatus::Pending]
        );
    }

    #[test]
    fn status_accepts_both_cancel_spellings() {
        assert_eq!(OrderStatus::from("CANCELED".to_string()), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from("CANCELLED".to_string()), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from("SOMETHING_NEW".to_string()), OrderStatus::Unknown);
    }

    #[test]
    fn option_orders_are_sent_as_opening() {
        let req = PlaceOrderRequest::day(
            Instrument::option("AAPL250117C00175000"),
            OrderSide::Buy,
            OrderType::Limit,
            BigDecimal::from(1),
            Some("2.15".parse().unwrap()),
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["openCloseIndicator"], "OPEN");
        assert_eq!(json["orderSide"], "BUY");
        assert_eq!(json["orderType"], "LIMIT");
        assert_eq!(json["expiration"]["timeInForce"], "DAY");

        let req = PlaceOrderRequest::day(
            Instrument::equity("AAPL"),
            OrderSide::Sell,
            OrderType::Market,
            BigDecimal::from(10),
            None,
        );
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("openCloseIndicator").is_none());
        assert!(json.get("limitPrice").is_none());
    }
}
