use broker_client::models::{
    Account, HistoryPage, InstrumentDetails, OptionChain, OptionGreeks, PlaceOrderResponse,
    Portfolio, Quote,
};
use broker_client::ApiError;
use chrono::NaiveDate;
use crossterm::event::KeyEvent;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    Api(ApiEvent),
    Timer(TimerEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Refresh,
}

/// Which component asked for a batch of quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteTarget {
    Watchlist,
    Trade,
    Underlying,
}

/// Which view embeds the asset selector that issued a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorOwner {
    Trade,
    Options,
}

/// Outcome of one finished command. Every variant has exactly one consumer.
#[derive(Debug, Clone)]
pub enum ApiEvent {
    Accounts(Result<Vec<Account>, ApiError>),
    Portfolio {
        tag: u64,
        result: Result<Portfolio, ApiError>,
    },
    Orders {
        tag: u64,
        result: Result<Portfolio, ApiError>,
    },
    Quotes {
        target: QuoteTarget,
        tag: u64,
        result: Result<Vec<Quote>, ApiError>,
    },
    Instrument {
        owner: SelectorOwner,
        tag: u64,
        symbol: String,
        result: Result<InstrumentDetails, ApiError>,
    },
    Expirations {
        tag: u64,
        result: Result<Vec<NaiveDate>, ApiError>,
    },
    Chain {
        tag: u64,
        result: Result<OptionChain, ApiError>,
    },
    Greeks {
        chain_tag: u64,
        symbols: Vec<String>,
        result: Result<Vec<OptionGreeks>, ApiError>,
    },
    OrderPlaced {
        tag: u64,
        result: Result<PlaceOrderResponse, ApiError>,
    },
    OrderCancelled {
        order_id: String,
        result: Result<(), ApiError>,
    },
    History {
        tag: u64,
        append: bool,
        result: Result<HistoryPage, ApiError>,
    },
    Saved {
        what: &'static str,
        result: Result<(), String>,
    },
}
