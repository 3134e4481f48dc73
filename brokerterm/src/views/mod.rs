//! The six top-level screens behind one [`Screen`] trait.

pub mod history;
pub mod options;
pub mod orders;
pub mod portfolio;
pub mod trade;
pub mod watchlist;
pub mod widgets;

use bigdecimal::BigDecimal;
use broker_client::models::{AccountId, InstrumentType, Quote};
use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::app::commands::Command;
use crate::app::state::{ConfirmKind, ViewKind};

/// A watchlist row as seen by other components.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchItem {
    pub symbol: String,
    pub quote: Option<Quote>,
}

/// A position row as seen by other components.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub instrument_type: InstrumentType,
    pub last: Option<BigDecimal>,
}

/// Read-only session data handed to views on every call.
#[derive(Debug, Clone, Default)]
pub struct ViewContext {
    pub account: Option<AccountId>,
    pub watchlist: Vec<WatchItem>,
    pub holdings: Vec<Holding>,
    pub history_page_size: u32,
}

impl ViewContext {
    pub fn cached_quote(&self, symbol: &str) -> Option<&Quote> {
        self.watchlist
            .iter()
            .find(|w| w.symbol == symbol)
            .and_then(|w| w.quote.as_ref())
    }
}

/// Something a view wants the dispatcher to do on its behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    OpenTrade {
        symbol: String,
        instrument_type: InstrumentType,
    },
    Confirm {
        kind: ConfirmKind,
        prompt: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyOutcome {
    pub consumed: bool,
    pub command: Option<Command>,
    pub action: Option<ViewAction>,
}

impl KeyOutcome {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn consumed() -> Self {
        Self {
            consumed: true,
            ..Self::default()
        }
    }

    pub fn command(cmd: Option<Command>) -> Self {
        Self {
            consumed: true,
            command: cmd,
            action: None,
        }
    }

    pub fn action(action: ViewAction) -> Self {
        Self {
            consumed: true,
            command: None,
            action: Some(action),
        }
    }
}

pub trait Screen {
    fn kind(&self) -> ViewKind;

    fn handle_key(&mut self, key: KeyEvent, ctx: &ViewContext) -> KeyOutcome;

    /// Manual or first fetch. `None` when there is nothing to fetch.
    fn refresh(&mut self, ctx: &ViewContext) -> Option<Command>;

    /// Periodic refresh; callers only invoke it when the view is idle.
    fn on_timer(&mut self, ctx: &ViewContext) -> Option<Command> {
        self.refresh(ctx)
    }

    /// While true the dispatcher forwards every key here.
    fn is_exclusive(&self) -> bool {
        false
    }

    fn is_fetching(&self) -> bool;

    fn has_loaded(&self) -> bool;

    /// Back to the initial state; outstanding results become stale.
    fn reset(&mut self);

    fn set_visible_rows(&mut self, rows: usize);

    /// Rows the view uses beyond its table body.
    fn chrome_rows(&self) -> u16;

    fn render(&self, frame: &mut Frame, area: Rect);

    fn hints(&self) -> &'static str;

    fn take_message(&mut self) -> Option<String> {
        None
    }
}
