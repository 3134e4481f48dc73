//! Symbol picker shared by the Trade and Options views.
//!
//! Search mode takes free text; Watchlist and Portfolio modes list symbols
//! the caller already knows about. Lookups resolve instrument metadata but
//! are never required before confirming.

use broker_client::models::{InstrumentDetails, InstrumentType, Quote};
use broker_client::osi::OsiSymbol;
use broker_client::ApiError;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};
use std::collections::HashMap;

use crate::app::commands::Command;
use crate::app::event::SelectorOwner;
use crate::app::state::{ListCursor, RequestTracker};
use crate::keys::{is_ctrl, is_down, is_up, plain_char};
use crate::views::widgets::{block, money, selected_style};
use crate::views::ViewContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorMode {
    Search,
    Watchlist,
    Portfolio,
}

impl SelectorMode {
    fn label(self) -> &'static str {
        match self {
            SelectorMode::Search => "search",
            SelectorMode::Watchlist => "watchlist",
            SelectorMode::Portfolio => "portfolio",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub symbol: String,
    pub instrument_type: InstrumentType,
    pub quote: Option<Quote>,
    /// `None` until a lookup for this symbol has completed.
    pub supports_options: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectorOutcome {
    Ignored,
    Consumed,
    Lookup(Command),
    Selected(Selection),
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    symbol: String,
    instrument_type: InstrumentType,
    quote: Option<Quote>,
    detail: String,
}

#[derive(Debug, Clone, PartialEq)]
enum LookupStatus {
    None,
    Pending(String),
    Found {
        symbol: String,
        name: Option<String>,
        supports_options: bool,
    },
    Failed {
        symbol: String,
        error: ApiError,
    },
}

pub struct AssetSelector {
    owner: SelectorOwner,
    mode: SelectorMode,
    text: String,
    cursor: ListCursor,
    entries: Vec<Entry>,
    tracker: RequestTracker,
    pending_symbol: Option<String>,
    options_support: HashMap<String, bool>,
    status: LookupStatus,
}

impl AssetSelector {
    pub fn new(owner: SelectorOwner) -> Self {
        Self {
            owner,
            mode: SelectorMode::Search,
            text: String::new(),
            cursor: ListCursor::default(),
            entries: Vec::new(),
            tracker: RequestTracker::default(),
            pending_symbol: None,
            options_support: HashMap::new(),
            status: LookupStatus::None,
        }
    }

    pub fn mode(&self) -> SelectorMode {
        self.mode
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.trim().to_uppercase();
        self.mode = SelectorMode::Search;
    }

    /// Clears input and any in-flight lookup. Known lookups are kept.
    pub fn reset(&mut self) {
        self.mode = SelectorMode::Search;
        self.text.clear();
        self.cursor.reset();
        self.tracker.cancel();
        self.pending_symbol = None;
        self.status = LookupStatus::None;
    }

    pub fn supports_options(&self, symbol: &str) -> Option<bool> {
        self.options_support.get(symbol).copied()
    }

    pub fn lookup_in_flight(&self) -> bool {
        self.tracker.in_flight()
    }

    pub fn set_visible_rows(&mut self, rows: usize) {
        self.cursor.set_height(rows);
    }

    pub fn handle_key(&mut self, key: KeyEvent, ctx: &ViewContext) -> SelectorOutcome {
        self.sync_entries(ctx);

        if is_ctrl(&key, 'l') {
            return match self.mode {
                SelectorMode::Search => self.lookup(),
                _ => SelectorOutcome::Consumed,
            };
        }

        let before = self.mode;
        let outcome = match self.mode {
            SelectorMode::Search => self.handle_search(key),
            SelectorMode::Watchlist | SelectorMode::Portfolio => self.handle_list(key),
        };
        if self.mode != before {
            self.sync_entries(ctx);
        }
        outcome
    }

    fn handle_search(&mut self, key: KeyEvent) -> SelectorOutcome {
        match key.code {
            KeyCode::Enter => {
                let symbol = self.text.trim().to_uppercase();
                if symbol.is_empty() {
                    return SelectorOutcome::Consumed;
                }
                let instrument_type = infer_type(&symbol);
                SelectorOutcome::Selected(Selection {
                    quote: None,
                    supports_options: self.supports_options(&symbol),
                    symbol,
                    instrument_type,
                })
            }
            KeyCode::Backspace => {
                self.text.pop();
                SelectorOutcome::Consumed
            }
            _ => match plain_char(&key) {
                Some(c @ ('w' | 'p' | 's')) if self.text.is_empty() => {
                    self.switch_mode(c);
                    SelectorOutcome::Consumed
                }
                Some(c) if is_symbol_char(c) => {
                    self.text.push(c.to_ascii_uppercase());
                    SelectorOutcome::Consumed
                }
                _ => SelectorOutcome::Ignored,
            },
        }
    }

    fn handle_list(&mut self, key: KeyEvent) -> SelectorOutcome {
        if is_up(&key) {
            self.cursor.up();
            return SelectorOutcome::Consumed;
        }
        if is_down(&key) {
            self.cursor.down(self.entries.len());
            return SelectorOutcome::Consumed;
        }
        match key.code {
            KeyCode::Enter => match self.entries.get(self.cursor.index) {
                Some(entry) => SelectorOutcome::Selected(Selection {
                    symbol: entry.symbol.clone(),
                    instrument_type: entry.instrument_type,
                    quote: entry.quote.clone(),
                    supports_options: self.supports_options(&entry.symbol),
                }),
                None => SelectorOutcome::Consumed,
            },
            KeyCode::Esc => {
                self.mode = SelectorMode::Search;
                SelectorOutcome::Consumed
            }
            _ => match plain_char(&key) {
                Some(c @ ('w' | 'p' | 's')) => {
                    self.switch_mode(c);
                    SelectorOutcome::Consumed
                }
                _ => SelectorOutcome::Ignored,
            },
        }
    }

    fn switch_mode(&mut self, c: char) {
        self.mode = match c {
            'w' => SelectorMode::Watchlist,
            'p' => SelectorMode::Portfolio,
            _ => SelectorMode::Search,
        };
        self.cursor.reset();
    }

    fn lookup(&mut self) -> SelectorOutcome {
        let symbol = self.text.trim().to_uppercase();
        if symbol.is_empty() {
            return SelectorOutcome::Consumed;
        }
        if self.tracker.in_flight() && self.pending_symbol.as_deref() == Some(symbol.as_str()) {
            return SelectorOutcome::Consumed;
        }
        let tag = self.tracker.issue();
        self.pending_symbol = Some(symbol.clone());
        self.status = LookupStatus::Pending(symbol.clone());
        SelectorOutcome::Lookup(Command::LookupInstrument {
            symbol,
            owner: self.owner,
            tag,
        })
    }

    pub fn on_instrument(
        &mut self,
        tag: u64,
        symbol: String,
        result: Result<InstrumentDetails, ApiError>,
    ) -> bool {
        if !self.tracker.accept(tag) {
            return false;
        }
        self.pending_symbol = None;
        self.status = match result {
            Ok(details) => {
                let supports_options = details.supports_options();
                self.options_support.insert(symbol.clone(), supports_options);
                LookupStatus::Found {
                    symbol,
                    name: details.instrument.name,
                    supports_options,
                }
            }
            Err(error) => LookupStatus::Failed { symbol, error },
        };
        true
    }

    fn sync_entries(&mut self, ctx: &ViewContext) {
        self.entries = match self.mode {
            SelectorMode::Search => Vec::new(),
            SelectorMode::Watchlist => ctx
                .watchlist
                .iter()
                .map(|w| Entry {
                    symbol: w.symbol.clone(),
                    instrument_type: InstrumentType::Equity,
                    detail: money(w.quote.as_ref().and_then(|q| q.last.as_ref())),
                    quote: w.quote.clone(),
                })
                .collect(),
            SelectorMode::Portfolio => ctx
                .holdings
                .iter()
                .map(|h| Entry {
                    symbol: h.symbol.clone(),
                    instrument_type: h.instrument_type,
                    quote: ctx.cached_quote(&h.symbol).cloned(),
                    detail: money(h.last.as_ref()),
                })
                .collect(),
        };
        self.cursor.clamp(self.entries.len());
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let title = format!("Symbol ({})", self.mode.label());
        match self.mode {
            SelectorMode::Search => {
                let caret = if focused { "▏" } else { "" };
                let mut lines = vec![Line::from(vec![
                    Span::styled(
                        format!("{}{caret}", self.text),
                        Style::default().fg(Color::Cyan),
                    ),
                ])];
                lines.push(Line::from(self.status_line()));
                frame.render_widget(Paragraph::new(lines).block(block(&title)), area);
            }
            SelectorMode::Watchlist | SelectorMode::Portfolio => {
                let range = self.cursor.visible(self.entries.len());
                let items: Vec<ListItem> = self.entries[range.clone()]
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        let item = ListItem::new(format!("{:<24} {:>12}", e.symbol, e.detail));
                        if range.start + i == self.cursor.index {
                            item.style(selected_style())
                        } else {
                            item
                        }
                    })
                    .collect();
                let list = if items.is_empty() {
                    List::new(vec![ListItem::new("(empty)")])
                } else {
                    List::new(items)
                };
                frame.render_widget(list.block(block(&title)), area);
            }
        }
    }

    fn status_line(&self) -> String {
        match &self.status {
            LookupStatus::None if self.text.is_empty() => {
                "type a symbol · w watchlist · p portfolio".to_string()
            }
            LookupStatus::None => "enter confirm · ctrl+l look up".to_string(),
            LookupStatus::Pending(s) => format!("looking up {s}…"),
            LookupStatus::Found {
                symbol,
                name,
                supports_options,
            } => format!(
                "{symbol}: {} · options {}",
                name.as_deref().unwrap_or("found"),
                if *supports_options { "yes" } else { "no" }
            ),
            LookupStatus::Failed { symbol, error } => format!("{symbol}: {error}"),
        }
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '/')
}

fn infer_type(symbol: &str) -> InstrumentType {
    if symbol.parse::<OsiSymbol>().is_ok() {
        InstrumentType::Option
    } else {
        InstrumentType::Equity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{ch, code, ctrl};
    use crate::views::{Holding, WatchItem};
    use broker_client::models::Instrument;

    fn ctx() -> ViewContext {
        ViewContext {
            watchlist: vec![
                WatchItem {
                    symbol: "MSFT".into(),
                    quote: None,
                },
                WatchItem {
                    symbol: "SPY".into(),
                    quote: None,
                },
            ],
            holdings: vec![Holding {
                symbol: "AAPL".into(),
                instrument_type: InstrumentType::Equity,
                last: None,
            }],
            ..ViewContext::default()
        }
    }

    fn type_text(sel: &mut AssetSelector, text: &str) {
        for c in text.chars() {
            sel.handle_key(ch(c), &ctx());
        }
    }

    #[test]
    fn mode_keys_only_switch_with_empty_text() {
        let mut sel = AssetSelector::new(SelectorOwner::Trade);
        sel.handle_key(ch('w'), &ctx());
        assert_eq!(sel.mode(), SelectorMode::Watchlist);
        sel.handle_key(code(KeyCode::Esc), &ctx());
        assert_eq!(sel.mode(), SelectorMode::Search);

        type_text(&mut sel, "s");
        assert_eq!(sel.mode(), SelectorMode::Search);
        assert_eq!(sel.text(), "");

        type_text(&mut sel, "A");
        type_text(&mut sel, "wps");
        assert_eq!(sel.mode(), SelectorMode::Search);
        assert_eq!(sel.text(), "AWPS");
    }

    #[test]
    fn typed_text_is_upper_cased_and_confirmed_without_lookup() {
        let mut sel = AssetSelector::new(SelectorOwner::Trade);
        type_text(&mut sel, "Aapl");
        assert_eq!(sel.text(), "AAPL");
        match sel.handle_key(code(KeyCode::Enter), &ctx()) {
            SelectorOutcome::Selected(s) => {
                assert_eq!(s.symbol, "AAPL");
                assert_eq!(s.instrument_type, InstrumentType::Equity);
                assert_eq!(s.supports_options, None);
                assert!(s.quote.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lookup_is_not_reissued_while_in_flight() {
        let mut sel = AssetSelector::new(SelectorOwner::Options);
        type_text(&mut sel, "AAPL");
        let tag = match sel.handle_key(ctrl('l'), &ctx()) {
            SelectorOutcome::Lookup(Command::LookupInstrument { symbol, owner, tag }) => {
                assert_eq!(symbol, "AAPL");
                assert_eq!(owner, SelectorOwner::Options);
                tag
            }
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(sel.handle_key(ctrl('l'), &ctx()), SelectorOutcome::Consumed);

        let details = InstrumentDetails {
            instrument: Instrument::equity("AAPL"),
            trading: Some("BUY_AND_SELL".into()),
            fractional_trading: None,
            option_trading: Some("BUY_AND_SELL".into()),
            option_spread_trading: None,
        };
        assert!(sel.on_instrument(tag, "AAPL".into(), Ok(details)));
        assert_eq!(sel.supports_options("AAPL"), Some(true));
        assert!(matches!(
            sel.handle_key(ctrl('l'), &ctx()),
            SelectorOutcome::Lookup(_)
        ));
    }

    #[test]
    fn list_modes_confirm_entries() {
        let mut sel = AssetSelector::new(SelectorOwner::Trade);
        sel.handle_key(ch('w'), &ctx());
        sel.handle_key(ch('j'), &ctx());
        match sel.handle_key(code(KeyCode::Enter), &ctx()) {
            SelectorOutcome::Selected(s) => assert_eq!(s.symbol, "SPY"),
            other => panic!("unexpected {other:?}"),
        }

        sel.handle_key(ch('p'), &ctx());
        assert_eq!(sel.mode(), SelectorMode::Portfolio);
        match sel.handle_key(code(KeyCode::Enter), &ctx()) {
            SelectorOutcome::Selected(s) => assert_eq!(s.symbol, "AAPL"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
