use broker_client::models::{Instrument, InstrumentType, Quote};
use broker_client::ApiError;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Cell, Paragraph, Row},
    Frame,
};
use std::collections::HashMap;

use super::widgets::{count, money, windowed_table};
use super::{KeyOutcome, Screen, ViewAction, ViewContext, WatchItem};
use crate::app::commands::Command;
use crate::app::event::QuoteTarget;
use crate::app::state::{ListCursor, LoadState, RequestTracker, ViewKind};
use crate::keys::{is_char, is_confirm, is_deny, is_down, is_up, plain_char};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Normal,
    Adding(String),
    Deleting(String),
}

#[derive(Debug)]
pub struct WatchlistView {
    symbols: Vec<String>,
    quotes: HashMap<String, Quote>,
    status: LoadState<()>,
    tracker: RequestTracker,
    cursor: ListCursor,
    mode: Mode,
    message: Option<String>,
}

impl WatchlistView {
    pub fn new(symbols: Vec<String>) -> Self {
        Self {
            symbols,
            quotes: HashMap::new(),
            status: LoadState::Idle,
            tracker: RequestTracker::default(),
            cursor: ListCursor::default(),
            mode: Mode::Normal,
            message: None,
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn items(&self) -> Vec<WatchItem> {
        self.symbols
            .iter()
            .map(|s| WatchItem {
                symbol: s.clone(),
                quote: self.quotes.get(s).cloned(),
            })
            .collect()
    }

    pub fn on_quotes(&mut self, tag: u64, result: Result<Vec<Quote>, ApiError>) -> bool {
        if !self.tracker.accept(tag) {
            return false;
        }
        match result {
            Ok(quotes) => {
                for q in quotes {
                    // a symbol may have been removed while the request was out
                    if self.symbols.iter().any(|s| s == q.symbol()) {
                        self.quotes.insert(q.symbol().to_string(), q);
                    }
                }
                self.status.finish(Ok(()));
            }
            Err(e) => self.status.finish(Err(e)),
        }
        true
    }

    fn fetch(&mut self, ctx: &ViewContext) -> Option<Command> {
        let account = ctx.account.clone()?;
        if self.symbols.is_empty() {
            self.tracker.cancel();
            self.status = LoadState::Loaded(());
            return None;
        }
        self.status.begin();
        Some(Command::FetchQuotes {
            account,
            instruments: self.symbols.iter().map(Instrument::equity).collect(),
            target: QuoteTarget::Watchlist,
            tag: self.tracker.issue(),
        })
    }

    fn save(&self) -> Command {
        Command::SaveWatchlist(self.symbols.clone())
    }

    fn confirm_add(&mut self, text: &str, ctx: &ViewContext) -> KeyOutcome {
        self.mode = Mode::Normal;
        let symbol = text.trim().to_uppercase();
        if symbol.is_empty() {
            return KeyOutcome::consumed();
        }
        if self.symbols.contains(&symbol) {
            self.message = Some(format!("{symbol} is already on the watchlist"));
            return KeyOutcome::consumed();
        }
        self.symbols.push(symbol);
        let len = self.symbols.len();
        self.cursor.select(len - 1, len);
        let save = self.save();
        match self.fetch(ctx) {
            Some(fetch) => KeyOutcome::command(Some(Command::Batch(vec![save, fetch]))),
            None => KeyOutcome::command(Some(save)),
        }
    }

    fn confirm_delete(&mut self, symbol: &str) -> KeyOutcome {
        self.mode = Mode::Normal;
        self.symbols.retain(|s| s != symbol);
        self.quotes.remove(symbol);
        self.cursor.clamp(self.symbols.len());
        self.message = Some(format!("removed {symbol}"));
        KeyOutcome::command(Some(self.save()))
    }

    fn handle_adding(&mut self, key: KeyEvent, mut text: String, ctx: &ViewContext) -> KeyOutcome {
        match key.code {
            KeyCode::Enter => return self.confirm_add(&text, ctx),
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                return KeyOutcome::consumed();
            }
            KeyCode::Backspace => {
                text.pop();
            }
            _ => {
                if let Some(c) = plain_char(&key).filter(|c| !c.is_whitespace() || !text.is_empty()) {
                    text.push(c);
                }
            }
        }
        self.mode = Mode::Adding(text);
        KeyOutcome::consumed()
    }
}

impl Screen for WatchlistView {
    fn kind(&self) -> ViewKind {
        ViewKind::Watchlist
    }

    fn handle_key(&mut self, key: KeyEvent, ctx: &ViewContext) -> KeyOutcome {
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Adding(text) => return self.handle_adding(key, text, ctx),
            Mode::Deleting(symbol) => {
                if is_confirm(&key) {
                    return self.confirm_delete(&symbol);
                }
                if !is_deny(&key) {
                    self.mode = Mode::Deleting(symbol);
                }
                return KeyOutcome::consumed();
            }
            Mode::Normal => {}
        }

        if is_up(&key) {
            self.cursor.up();
            return KeyOutcome::consumed();
        }
        if is_down(&key) {
            self.cursor.down(self.symbols.len());
            return KeyOutcome::consumed();
        }
        match plain_char(&key) {
            Some('a') => {
                self.mode = Mode::Adding(String::new());
                KeyOutcome::consumed()
            }
            Some('d') => {
                if let Some(symbol) = self.symbols.get(self.cursor.index) {
                    self.mode = Mode::Deleting(symbol.clone());
                }
                KeyOutcome::consumed()
            }
            Some('t') => match self.symbols.get(self.cursor.index) {
                Some(symbol) => KeyOutcome::action(ViewAction::OpenTrade {
                    symbol: symbol.clone(),
                    instrument_type: InstrumentType::Equity,
                }),
                None => KeyOutcome::consumed(),
            },
            _ => KeyOutcome::ignored(),
        }
    }

    fn refresh(&mut self, ctx: &ViewContext) -> Option<Command> {
        self.fetch(ctx)
    }

    fn is_exclusive(&self) -> bool {
        self.mode != Mode::Normal
    }

    fn is_fetching(&self) -> bool {
        self.tracker.in_flight()
    }

    fn has_loaded(&self) -> bool {
        !matches!(self.status, LoadState::Idle)
    }

    fn reset(&mut self) {
        self.quotes.clear();
        self.status = LoadState::Idle;
        self.tracker.cancel();
        self.cursor.reset();
        self.mode = Mode::Normal;
    }

    fn set_visible_rows(&mut self, rows: usize) {
        self.cursor.set_height(rows);
    }

    fn chrome_rows(&self) -> u16 {
        4
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let rows: Vec<Row> = self
            .symbols
            .iter()
            .map(|s| {
                let q = self.quotes.get(s);
                Row::new(vec![
                    Cell::from(s.clone()),
                    Cell::from(money(q.and_then(|q| q.last.as_ref()))),
                    Cell::from(money(q.and_then(|q| q.bid.as_ref()))),
                    Cell::from(money(q.and_then(|q| q.ask.as_ref()))),
                    Cell::from(count(q.and_then(|q| q.volume))),
                ])
            })
            .collect();
        let title = match &self.status {
            LoadState::Loading(_) => "Watchlist (refreshing)".to_string(),
            LoadState::Error(e) => format!("Watchlist · {e}"),
            _ => format!("Watchlist · {} symbols", self.symbols.len()),
        };
        let table = windowed_table(
            &title,
            vec!["Symbol", "Last", "Bid", "Ask", "Volume"],
            vec![
                Constraint::Min(10),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(12),
            ],
            rows,
            &self.cursor,
            true,
        );
        frame.render_widget(table, chunks[0]);

        let prompt = match &self.mode {
            Mode::Normal if self.symbols.is_empty() => "Watchlist is empty; press a to add a symbol.".to_string(),
            Mode::Normal => String::new(),
            Mode::Adding(text) => format!("Add symbol: {text}▏"),
            Mode::Deleting(symbol) => format!("Remove {symbol}? (y/n)"),
        };
        frame.render_widget(
            Paragraph::new(prompt).style(Style::default().fg(Color::Cyan)),
            chunks[1],
        );
    }

    fn hints(&self) -> &'static str {
        match self.mode {
            Mode::Normal => "a add · d delete · t trade · r refresh",
            Mode::Adding(_) => "enter add · esc cancel",
            Mode::Deleting(_) => "y remove · n keep",
        }
    }

    fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{ch, code};
    use crate::views::testing::{account_ctx, quote};

    fn add(view: &mut WatchlistView, text: &str) -> KeyOutcome {
        let ctx = account_ctx();
        view.handle_key(ch('a'), &ctx);
        for c in text.chars() {
            view.handle_key(ch(c), &ctx);
        }
        view.handle_key(code(KeyCode::Enter), &ctx)
    }

    #[test]
    fn adding_upper_cases_saves_and_fetches() {
        let mut view = WatchlistView::new(vec!["SPY".into()]);
        let out = add(&mut view, " msft ");
        assert_eq!(view.symbols(), ["SPY", "MSFT"]);
        match out.command {
            Some(Command::Batch(cmds)) => {
                assert_eq!(cmds[0], Command::SaveWatchlist(vec!["SPY".into(), "MSFT".into()]));
                assert!(matches!(
                    &cmds[1],
                    Command::FetchQuotes { target: QuoteTarget::Watchlist, instruments, .. }
                        if instruments.len() == 2
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!view.is_exclusive());
    }

    #[test]
    fn duplicate_and_empty_adds_change_nothing() {
        let mut view = WatchlistView::new(vec!["SPY".into()]);
        let out = add(&mut view, "spy");
        assert_eq!(out.command, None);
        assert_eq!(view.symbols(), ["SPY"]);
        assert!(view.take_message().unwrap().contains("already"));

        let out = add(&mut view, "   ");
        assert_eq!(out.command, None);
        assert_eq!(view.symbols(), ["SPY"]);
    }

    #[test]
    fn delete_requires_confirmation_and_drops_quote() {
        let ctx = account_ctx();
        let mut view = WatchlistView::new(vec!["SPY".into(), "QQQ".into()]);
        let tag = match view.refresh(&ctx) {
            Some(Command::FetchQuotes { tag, .. }) => tag,
            other => panic!("unexpected {other:?}"),
        };
        view.on_quotes(tag, Ok(vec![quote("SPY", Some("500")), quote("QQQ", Some("400"))]));

        view.handle_key(ch('d'), &ctx);
        assert!(view.is_exclusive());
        view.handle_key(ch('n'), &ctx);
        assert_eq!(view.symbols().len(), 2);

        view.handle_key(ch('d'), &ctx);
        let out = view.handle_key(code(KeyCode::Enter), &ctx);
        assert_eq!(out.command, Some(Command::SaveWatchlist(vec!["QQQ".into()])));
        assert!(view.items().iter().all(|i| i.symbol != "SPY"));
        assert!(!view.quotes.contains_key("SPY"));
    }

    #[test]
    fn quotes_for_removed_symbols_are_dropped() {
        let ctx = account_ctx();
        let mut view = WatchlistView::new(vec!["SPY".into(), "QQQ".into()]);
        let tag = match view.refresh(&ctx) {
            Some(Command::FetchQuotes { tag, .. }) => tag,
            other => panic!("unexpected {other:?}"),
        };
        view.handle_key(ch('d'), &ctx);
        view.handle_key(ch('y'), &ctx);
        view.on_quotes(tag, Ok(vec![quote("SPY", Some("500")), quote("QQQ", Some("400"))]));
        assert_eq!(view.quotes.len(), 1);
        assert!(view.quotes.contains_key("QQQ"));
    }

    #[test]
    fn trade_key_opens_equity_ticket() {
        let mut view = WatchlistView::new(vec!["SPY".into()]);
        let out = view.handle_key(ch('t'), &account_ctx());
        assert_eq!(
            out.action,
            Some(ViewAction::OpenTrade {
                symbol: "SPY".into(),
                instrument_type: InstrumentType::Equity,
            })
        );
    }
}
