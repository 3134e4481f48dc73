//! Option chain browser: underlying → expiration → calls/puts with greeks.

use bigdecimal::BigDecimal;
use broker_client::models::{
    AccountId, Greeks, Instrument, InstrumentType, OptionChain, OptionGreeks, Quote,
};
use broker_client::osi::strike_of;
use broker_client::ApiError;
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    widgets::{Cell, List, ListItem, Paragraph, Row},
    Frame,
};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use super::widgets::{
    block, count, fixed, money, render_status, render_text, selected_style, windowed_table,
};
use super::{KeyOutcome, Screen, ViewAction, ViewContext};
use crate::app::commands::Command;
use crate::app::event::{QuoteTarget, SelectorOwner};
use crate::app::state::{ListCursor, LoadState, RequestTracker, ViewKind};
use crate::keys::{is_down, is_up, plain_char};
use crate::selector::{AssetSelector, SelectorOutcome};

const GREEKS_ABOVE: usize = 3;
const GREEKS_BELOW: usize = 4;

/// Row closest to the underlying's last price; the first row wins ties.
/// Without a price the middle row is used.
pub fn atm_index(strikes: &[Option<BigDecimal>], last: Option<&BigDecimal>) -> Option<usize> {
    if strikes.is_empty() {
        return None;
    }
    let Some(last) = last else {
        return Some(strikes.len() / 2);
    };
    let mut best: Option<(usize, BigDecimal)> = None;
    for (i, strike) in strikes.iter().enumerate() {
        let Some(strike) = strike else { continue };
        let distance = (strike - last).abs();
        if best.as_ref().map_or(true, |(_, d)| distance < *d) {
            best = Some((i, distance));
        }
    }
    Some(best.map_or(strikes.len() / 2, |(i, _)| i))
}

/// Rows whose greeks are wanted around `cursor`.
pub fn greeks_window(len: usize, cursor: usize) -> Range<usize> {
    let start = cursor.saturating_sub(GREEKS_ABOVE).min(len);
    start..(cursor + GREEKS_BELOW + 1).min(len)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Underlying,
    Expirations,
    Chain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Calls,
    Puts,
}

pub struct OptionsView {
    selector: AssetSelector,
    stage: Stage,
    underlying: Option<String>,
    underlying_last: Option<BigDecimal>,
    expirations: LoadState<Vec<NaiveDate>>,
    exp_cursor: ListCursor,
    exp_tracker: RequestTracker,
    quote_tracker: RequestTracker,
    expiration: Option<NaiveDate>,
    chain: LoadState<OptionChain>,
    chain_tracker: RequestTracker,
    chain_tag: u64,
    reposition: bool,
    // Cursors sit on the middle row until the underlying's last price arrives.
    awaiting_last: bool,
    column: Column,
    call_cursor: ListCursor,
    put_cursor: ListCursor,
    greeks: HashMap<String, Greeks>,
    greeks_in_flight: HashSet<String>,
    show_greeks: bool,
    message: Option<String>,
}

impl Default for OptionsView {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionsView {
    pub fn new() -> Self {
        Self {
            selector: AssetSelector::new(SelectorOwner::Options),
            stage: Stage::Underlying,
            underlying: None,
            underlying_last: None,
            expirations: LoadState::Idle,
            exp_cursor: ListCursor::default(),
            exp_tracker: RequestTracker::default(),
            quote_tracker: RequestTracker::default(),
            expiration: None,
            chain: LoadState::Idle,
            chain_tracker: RequestTracker::default(),
            chain_tag: 0,
            reposition: false,
            awaiting_last: false,
            column: Column::Calls,
            call_cursor: ListCursor::default(),
            put_cursor: ListCursor::default(),
            greeks: HashMap::new(),
            greeks_in_flight: HashSet::new(),
            show_greeks: true,
            message: None,
        }
    }

    pub fn selector_mut(&mut self) -> &mut AssetSelector {
        &mut self.selector
    }

    pub fn underlying(&self) -> Option<&str> {
        self.underlying.as_deref()
    }

    pub fn on_expirations(&mut self, tag: u64, result: Result<Vec<NaiveDate>, ApiError>) -> bool {
        if !self.exp_tracker.accept(tag) {
            return false;
        }
        self.expirations.finish(result);
        let len = self.expirations.data().map_or(0, Vec::len);
        self.exp_cursor.clamp(len);
        true
    }

    /// Records the underlying's last price. A chain that was positioned
    /// without it is re-centred on the money.
    pub fn on_underlying_quote(
        &mut self,
        tag: u64,
        result: Result<Vec<Quote>, ApiError>,
        ctx: &ViewContext,
    ) -> Option<Command> {
        if !self.quote_tracker.accept(tag) {
            return None;
        }
        match result {
            Ok(quotes) => {
                let symbol = self.underlying.as_deref().unwrap_or_default();
                self.underlying_last = quotes
                    .into_iter()
                    .find(|q| q.symbol() == symbol)
                    .and_then(|q| q.last);
            }
            Err(e) => self.message = Some(format!("underlying quote failed: {e}")),
        }
        if self.awaiting_last && self.underlying_last.is_some() && self.chain.data().is_some() {
            self.center_on_money();
            return self.greeks_command(ctx);
        }
        None
    }

    fn center_on_money(&mut self) {
        let strikes = |rows: &[Quote]| rows.iter().map(|q| strike_of(q.symbol())).collect::<Vec<_>>();
        let calls = strikes(self.chain_rows(Column::Calls));
        let puts = strikes(self.chain_rows(Column::Puts));
        let last = self.underlying_last.as_ref();
        self.call_cursor.reset();
        self.put_cursor.reset();
        self.call_cursor.select(atm_index(&calls, last).unwrap_or(0), calls.len());
        self.put_cursor.select(atm_index(&puts, last).unwrap_or(0), puts.len());
        self.awaiting_last = last.is_none();
    }

    /// Applies a chain and asks for greeks around the selected rows.
    pub fn on_chain(
        &mut self,
        tag: u64,
        result: Result<OptionChain, ApiError>,
        ctx: &ViewContext,
    ) -> Option<Command> {
        if !self.chain_tracker.accept(tag) {
            return None;
        }
        self.chain_tag = tag;
        self.greeks_in_flight.clear();
        self.chain.finish(result);
        let chain = self.chain.data()?;
        let (calls, puts) = (chain.calls.len(), chain.puts.len());
        if self.reposition {
            self.reposition = false;
            self.center_on_money();
        } else {
            self.call_cursor.clamp(calls);
            self.put_cursor.clamp(puts);
        }
        self.greeks_command(ctx)
    }

    pub fn on_greeks(
        &mut self,
        chain_tag: u64,
        symbols: &[String],
        result: Result<Vec<OptionGreeks>, ApiError>,
    ) -> bool {
        if chain_tag != self.chain_tag {
            return false;
        }
        for s in symbols {
            self.greeks_in_flight.remove(s);
        }
        match result {
            Ok(list) => {
                for g in list {
                    self.greeks.insert(g.symbol, g.greeks);
                }
            }
            Err(e) => self.message = Some(format!("greeks unavailable: {e}")),
        }
        true
    }

    fn chain_rows(&self, column: Column) -> &[Quote] {
        match (self.chain.data(), column) {
            (Some(c), Column::Calls) => &c.calls,
            (Some(c), Column::Puts) => &c.puts,
            (None, _) => &[],
        }
    }

    fn cursor(&self, column: Column) -> &ListCursor {
        match column {
            Column::Calls => &self.call_cursor,
            Column::Puts => &self.put_cursor,
        }
    }

    fn selected_contract(&self) -> Option<&Quote> {
        self.chain_rows(self.column).get(self.cursor(self.column).index)
    }

    fn greeks_command(&mut self, ctx: &ViewContext) -> Option<Command> {
        let account = ctx.account.clone()?;
        let mut symbols = Vec::new();
        for column in [Column::Calls, Column::Puts] {
            let rows = self.chain_rows(column);
            for q in &rows[greeks_window(rows.len(), self.cursor(column).index)] {
                let s = q.symbol();
                if !self.greeks.contains_key(s) && !self.greeks_in_flight.contains(s) {
                    symbols.push(s.to_string());
                }
            }
        }
        if symbols.is_empty() {
            return None;
        }
        self.greeks_in_flight.extend(symbols.iter().cloned());
        Some(Command::FetchGreeks {
            account,
            symbols,
            chain_tag: self.chain_tag,
        })
    }

    fn start_underlying(&mut self, symbol: String, ctx: &ViewContext) -> Option<Command> {
        let account = ctx.account.clone()?;
        self.underlying = Some(symbol);
        self.underlying_last = None;
        self.stage = Stage::Expirations;
        self.expirations = LoadState::Idle;
        self.exp_cursor.reset();
        self.fetch_expirations(account)
    }

    fn fetch_expirations(&mut self, account: AccountId) -> Option<Command> {
        let symbol = self.underlying.clone()?;
        let instrument = Instrument::equity(symbol);
        self.expirations.begin();
        Some(Command::Batch(vec![
            Command::FetchExpirations {
                account: account.clone(),
                instrument: instrument.clone(),
                tag: self.exp_tracker.issue(),
            },
            Command::FetchQuotes {
                account,
                instruments: vec![instrument],
                target: QuoteTarget::Underlying,
                tag: self.quote_tracker.issue(),
            },
        ]))
    }

    fn fetch_chain(&mut self, ctx: &ViewContext, reposition: bool) -> Option<Command> {
        let account = ctx.account.clone()?;
        let symbol = self.underlying.clone()?;
        let expiration = self.expiration?;
        self.stage = Stage::Chain;
        // a refresh must not undo a first load that has not landed yet
        self.reposition |= reposition;
        if reposition {
            self.chain = LoadState::Idle;
            self.column = Column::Calls;
        }
        self.chain.begin();
        Some(Command::FetchChain {
            account,
            instrument: Instrument::equity(symbol),
            expiration,
            tag: self.chain_tracker.issue(),
        })
    }

    fn start_over(&mut self) {
        self.underlying = None;
        self.underlying_last = None;
        self.expirations = LoadState::Idle;
        self.exp_tracker.cancel();
        self.quote_tracker.cancel();
        self.back_to_expirations();
        self.stage = Stage::Underlying;
        self.selector.reset();
    }

    fn back_to_expirations(&mut self) {
        self.stage = Stage::Expirations;
        self.expiration = None;
        self.chain = LoadState::Idle;
        self.chain_tracker.cancel();
        self.greeks_in_flight.clear();
        self.reposition = false;
        self.awaiting_last = false;
    }

    fn handle_underlying(&mut self, key: KeyEvent, ctx: &ViewContext) -> KeyOutcome {
        match self.selector.handle_key(key, ctx) {
            SelectorOutcome::Ignored => KeyOutcome::ignored(),
            SelectorOutcome::Consumed => KeyOutcome::consumed(),
            SelectorOutcome::Lookup(cmd) => KeyOutcome::command(Some(cmd)),
            SelectorOutcome::Selected(sel) => {
                if sel.supports_options == Some(false) {
                    self.message = Some(format!("{} has no option trading", sel.symbol));
                    return KeyOutcome::consumed();
                }
                if ctx.account.is_none() {
                    self.message = Some("select an account first".to_string());
                    return KeyOutcome::consumed();
                }
                KeyOutcome::command(self.start_underlying(sel.symbol, ctx))
            }
        }
    }

    fn handle_expirations(&mut self, key: KeyEvent, ctx: &ViewContext) -> KeyOutcome {
        let len = self.expirations.data().map_or(0, Vec::len);
        if is_up(&key) {
            self.exp_cursor.up();
            return KeyOutcome::consumed();
        }
        if is_down(&key) {
            self.exp_cursor.down(len);
            return KeyOutcome::consumed();
        }
        if key.code == KeyCode::Enter {
            let date = self
                .expirations
                .data()
                .and_then(|d| d.get(self.exp_cursor.index))
                .copied();
            let Some(date) = date else {
                return KeyOutcome::consumed();
            };
            self.expiration = Some(date);
            return KeyOutcome::command(self.fetch_chain(ctx, true));
        }
        if plain_char(&key) == Some('n') {
            self.start_over();
            return KeyOutcome::consumed();
        }
        KeyOutcome::ignored()
    }

    fn handle_chain(&mut self, key: KeyEvent, ctx: &ViewContext) -> KeyOutcome {
        match key.code {
            KeyCode::Left => return self.switch_column(Column::Calls),
            KeyCode::Right => return self.switch_column(Column::Puts),
            _ => {}
        }
        if is_up(&key) || is_down(&key) {
            let len = self.chain_rows(self.column).len();
            let cursor = match self.column {
                Column::Calls => &mut self.call_cursor,
                Column::Puts => &mut self.put_cursor,
            };
            if is_up(&key) {
                cursor.up();
            } else {
                cursor.down(len);
            }
            self.awaiting_last = false;
            return KeyOutcome::command(self.greeks_command(ctx));
        }
        match plain_char(&key) {
            Some('h') => self.switch_column(Column::Calls),
            Some('l') => self.switch_column(Column::Puts),
            Some('g') => {
                self.show_greeks = !self.show_greeks;
                KeyOutcome::consumed()
            }
            Some('e') => {
                self.back_to_expirations();
                KeyOutcome::consumed()
            }
            Some('n') => {
                self.start_over();
                KeyOutcome::consumed()
            }
            Some('t') => match self.selected_contract() {
                Some(q) => KeyOutcome::action(ViewAction::OpenTrade {
                    symbol: q.symbol().to_string(),
                    instrument_type: InstrumentType::Option,
                }),
                None => KeyOutcome::consumed(),
            },
            _ => KeyOutcome::ignored(),
        }
    }

    fn switch_column(&mut self, column: Column) -> KeyOutcome {
        self.column = column;
        KeyOutcome::consumed()
    }

    fn render_chain(&self, frame: &mut Frame, area: Rect, chain: &OptionChain) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(3)])
            .split(area);
        let header = format!(
            "{} · {} · last {}{}",
            self.underlying.as_deref().unwrap_or_default(),
            self.expiration.map(|d| d.to_string()).unwrap_or_default(),
            money(self.underlying_last.as_ref()),
            if self.chain.is_loading() { " · refreshing" } else { "" },
        );
        frame.render_widget(Paragraph::new(header), chunks[0]);

        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);
        for (column, rows, area) in [
            (Column::Calls, &chain.calls, halves[0]),
            (Column::Puts, &chain.puts, halves[1]),
        ] {
            let title = match column {
                Column::Calls => "Calls",
                Column::Puts => "Puts",
            };
            frame.render_widget(self.chain_table(title, column, rows), area);
        }
    }

    fn chain_table<'a>(&'a self, title: &'a str, column: Column, rows: &'a [Quote]) -> ratatui::widgets::Table<'a> {
        let mut header = vec!["Strike", "Bid", "Ask", "Last", "Vol", "OI"];
        let mut widths = vec![Constraint::Length(9); 4];
        widths.extend([Constraint::Length(7), Constraint::Length(7)]);
        if self.show_greeks {
            header.extend(["Δ", "Γ", "Θ", "IV"]);
            widths.extend([Constraint::Length(7); 4]);
        }
        let body: Vec<Row> = rows
            .iter()
            .map(|q| {
                let mut cells = vec![
                    Cell::from(strike_of(q.symbol()).map(|s| fixed(&s, 2)).unwrap_or_default()),
                    Cell::from(money(q.bid.as_ref())),
                    Cell::from(money(q.ask.as_ref())),
                    Cell::from(money(q.last.as_ref())),
                    Cell::from(count(q.volume)),
                    Cell::from(count(q.open_interest)),
                ];
                if self.show_greeks {
                    let g = self.greeks.get(q.symbol());
                    let f = |v: Option<&BigDecimal>| v.map(|v| fixed(v, 3)).unwrap_or_else(|| "-".into());
                    cells.push(Cell::from(f(g.and_then(|g| g.delta.as_ref()))));
                    cells.push(Cell::from(f(g.and_then(|g| g.gamma.as_ref()))));
                    cells.push(Cell::from(f(g.and_then(|g| g.theta.as_ref()))));
                    cells.push(Cell::from(f(g.and_then(|g| g.implied_volatility.as_ref()))));
                }
                Row::new(cells)
            })
            .collect();
        windowed_table(title, header, widths, body, self.cursor(column), column == self.column)
    }
}

impl Screen for OptionsView {
    fn kind(&self) -> ViewKind {
        ViewKind::Options
    }

    fn handle_key(&mut self, key: KeyEvent, ctx: &ViewContext) -> KeyOutcome {
        match self.stage {
            Stage::Underlying => self.handle_underlying(key, ctx),
            Stage::Expirations => self.handle_expirations(key, ctx),
            Stage::Chain => self.handle_chain(key, ctx),
        }
    }

    fn refresh(&mut self, ctx: &ViewContext) -> Option<Command> {
        match self.stage {
            Stage::Underlying => None,
            Stage::Expirations => {
                let account = ctx.account.clone()?;
                self.fetch_expirations(account)
            }
            Stage::Chain => self.fetch_chain(ctx, false),
        }
    }

    fn is_exclusive(&self) -> bool {
        self.stage == Stage::Underlying
    }

    fn is_fetching(&self) -> bool {
        self.exp_tracker.in_flight() || self.quote_tracker.in_flight() || self.chain_tracker.in_flight()
    }

    fn has_loaded(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.start_over();
        self.greeks.clear();
    }

    fn set_visible_rows(&mut self, rows: usize) {
        self.exp_cursor.set_height(rows);
        self.call_cursor.set_height(rows);
        self.put_cursor.set_height(rows);
    }

    fn chrome_rows(&self) -> u16 {
        4
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        match self.stage {
            Stage::Underlying => {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(8), Constraint::Min(1)])
                    .split(area);
                self.selector.render(frame, chunks[0], true);
                render_text(
                    frame,
                    chunks[1],
                    "Options",
                    "Pick an underlying, then an expiration.\nctrl+l checks whether the symbol trades options.",
                );
            }
            Stage::Expirations => {
                let title = format!(
                    "{} expirations · last {}",
                    self.underlying.as_deref().unwrap_or_default(),
                    money(self.underlying_last.as_ref())
                );
                let Some(dates) = self.expirations.data() else {
                    render_status(frame, area, &title, &self.expirations, "");
                    return;
                };
                let range = self.exp_cursor.visible(dates.len());
                let items: Vec<ListItem> = dates[range.clone()]
                    .iter()
                    .enumerate()
                    .map(|(i, d)| {
                        let item = ListItem::new(d.format("%Y-%m-%d (%a)").to_string());
                        if range.start + i == self.exp_cursor.index {
                            item.style(selected_style())
                        } else {
                            item
                        }
                    })
                    .collect();
                frame.render_widget(List::new(items).block(block(&title)), area);
            }
            Stage::Chain => match self.chain.data() {
                Some(chain) => self.render_chain(frame, area, chain),
                None => render_status(frame, area, "Option chain", &self.chain, ""),
            },
        }
    }

    fn hints(&self) -> &'static str {
        match self.stage {
            Stage::Underlying => "enter confirm · ctrl+l lookup · w/p lists · esc toolbar",
            Stage::Expirations => "j/k move · enter load chain · n new underlying",
            Stage::Chain => "h/l column · j/k move · g greeks · e expirations · n new · t trade",
        }
    }

    fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{ch, code, ctrl};
    use crate::views::testing::{account_ctx, dec, quote};
    use broker_client::models::{InstrumentDetails, OptionChain};
    use proptest::prelude::*;

    fn contract(symbol: &str) -> Quote {
        let mut q = quote(symbol, None);
        q.instrument = Instrument::option(symbol);
        q
    }

    fn chain(strikes: &[u32]) -> OptionChain {
        let osi = |right: char, k: u32| format!("AAPL250117{right}{:08}", k * 1000);
        OptionChain {
            base_symbol: Some("AAPL".into()),
            calls: strikes.iter().map(|k| contract(&osi('C', *k))).collect(),
            puts: strikes.iter().map(|k| contract(&osi('P', *k))).collect(),
        }
    }

    fn pick_underlying(view: &mut OptionsView) -> (u64, u64) {
        let ctx = account_ctx();
        for c in "aapl".chars() {
            view.handle_key(ch(c), &ctx);
        }
        let cmd = view.handle_key(code(KeyCode::Enter), &ctx).command.unwrap();
        match cmd.flatten().as_slice() {
            [Command::FetchExpirations { tag: e, .. }, Command::FetchQuotes {
                target: QuoteTarget::Underlying,
                tag: q,
                ..
            }] => (*e, *q),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn atm_prefers_closest_then_first() {
        let s = |v: &[&str]| v.iter().map(|x| Some(dec(x))).collect::<Vec<_>>();
        assert_eq!(atm_index(&s(&["170", "175", "180"]), Some(&dec("176"))), Some(1));
        assert_eq!(atm_index(&s(&["170", "175", "180"]), Some(&dec("177.5"))), Some(1));
        assert_eq!(atm_index(&s(&["170", "175", "180", "185"]), None), Some(2));
        assert_eq!(atm_index(&[], Some(&dec("1"))), None);
        assert_eq!(atm_index(&[None, Some(dec("10"))], Some(&dec("1"))), Some(1));
    }

    #[test]
    fn greeks_window_is_clamped() {
        assert_eq!(greeks_window(20, 10), 7..15);
        assert_eq!(greeks_window(20, 1), 0..6);
        assert_eq!(greeks_window(5, 4), 1..5);
        assert_eq!(greeks_window(0, 0), 0..0);
    }

    #[test]
    fn refuses_underlying_without_option_trading() {
        let ctx = account_ctx();
        let mut view = OptionsView::new();
        for c in "BRK.A".chars() {
            view.handle_key(ch(c), &ctx);
        }
        let tag = match view.handle_key(ctrl('l'), &ctx).command {
            Some(Command::LookupInstrument { tag, .. }) => tag,
            other => panic!("unexpected {other:?}"),
        };
        let details = InstrumentDetails {
            instrument: Instrument::equity("BRK.A"),
            trading: None,
            fractional_trading: None,
            option_trading: Some("DISABLED".into()),
            option_spread_trading: None,
        };
        view.selector_mut().on_instrument(tag, "BRK.A".into(), Ok(details));
        let out = view.handle_key(code(KeyCode::Enter), &ctx);
        assert!(out.command.is_none());
        assert!(view.underlying().is_none());
        assert!(view.take_message().unwrap().contains("no option trading"));
    }

    #[test]
    fn chain_load_positions_at_the_money_and_requests_greeks() {
        let ctx = account_ctx();
        let mut view = OptionsView::new();
        let (exp_tag, quote_tag) = pick_underlying(&mut view);
        assert!(view.on_expirations(
            exp_tag,
            Ok(vec![NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()])
        ));
        assert_eq!(
            view.on_underlying_quote(quote_tag, Ok(vec![quote("AAPL", Some("181"))]), &ctx),
            None
        );

        let chain_tag = match view.handle_key(code(KeyCode::Enter), &ctx).command {
            Some(Command::FetchChain { tag, .. }) => tag,
            other => panic!("unexpected {other:?}"),
        };
        let strikes: Vec<u32> = (150..=210).step_by(5).collect();
        let greeks = view.on_chain(chain_tag, Ok(chain(&strikes)), &ctx).unwrap();
        assert_eq!(view.call_cursor.index, 6);
        assert_eq!(view.put_cursor.index, 6);
        let symbols = match &greeks {
            Command::FetchGreeks { symbols, .. } => symbols.clone(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(symbols.len(), 16);

        // only the row entering the window is requested
        match view.handle_key(ch('j'), &ctx).command {
            Some(Command::FetchGreeks { symbols, .. }) => {
                assert_eq!(symbols, vec!["AAPL250117C00205000".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(view.handle_key(ch('k'), &ctx).command, None);
        assert!(view.on_greeks(chain_tag, &symbols, Ok(vec![])));
    }

    #[test]
    fn stale_greeks_are_ignored_and_keys_navigate() {
        let ctx = account_ctx();
        let mut view = OptionsView::new();
        let (exp_tag, _) = pick_underlying(&mut view);
        view.on_expirations(exp_tag, Ok(vec![NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()]));
        let tag = match view.handle_key(code(KeyCode::Enter), &ctx).command {
            Some(Command::FetchChain { tag, .. }) => tag,
            other => panic!("unexpected {other:?}"),
        };
        view.on_chain(tag, Ok(chain(&[170, 175, 180])), &ctx);
        assert_eq!(view.call_cursor.index, 1);
        assert!(!view.on_greeks(tag + 99, &[], Ok(vec![])));

        view.handle_key(ch('l'), &ctx);
        let out = view.handle_key(ch('t'), &ctx);
        assert_eq!(
            out.action,
            Some(ViewAction::OpenTrade {
                symbol: "AAPL250117P00175000".into(),
                instrument_type: InstrumentType::Option,
            })
        );

        view.handle_key(ch('e'), &ctx);
        assert_eq!(view.stage, Stage::Expirations);
        view.handle_key(ch('n'), &ctx);
        assert_eq!(view.stage, Stage::Underlying);
        assert!(view.is_exclusive());
    }

    fn chain_tag(out: KeyOutcome) -> u64 {
        match out.command {
            Some(Command::FetchChain { tag, .. }) => tag,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn refresh_before_first_chain_keeps_at_the_money_selection() {
        let ctx = account_ctx();
        let mut view = OptionsView::new();
        let (exp_tag, quote_tag) = pick_underlying(&mut view);
        view.on_expirations(exp_tag, Ok(vec![NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()]));
        view.on_underlying_quote(quote_tag, Ok(vec![quote("AAPL", Some("176"))]), &ctx);

        let first = chain_tag(view.handle_key(code(KeyCode::Enter), &ctx));
        let second = match view.refresh(&ctx) {
            Some(Command::FetchChain { tag, .. }) => tag,
            other => panic!("unexpected {other:?}"),
        };
        assert!(view.on_chain(first, Ok(chain(&[170, 175, 180])), &ctx).is_none());
        view.on_chain(second, Ok(chain(&[170, 175, 180])), &ctx);
        assert_eq!(view.call_cursor.index, 1);
        assert_eq!(view.put_cursor.index, 1);

        // later refreshes keep where the user moved to
        view.handle_key(ch('j'), &ctx);
        let third = match view.refresh(&ctx) {
            Some(Command::FetchChain { tag, .. }) => tag,
            other => panic!("unexpected {other:?}"),
        };
        view.on_chain(third, Ok(chain(&[170, 175, 180])), &ctx);
        assert_eq!(view.call_cursor.index, 2);
    }

    #[test]
    fn late_underlying_quote_recenters_the_chain() {
        let ctx = account_ctx();
        let mut view = OptionsView::new();
        let (exp_tag, quote_tag) = pick_underlying(&mut view);
        view.on_expirations(exp_tag, Ok(vec![NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()]));

        let tag = chain_tag(view.handle_key(code(KeyCode::Enter), &ctx));
        let strikes: Vec<u32> = (150..=210).step_by(5).collect();
        view.on_chain(tag, Ok(chain(&strikes)), &ctx);
        assert_eq!(view.call_cursor.index, 6);

        let greeks = view.on_underlying_quote(quote_tag, Ok(vec![quote("AAPL", Some("171"))]), &ctx);
        assert!(matches!(greeks, Some(Command::FetchGreeks { .. })));
        assert_eq!(view.call_cursor.index, 4);
        assert_eq!(view.put_cursor.index, 4);
    }

    #[test]
    fn late_quote_leaves_a_moved_cursor_alone() {
        let ctx = account_ctx();
        let mut view = OptionsView::new();
        let (exp_tag, quote_tag) = pick_underlying(&mut view);
        view.on_expirations(exp_tag, Ok(vec![NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()]));

        let tag = chain_tag(view.handle_key(code(KeyCode::Enter), &ctx));
        view.on_chain(tag, Ok(chain(&[170, 175, 180])), &ctx);
        view.handle_key(ch('k'), &ctx);
        assert_eq!(view.call_cursor.index, 0);

        assert_eq!(
            view.on_underlying_quote(quote_tag, Ok(vec![quote("AAPL", Some("181"))]), &ctx),
            None
        );
        assert_eq!(view.call_cursor.index, 0);
    }

    proptest! {
        #[test]
        fn atm_row_is_never_beaten(strikes in proptest::collection::vec(1u32..500, 1..40), last in 1u32..500) {
            let s: Vec<Option<BigDecimal>> = strikes.iter().map(|k| Some(BigDecimal::from(*k))).collect();
            let last = BigDecimal::from(last);
            let i = atm_index(&s, Some(&last)).unwrap();
            let best = (BigDecimal::from(strikes[i]) - &last).abs();
            for (j, k) in strikes.iter().enumerate() {
                let d = (BigDecimal::from(*k) - &last).abs();
                prop_assert!(d >= best);
                if j < i {
                    prop_assert!(d > best);
                }
            }
        }
    }
}
