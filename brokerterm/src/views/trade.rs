//! Order ticket.
//!
//! The form walks Symbol → Side → OrderType → Quantity → LimitPrice. A valid
//! ticket is shown once more for confirmation before anything is sent; all
//! orders are DAY orders.

use bigdecimal::{BigDecimal, Zero};
use broker_client::models::{
    Instrument, InstrumentType, OrderSide, OrderType, PlaceOrderRequest, PlaceOrderResponse, Quote,
};
use broker_client::ApiError;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::str::FromStr;

use super::widgets::{block, money, selected_style};
use super::{KeyOutcome, Screen, ViewContext};
use crate::app::commands::Command;
use crate::app::event::{QuoteTarget, SelectorOwner};
use crate::app::state::{LoadState, RequestTracker, ViewKind};
use crate::keys::{is_confirm, is_deny, plain_char};
use crate::selector::{AssetSelector, Selection, SelectorMode, SelectorOutcome};

const OPTION_MULTIPLIER: u32 = 100;
const SELECTOR_LIST_ROWS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Symbol,
    Side,
    OrderType,
    Quantity,
    LimitPrice,
}

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::Symbol => "Symbol",
            Field::Side => "Side",
            Field::OrderType => "Type",
            Field::Quantity => "Quantity",
            Field::LimitPrice => "Limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Form,
    Confirm,
    Submitting,
}

/// Checks a ticket and returns the parsed quantity and limit price.
pub fn validate(
    symbol: Option<&str>,
    quantity: &str,
    order_type: OrderType,
    limit_price: &str,
) -> Result<(BigDecimal, Option<BigDecimal>), &'static str> {
    if symbol.map_or(true, |s| s.trim().is_empty()) {
        return Err("choose a symbol first");
    }
    let qty = positive(quantity).ok_or("quantity must be a positive number")?;
    let limit = match order_type {
        OrderType::Limit => Some(positive(limit_price).ok_or("limit price must be a positive number")?),
        _ => None,
    };
    Ok((qty, limit))
}

pub fn valid(symbol: Option<&str>, quantity: &str, order_type: OrderType, limit_price: &str) -> bool {
    validate(symbol, quantity, order_type, limit_price).is_ok()
}

fn positive(raw: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(raw.trim())
        .ok()
        .filter(|v| v > &BigDecimal::zero())
}

/// Quantity × price, where the price is the limit for limit orders and the
/// last trade otherwise. Option contracts cover 100 shares.
pub fn estimate(
    quantity: &BigDecimal,
    order_type: OrderType,
    limit_price: Option<&BigDecimal>,
    last: Option<&BigDecimal>,
    instrument_type: InstrumentType,
) -> Option<BigDecimal> {
    let price = match order_type {
        OrderType::Limit => limit_price.or(last)?,
        _ => last?,
    };
    let total = quantity * price;
    Some(if instrument_type == InstrumentType::Option {
        total * BigDecimal::from(OPTION_MULTIPLIER)
    } else {
        total
    })
}

pub struct TradeView {
    selector: AssetSelector,
    symbol: Option<String>,
    instrument_type: InstrumentType,
    side: OrderSide,
    order_type: OrderType,
    quantity: String,
    limit_price: String,
    field: Field,
    phase: Phase,
    quote: LoadState<Quote>,
    quote_tracker: RequestTracker,
    order_tracker: RequestTracker,
    last_result: Option<Result<String, ApiError>>,
    message: Option<String>,
}

impl Default for TradeView {
    fn default() -> Self {
        Self::new()
    }
}

impl TradeView {
    pub fn new() -> Self {
        let mut selector = AssetSelector::new(SelectorOwner::Trade);
        selector.set_visible_rows(SELECTOR_LIST_ROWS);
        Self {
            selector,
            symbol: None,
            instrument_type: InstrumentType::Equity,
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: String::new(),
            limit_price: String::new(),
            field: Field::Symbol,
            phase: Phase::Form,
            quote: LoadState::Idle,
            quote_tracker: RequestTracker::default(),
            order_tracker: RequestTracker::default(),
            last_result: None,
            message: None,
        }
    }

    pub fn selector_mut(&mut self) -> &mut AssetSelector {
        &mut self.selector
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    /// Fills the ticket from another view and fetches a quote.
    pub fn prefill(
        &mut self,
        symbol: &str,
        instrument_type: InstrumentType,
        ctx: &ViewContext,
    ) -> Option<Command> {
        if self.phase == Phase::Confirm {
            self.phase = Phase::Form;
        }
        self.selector.set_text(symbol);
        self.select(
            Selection {
                symbol: symbol.to_uppercase(),
                instrument_type,
                quote: ctx.cached_quote(symbol).cloned(),
                supports_options: None,
            },
            ctx,
        )
    }

    pub fn on_quotes(&mut self, tag: u64, result: Result<Vec<Quote>, ApiError>) -> bool {
        if !self.quote_tracker.accept(tag) {
            return false;
        }
        let symbol = self.symbol.clone().unwrap_or_default();
        self.quote.finish(result.and_then(|quotes| {
            quotes
                .into_iter()
                .find(|q| q.symbol() == symbol)
                .ok_or_else(|| ApiError::Decode(format!("no quote returned for {symbol}")))
        }));
        true
    }

    /// Records the placement result; returns the new order id on success.
    pub fn on_order(
        &mut self,
        tag: u64,
        result: Result<PlaceOrderResponse, ApiError>,
    ) -> Option<String> {
        if !self.order_tracker.accept(tag) {
            return None;
        }
        self.phase = Phase::Form;
        match result {
            Ok(resp) => {
                self.quantity.clear();
                self.message = Some(format!("order {} placed", resp.order_id));
                self.last_result = Some(Ok(resp.order_id.clone()));
                Some(resp.order_id)
            }
            Err(e) => {
                self.last_result = Some(Err(e));
                None
            }
        }
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::Symbol, Field::Side, Field::OrderType, Field::Quantity];
        if self.order_type == OrderType::Limit {
            fields.push(Field::LimitPrice);
        }
        fields
    }

    fn step_field(&mut self, forward: bool) {
        let fields = self.fields();
        let pos = fields.iter().position(|f| *f == self.field).unwrap_or(0);
        let next = if forward {
            (pos + 1) % fields.len()
        } else {
            (pos + fields.len() - 1) % fields.len()
        };
        self.field = fields[next];
    }

    fn select(&mut self, selection: Selection, ctx: &ViewContext) -> Option<Command> {
        let instrument = Instrument::new(selection.symbol.clone(), selection.instrument_type);
        self.symbol = Some(selection.symbol);
        self.instrument_type = selection.instrument_type;
        self.field = Field::Side;
        self.last_result = None;
        self.quote = match selection.quote {
            Some(q) => LoadState::Loaded(q),
            None => LoadState::Idle,
        };
        let account = ctx.account.clone()?;
        self.quote.begin();
        Some(Command::FetchQuotes {
            account,
            instruments: vec![instrument],
            target: QuoteTarget::Trade,
            tag: self.quote_tracker.issue(),
        })
    }

    fn clear_symbol(&mut self) {
        self.symbol = None;
        self.quote = LoadState::Idle;
        self.quote_tracker.cancel();
    }

    fn submit(&mut self) -> KeyOutcome {
        match validate(self.symbol.as_deref(), &self.quantity, self.order_type, &self.limit_price) {
            Ok(_) => {
                self.phase = Phase::Confirm;
                self.last_result = None;
            }
            Err(reason) => self.message = Some(format!("order blocked: {reason}")),
        }
        KeyOutcome::consumed()
    }

    fn place(&mut self, ctx: &ViewContext) -> KeyOutcome {
        let Some(account) = ctx.account.clone() else {
            self.phase = Phase::Form;
            self.message = Some("select an account first".to_string());
            return KeyOutcome::consumed();
        };
        let (qty, limit) = match validate(self.symbol.as_deref(), &self.quantity, self.order_type, &self.limit_price) {
            Ok(parsed) => parsed,
            Err(reason) => {
                self.phase = Phase::Form;
                self.message = Some(format!("order blocked: {reason}"));
                return KeyOutcome::consumed();
            }
        };
        let symbol = self.symbol.clone().unwrap_or_default();
        let order = PlaceOrderRequest::day(
            Instrument::new(symbol, self.instrument_type),
            self.side,
            self.order_type,
            qty,
            limit,
        );
        self.phase = Phase::Submitting;
        KeyOutcome::command(Some(Command::PlaceOrder {
            account,
            order,
            tag: self.order_tracker.issue(),
        }))
    }

    fn handle_symbol(&mut self, key: KeyEvent, ctx: &ViewContext) -> Option<KeyOutcome> {
        let before = self.selector.text().to_string();
        let outcome = match self.selector.handle_key(key, ctx) {
            SelectorOutcome::Ignored => return None,
            SelectorOutcome::Consumed => KeyOutcome::consumed(),
            SelectorOutcome::Lookup(cmd) => KeyOutcome::command(Some(cmd)),
            SelectorOutcome::Selected(selection) => {
                let cmd = self.select(selection, ctx);
                return Some(KeyOutcome::command(cmd));
            }
        };
        if self.selector.text() != before && self.symbol.is_some() {
            self.clear_symbol();
        }
        Some(outcome)
    }

    fn edit_number(&mut self, key: KeyEvent) -> bool {
        let target = match self.field {
            Field::Quantity => &mut self.quantity,
            Field::LimitPrice => &mut self.limit_price,
            _ => return false,
        };
        match key.code {
            KeyCode::Backspace => {
                target.pop();
                true
            }
            _ => match plain_char(&key) {
                Some(c) if c.is_ascii_digit() => {
                    target.push(c);
                    true
                }
                Some('.') if !target.contains('.') => {
                    target.push('.');
                    true
                }
                Some('.') => true,
                _ => false,
            },
        }
    }

    fn toggle(&mut self) {
        match self.field {
            Field::Side => self.side = self.side.toggled(),
            Field::OrderType => {
                self.order_type = match self.order_type {
                    OrderType::Limit => OrderType::Market,
                    _ => OrderType::Limit,
                };
            }
            _ => {}
        }
    }

    fn field_value(&self, field: Field) -> String {
        match field {
            Field::Symbol => match &self.symbol {
                Some(s) => format!("{s} ({})", self.instrument_type),
                None => "-".to_string(),
            },
            Field::Side => format!("‹ {} ›", self.side),
            Field::OrderType => format!("‹ {} ›", self.order_type),
            Field::Quantity => self.quantity.clone(),
            Field::LimitPrice => self.limit_price.clone(),
        }
    }

    fn quote_line(&self) -> String {
        match &self.quote {
            LoadState::Idle => String::new(),
            LoadState::Loading(None) => "fetching quote…".to_string(),
            LoadState::Loading(Some(q)) | LoadState::Loaded(q) => format!(
                "last {}  bid {}  ask {}",
                money(q.last.as_ref()),
                money(q.bid.as_ref()),
                money(q.ask.as_ref())
            ),
            LoadState::Error(e) => format!("quote unavailable: {e}"),
        }
    }

    fn estimate_line(&self) -> Option<String> {
        let qty = positive(&self.quantity)?;
        let limit = positive(&self.limit_price);
        let last = self.quote.data().and_then(|q| q.last.as_ref());
        let total = estimate(&qty, self.order_type, limit.as_ref(), last, self.instrument_type)?;
        Some(format!("Estimated cost {}", money(Some(&total))))
    }

    fn status_line(&self) -> Line<'static> {
        match (self.phase, &self.last_result) {
            (Phase::Confirm, _) => Line::from(Span::styled(
                format!(
                    "Send {} {} {} {}? (y/n)",
                    self.side,
                    self.quantity,
                    self.symbol.as_deref().unwrap_or_default(),
                    match self.order_type {
                        OrderType::Limit => format!("LIMIT @ {}", self.limit_price),
                        other => other.to_string(),
                    }
                ),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            (Phase::Submitting, _) => Line::from("submitting…"),
            (Phase::Form, Some(Ok(id))) => Line::from(Span::styled(
                format!("placed order {id}"),
                Style::default().fg(Color::Green),
            )),
            (Phase::Form, Some(Err(e))) => Line::from(Span::styled(
                format!("order failed: {e}"),
                Style::default().fg(Color::Red),
            )),
            (Phase::Form, None) => match validate(
                self.symbol.as_deref(),
                &self.quantity,
                self.order_type,
                &self.limit_price,
            ) {
                Ok(_) => Line::from("enter to review"),
                Err(reason) => Line::from(Span::styled(
                    reason.to_string(),
                    Style::default().fg(Color::DarkGray),
                )),
            },
        }
    }
}

impl Screen for TradeView {
    fn kind(&self) -> ViewKind {
        ViewKind::Trade
    }

    fn handle_key(&mut self, key: KeyEvent, ctx: &ViewContext) -> KeyOutcome {
        match self.phase {
            Phase::Confirm => {
                if is_confirm(&key) {
                    return self.place(ctx);
                }
                if is_deny(&key) {
                    self.phase = Phase::Form;
                }
                return KeyOutcome::consumed();
            }
            Phase::Submitting => return KeyOutcome::ignored(),
            Phase::Form => {}
        }

        if self.field == Field::Symbol {
            if let Some(outcome) = self.handle_symbol(key, ctx) {
                return outcome;
            }
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.step_field(true);
                return KeyOutcome::consumed();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.step_field(false);
                return KeyOutcome::consumed();
            }
            KeyCode::Enter if self.field != Field::Symbol => return self.submit(),
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
                if matches!(self.field, Field::Side | Field::OrderType) =>
            {
                self.toggle();
                return KeyOutcome::consumed();
            }
            _ => {}
        }
        if self.edit_number(key) {
            return KeyOutcome::consumed();
        }
        KeyOutcome::ignored()
    }

    fn refresh(&mut self, ctx: &ViewContext) -> Option<Command> {
        let symbol = self.symbol.clone()?;
        let account = ctx.account.clone()?;
        self.quote.begin();
        Some(Command::FetchQuotes {
            account,
            instruments: vec![Instrument::new(symbol, self.instrument_type)],
            target: QuoteTarget::Trade,
            tag: self.quote_tracker.issue(),
        })
    }

    fn is_exclusive(&self) -> bool {
        match self.phase {
            Phase::Confirm => true,
            Phase::Submitting => false,
            Phase::Form => matches!(self.field, Field::Symbol | Field::Quantity | Field::LimitPrice),
        }
    }

    fn is_fetching(&self) -> bool {
        self.quote_tracker.in_flight() || self.order_tracker.in_flight()
    }

    fn has_loaded(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.selector.reset();
        self.clear_symbol();
        self.order_tracker.cancel();
        self.phase = Phase::Form;
        self.field = Field::Symbol;
        self.quantity.clear();
        self.limit_price.clear();
        self.last_result = None;
    }

    fn set_visible_rows(&mut self, rows: usize) {
        self.selector.set_visible_rows(rows.min(SELECTOR_LIST_ROWS));
    }

    fn chrome_rows(&self) -> u16 {
        0
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let selector_height = match self.selector.mode() {
            SelectorMode::Search => 4,
            _ => SELECTOR_LIST_ROWS as u16 + 2,
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(selector_height), Constraint::Min(8)])
            .split(area);
        self.selector.render(
            frame,
            chunks[0],
            self.field == Field::Symbol && self.phase == Phase::Form,
        );

        let mut lines = Vec::new();
        for field in self.fields() {
            let focused = field == self.field && self.phase == Phase::Form;
            let marker = if focused { "› " } else { "  " };
            let value = Span::styled(
                self.field_value(field),
                if focused { selected_style() } else { Style::default() },
            );
            lines.push(Line::from(vec![
                Span::raw(format!("{marker}{:<10}", field.label())),
                value,
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(self.quote_line()));
        if let Some(est) = self.estimate_line() {
            lines.push(Line::from(est));
        }
        lines.push(Line::from(""));
        lines.push(self.status_line());

        frame.render_widget(Paragraph::new(lines).block(block("Order ticket")), chunks[1]);
    }

    fn hints(&self) -> &'static str {
        match (self.phase, self.field) {
            (Phase::Confirm, _) => "y send · n back",
            (Phase::Submitting, _) => "waiting for the broker",
            (Phase::Form, Field::Symbol) => "enter confirm · ctrl+l lookup · tab next · esc toolbar",
            (Phase::Form, Field::Side | Field::OrderType) => "←/→ change · tab next · enter review",
            (Phase::Form, _) => "digits edit · tab next · enter review · esc toolbar",
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
    use crate::views::testing::{account_ctx, dec, quote};
    use proptest::prelude::*;

    fn typed(view: &mut TradeView, text: &str) {
        for c in text.chars() {
            view.handle_key(ch(c), &account_ctx());
        }
    }

    fn ticket(symbol: &str) -> (TradeView, u64) {
        let mut view = TradeView::new();
        typed(&mut view, symbol);
        let out = view.handle_key(code(KeyCode::Enter), &account_ctx());
        match out.command {
            Some(Command::FetchQuotes {
                target: QuoteTarget::Trade,
                tag,
                ..
            }) => (view, tag),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn validity_rules() {
        assert!(valid(Some("AAPL"), "10", OrderType::Market, ""));
        assert!(valid(Some("AAPL"), "0.5", OrderType::Limit, "180.25"));
        assert!(!valid(None, "10", OrderType::Market, ""));
        assert!(!valid(Some(" "), "10", OrderType::Market, ""));
        assert!(!valid(Some("AAPL"), "0", OrderType::Market, ""));
        assert!(!valid(Some("AAPL"), "abc", OrderType::Market, ""));
        assert!(!valid(Some("AAPL"), "10", OrderType::Limit, ""));
        assert!(!valid(Some("AAPL"), "10", OrderType::Limit, "-1"));
    }

    #[test]
    fn estimate_uses_limit_then_last_and_option_multiplier() {
        let last = dec("180");
        let limit = dec("175.5");
        let q = dec("2");
        assert_eq!(
            estimate(&q, OrderType::Limit, Some(&limit), Some(&last), InstrumentType::Equity),
            Some(dec("351.0"))
        );
        assert_eq!(
            estimate(&q, OrderType::Market, Some(&limit), Some(&last), InstrumentType::Equity),
            Some(dec("360"))
        );
        assert_eq!(
            estimate(&q, OrderType::Market, None, Some(&dec("1.25")), InstrumentType::Option),
            Some(dec("250"))
        );
        assert_eq!(estimate(&q, OrderType::Market, None, None, InstrumentType::Equity), None);
    }

    #[test]
    fn confirming_symbol_fetches_quote_and_moves_on() {
        let (mut view, tag) = ticket("aapl");
        assert_eq!(view.symbol(), Some("AAPL"));
        assert_eq!(view.field(), Field::Side);
        assert!(view.on_quotes(tag, Ok(vec![quote("AAPL", Some("180"))])));
        assert!(view.quote.data().is_some());
    }

    #[test]
    fn editing_symbol_drops_quote_and_tag() {
        let (mut view, tag) = ticket("AAPL");
        view.handle_key(code(KeyCode::BackTab), &account_ctx());
        assert_eq!(view.field(), Field::Symbol);
        view.handle_key(code(KeyCode::Backspace), &account_ctx());
        assert_eq!(view.symbol(), None);
        assert!(!view.on_quotes(tag, Ok(vec![quote("AAPL", Some("180"))])));
        assert!(view.quote.data().is_none());
    }

    #[test]
    fn limit_field_only_in_cycle_for_limit_orders() {
        let (mut view, _) = ticket("AAPL");
        let ctx = account_ctx();
        view.handle_key(code(KeyCode::Tab), &ctx);
        assert_eq!(view.field(), Field::OrderType);
        view.handle_key(code(KeyCode::Tab), &ctx);
        view.handle_key(code(KeyCode::Tab), &ctx);
        assert_eq!(view.field(), Field::Symbol);

        view.handle_key(code(KeyCode::Tab), &ctx);
        view.handle_key(code(KeyCode::Tab), &ctx);
        view.handle_key(code(KeyCode::Right), &ctx);
        view.handle_key(code(KeyCode::Tab), &ctx);
        view.handle_key(code(KeyCode::Tab), &ctx);
        assert_eq!(view.field(), Field::LimitPrice);
    }

    #[test]
    fn invalid_ticket_is_blocked_with_reason() {
        let (mut view, _) = ticket("AAPL");
        let ctx = account_ctx();
        view.handle_key(code(KeyCode::Tab), &ctx);
        view.handle_key(code(KeyCode::Tab), &ctx);
        let out = view.handle_key(code(KeyCode::Enter), &ctx);
        assert!(out.command.is_none());
        assert!(view.take_message().unwrap().contains("quantity"));
        assert_eq!(view.phase, Phase::Form);
    }

    #[test]
    fn confirm_then_place_then_success() {
        let (mut view, _) = ticket("AAPL");
        let ctx = account_ctx();
        view.handle_key(code(KeyCode::Tab), &ctx);
        view.handle_key(code(KeyCode::Tab), &ctx);
        typed(&mut view, "10");
        view.handle_key(code(KeyCode::Enter), &ctx);
        assert_eq!(view.phase, Phase::Confirm);
        assert!(view.is_exclusive());

        view.handle_key(ch('n'), &ctx);
        assert_eq!(view.phase, Phase::Form);
        view.handle_key(code(KeyCode::Enter), &ctx);

        let out = view.handle_key(ch('y'), &ctx);
        let tag = match out.command {
            Some(Command::PlaceOrder { order, tag, .. }) => {
                assert_eq!(order.instrument.symbol, "AAPL");
                assert_eq!(order.quantity, Some(dec("10")));
                assert_eq!(order.limit_price, None);
                assert_eq!(order.open_close_indicator, None);
                tag
            }
            other => panic!("unexpected {other:?}"),
        };
        assert!(view.is_submitting());

        let id = view.on_order(tag, Ok(PlaceOrderResponse { order_id: "srv-1".into() }));
        assert_eq!(id.as_deref(), Some("srv-1"));
        assert!(!view.is_submitting());
        assert_eq!(view.last_result, Some(Ok("srv-1".into())));
    }

    #[test]
    fn option_symbols_are_sent_as_opening_orders() {
        let ctx = account_ctx();
        let mut view = TradeView::new();
        view.prefill("AAPL250117C00175000", InstrumentType::Option, &ctx);
        view.handle_key(code(KeyCode::Tab), &ctx);
        view.handle_key(code(KeyCode::Tab), &ctx);
        typed(&mut view, "1");
        view.handle_key(code(KeyCode::Enter), &ctx);
        match view.handle_key(code(KeyCode::Enter), &ctx).command {
            Some(Command::PlaceOrder { order, .. }) => {
                assert_eq!(order.instrument.kind, InstrumentType::Option);
                assert!(order.open_close_indicator.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn positive_quantities_are_valid(whole in 1u32..1_000_000, frac in 0u32..100) {
            let qty = format!("{whole}.{frac:02}");
            prop_assert!(valid(Some("SPY"), &qty, OrderType::Market, ""));
            prop_assert!(!valid(Some("SPY"), &qty, OrderType::Limit, ""));
            prop_assert!(valid(Some("SPY"), &qty, OrderType::Limit, &qty));
        }

        #[test]
        fn non_positive_quantities_are_rejected(n in -1_000_000i64..=0) {
            prop_assert!(!valid(Some("SPY"), &n.to_string(), OrderType::Market, ""));
        }
    }
}
