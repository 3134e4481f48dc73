use broker_client::models::{Order, Portfolio};
use broker_client::ApiError;
use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Style},
    widgets::{Cell, Row},
    Frame,
};

use super::widgets::{money, qty, render_status, windowed_table};
use super::{KeyOutcome, Screen, ViewAction, ViewContext};
use crate::app::commands::Command;
use crate::app::state::{ConfirmKind, ListCursor, LoadState, RequestTracker, ViewKind};
use crate::keys::{is_confirm, is_deny, is_down, is_up, plain_char};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Normal,
    Canceling(String),
}

#[derive(Debug)]
pub struct OrdersView {
    state: LoadState<Vec<Order>>,
    tracker: RequestTracker,
    cursor: ListCursor,
    mode: Mode,
    pending_cancels: usize,
    stale: bool,
    message: Option<String>,
}

impl Default for OrdersView {
    fn default() -> Self {
        Self {
            state: LoadState::Idle,
            tracker: RequestTracker::default(),
            cursor: ListCursor::default(),
            mode: Mode::Normal,
            pending_cancels: 0,
            stale: false,
            message: None,
        }
    }
}

impl OrdersView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> &[Order] {
        self.state.data().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cancels_in_flight(&self) -> bool {
        self.pending_cancels > 0
    }

    /// Forces a refetch the next time the view is activated.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub fn on_result(&mut self, tag: u64, result: Result<Portfolio, ApiError>) -> bool {
        if !self.tracker.accept(tag) {
            return false;
        }
        self.state.finish(result.map(|p| p.orders));
        self.cursor.clamp(self.orders().len());
        true
    }

    /// Refetches once the last outstanding cancel has reported back.
    pub fn on_cancelled(
        &mut self,
        order_id: &str,
        result: Result<(), ApiError>,
        ctx: &ViewContext,
    ) -> Option<Command> {
        self.pending_cancels = self.pending_cancels.saturating_sub(1);
        self.message = Some(match result {
            Ok(()) => format!("cancel requested for {order_id}"),
            Err(e) => format!("cancel of {order_id} failed: {e}"),
        });
        if self.pending_cancels == 0 {
            self.refresh(ctx)
        } else {
            None
        }
    }

    pub fn cancellable_count(&self) -> usize {
        self.orders().iter().filter(|o| o.status.is_cancellable()).count()
    }

    /// Cancels every working order after the dispatcher's confirmation.
    pub fn cancel_all(&mut self, ctx: &ViewContext) -> Option<Command> {
        let account = ctx.account.clone()?;
        let ids: Vec<String> = self
            .orders()
            .iter()
            .filter(|o| o.status.is_cancellable())
            .map(|o| o.order_id.clone())
            .collect();
        if ids.is_empty() {
            return None;
        }
        if let Some(orders) = self.state.data_mut() {
            orders.retain(|o| !ids.contains(&o.order_id));
        }
        self.cursor.clamp(self.orders().len());
        self.pending_cancels += ids.len();
        self.message = Some(format!("cancelling {} orders", ids.len()));
        Some(Command::Batch(
            ids.into_iter()
                .map(|order_id| Command::CancelOrder {
                    account: account.clone(),
                    order_id,
                })
                .collect(),
        ))
    }

    fn confirm_cancel(&mut self, order_id: String, ctx: &ViewContext) -> KeyOutcome {
        let Some(account) = ctx.account.clone() else {
            return KeyOutcome::consumed();
        };
        if let Some(orders) = self.state.data_mut() {
            orders.retain(|o| o.order_id != order_id);
        }
        self.cursor.clamp(self.orders().len());
        self.pending_cancels += 1;
        KeyOutcome::command(Some(Command::CancelOrder { account, order_id }))
    }
}

impl Screen for OrdersView {
    fn kind(&self) -> ViewKind {
        ViewKind::Orders
    }

    fn handle_key(&mut self, key: KeyEvent, ctx: &ViewContext) -> KeyOutcome {
        if let Mode::Canceling(order_id) = std::mem::replace(&mut self.mode, Mode::Normal) {
            if is_confirm(&key) {
                return self.confirm_cancel(order_id, ctx);
            }
            if !is_deny(&key) {
                self.mode = Mode::Canceling(order_id);
            }
            return KeyOutcome::consumed();
        }

        if is_up(&key) {
            self.cursor.up();
            return KeyOutcome::consumed();
        }
        if is_down(&key) {
            self.cursor.down(self.orders().len());
            return KeyOutcome::consumed();
        }
        match plain_char(&key) {
            Some('c' | 'x' | 'd') => {
                let selected = self
                    .orders()
                    .get(self.cursor.index)
                    .map(|o| (o.order_id.clone(), o.status));
                match selected {
                    Some((id, status)) if status.is_cancellable() => {
                        self.mode = Mode::Canceling(id);
                    }
                    Some((id, status)) => {
                        self.message = Some(format!("{id} is {status} and cannot be cancelled"));
                    }
                    None => {}
                }
                KeyOutcome::consumed()
            }
            Some('X') => match self.cancellable_count() {
                0 => {
                    self.message = Some("no open orders to cancel".to_string());
                    KeyOutcome::consumed()
                }
                n => KeyOutcome::action(ViewAction::Confirm {
                    kind: ConfirmKind::CancelAll,
                    prompt: format!("Cancel all {n} open orders?"),
                }),
            },
            _ => KeyOutcome::ignored(),
        }
    }

    fn refresh(&mut self, ctx: &ViewContext) -> Option<Command> {
        let account = ctx.account.clone()?;
        self.stale = false;
        self.state.begin();
        Some(Command::FetchOrders {
            account,
            tag: self.tracker.issue(),
        })
    }

    fn is_exclusive(&self) -> bool {
        matches!(self.mode, Mode::Canceling(_))
    }

    fn is_fetching(&self) -> bool {
        self.tracker.in_flight()
    }

    fn has_loaded(&self) -> bool {
        !self.stale && !matches!(self.state, LoadState::Idle)
    }

    fn reset(&mut self) {
        self.state = LoadState::Idle;
        self.tracker.cancel();
        self.cursor.reset();
        self.mode = Mode::Normal;
        self.stale = false;
    }

    fn set_visible_rows(&mut self, rows: usize) {
        self.cursor.set_height(rows);
    }

    fn chrome_rows(&self) -> u16 {
        3
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        if self.state.data().is_none() {
            render_status(frame, area, "Orders", &self.state, "No account selected.");
            return;
        }
        let rows: Vec<Row> = self
            .orders()
            .iter()
            .map(|o| {
                let status_style = if o.status.is_cancellable() {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                Row::new(vec![
                    Cell::from(o.instrument.symbol.clone()),
                    Cell::from(o.side.to_string()),
                    Cell::from(o.order_type.to_string()),
                    Cell::from(qty(o.quantity.as_ref())),
                    Cell::from(qty(o.filled_quantity.as_ref())),
                    Cell::from(money(o.limit_price.as_ref().or(o.stop_price.as_ref()))),
                    Cell::from(o.status.to_string()).style(status_style),
                    Cell::from(
                        o.created_at
                            .map(|t| t.format("%m-%d %H:%M").to_string())
                            .unwrap_or_default(),
                    ),
                ])
            })
            .collect();
        let title = match &self.mode {
            Mode::Canceling(id) => format!("Cancel order {id}? (y/n)"),
            Mode::Normal if self.state.is_loading() => "Orders (refreshing)".to_string(),
            Mode::Normal => format!("Orders · {} open", self.cancellable_count()),
        };
        let table = windowed_table(
            &title,
            vec!["Symbol", "Side", "Type", "Qty", "Filled", "Price", "Status", "Created"],
            vec![
                Constraint::Min(20),
                Constraint::Length(5),
                Constraint::Length(11),
                Constraint::Length(8),
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Length(17),
                Constraint::Length(12),
            ],
            rows,
            &self.cursor,
            true,
        );
        frame.render_widget(table, area);
    }

    fn hints(&self) -> &'static str {
        match self.mode {
            Mode::Normal => "c cancel · X cancel all · r refresh",
            Mode::Canceling(_) => "y confirm cancel · n keep order",
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
    use crate::views::testing::{account_ctx, sample_portfolio};
    use crossterm::event::KeyCode;

    fn loaded() -> OrdersView {
        let mut view = OrdersView::new();
        let tag = match view.refresh(&account_ctx()) {
            Some(Command::FetchOrders { tag, .. }) => tag,
            other => panic!("unexpected {other:?}"),
        };
        assert!(view.on_result(tag, Ok(sample_portfolio())));
        view
    }

    #[test]
    fn cancel_removes_optimistically_then_refetches() {
        let ctx = account_ctx();
        let mut view = loaded();
        view.handle_key(ch('c'), &ctx);
        assert!(view.is_exclusive());
        let out = view.handle_key(code(KeyCode::Enter), &ctx);
        assert_eq!(
            out.command,
            Some(Command::CancelOrder {
                account: "ACC1".into(),
                order_id: "o-1".into(),
            })
        );
        assert_eq!(view.orders().len(), 2);
        assert!(view.cancels_in_flight());

        let next = view.on_cancelled("o-1", Ok(()), &ctx);
        assert!(matches!(next, Some(Command::FetchOrders { .. })));
        assert!(!view.cancels_in_flight());
    }

    #[test]
    fn finished_orders_cannot_be_cancelled() {
        let ctx = account_ctx();
        let mut view = loaded();
        view.handle_key(ch('j'), &ctx);
        let out = view.handle_key(ch('x'), &ctx);
        assert!(out.consumed);
        assert!(!view.is_exclusive());
        assert!(view.take_message().unwrap().contains("cannot be cancelled"));
    }

    #[test]
    fn deny_keeps_the_order() {
        let ctx = account_ctx();
        let mut view = loaded();
        view.handle_key(ch('d'), &ctx);
        let out = view.handle_key(code(KeyCode::Esc), &ctx);
        assert!(out.consumed);
        assert_eq!(out.command, None);
        assert_eq!(view.orders().len(), 3);
    }

    #[test]
    fn cancel_all_asks_then_batches_working_orders() {
        let ctx = account_ctx();
        let mut view = loaded();
        let out = view.handle_key(ch('X'), &ctx);
        assert!(matches!(
            out.action,
            Some(ViewAction::Confirm { kind: ConfirmKind::CancelAll, .. })
        ));

        let cmd = view.cancel_all(&ctx).unwrap();
        assert_eq!(cmd.flatten().len(), 2);
        assert_eq!(view.orders().len(), 1);
        assert!(view.on_cancelled("o-1", Ok(()), &ctx).is_none());
        assert!(view.on_cancelled("o-3", Err(ApiError::Transport("x".into())), &ctx).is_some());
    }

    #[test]
    fn stale_view_reports_not_loaded() {
        let mut view = loaded();
        assert!(view.has_loaded());
        view.mark_stale();
        assert!(!view.has_loaded());
        view.refresh(&account_ctx());
        assert!(view.has_loaded());
    }
}
