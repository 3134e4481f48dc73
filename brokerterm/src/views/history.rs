use broker_client::models::{HistoryPage, Transaction};
use broker_client::ApiError;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Rect},
    widgets::{Cell, Clear, Row},
    Frame,
};

use super::widgets::{
    centered, gain_style, money, qty, render_status, render_text, signed_money, windowed_table,
};
use super::{KeyOutcome, Screen, ViewContext};
use crate::app::commands::Command;
use crate::app::state::{ListCursor, LoadState, RequestTracker, ViewKind};
use crate::keys::{is_char, is_down, is_up};

#[derive(Debug, Default)]
pub struct HistoryView {
    state: LoadState<HistoryPage>,
    tracker: RequestTracker,
    cursor: ListCursor,
    detail: bool,
}

impl HistoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.state
            .data()
            .map(|p| p.transactions.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_more(&self) -> bool {
        self.state.data().is_some_and(HistoryPage::has_more)
    }

    pub fn on_result(
        &mut self,
        tag: u64,
        append: bool,
        result: Result<HistoryPage, ApiError>,
    ) -> bool {
        if !self.tracker.accept(tag) {
            return false;
        }
        match result {
            Ok(page) if append && self.state.data().is_some() => {
                if let Some(existing) = self.state.data_mut() {
                    existing.transactions.extend(page.transactions);
                    existing.next_token = page.next_token;
                }
            }
            result => self.state.finish(result),
        }
        self.cursor.clamp(self.transactions().len());
        true
    }

    fn load_more(&mut self, ctx: &ViewContext) -> Option<Command> {
        if self.tracker.in_flight() {
            return None;
        }
        let account = ctx.account.clone()?;
        let next_token = self.state.data()?.next_token.clone().filter(|t| !t.is_empty())?;
        Some(Command::FetchHistory {
            account,
            page_size: ctx.history_page_size,
            next_token: Some(next_token),
            tag: self.tracker.issue(),
        })
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, t: &Transaction) {
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        let text = format!(
            "Id           {}\nTime         {}\nType         {} {}\nSymbol       {} ({})\nSide         {}\nQuantity     {}\nPrincipal    {}\nFees         {}\nNet amount   {}\nDirection    {}\n\n{}",
            t.id,
            t.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            t.kind,
            opt(&t.sub_type),
            opt(&t.symbol),
            opt(&t.security_type),
            opt(&t.side),
            qty(t.quantity.as_ref()),
            money(t.principal_amount.as_ref()),
            money(t.fees.as_ref()),
            signed_money(t.net_amount.as_ref()),
            opt(&t.direction),
            opt(&t.description),
        );
        let popup = centered(area, 70, 16);
        frame.render_widget(Clear, popup);
        render_text(frame, popup, "Transaction", &text);
    }
}

impl Screen for HistoryView {
    fn kind(&self) -> ViewKind {
        ViewKind::History
    }

    fn handle_key(&mut self, key: KeyEvent, ctx: &ViewContext) -> KeyOutcome {
        if self.detail {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.detail = false;
            }
            return KeyOutcome::consumed();
        }
        let len = self.transactions().len();
        if is_up(&key) {
            self.cursor.up();
            return KeyOutcome::consumed();
        }
        if is_down(&key) {
            if self.cursor.at_end(len) && self.has_more() {
                return KeyOutcome::command(self.load_more(ctx));
            }
            self.cursor.down(len);
            return KeyOutcome::consumed();
        }
        if is_char(&key, 'm') {
            return KeyOutcome::command(self.load_more(ctx));
        }
        if key.code == KeyCode::Enter && len > 0 {
            self.detail = true;
            return KeyOutcome::consumed();
        }
        KeyOutcome::ignored()
    }

    fn refresh(&mut self, ctx: &ViewContext) -> Option<Command> {
        let account = ctx.account.clone()?;
        self.state.begin();
        Some(Command::FetchHistory {
            account,
            page_size: ctx.history_page_size,
            next_token: None,
            tag: self.tracker.issue(),
        })
    }

    fn on_timer(&mut self, _ctx: &ViewContext) -> Option<Command> {
        None
    }

    fn is_exclusive(&self) -> bool {
        self.detail
    }

    fn is_fetching(&self) -> bool {
        self.tracker.in_flight()
    }

    fn has_loaded(&self) -> bool {
        !matches!(self.state, LoadState::Idle)
    }

    fn reset(&mut self) {
        self.state = LoadState::Idle;
        self.tracker.cancel();
        self.cursor.reset();
        self.detail = false;
    }

    fn set_visible_rows(&mut self, rows: usize) {
        self.cursor.set_height(rows);
    }

    fn chrome_rows(&self) -> u16 {
        3
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        if self.state.data().is_none() {
            render_status(frame, area, "History", &self.state, "No account selected.");
            return;
        }
        let rows: Vec<Row> = self
            .transactions()
            .iter()
            .map(|t| {
                Row::new(vec![
                    Cell::from(t.timestamp.format("%Y-%m-%d").to_string()),
                    Cell::from(t.kind.clone()),
                    Cell::from(t.symbol.clone().unwrap_or_default()),
                    Cell::from(t.side.clone().unwrap_or_default()),
                    Cell::from(qty(t.quantity.as_ref())),
                    Cell::from(signed_money(t.net_amount.as_ref())).style(gain_style(t.net_amount.as_ref())),
                    Cell::from(t.description.clone().unwrap_or_default()),
                ])
            })
            .collect();
        let title = match (self.state.is_loading(), self.tracker.in_flight(), self.has_more()) {
            (true, _, _) => "History (refreshing)".to_string(),
            (_, true, _) => "History (loading more…)".to_string(),
            (_, _, true) => format!("History · {} rows · m for more", rows.len()),
            _ => format!("History · {} rows", rows.len()),
        };
        let table = windowed_table(
            &title,
            vec!["Date", "Type", "Symbol", "Side", "Qty", "Net", "Description"],
            vec![
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(20),
                Constraint::Length(5),
                Constraint::Length(8),
                Constraint::Length(12),
                Constraint::Min(10),
            ],
            rows,
            &self.cursor,
            true,
        );
        frame.render_widget(table, area);

        if self.detail {
            if let Some(t) = self.transactions().get(self.cursor.index) {
                self.render_detail(frame, area, t);
            }
        }
    }

    fn hints(&self) -> &'static str {
        if self.detail {
            "esc/enter close"
        } else {
            "enter details · m more · r refresh"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{ch, code};
    use crate::views::testing::account_ctx;

    fn page(ids: &[&str], next: Option<&str>) -> HistoryPage {
        let transactions = ids
            .iter()
            .map(|id| {
                serde_json::from_value(serde_json::json!({
                    "timestamp": "2024-03-01T15:30:00Z",
                    "id": id,
                    "type": "TRADE",
                    "symbol": "AAPL",
                    "netAmount": "-1800.00"
                }))
                .unwrap()
            })
            .collect();
        HistoryPage {
            transactions,
            next_token: next.map(str::to_string),
            page_size: Some(50),
        }
    }

    fn loaded(next: Option<&str>) -> HistoryView {
        let mut view = HistoryView::new();
        let cmd = view.refresh(&account_ctx());
        let tag = match cmd {
            Some(Command::FetchHistory {
                page_size: 50,
                next_token: None,
                tag,
                ..
            }) => tag,
            other => panic!("unexpected {other:?}"),
        };
        assert!(view.on_result(tag, false, Ok(page(&["t1", "t2"], next))));
        view
    }

    #[test]
    fn more_key_appends_and_keeps_cursor() {
        let ctx = account_ctx();
        let mut view = loaded(Some("tok-2"));
        assert!(view.has_more());
        view.handle_key(ch('j'), &ctx);
        let tag = match view.handle_key(ch('m'), &ctx).command {
            Some(Command::FetchHistory {
                next_token: Some(t),
                tag,
                ..
            }) => {
                assert_eq!(t, "tok-2");
                tag
            }
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(view.handle_key(ch('m'), &ctx).command, None);

        assert!(view.on_result(tag, true, Ok(page(&["t3"], None))));
        assert_eq!(view.transactions().len(), 3);
        assert_eq!(view.cursor.index, 1);
        assert!(!view.has_more());
        assert_eq!(view.handle_key(ch('m'), &ctx).command, None);
    }

    #[test]
    fn moving_past_last_row_fetches_next_page() {
        let ctx = account_ctx();
        let mut view = loaded(Some("tok-2"));
        view.handle_key(code(KeyCode::Down), &ctx);
        let out = view.handle_key(code(KeyCode::Down), &ctx);
        assert!(matches!(out.command, Some(Command::FetchHistory { next_token: Some(_), .. })));
    }

    #[test]
    fn failed_append_moves_to_error() {
        let ctx = account_ctx();
        let mut view = loaded(Some("tok-2"));
        let tag = match view.handle_key(ch('m'), &ctx).command {
            Some(Command::FetchHistory { tag, .. }) => tag,
            other => panic!("unexpected {other:?}"),
        };
        view.on_result(tag, true, Err(ApiError::Transport("reset".into())));
        assert!(view.state.error().is_some());
        assert!(view.transactions().is_empty());
    }

    #[test]
    fn detail_panel_is_exclusive() {
        let ctx = account_ctx();
        let mut view = loaded(None);
        view.handle_key(code(KeyCode::Enter), &ctx);
        assert!(view.is_exclusive());
        assert!(view.handle_key(ch('q'), &ctx).consumed);
        view.handle_key(code(KeyCode::Esc), &ctx);
        assert!(!view.is_exclusive());
        assert_eq!(view.on_timer(&ctx), None);
    }
}
