use broker_client::models::{Portfolio, Position};
use broker_client::ApiError;
use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row},
    Frame,
};

use super::widgets::{
    block, gain_style, money, percent, qty, render_status, signed_money, windowed_table,
};
use super::{Holding, KeyOutcome, Screen, ViewAction, ViewContext};
use crate::app::commands::Command;
use crate::app::state::{ListCursor, LoadState, RequestTracker, ViewKind};
use crate::keys::{is_char, is_down, is_up};

const SUMMARY_ROWS: u16 = 3;

#[derive(Debug, Default)]
pub struct PortfolioView {
    state: LoadState<Portfolio>,
    tracker: RequestTracker,
    cursor: ListCursor,
}

impl PortfolioView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn portfolio(&self) -> Option<&Portfolio> {
        self.state.data()
    }

    pub fn holdings(&self) -> Vec<Holding> {
        self.portfolio()
            .map(|p| {
                p.positions
                    .iter()
                    .map(|pos| Holding {
                        symbol: pos.symbol().to_string(),
                        instrument_type: pos.instrument.kind,
                        last: pos.last().cloned(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn on_result(&mut self, tag: u64, result: Result<Portfolio, ApiError>) -> bool {
        if !self.tracker.accept(tag) {
            return false;
        }
        self.state.finish(result);
        let len = self.positions().len();
        self.cursor.clamp(len);
        true
    }

    fn positions(&self) -> &[Position] {
        self.portfolio().map(|p| p.positions.as_slice()).unwrap_or(&[])
    }

    fn selected(&self) -> Option<&Position> {
        self.positions().get(self.cursor.index)
    }
}

impl Screen for PortfolioView {
    fn kind(&self) -> ViewKind {
        ViewKind::Portfolio
    }

    fn handle_key(&mut self, key: KeyEvent, _ctx: &ViewContext) -> KeyOutcome {
        if is_up(&key) {
            self.cursor.up();
            return KeyOutcome::consumed();
        }
        if is_down(&key) {
            let len = self.positions().len();
            self.cursor.down(len);
            return KeyOutcome::consumed();
        }
        if is_char(&key, 't') {
            return match self.selected() {
                Some(pos) => KeyOutcome::action(ViewAction::OpenTrade {
                    symbol: pos.symbol().to_string(),
                    instrument_type: pos.instrument.kind,
                }),
                None => KeyOutcome::consumed(),
            };
        }
        KeyOutcome::ignored()
    }

    fn refresh(&mut self, ctx: &ViewContext) -> Option<Command> {
        let account = ctx.account.clone()?;
        self.state.begin();
        Some(Command::FetchPortfolio {
            account,
            tag: self.tracker.issue(),
        })
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
    }

    fn set_visible_rows(&mut self, rows: usize) {
        self.cursor.set_height(rows);
    }

    fn chrome_rows(&self) -> u16 {
        SUMMARY_ROWS + 3
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let Some(portfolio) = self.portfolio() else {
            render_status(frame, area, "Portfolio", &self.state, "No account selected.");
            return;
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(SUMMARY_ROWS), Constraint::Min(3)])
            .split(area);

        let bp = &portfolio.buying_power;
        let summary = Line::from(vec![
            Span::raw(format!("Equity {}", money(Some(&portfolio.total_equity())))),
            Span::raw(format!("  ·  Buying power {}", money(bp.buying_power.as_ref()))),
            Span::raw(format!(
                "  ·  Options BP {}",
                money(bp.options_buying_power.as_ref())
            )),
            Span::raw(format!(
                "  ·  Cash {}",
                money(bp.cash_only_buying_power.as_ref())
            )),
        ]);
        let title = match (&self.state, &portfolio.account_type) {
            (LoadState::Loading(_), _) => format!("{} (refreshing)", portfolio.account_id),
            (_, Some(kind)) => format!("{} · {kind}", portfolio.account_id),
            _ => portfolio.account_id.to_string(),
        };
        frame.render_widget(Paragraph::new(summary).block(block(&title)), chunks[0]);

        let rows: Vec<Row> = portfolio
            .positions
            .iter()
            .map(|p| {
                let day = p.position_daily_gain.as_ref().map(|g| &g.gain_value);
                let total = p
                    .instrument_gain
                    .as_ref()
                    .map(|g| &g.gain_value)
                    .or_else(|| p.cost_basis.as_ref().and_then(|c| c.gain_value.as_ref()));
                Row::new(vec![
                    Cell::from(p.symbol().to_string()),
                    Cell::from(qty(Some(&p.quantity))),
                    Cell::from(money(p.last())),
                    Cell::from(money(p.current_value.as_ref())),
                    Cell::from(signed_money(day)).style(gain_style(day)),
                    Cell::from(signed_money(total)).style(gain_style(total)),
                    Cell::from(percent(p.percent_of_portfolio.as_ref())),
                ])
            })
            .collect();
        let table = windowed_table(
            "Positions",
            vec!["Symbol", "Qty", "Last", "Value", "Day", "Total", "% Port"],
            vec![
                Constraint::Min(22),
                Constraint::Length(10),
                Constraint::Length(11),
                Constraint::Length(12),
                Constraint::Length(11),
                Constraint::Length(11),
                Constraint::Length(8),
            ],
            rows,
            &self.cursor,
            true,
        );
        frame.render_widget(table, chunks[1]);
    }

    fn hints(&self) -> &'static str {
        "j/k move · t trade · r refresh"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::ch;
    use crate::views::testing::{account_ctx, sample_portfolio};
    use broker_client::models::InstrumentType;

    #[test]
    fn refresh_needs_an_account() {
        let mut view = PortfolioView::new();
        assert_eq!(view.refresh(&ViewContext::default()), None);
        assert!(!view.has_loaded());

        let cmd = view.refresh(&account_ctx()).unwrap();
        assert!(matches!(cmd, Command::FetchPortfolio { tag: 1, .. }));
        assert!(view.is_fetching());
        assert!(view.has_loaded());
    }

    #[test]
    fn only_latest_result_is_applied() {
        let mut view = PortfolioView::new();
        view.refresh(&account_ctx());
        view.refresh(&account_ctx());
        assert!(!view.on_result(1, Ok(sample_portfolio())));
        assert!(view.portfolio().is_none());
        assert!(view.on_result(2, Ok(sample_portfolio())));
        assert_eq!(view.holdings().len(), 2);
    }

    #[test]
    fn trade_key_opens_ticket_for_selected_position() {
        let mut view = PortfolioView::new();
        view.refresh(&account_ctx());
        view.on_result(1, Ok(sample_portfolio()));
        view.handle_key(ch('j'), &account_ctx());
        let out = view.handle_key(ch('t'), &account_ctx());
        assert_eq!(
            out.action,
            Some(ViewAction::OpenTrade {
                symbol: "AAPL250117C00175000".into(),
                instrument_type: InstrumentType::Option,
            })
        );
    }

    #[test]
    fn failed_fetch_keeps_error() {
        let mut view = PortfolioView::new();
        view.refresh(&account_ctx());
        view.on_result(1, Err(ApiError::Transport("timeout".into())));
        assert!(!view.is_fetching());
        assert!(view.portfolio().is_none());
        assert!(matches!(view.state, LoadState::Error(_)));
    }
}
