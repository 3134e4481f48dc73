use broker_client::models::{Account, AccountId};
use crossterm::event::{KeyCode, KeyEvent};
use std::time::Duration;

use super::commands::Command;
use super::event::*;
use super::state::*;
use crate::keys::{is_char, is_confirm, is_ctrl, is_deny, is_down, is_up, plain_char};
use crate::views::history::HistoryView;
use crate::views::options::OptionsView;
use crate::views::orders::OrdersView;
use crate::views::portfolio::PortfolioView;
use crate::views::trade::TradeView;
use crate::views::watchlist::WatchlistView;
use crate::views::{KeyOutcome, Screen, ViewAction, ViewContext};

const ACCOUNT_SWITCH_BLOCKED: &str = "wait for pending order requests before switching accounts";

/// Owns every view and decides where each event goes.
pub struct Dispatcher {
    ctx: AppContext,
    active: ViewKind,
    focus: FocusScope,
    modal: Modal,
    status: Option<String>,
    quit: bool,
    portfolio: PortfolioView,
    watchlist: WatchlistView,
    orders: OrdersView,
    trade: TradeView,
    options: OptionsView,
    history: HistoryView,
}

impl Dispatcher {
    pub fn new(account: Option<AccountId>, watchlist: Vec<String>, refresh_interval: Duration) -> Self {
        Self {
            ctx: AppContext::new(account, refresh_interval),
            active: ViewKind::Portfolio,
            focus: FocusScope::Content,
            modal: Modal::None,
            status: None,
            quit: false,
            portfolio: PortfolioView::new(),
            watchlist: WatchlistView::new(watchlist),
            orders: OrdersView::new(),
            trade: TradeView::new(),
            options: OptionsView::new(),
            history: HistoryView::new(),
        }
    }

    /// Commands to run once the event loop is up.
    pub fn init(&mut self) -> Vec<Command> {
        self.ctx.accounts.begin();
        let mut cmds = vec![
            Command::FetchAccounts,
            Command::ScheduleRefresh(self.ctx.refresh_interval),
        ];
        cmds.extend(self.refresh_active());
        cmds
    }

    pub fn reduce(&mut self, ev: AppEvent) -> Vec<Command> {
        let cmds = match ev {
            AppEvent::Key(key) => self.reduce_key(key),
            AppEvent::Resize { height, .. } => {
                self.resize(height);
                Vec::new()
            }
            AppEvent::Api(api) => self.reduce_api(api),
            AppEvent::Timer(t) => self.reduce_timer(t),
        };
        self.collect_messages();
        cmds
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn active(&self) -> ViewKind {
        self.active
    }

    pub fn focus(&self) -> FocusScope {
        self.focus
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn account(&self) -> Option<&AccountId> {
        self.ctx.account.as_ref()
    }

    pub fn accounts(&self) -> &[Account] {
        self.ctx.accounts.data().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn watchlist_symbols(&self) -> &[String] {
        self.watchlist.symbols()
    }

    pub fn screen(&self, kind: ViewKind) -> &dyn Screen {
        match kind {
            ViewKind::Portfolio => &self.portfolio,
            ViewKind::Watchlist => &self.watchlist,
            ViewKind::Orders => &self.orders,
            ViewKind::Trade => &self.trade,
            ViewKind::Options => &self.options,
            ViewKind::History => &self.history,
        }
    }

    fn screen_mut(&mut self, kind: ViewKind) -> &mut dyn Screen {
        match kind {
            ViewKind::Portfolio => &mut self.portfolio,
            ViewKind::Watchlist => &mut self.watchlist,
            ViewKind::Orders => &mut self.orders,
            ViewKind::Trade => &mut self.trade,
            ViewKind::Options => &mut self.options,
            ViewKind::History => &mut self.history,
        }
    }

    fn view_ctx(&self) -> ViewContext {
        ViewContext {
            account: self.ctx.account.clone(),
            watchlist: self.watchlist.items(),
            holdings: self.portfolio.holdings(),
            history_page_size: self.ctx.history_page_size,
        }
    }

    fn collect_messages(&mut self) {
        for kind in ViewKind::ALL {
            if let Some(msg) = self.screen_mut(kind).take_message() {
                self.status = Some(msg);
            }
        }
    }

    // ---- keys ----

    fn reduce_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if self.modal.is_open() {
            return self.reduce_modal_key(key);
        }
        if is_ctrl(&key, 'c') {
            tracing::info!(target: "dispatcher", "interrupt");
            self.quit = true;
            return Vec::new();
        }
        if self.focus == FocusScope::Content && self.screen(self.active).is_exclusive() {
            let ctx = self.view_ctx();
            let out = self.screen_mut(self.active).handle_key(key, &ctx);
            if !out.consumed && key.code == KeyCode::Esc {
                self.focus = FocusScope::Toolbar;
            }
            return self.apply_outcome(out);
        }
        match self.focus {
            FocusScope::Toolbar => self.reduce_toolbar_key(key),
            FocusScope::Content => self.reduce_content_key(key),
        }
    }

    fn reduce_toolbar_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Left | KeyCode::BackTab => return self.switch_to(self.active.prev()),
            KeyCode::Right | KeyCode::Tab => return self.switch_to(self.active.next()),
            KeyCode::Enter | KeyCode::Down => {
                self.focus = FocusScope::Content;
                return Vec::new();
            }
            _ => {}
        }
        match plain_char(&key) {
            Some('h') => self.switch_to(self.active.prev()),
            Some('l') => self.switch_to(self.active.next()),
            Some('j') => {
                self.focus = FocusScope::Content;
                Vec::new()
            }
            Some('q') => self.request_quit(),
            Some('r') => self.refresh_active(),
            Some('a') => self.open_account_picker(),
            Some(c) => match ViewKind::from_digit(c) {
                Some(kind) => self.switch_to(kind),
                None => Vec::new(),
            },
            None => Vec::new(),
        }
    }

    fn reduce_content_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if key.code == KeyCode::Esc {
            self.focus = FocusScope::Toolbar;
            return Vec::new();
        }
        match plain_char(&key) {
            Some('q') => return self.request_quit(),
            Some('r') => return self.refresh_active(),
            Some(c) => {
                if let Some(kind) = ViewKind::from_digit(c) {
                    return self.switch_to(kind);
                }
            }
            None => {}
        }
        let ctx = self.view_ctx();
        let out = self.screen_mut(self.active).handle_key(key, &ctx);
        if !out.consumed && is_char(&key, 'a') {
            return self.open_account_picker();
        }
        self.apply_outcome(out)
    }

    fn reduce_modal_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match std::mem::take(&mut self.modal) {
            Modal::None => Vec::new(),
            Modal::AccountPicker { mut cursor } => {
                let len = self.accounts().len();
                if is_up(&key) {
                    cursor = cursor.saturating_sub(1);
                } else if is_down(&key) {
                    if cursor + 1 < len {
                        cursor += 1;
                    }
                } else if key.code == KeyCode::Enter {
                    let id = self.accounts().get(cursor).map(|a| a.account_id.clone());
                    return match id {
                        Some(id) => self.select_account(id),
                        None => Vec::new(),
                    };
                } else if key.code == KeyCode::Esc {
                    return Vec::new();
                }
                self.modal = Modal::AccountPicker { cursor };
                Vec::new()
            }
            Modal::Confirmation(req) => {
                if is_confirm(&key) {
                    return self.confirmed(req);
                }
                if !is_deny(&key) {
                    self.modal = Modal::Confirmation(req);
                }
                Vec::new()
            }
        }
    }

    fn confirmed(&mut self, req: ConfirmRequest) -> Vec<Command> {
        match req.kind {
            ConfirmKind::Quit => {
                self.quit = true;
                Vec::new()
            }
            ConfirmKind::CancelAll => {
                let ctx = self.view_ctx();
                self.orders.cancel_all(&ctx).into_iter().collect()
            }
        }
    }

    fn apply_outcome(&mut self, out: KeyOutcome) -> Vec<Command> {
        let mut cmds: Vec<Command> = out.command.into_iter().collect();
        match out.action {
            Some(ViewAction::OpenTrade {
                symbol,
                instrument_type,
            }) => {
                self.active = ViewKind::Trade;
                self.focus = FocusScope::Content;
                let ctx = self.view_ctx();
                cmds.extend(self.trade.prefill(&symbol, instrument_type, &ctx));
            }
            Some(ViewAction::Confirm { kind, prompt }) => {
                self.modal = Modal::Confirmation(ConfirmRequest {
                    origin: self.active,
                    kind,
                    prompt,
                });
            }
            None => {}
        }
        cmds
    }

    fn order_requests_in_flight(&self) -> bool {
        self.trade.is_submitting() || self.orders.cancels_in_flight()
    }

    fn request_quit(&mut self) -> Vec<Command> {
        if self.order_requests_in_flight() {
            self.modal = Modal::Confirmation(ConfirmRequest {
                origin: self.active,
                kind: ConfirmKind::Quit,
                prompt: "An order request is still in flight. Quit anyway?".to_string(),
            });
        } else {
            self.quit = true;
        }
        Vec::new()
    }

    fn open_account_picker(&mut self) -> Vec<Command> {
        if !self.ctx.accounts_loaded() {
            self.status = Some("accounts are not loaded yet".to_string());
            return Vec::new();
        }
        if self.order_requests_in_flight() {
            self.status = Some(ACCOUNT_SWITCH_BLOCKED.to_string());
            return Vec::new();
        }
        let cursor = self
            .ctx
            .account
            .as_ref()
            .and_then(|id| self.accounts().iter().position(|a| &a.account_id == id))
            .unwrap_or(0);
        self.modal = Modal::AccountPicker { cursor };
        Vec::new()
    }

    fn switch_to(&mut self, kind: ViewKind) -> Vec<Command> {
        self.active = kind;
        if self.screen(kind).has_loaded() {
            return Vec::new();
        }
        self.refresh_active()
    }

    fn refresh_active(&mut self) -> Vec<Command> {
        let ctx = self.view_ctx();
        self.screen_mut(self.active).refresh(&ctx).into_iter().collect()
    }

    fn select_account(&mut self, id: AccountId) -> Vec<Command> {
        if self.ctx.account.as_ref() == Some(&id) {
            return Vec::new();
        }
        // replies for the current account's orders would be dropped by the reset
        if self.order_requests_in_flight() {
            self.status = Some(ACCOUNT_SWITCH_BLOCKED.to_string());
            return Vec::new();
        }
        tracing::info!(target: "dispatcher", account = %id, "account selected");
        self.status = Some(format!("account {id} selected"));
        self.ctx.account = Some(id.clone());
        for kind in ViewKind::ALL {
            self.screen_mut(kind).reset();
        }
        let mut cmds = vec![Command::SaveConfig { account: Some(id) }];
        cmds.extend(self.refresh_active());
        cmds
    }

    // ---- results ----

    fn reduce_api(&mut self, ev: ApiEvent) -> Vec<Command> {
        let ctx = self.view_ctx();
        match ev {
            ApiEvent::Accounts(result) => self.accounts_loaded(result),
            ApiEvent::Portfolio { tag, result } => {
                self.portfolio.on_result(tag, result);
                Vec::new()
            }
            ApiEvent::Orders { tag, result } => {
                self.orders.on_result(tag, result);
                Vec::new()
            }
            ApiEvent::Quotes {
                target,
                tag,
                result,
            } => match target {
                QuoteTarget::Watchlist => {
                    self.watchlist.on_quotes(tag, result);
                    Vec::new()
                }
                QuoteTarget::Trade => {
                    self.trade.on_quotes(tag, result);
                    Vec::new()
                }
                QuoteTarget::Underlying => self
                    .options
                    .on_underlying_quote(tag, result, &ctx)
                    .into_iter()
                    .collect(),
            },
            ApiEvent::Instrument {
                owner,
                tag,
                symbol,
                result,
            } => {
                let selector = match owner {
                    SelectorOwner::Trade => self.trade.selector_mut(),
                    SelectorOwner::Options => self.options.selector_mut(),
                };
                selector.on_instrument(tag, symbol, result);
                Vec::new()
            }
            ApiEvent::Expirations { tag, result } => {
                self.options.on_expirations(tag, result);
                Vec::new()
            }
            ApiEvent::Chain { tag, result } => self.options.on_chain(tag, result, &ctx).into_iter().collect(),
            ApiEvent::Greeks {
                chain_tag,
                symbols,
                result,
            } => {
                self.options.on_greeks(chain_tag, &symbols, result);
                Vec::new()
            }
            ApiEvent::OrderPlaced { tag, result } => {
                if let Some(order_id) = self.trade.on_order(tag, result) {
                    tracing::info!(target: "dispatcher", order_id = %order_id, "order placed");
                    self.orders.mark_stale();
                }
                Vec::new()
            }
            ApiEvent::OrderCancelled { order_id, result } => {
                self.orders.on_cancelled(&order_id, result, &ctx).into_iter().collect()
            }
            ApiEvent::History {
                tag,
                append,
                result,
            } => {
                self.history.on_result(tag, append, result);
                Vec::new()
            }
            ApiEvent::Saved { what, result } => {
                if let Err(e) = result {
                    self.status = Some(format!("could not save {what}: {e}"));
                }
                Vec::new()
            }
        }
    }

    fn accounts_loaded(&mut self, result: Result<Vec<Account>, broker_client::ApiError>) -> Vec<Command> {
        match result {
            Ok(accounts) => {
                let only = match accounts.as_slice() {
                    [one] => Some(one.account_id.clone()),
                    _ => None,
                };
                let empty = accounts.is_empty();
                self.ctx.accounts = LoadState::Loaded(accounts);
                if self.ctx.account.is_some() {
                    return Vec::new();
                }
                if let Some(id) = only {
                    return self.select_account(id);
                }
                if empty {
                    self.status = Some("no brokerage accounts found".to_string());
                } else if !self.modal.is_open() {
                    self.modal = Modal::AccountPicker { cursor: 0 };
                }
                Vec::new()
            }
            Err(e) => {
                self.status = Some(format!("could not load accounts: {e}"));
                self.ctx.accounts = LoadState::Error(e);
                Vec::new()
            }
        }
    }

    fn reduce_timer(&mut self, ev: TimerEvent) -> Vec<Command> {
        match ev {
            TimerEvent::Refresh => {
                let mut cmds = vec![Command::ScheduleRefresh(self.ctx.refresh_interval)];
                if !self.screen(self.active).is_fetching() {
                    let ctx = self.view_ctx();
                    cmds.extend(self.screen_mut(self.active).on_timer(&ctx));
                }
                cmds
            }
        }
    }

    fn resize(&mut self, height: u16) {
        for kind in ViewKind::ALL {
            let screen = self.screen_mut(kind);
            let rows = visible_rows(height, screen.chrome_rows());
            screen.set_visible_rows(rows);
        }
    }
}
