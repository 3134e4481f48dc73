use broker_client::models::{Account, AccountId};
use broker_client::ApiError;
use std::ops::Range;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Portfolio,
    Watchlist,
    Orders,
    Trade,
    Options,
    History,
}

impl ViewKind {
    pub const ALL: [ViewKind; 6] = [
        ViewKind::Portfolio,
        ViewKind::Watchlist,
        ViewKind::Orders,
        ViewKind::Trade,
        ViewKind::Options,
        ViewKind::History,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|k| *k == self).unwrap_or(0)
    }

    pub fn from_digit(c: char) -> Option<Self> {
        let n = c.to_digit(10)? as usize;
        (1..=Self::ALL.len()).contains(&n).then(|| Self::ALL[n - 1])
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewKind::Portfolio => "Portfolio",
            ViewKind::Watchlist => "Watchlist",
            ViewKind::Orders => "Orders",
            ViewKind::Trade => "Trade",
            ViewKind::Options => "Options",
            ViewKind::History => "History",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusScope {
    Toolbar,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    Quit,
    CancelAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub origin: ViewKind,
    pub kind: ConfirmKind,
    pub prompt: String,
}

/// At most one overlay; while open it owns all input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Modal {
    #[default]
    None,
    AccountPicker {
        cursor: usize,
    },
    Confirmation(ConfirmRequest),
}

impl Modal {
    pub fn is_open(&self) -> bool {
        !matches!(self, Modal::None)
    }
}

/// Fetch lifecycle of one piece of server data. `Loading` keeps the previous
/// value so a reload does not blank the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading(Option<T>),
    Loaded(T),
    Error(ApiError),
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        LoadState::Idle
    }
}

impl<T> LoadState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            LoadState::Loading(Some(v)) | LoadState::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut T> {
        match self {
            LoadState::Loading(Some(v)) | LoadState::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading(_))
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            LoadState::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Enter `Loading`, carrying over whatever was loaded before.
    pub fn begin(&mut self) {
        let previous = match std::mem::take(self) {
            LoadState::Loaded(v) | LoadState::Loading(Some(v)) => Some(v),
            _ => None,
        };
        *self = LoadState::Loading(previous);
    }

    pub fn finish(&mut self, result: Result<T, ApiError>) {
        *self = match result {
            Ok(v) => LoadState::Loaded(v),
            Err(e) => LoadState::Error(e),
        };
    }
}

/// Tags outgoing requests of one fetch kind. Only the most recently issued
/// tag is accepted; everything else is a stale result.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    issued: u64,
    pending: Option<u64>,
}

impl RequestTracker {
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.pending = Some(self.issued);
        self.issued
    }

    /// True when `tag` is the outstanding request; clears it.
    pub fn accept(&mut self, tag: u64) -> bool {
        if self.pending == Some(tag) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget the outstanding request; its result will be discarded.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Selection and scroll window over a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListCursor {
    pub index: usize,
    pub offset: usize,
    pub height: usize,
}

impl Default for ListCursor {
    fn default() -> Self {
        Self {
            index: 0,
            offset: 0,
            height: MIN_VISIBLE_ROWS,
        }
    }
}

impl ListCursor {
    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.scroll_into_view();
    }

    pub fn up(&mut self) {
        self.index = self.index.saturating_sub(1);
        self.scroll_into_view();
    }

    pub fn down(&mut self, len: usize) {
        if self.index + 1 < len {
            self.index += 1;
        }
        self.scroll_into_view();
    }

    pub fn select(&mut self, index: usize, len: usize) {
        self.index = index.min(len.saturating_sub(1));
        self.scroll_into_view();
    }

    pub fn clamp(&mut self, len: usize) {
        self.select(self.index, len);
    }

    pub fn at_end(&self, len: usize) -> bool {
        len == 0 || self.index + 1 >= len
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.offset = 0;
    }

    pub fn visible(&self, len: usize) -> Range<usize> {
        let start = self.offset.min(len);
        start..(start + self.height).min(len)
    }

    fn scroll_into_view(&mut self) {
        if self.index < self.offset {
            self.offset = self.index;
        } else if self.index >= self.offset + self.height {
            self.offset = self.index + 1 - self.height;
        }
    }
}

pub const HEADER_ROWS: u16 = 3;
pub const FOOTER_ROWS: u16 = 2;
pub const MIN_VISIBLE_ROWS: usize = 3;

/// Table rows left for a view once the shared header/footer and the view's
/// own chrome are taken out.
pub fn visible_rows(height: u16, chrome: u16) -> usize {
    let used = HEADER_ROWS + FOOTER_ROWS + chrome;
    (height.saturating_sub(used) as usize).max(MIN_VISIBLE_ROWS)
}

/// Session-wide values the dispatcher owns and hands to views.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub account: Option<AccountId>,
    pub accounts: LoadState<Vec<Account>>,
    pub refresh_interval: Duration,
    pub history_page_size: u32,
}

impl AppContext {
    pub fn new(account: Option<AccountId>, refresh_interval: Duration) -> Self {
        Self {
            account,
            accounts: LoadState::Idle,
            refresh_interval,
            history_page_size: 50,
        }
    }

    pub fn accounts_loaded(&self) -> bool {
        matches!(self.accounts, LoadState::Loaded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_map_to_views() {
        assert_eq!(ViewKind::from_digit('1'), Some(ViewKind::Portfolio));
        assert_eq!(ViewKind::from_digit('6'), Some(ViewKind::History));
        assert_eq!(ViewKind::from_digit('0'), None);
        assert_eq!(ViewKind::from_digit('7'), None);
        assert_eq!(ViewKind::History.next(), ViewKind::Portfolio);
        assert_eq!(ViewKind::Portfolio.prev(), ViewKind::History);
    }

    #[test]
    fn tracker_accepts_only_latest() {
        let mut t = RequestTracker::default();
        let first = t.issue();
        let second = t.issue();
        assert!(!t.accept(first));
        assert!(t.in_flight());
        assert!(t.accept(second));
        assert!(!t.in_flight());
        assert!(!t.accept(second));

        let third = t.issue();
        t.cancel();
        assert!(!t.accept(third));
    }

    #[test]
    fn load_state_keeps_previous_while_loading() {
        let mut s: LoadState<u32> = LoadState::Idle;
        s.begin();
        assert_eq!(s, LoadState::Loading(None));
        s.finish(Ok(7));
        s.begin();
        assert_eq!(s.data(), Some(&7));
        s.finish(Err(ApiError::Transport("down".into())));
        assert!(s.data().is_none());
        assert!(s.error().is_some());
    }

    #[test]
    fn cursor_scrolls_with_selection() {
        let mut c = ListCursor::default();
        c.set_height(3);
        for _ in 0..5 {
            c.down(10);
        }
        assert_eq!(c.index, 5);
        assert_eq!(c.visible(10), 3..6);
        c.select(100, 10);
        assert_eq!(c.index, 9);
        assert!(c.at_end(10));
        c.clamp(4);
        assert_eq!(c.index, 3);
        assert_eq!(c.visible(4), 3..4);
    }

    #[test]
    fn visible_rows_has_floor() {
        assert_eq!(visible_rows(40, 4), 31);
        assert_eq!(visible_rows(10, 6), MIN_VISIBLE_ROWS);
        assert_eq!(visible_rows(0, 0), MIN_VISIBLE_ROWS);
    }
}
