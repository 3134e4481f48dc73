use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{SystemTime, UNIX_EPOCH},
};

/// Bump when you change the ui.json schema.
const UI_STATE_VERSION: u32 = 1;

/// UI preferences, kept apart from the trading config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiState {
    pub version: u32,
    pub watchlist: Vec<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            version: UI_STATE_VERSION,
            watchlist: Vec::new(),
        }
    }
}

impl UiState {
    pub fn with_watchlist(watchlist: Vec<String>) -> Self {
        Self {
            watchlist,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct Written {
    ticket: u64,
    json: String,
}

struct Inner {
    path: PathBuf,
    issued: AtomicU64,
    // held for the whole write, so saves never share the tmp file
    written: Mutex<Written>,
}

#[derive(Clone)]
pub struct Persistence {
    inner: Arc<Inner>,
}

impl Persistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                issued: AtomicU64::new(0),
                written: Mutex::new(Written::default()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn load(&self) -> UiState {
        if !self.inner.path.exists() {
            return UiState::default();
        }
        match read_json::<UiState>(&self.inner.path) {
            Ok(mut state) => {
                if state.version == 0 {
                    state.version = UI_STATE_VERSION;
                }
                state.watchlist = normalize_watchlist(state.watchlist);
                state
            }
            Err(err) => {
                archive_corrupt(&self.inner.path, &err);
                UiState::default()
            }
        }
    }

    /// Reserves the next position in save order. Take it on the thread
    /// that decides the save, before handing the write off.
    pub fn ticket(&self) -> u64 {
        self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Save if content changed.
    pub fn save_now(&self, state: &UiState) -> Result<()> {
        self.save_ordered(self.ticket(), state)
    }

    /// Writes `state` unless a save with a later ticket already landed.
    pub fn save_ordered(&self, ticket: u64, state: &UiState) -> Result<()> {
        let path = &self.inner.path;

        let parent = path.parent().context("ui state path has no parent")?;
        fs::create_dir_all(parent).with_context(|| format!("create config dir {:?}", parent))?;

        let json = serde_json::to_string_pretty(state)?;

        let mut written = self
            .inner
            .written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if ticket <= written.ticket {
            tracing::debug!(target: "persist", ticket, newer = written.ticket, "ui state save superseded");
            return Ok(());
        }
        if written.json == json {
            written.ticket = ticket;
            return Ok(());
        }

        // backup previous
        if path.exists() {
            let backup = path.with_extension("json.bak");
            let _ = fs::copy(path, backup);
        }

        atomic_write(path, json.as_bytes())?;
        *written = Written { ticket, json };
        tracing::debug!(target: "persist", path = ?path, symbols = state.watchlist.len(), "ui state saved");
        Ok(())
    }
}

/// Upper-cased, trimmed, de-duplicated, order preserved.
fn normalize_watchlist(symbols: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(symbols.len());
    for s in symbols {
        let s = s.trim().to_uppercase();
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {:?}", path))?;
    let value = serde_json::from_slice::<T>(&bytes).with_context(|| "parse json")?;
    Ok(value)
}

fn archive_corrupt(path: &Path, err: &anyhow::Error) {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let archived = path.with_extension(format!("corrupt.{ts}.json"));
    let _ = fs::rename(path, &archived);
    tracing::warn!(target: "persist", error = ?err, archived = ?archived, "ui state corrupt; archived");
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().context("no parent dir for ui state path")?;
    let tmp = dir.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    {
        let mut f = fs::File::create(&tmp).with_context(|| format!("create tmp {:?}", tmp))?;
        f.write_all(bytes).with_context(|| "write tmp")?;
        let _ = f.sync_all();
    }

    fs::rename(&tmp, path).with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let p = Persistence::new(dir.path().join("ui.json"));
        assert_eq!(p.load(), UiState::default());

        p.save_now(&UiState::with_watchlist(vec!["AAPL".into()])).unwrap();
        p.save_now(&UiState::with_watchlist(vec!["AAPL".into(), "MSFT".into()]))
            .unwrap();

        assert_eq!(p.load().watchlist, vec!["AAPL", "MSFT"]);
        let backup: UiState =
            serde_json::from_slice(&fs::read(dir.path().join("ui.json.bak")).unwrap()).unwrap();
        assert_eq!(backup.watchlist, vec!["AAPL"]);
    }

    #[test]
    fn late_save_does_not_overwrite_newer_state() {
        let dir = tempfile::tempdir().unwrap();
        let p = Persistence::new(dir.path().join("ui.json"));
        let older = p.ticket();
        let newer = p.ticket();

        p.save_ordered(newer, &UiState::with_watchlist(vec!["AAPL".into(), "MSFT".into()]))
            .unwrap();
        p.save_ordered(older, &UiState::with_watchlist(vec!["AAPL".into()]))
            .unwrap();
        assert_eq!(p.load().watchlist, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn concurrent_saves_keep_the_newest_list() {
        for _ in 0..100 {
            let dir = tempfile::tempdir().unwrap();
            let p = Persistence::new(dir.path().join("ui.json"));
            let saves = [vec!["AAPL".to_string()], vec!["AAPL".to_string(), "MSFT".to_string()]];
            let handles: Vec<_> = saves
                .into_iter()
                .map(|list| {
                    let ticket = p.ticket();
                    let p = p.clone();
                    std::thread::spawn(move || p.save_ordered(ticket, &UiState::with_watchlist(list)))
                })
                .collect();
            for h in handles {
                h.join().unwrap().unwrap();
            }
            assert_eq!(p.load().watchlist, vec!["AAPL", "MSFT"]);
        }
    }

    #[test]
    fn corrupt_file_is_archived() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui.json");
        fs::write(&path, b"{ not json").unwrap();

        let p = Persistence::new(&path);
        assert_eq!(p.load(), UiState::default());
        assert!(!path.exists());
        let archived = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().starts_with("ui.corrupt."));
        assert!(archived);
    }

    #[test]
    fn loaded_watchlist_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui.json");
        fs::write(&path, br#"{"version":1,"watchlist":[" aapl","AAPL","msft",""]}"#).unwrap();
        assert_eq!(Persistence::new(&path).load().watchlist, vec!["AAPL", "MSFT"]);
    }
}
