pub mod commands;
pub mod event;
pub mod reducer;
pub mod render;
pub mod state;

pub use event::*;
pub use state::*;

use anyhow::{Context, Result};
use broker_client::models::AccountId;
use broker_client::{
    BrokerApi, FileSecretStore, FileTokenCache, HttpTransport, ReqwestTransport, SecretStore,
    TokenCache, TokenManager,
};
use crossterm::{
    event::{self as term_event, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};

use self::commands::{Command, Orchestrator};
use self::reducer::Dispatcher;
use crate::persist::Persistence;
use crate::settings::{ConfigPaths, Settings};

const INPUT_POLL: Duration = Duration::from_millis(250);

/// Dispatcher plus redraw bookkeeping.
pub struct AppRuntime {
    pub dispatcher: Dispatcher,
    dirty: bool,
}

impl AppRuntime {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            dirty: true,
        }
    }

    pub fn start(&mut self) -> Vec<Command> {
        self.dirty = true;
        flatten(self.dispatcher.init())
    }

    pub fn handle_event(&mut self, ev: AppEvent) -> Vec<Command> {
        self.dirty = true;
        flatten(self.dispatcher.reduce(ev))
    }

    pub fn should_quit(&self) -> bool {
        self.dispatcher.should_quit()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn render_if_dirty<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        if self.dirty {
            terminal.draw(|frame| render::render(frame, &self.dispatcher))?;
            self.dirty = false;
        }
        Ok(())
    }
}

fn flatten(cmds: Vec<Command>) -> Vec<Command> {
    cmds.into_iter().flat_map(Command::flatten).collect()
}

/// Raw mode plus alternate screen for as long as it lives.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e).context("enter alternate screen");
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout)).context("create terminal")?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Blocking crossterm reads on a plain thread; stops once the loop drops
/// its receiver.
fn spawn_input_reader(tx: UnboundedSender<AppEvent>) {
    std::thread::spawn(move || loop {
        if tx.is_closed() {
            break;
        }
        match term_event::poll(INPUT_POLL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                tracing::error!(target: "input", error = %e, "poll failed");
                break;
            }
        }
        let ev = match term_event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
            Ok(Event::Resize(width, height)) => AppEvent::Resize { width, height },
            Ok(_) => continue,
            Err(e) => {
                tracing::error!(target: "input", error = %e, "read failed");
                break;
            }
        };
        if tx.send(ev).is_err() {
            break;
        }
    });
}

fn build_api(settings: &Settings, paths: &ConfigPaths) -> Result<BrokerApi> {
    let transport: Arc<dyn HttpTransport> = Arc::new(
        ReqwestTransport::new(&settings.base_url, settings.request_timeout())
            .context("build http client")?,
    );
    let secrets: Arc<dyn SecretStore> = Arc::new(FileSecretStore::new(paths.secrets_file()));
    let cache: Arc<dyn TokenCache> = Arc::new(FileTokenCache::new(paths.token_file()));
    let tokens = Arc::new(TokenManager::new(
        transport.clone(),
        secrets,
        cache,
        settings.token_validity_minutes,
    ));
    Ok(BrokerApi::new(transport, tokens))
}

/// Runs the interactive client until the user quits.
pub async fn run(settings: Settings, paths: ConfigPaths) -> Result<()> {
    let api = build_api(&settings, &paths)?;
    let ui_store = Persistence::new(paths.ui_file());
    let ui_state = ui_store.load();
    tracing::info!(
        target: "brokerterm",
        base_url = %settings.base_url,
        account = ?settings.account_id,
        watchlist = ui_state.watchlist.len(),
        "starting"
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = Orchestrator::new(api, tx.clone(), paths, ui_store);
    let mut runtime = AppRuntime::new(Dispatcher::new(
        settings.account_id.clone().map(AccountId),
        ui_state.watchlist,
        settings.refresh_interval(),
    ));

    let mut guard = TerminalGuard::enter()?;
    spawn_input_reader(tx.clone());
    drop(tx);

    let size = guard.terminal.size().context("query terminal size")?;
    runtime.handle_event(AppEvent::Resize {
        width: size.width,
        height: size.height,
    });
    for cmd in runtime.start() {
        orchestrator.run(cmd);
    }

    while !runtime.should_quit() {
        runtime
            .render_if_dirty(&mut guard.terminal)
            .context("draw frame")?;
        let Some(ev) = rx.recv().await else {
            tracing::warn!(target: "brokerterm", "event channel closed");
            break;
        };
        for cmd in runtime.handle_event(ev) {
            orchestrator.run(cmd);
        }
        // Coalesce bursts into one frame.
        while let Ok(ev) = rx.try_recv() {
            for cmd in runtime.handle_event(ev) {
                orchestrator.run(cmd);
            }
            if runtime.should_quit() {
                break;
            }
        }
    }
    tracing::info!(target: "brokerterm", "exiting");
    Ok(())
}
