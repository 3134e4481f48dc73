use anyhow::{bail, Context, Result};
use broker_client::secrets::{SECRET_KEY, SERVICE};
use broker_client::{FileSecretStore, SecretStore};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;

use brokerterm::settings::{self, ConfigPaths, SettingsManager, CONFIG_DIR_ENV};
use brokerterm::{app, logging};

#[derive(Parser)]
#[command(name = "brokerterm", version)]
#[command(about = "Terminal client for a brokerage trading API")]
struct Cli {
    /// Config root; defaults to the platform config directory
    #[arg(long, global = true, env = CONFIG_DIR_ENV)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the API secret from stdin and store it
    SetSecret,
    /// Print the resolved configuration and file locations
    Config,
    /// Select the account used on the next start
    SetAccount {
        /// Account id, as shown in the account picker
        id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = ConfigPaths::resolve(cli.config_dir)?;

    match cli.command {
        None => run_tui(paths),
        Some(Commands::SetSecret) => set_secret(&paths),
        Some(Commands::Config) => print_config(&paths),
        Some(Commands::SetAccount { id }) => {
            settings::save_account(&paths, Some(id.clone()))?;
            println!("account set to {id}");
            Ok(())
        }
    }
}

fn run_tui(paths: ConfigPaths) -> Result<()> {
    logging::init(&paths)?;
    let settings = SettingsManager::load(&paths)?.settings().clone();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    let result = rt.block_on(app::run(settings, paths));
    if let Err(e) = &result {
        tracing::error!(target: "brokerterm", error = %format!("{e:#}"), "fatal");
    }
    result
}

fn set_secret(paths: &ConfigPaths) -> Result<()> {
    eprintln!("paste the API secret and press enter:");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read secret from stdin")?;
    let secret = line.trim();
    if secret.is_empty() {
        bail!("empty secret, nothing stored");
    }
    let store = FileSecretStore::new(paths.secrets_file());
    store.set(SERVICE, SECRET_KEY, secret)?;
    println!("secret stored in {}", store.path().display());
    Ok(())
}

fn print_config(paths: &ConfigPaths) -> Result<()> {
    let mgr = SettingsManager::load(paths)?;
    let body = toml::to_string_pretty(mgr.settings()).context("serialize settings")?;
    println!("# {}", mgr.path().display());
    println!("{body}");
    println!("ui state:  {}", paths.ui_file().display());
    println!("token:     {}", paths.token_file().display());
    println!("secrets:   {}", paths.secrets_file().display());
    println!("log:       {}", paths.log_file().display());
    Ok(())
}
