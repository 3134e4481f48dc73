use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR_ENV: &str = "BROKERTERM_CONFIG_DIR";
pub const DEFAULT_BASE_URL: &str = "https://api.public.com";

/// Files that live under the config root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    root: PathBuf,
}

impl ConfigPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Explicit override, then `$BROKERTERM_CONFIG_DIR`, then the platform
    /// config directory.
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = override_dir {
            return Ok(Self::new(dir));
        }
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir));
        }
        let proj = ProjectDirs::from("", "", "brokerterm").context("ProjectDirs::from returned None")?;
        Ok(Self::new(proj.config_dir()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn ui_file(&self) -> PathBuf {
        self.root.join("ui.json")
    }

    pub fn token_file(&self) -> PathBuf {
        self.root.join("token.json")
    }

    pub fn secrets_file(&self) -> PathBuf {
        self.root.join("secrets.toml")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("brokerterm.log")
    }
}

/// Trading configuration. No secrets are stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub token_validity_minutes: u32,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            account_id: None,
            token_validity_minutes: 60,
            refresh_interval_secs: 30,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

pub struct SettingsManager {
    cfg_path: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Loads `config.toml`; a missing file yields defaults.
    pub fn load(paths: &ConfigPaths) -> Result<Self> {
        let cfg_path = paths.config_file();
        let settings = if cfg_path.exists() {
            let text = fs::read_to_string(&cfg_path)
                .with_context(|| format!("read {}", cfg_path.display()))?;
            toml::from_str(&text).with_context(|| format!("parse {}", cfg_path.display()))?
        } else {
            Settings::default()
        };
        Ok(Self { cfg_path, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.cfg_path
    }

    pub fn set_account(&mut self, account_id: Option<String>) -> Result<()> {
        self.settings.account_id = account_id.filter(|a| !a.trim().is_empty());
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        let dir = self.cfg_path.parent().context("config path has no parent")?;
        create_dir_all(dir).with_context(|| format!("create config dir {}", dir.display()))?;

        let body = toml::to_string_pretty(&self.settings).context("serialize settings")?;
        let text = format!("# brokerterm settings (no secrets stored)\n{body}");

        let tmp = self.cfg_path.with_extension("toml.tmp");
        fs::write(&tmp, text).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.cfg_path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.cfg_path.display()))?;
        tracing::debug!(target: "persist", path = %self.cfg_path.display(), "settings saved");
        Ok(())
    }
}

/// Reloads `config.toml` and persists a new selected account, leaving the
/// other keys as the user wrote them.
pub fn save_account(paths: &ConfigPaths, account_id: Option<String>) -> Result<()> {
    let mut mgr = SettingsManager::load(paths)?;
    mgr.set_account(account_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = SettingsManager::load(&ConfigPaths::new(dir.path())).unwrap();
        assert_eq!(mgr.settings(), &Settings::default());
        assert_eq!(mgr.settings().base_url, "https://api.public.com");
    }

    #[test]
    fn account_round_trip_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(dir.path().join("nested"));
        fs::create_dir_all(paths.root()).unwrap();
        fs::write(
            paths.config_file(),
            "base_url = \"http://localhost:9000\"\nrefresh_interval_secs = 5\n",
        )
        .unwrap();

        save_account(&paths, Some("ACC42".into())).unwrap();

        let mgr = SettingsManager::load(&paths).unwrap();
        assert_eq!(mgr.settings().account_id.as_deref(), Some("ACC42"));
        assert_eq!(mgr.settings().base_url, "http://localhost:9000");
        assert_eq!(mgr.settings().refresh_interval(), Duration::from_secs(5));
        assert_eq!(mgr.settings().token_validity_minutes, 60);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(dir.path());
        fs::write(paths.config_file(), "base_url = [").unwrap();
        assert!(SettingsManager::load(&paths).is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_platform_dir() {
        std::env::set_var(CONFIG_DIR_ENV, "/tmp/brokerterm-test-root");
        let resolved = ConfigPaths::resolve(None).unwrap();
        let explicit = ConfigPaths::resolve(Some(PathBuf::from("/elsewhere"))).unwrap();
        std::env::remove_var(CONFIG_DIR_ENV);

        assert_eq!(resolved.root(), Path::new("/tmp/brokerterm-test-root"));
        assert_eq!(explicit.root(), Path::new("/elsewhere"));
        assert_eq!(resolved.ui_file(), Path::new("/tmp/brokerterm-test-root/ui.json"));
    }
}
