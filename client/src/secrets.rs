use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ApiError;

pub const SERVICE: &str = "brokerterm";
pub const SECRET_KEY: &str = "secret_key";

/// Storage for long-lived credentials, addressed by (service, key).
pub trait SecretStore: Send + Sync {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>, ApiError>;
    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), ApiError>;
}

type Tables = BTreeMap<String, BTreeMap<String, String>>;

/// TOML file with one table per service. Written owner-only on unix.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_tables(&self) -> Result<Tables, ApiError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => toml::from_str(&text)
                .map_err(|e| ApiError::Secret(format!("parse {}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tables::new()),
            Err(e) => Err(ApiError::Secret(format!("read {}: {e}", self.path.display()))),
        }
    }

    fn write_tables(&self, tables: &Tables) -> Result<(), ApiError> {
        let text = toml::to_string(tables).map_err(|e| ApiError::Secret(e.to_string()))?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| ApiError::Secret(format!("create {}: {e}", dir.display())))?;
        }
        let mut file = open_private(&self.path)
            .map_err(|e| ApiError::Secret(format!("open {}: {e}", self.path.display())))?;
        file.write_all(text.as_bytes())
            .map_err(|e| ApiError::Secret(format!("write {}: {e}", self.path.display())))?;
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>, ApiError> {
        let tables = self.read_tables()?;
        Ok(tables
            .get(service)
            .and_then(|t| t.get(key))
            .filter(|v| !v.trim().is_empty())
            .cloned())
    }

    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), ApiError> {
        let mut tables = self.read_tables()?;
        tables
            .entry(service.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self.write_tables(&tables)
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("secrets.toml"));
        assert_eq!(store.get(SERVICE, SECRET_KEY).unwrap(), None);

        store.set(SERVICE, SECRET_KEY, "s3cr3t").unwrap();
        store.set("other", "k", "v").unwrap();
        assert_eq!(store.get(SERVICE, SECRET_KEY).unwrap().as_deref(), Some("s3cr3t"));
        assert_eq!(store.get("other", "k").unwrap().as_deref(), Some("v"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
