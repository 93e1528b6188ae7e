use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub page_size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Applied by callers through `with_timeout`; the dispatcher has none.
    pub timeout_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { timeout_ms: 15_000 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

impl SyncConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: SyncConfig = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    /// Missing file means defaults; a file that exists but does not parse is
    /// still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let s = self.to_toml_string()?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).with_context(|| "serialize toml")
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".practicum").join("sync.toml")
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote.timeout_ms)
    }
}

/// Expand a leading `~` (and `$VARS`) in a user-supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("expand path {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = SyncConfig::default();
        assert_eq!(cfg.pagination.page_size, 20);
        assert_eq!(cfg.remote_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.logging.filter, "info");
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let cfg: SyncConfig = toml::from_str("[pagination]\npage_size = 50\n").unwrap();
        assert_eq!(cfg.pagination.page_size, 50);
        assert_eq!(cfg.remote.timeout_ms, 15_000);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = SyncConfig::config_path(dir.path());
        let mut cfg = SyncConfig::default();
        cfg.logging.filter = "practicum_sync=debug".into();
        cfg.save_to(&path).unwrap();
        assert!(path.ends_with(".practicum/sync.toml"));
        assert_eq!(SyncConfig::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn test_missing_file_loads_defaults_but_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");
        assert_eq!(SyncConfig::load_or_default(&path).unwrap(), SyncConfig::default());
        std::fs::write(&path, "pagination = [").unwrap();
        assert!(SyncConfig::load_or_default(&path).is_err());
    }
}
