//! Layered configuration for longbox.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults,
//! 2. a TOML file (an explicit path, or `longbox.toml` in the user's config
//!    directory if it exists),
//! 3. `LONGBOX_*` environment variables, with `__` separating nested keys
//!    (`LONGBOX_MONITOR__BATCH_SIZE=25`).
//!
//! ```toml
//! [library]
//! roots = ["/srv/comics"]
//!
//! [catalog]
//! path = "/var/lib/longbox/catalog.sqlite"
//!
//! [monitor]
//! quiet_period_secs = 30
//! batch_size = 10
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "longbox.toml";
pub const ENV_PREFIX: &str = "LONGBOX_";
const CATALOG_FILE_NAME: &str = "catalog.sqlite";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "longbox")
}

/// `longbox.toml` in the platform config directory, if there is one.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub catalog: CatalogConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Absolute paths of the folders to keep catalogued.
    pub roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file; created if missing.
    pub path: PathBuf,
}
impl Default for CatalogConfig {
    fn default() -> Self {
        let path = project_dirs()
            .map(|dirs| dirs.data_dir().join(CATALOG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CATALOG_FILE_NAME));
        Self { path }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds without filesystem events before a rescan starts.
    pub quiet_period_secs: u64,
    /// New comics committed to the catalog per transaction.
    pub batch_size: usize,
    /// How long the worker waits for a command before re-checking whether it
    /// has been asked to stop.
    pub poll_timeout_ms: u64,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}
impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            quiet_period_secs: 30,
            batch_size: 10,
            poll_timeout_ms: 1_000,
            thumbnail_width: 200,
            thumbnail_height: 200,
        }
    }
}
impl MonitorConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_secs(self.quiet_period_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn thumbnail_size(&self) -> (u32, u32) {
        (self.thumbnail_width, self.thumbnail_height)
    }
}

impl Config {
    /// Every source merged, ready for callers to layer their own overrides on
    /// top before calling [`Config::from_figment`].
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                debug!(path = %path.display(), "loading config file");
                figment = figment.merge(Toml::file(path));
            },
            None => {
                if let Some(path) = default_config_path().filter(|p| p.is_file()) {
                    debug!(path = %path.display(), "loading config file");
                    figment = figment.merge(Toml::file(path));
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(explicit)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.library.roots.is_empty() {
            exn::bail!(ErrorKind::Invalid {
                field: "library.roots",
                reason: "at least one folder to watch is required".to_string(),
            });
        }
        if let Some(root) = self.library.roots.iter().find(|root| !root.is_absolute()) {
            exn::bail!(ErrorKind::Invalid {
                field: "library.roots",
                reason: format!("'{}' is not an absolute path", root.display()),
            });
        }
        if self.monitor.batch_size == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "monitor.batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.monitor.poll_timeout_ms == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "monitor.poll_timeout_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.monitor.thumbnail_width == 0 || self.monitor.thumbnail_height == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "monitor.thumbnail_width",
                reason: "thumbnail dimensions must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn with_roots(roots: &[&str]) -> Config {
        Config {
            library: LibraryConfig { roots: roots.iter().map(PathBuf::from).collect() },
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.monitor.quiet_period(), Duration::from_secs(30));
        assert_eq!(config.monitor.batch_size, 10);
        assert_eq!(config.monitor.poll_timeout(), Duration::from_secs(1));
        assert_eq!(config.monitor.thumbnail_size(), (200, 200));
        assert!(config.catalog.path.ends_with(CATALOG_FILE_NAME));
    }

    #[rstest]
    #[case::no_roots(&[], "library.roots")]
    #[case::relative_root(&["/comics", "comics"], "library.roots")]
    fn test_invalid_roots(#[case] roots: &[&str], #[case] field: &str) {
        let err = with_roots(roots).validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid { field: f, .. } if *f == field));
    }

    #[test]
    fn test_zero_batch_size_is_invalid() {
        let mut config = with_roots(&["/comics"]);
        config.monitor.batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid { field: "monitor.batch_size", .. }));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "longbox.toml",
                r#"
                    [library]
                    roots = ["/srv/comics"]

                    [monitor]
                    batch_size = 25
                    quiet_period_secs = 5
                "#,
            )?;
            jail.set_env("LONGBOX_MONITOR__BATCH_SIZE", "50");
            jail.set_env("LONGBOX_CATALOG__PATH", "/tmp/catalog.sqlite");
            let path = jail.directory().join("longbox.toml");
            let config = Config::load(Some(&path)).map_err(|e| e.to_string())?;
            assert_eq!(config.library.roots, vec![PathBuf::from("/srv/comics")]);
            // Environment wins over the file; untouched keys keep the file's value.
            assert_eq!(config.monitor.batch_size, 50);
            assert_eq!(config.monitor.quiet_period_secs, 5);
            assert_eq!(config.monitor.poll_timeout_ms, 1_000);
            assert_eq!(config.catalog.path, PathBuf::from("/tmp/catalog.sqlite"));
            Ok(())
        });
    }

    #[test]
    fn test_caller_overrides() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("longbox.toml");
            jail.create_file("longbox.toml", "[library]\nroots = [\"/srv/comics\"]\n")?;
            let figment = Config::figment(Some(&path))
                .map_err(|e| e.to_string())?
                .merge(Serialized::default("library.roots", vec![PathBuf::from("/mnt/other")]));
            let config = Config::from_figment(figment).map_err(|e| e.to_string())?;
            assert_eq!(config.library.roots, vec![PathBuf::from("/mnt/other")]);
            Ok(())
        });
    }

    #[test]
    fn test_wrong_type_fails_to_load() {
        Jail::expect_with(|jail| {
            jail.set_env("LONGBOX_MONITOR__BATCH_SIZE", "lots");
            jail.set_env("LONGBOX_LIBRARY__ROOTS", "[\"/srv/comics\"]");
            let err = Config::load(None).unwrap_err();
            assert_eq!(*err, ErrorKind::Load);
            Ok(())
        });
    }
}
