//! Site configuration module.
//!
//! Handles loading, validating, and merging `folio.toml`. Configuration is a
//! single sparse file: stock defaults are overridden by whatever keys the
//! user's file provides, and unknown keys are rejected to catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! title = "Portfolio"           # Site title, used in <title> and metadata
//! description = ""              # Meta description injected into every page
//! base_url = ""                 # Absolute site URL (sitemap, canonical links)
//! language = "en"               # <html lang> attribute
//!
//! [build]
//! primary_script = "main.js"    # Script under static/js/ minified for every page
//! copy_dirs = ["images", "case-studies", "assets"]
//! # sitemap_date = "2026-01-01" # Pin the sitemap lastmod (reproducible builds)
//!
//! [server]
//! port = 8080                   # Requested preview port (probed upward if busy)
//! shutdown_timeout_ms = 5000    # Bound on stop() before reporting a timeout
//! health_timeout_ms = 1000      # Bound on the readiness probe
//!
//! [processing]
//! max_processes = 4             # Max parallel asset workers (omit for auto)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! title = "Jane Doe"
//!
//! [server]
//! port = 3000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `folio.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site title, used in page `<title>` elements.
    pub title: String,
    /// Meta description injected into every rendered page.
    pub description: String,
    /// Absolute URL the site is deployed at (informational; may be empty).
    pub base_url: String,
    /// BCP 47 language tag for the `<html lang>` attribute.
    pub language: String,
    /// Build pipeline settings.
    pub build: BuildConfig,
    /// Local preview / test server settings.
    pub server: ServerConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Portfolio".to_string(),
            description: String::new(),
            base_url: String::new(),
            language: "en".to_string(),
            build: BuildConfig::default(),
            server: ServerConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.language.is_empty() {
            return Err(ConfigError::Validation(
                "language must not be empty".into(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be 1-65535".into(),
            ));
        }
        if let Some(date) = &self.build.sitemap_date {
            if !is_iso_date(date) {
                return Err(ConfigError::Validation(format!(
                    "build.sitemap_date must be YYYY-MM-DD, got '{date}'"
                )));
            }
        }
        for dir in &self.build.copy_dirs {
            if dir.is_empty() || dir.contains("..") || Path::new(dir).is_absolute() {
                return Err(ConfigError::Validation(format!(
                    "build.copy_dirs entries must be relative child names, got '{dir}'"
                )));
            }
        }
        Ok(())
    }
}

fn is_iso_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| matches!(i, 4 | 7) || b.is_ascii_digit())
}

/// Build pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Name of the primary script under `static/js/`, minified for every page.
    pub primary_script: String,
    /// Source directories copied verbatim into the output root.
    pub copy_dirs: Vec<String>,
    /// Pinned sitemap `<lastmod>` date (`YYYY-MM-DD`). When absent the build
    /// uses the current local date.
    pub sitemap_date: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            primary_script: "main.js".to_string(),
            copy_dirs: vec![
                "images".to_string(),
                "case-studies".to_string(),
                "assets".to_string(),
            ],
            sitemap_date: None,
        }
    }
}

/// Local preview / test server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Requested listen port. The server probes upward from here if busy.
    pub port: u16,
    /// Upper bound on `stop()` before a shutdown timeout is reported.
    pub shutdown_timeout_ms: u64,
    /// Upper bound on the `is_healthy` readiness probe.
    pub health_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            shutdown_timeout_ms: 5000,
            health_timeout_ms: 1000,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel asset workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `folio.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `folio.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("folio.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `folio.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_validate() {
        SiteConfig::default().validate().unwrap();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.title, "Portfolio");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn sparse_override_preserves_siblings() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("folio.toml"),
            "title = \"Jane Doe\"\n\n[server]\nport = 3000\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.title, "Jane Doe");
        assert_eq!(config.server.port, 3000);
        // Untouched sibling keys keep their defaults
        assert_eq!(config.server.shutdown_timeout_ms, 5000);
        assert_eq!(config.language, "en");
    }

    #[test]
    fn merge_is_recursive() {
        let base = toml::toml! {
            [server]
            port = 8080
            shutdown_timeout_ms = 5000
        };
        let overlay = toml::toml! {
            [server]
            port = 9090
        };
        let merged = merge_toml(base.into(), overlay.into());
        let table = merged.get("server").unwrap();
        assert_eq!(table.get("port").unwrap().as_integer(), Some(9090));
        assert_eq!(
            table.get("shutdown_timeout_ms").unwrap().as_integer(),
            Some(5000)
        );
    }

    #[test]
    fn unknown_keys_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("folio.toml"), "titel = \"typo\"\n").unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)), "got: {err}");
    }

    #[test]
    fn zero_port_rejected() {
        let mut config = SiteConfig::default();
        config.server.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn bad_sitemap_date_rejected() {
        let mut config = SiteConfig::default();
        config.build.sitemap_date = Some("01/02/2026".to_string());
        assert!(config.validate().is_err());
        config.build.sitemap_date = Some("2026-01-02".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn traversal_copy_dir_rejected() {
        let mut config = SiteConfig::default();
        config.build.copy_dirs = vec!["../outside".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn effective_threads_clamps_to_cores() {
        let cores = std::thread::available_parallelism().unwrap().get();
        let config = ProcessingConfig {
            max_processes: Some(cores + 64),
        };
        assert_eq!(effective_threads(&config), cores);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }
}
