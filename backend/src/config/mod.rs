//! Runtime configuration from environment variables.
//!
//! A `.env` file in the working directory is loaded first when present.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATAVISION_PORT` | `3000` |
//! | `DATAVISION_MAX_UPLOAD_BYTES` | `8388608` (8 MiB) |
//! | `DATAVISION_SAVE_URL` | unset (local store) |
//! | `DATAVISION_API_KEY` | unset |
//! | `DATAVISION_STORE_DIR` | `.datavision/datasets` |
//! | `DATAVISION_NUMBER_RATIO` | `0.8` |
//! | `DATAVISION_DATE_RATIO` | `0.6` |
//! | `DATAVISION_CATEGORY_MAX_DISTINCT` | `50` |
//! | `DATAVISION_CATEGORY_RATIO` | `0.1` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::api::logs::log_warning;
use crate::inference::InferenceThresholds;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Largest file accepted for client-side processing.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 8 * 1024 * 1024;

/// Local dataset registry, relative to the working directory.
pub const DEFAULT_STORE_DIR: &str = ".datavision/datasets";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_upload_bytes: u64,
    pub thresholds: InferenceThresholds,
    /// URL of the remote save-dataset function.
    pub save_url: Option<String>,
    /// Bearer token sent to the save-dataset function.
    pub api_key: Option<String>,
    pub store_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            thresholds: InferenceThresholds::default(),
            save_url: None,
            api_key: None,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Unparseable values
    /// fall back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let thresholds = InferenceThresholds {
            number_ratio: parse_var(&lookup, "DATAVISION_NUMBER_RATIO", defaults.thresholds.number_ratio),
            date_ratio: parse_var(&lookup, "DATAVISION_DATE_RATIO", defaults.thresholds.date_ratio),
            category_max_distinct: parse_var(
                &lookup,
                "DATAVISION_CATEGORY_MAX_DISTINCT",
                defaults.thresholds.category_max_distinct,
            ),
            category_distinct_ratio: parse_var(
                &lookup,
                "DATAVISION_CATEGORY_RATIO",
                defaults.thresholds.category_distinct_ratio,
            ),
        };

        Self {
            port: parse_var(&lookup, "DATAVISION_PORT", defaults.port),
            max_upload_bytes: parse_var(&lookup, "DATAVISION_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            thresholds,
            save_url: non_empty(lookup("DATAVISION_SAVE_URL")),
            api_key: non_empty(lookup("DATAVISION_API_KEY")),
            store_dir: non_empty(lookup("DATAVISION_STORE_DIR"))
                .map(PathBuf::from)
                .unwrap_or(defaults.store_dir),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match non_empty(lookup(key)) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log_warning(format!("Ignoring invalid {}={}", key, raw));
            default
        }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_upload_bytes, 8 * 1024 * 1024);
        assert_eq!(config.thresholds, InferenceThresholds::default());
        assert!(config.save_url.is_none());
        assert_eq!(config.store_dir, PathBuf::from(".datavision/datasets"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATAVISION_PORT", "8080"),
            ("DATAVISION_NUMBER_RATIO", "0.9"),
            ("DATAVISION_CATEGORY_MAX_DISTINCT", "20"),
            ("DATAVISION_SAVE_URL", "https://example.test/functions/v1/save-dataset"),
            ("DATAVISION_API_KEY", ""),
        ]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.thresholds.number_ratio, 0.9);
        assert_eq!(config.thresholds.category_max_distinct, 20);
        assert!(config.save_url.is_some());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_value_falls_back() {
        let config = Config::from_lookup(lookup(&[("DATAVISION_MAX_UPLOAD_BYTES", "lots")]));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }
}
