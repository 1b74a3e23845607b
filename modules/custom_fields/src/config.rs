//! Configuration for the custom fields module

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `CUSTOM_FIELDS__ORPHAN_POLICY=cascade`
pub const ENV_PREFIX: &str = "CUSTOM_FIELDS__";

/// What happens to stored values when their definition is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Keep stored values; they are ignored at load
    #[default]
    Retain,
    /// Delete stored values through the value sink
    Cascade,
}

/// Custom fields configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,

    /// Upper bound on in-flight upserts during submit (0 = unbounded)
    #[serde(default)]
    pub max_concurrent_upserts: usize,

    /// Check values against their options (bounds, choices, formats, schema)
    /// in addition to required-ness
    #[serde(default = "default_true")]
    pub strict_value_checks: bool,

    /// Size ceiling applied to every upload, on top of per-field limits
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            orphan_policy: OrphanPolicy::default(),
            max_concurrent_upserts: 0,
            strict_value_checks: true,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Config {
    /// Parse a YAML document
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("invalid custom fields configuration")
    }

    /// Defaults, then the optional YAML file, then `CUSTOM_FIELDS__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .context("failed to load custom fields configuration")
    }
}

fn default_true() -> bool {
    true
}

fn default_max_upload_bytes() -> u64 {
    25 * 1024 * 1024 // 25MB
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.orphan_policy, OrphanPolicy::Retain);
        assert!(config.strict_value_checks);
    }

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(
            "orphan_policy: cascade\nmax_concurrent_upserts: 4\nstrict_value_checks: false\n",
        )
        .unwrap();
        assert_eq!(config.orphan_policy, OrphanPolicy::Cascade);
        assert_eq!(config.max_concurrent_upserts, 4);
        assert!(!config.strict_value_checks);
        assert_eq!(config.max_upload_bytes, default_max_upload_bytes());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Config::from_yaml("default_sort_order: 5\n").is_err());
        assert!(Config::from_yaml("orphan_policy: purge\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "max_upload_bytes: 1024").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.orphan_policy, OrphanPolicy::Retain);
    }

    #[test]
    fn test_load_without_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.max_concurrent_upserts, 0);
    }
}
