//! Engine configuration: the handful of knobs the core needs, persisted via
//! `serde` + `toml` against a file under the platform config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which executor `auto` backend selection should prefer when more than one
/// is available and the query is in-subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    Vectorized,
    Pull,
}

impl Default for BackendPreference {
    fn default() -> Self {
        BackendPreference::Vectorized
    }
}

/// Plain value struct passed into `Query`; not a dotfile-scanning connection
/// manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Row sample size used by readers to infer a `Schema`.
    pub schema_sample_size: usize,
    /// Directory HTTP-backed sources are cached in.
    pub http_cache_dir: PathBuf,
    /// Request timeout, in seconds, for the HTTP-backed reader.
    pub http_timeout_secs: u64,
    /// Preferred backend when `auto` selection has a choice.
    pub backend_preference: BackendPreference,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_sample_size: 100,
            http_cache_dir: default_cache_dir(),
            http_timeout_secs: 30,
            backend_preference: BackendPreference::default(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tabql")
}

impl EngineConfig {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| {
            crate::error::TabqlError::ParseError(format!("invalid config at {}: {e}", path.display()))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| {
            crate::error::TabqlError::ParseError(format!("cannot serialize config: {e}"))
        })?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.schema_sample_size, 100);
        assert_eq!(cfg.http_timeout_secs, 30);
    }

    #[test]
    fn roundtrips_through_toml() {
        let cfg = EngineConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.schema_sample_size, cfg.schema_sample_size);
    }
}
