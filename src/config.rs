//! Pipeline configuration.
//!
//! A single TOML file configures synthesis defaults, analyzer selection, location
//! overrides and the robot database path. Every section is optional:
//!
//! ```toml
//! robot_db = "robots_db.json"
//!
//! [synthesis]
//! safety_height = 120.0
//! default_manufacturer = "doosan"
//! default_model = "m1013"
//!
//! [analyzer]
//! provider = "ollama"
//! model = "gemma:2b"
//! timeout_secs = 20
//!
//! [locations]
//! shelf = [350.0, 400.0, 250.0, 180.0, 0.0, 180.0]
//! ```

use crate::location::LocationMap;
use crate::provider::OllamaConfig;
use crate::synthesizer::SynthesisConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const ENV_PROVIDER: &str = "NL2TDL_LLM_PROVIDER";
pub const ENV_MODEL: &str = "NL2TDL_LLM_MODEL";
pub const ENV_ENDPOINT: &str = "NL2TDL_LLM_ENDPOINT";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub synthesis: SynthesisConfig,
    pub analyzer: AnalyzerConfig,
    /// Entries merged over [`LocationMap::builtin`].
    pub locations: LocationMap,
    /// JSON robot specification database.
    pub robot_db: Option<PathBuf>,
}

impl PipelineConfig {
    /// The built-in location table with this configuration's overrides applied.
    pub fn location_map(&self) -> LocationMap {
        LocationMap::builtin().with_overrides(&self.locations)
    }
}

/// Which requirement extractor runs in front of the heuristic analyzer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Heuristic analysis only.
    #[default]
    None,
    /// Local Ollama server, with heuristic fallback.
    Ollama,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub endpoint: String,
    /// Bound on the single provider request. `0` means the default.
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let ollama = OllamaConfig::default();
        Self {
            provider: ProviderKind::None,
            model: ollama.model,
            endpoint: ollama.endpoint,
            timeout_secs: ollama.timeout.as_secs(),
        }
    }
}

impl AnalyzerConfig {
    pub fn ollama(&self) -> OllamaConfig {
        let timeout = match self.timeout_secs {
            0 => OllamaConfig::default().timeout,
            secs => Duration::from_secs(secs),
        };
        OllamaConfig {
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
            timeout,
        }
    }

    /// Applies `NL2TDL_LLM_*` overrides read through `lookup`.
    ///
    /// The lookup is explicit so the pipeline itself never reads process state; pass
    /// `|k| std::env::var(k).ok()` at the application edge. An unknown provider name
    /// disables the provider.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(provider) = lookup(ENV_PROVIDER) {
            self.provider = match provider.trim().to_lowercase().as_str() {
                "ollama" => ProviderKind::Ollama,
                "" | "none" => ProviderKind::None,
                other => {
                    warn!(provider = other, "unknown LLM provider; heuristic analysis only");
                    ProviderKind::None
                }
            };
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint;
        }
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parses a TOML configuration document.
pub fn parse_config(text: &str) -> Result<PipelineConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Reads and parses the TOML configuration at `path`.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&text)
}
