//! Configuration loading
//!
//! Priority order (highest wins):
//! 1. Command-line arguments
//! 2. Environment variables (VAKYA_CONFIG, VAKYA_DATA_DIR)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! Every field has a default, so an empty (or absent) config file yields a
//! fully working analyzer pointed at localhost engine endpoints.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vakya_common::{AnalysisMode, Error, Result};

/// Settings for one analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub enabled: bool,
    /// Ensemble weight. Weights of enabled engines must sum to 1.0.
    pub weight: f64,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 0.0,
            endpoint: String::new(),
            timeout_ms: 5_000,
        }
    }
}

/// The three engine adapters and their weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginesConfig {
    pub grammar: EngineConfig,
    pub morphology: EngineConfig,
    pub lexicon: EngineConfig,
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            grammar: EngineConfig {
                weight: 0.35,
                endpoint: "http://localhost:8801/analyze".to_string(),
                ..Default::default()
            },
            morphology: EngineConfig {
                weight: 0.40,
                endpoint: "http://localhost:8802/parse".to_string(),
                ..Default::default()
            },
            lexicon: EngineConfig {
                weight: 0.25,
                endpoint: "http://localhost:8803/segment".to_string(),
                ..Default::default()
            },
        }
    }
}

impl EnginesConfig {
    /// (name, config) pairs for the enabled engines.
    pub fn enabled(&self) -> Vec<(&'static str, &EngineConfig)> {
        let mut out = Vec::new();
        if self.grammar.enabled {
            out.push(("grammar", &self.grammar));
        }
        if self.morphology.enabled {
            out.push(("morphology", &self.morphology));
        }
        if self.lexicon.enabled {
            out.push(("lexicon", &self.lexicon));
        }
        out
    }
}

/// Model arbiter settings (second disambiguation stage).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    pub enabled: bool,
    pub url: String,
    pub model: String,
    pub timeout_ms: u64,
    /// How many top candidates the arbiter sees
    pub max_candidates: usize,
    pub temperature: f64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://localhost:11434".to_string(),
            model: "gemma2:9b".to_string(),
            timeout_ms: 30_000,
            max_candidates: 3,
            temperature: 0.1,
        }
    }
}

/// Disambiguation pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisambiguationConfig {
    /// Fast path: accept the top candidate outright at or above this
    pub skip_threshold: f64,
    /// ...provided the runner-up trails by more than this
    pub epsilon: f64,
    /// Margin the rule-adjusted winner must clear over the runner-up
    pub rule_margin: f64,
    /// Below this, a trivially selected result is still flagged for review
    pub review_threshold: f64,
    pub arbiter: ArbiterConfig,
}

impl Default for DisambiguationConfig {
    fn default() -> Self {
        Self {
            skip_threshold: 0.95,
            epsilon: 0.05,
            rule_margin: 0.05,
            review_threshold: 0.5,
            arbiter: ArbiterConfig::default(),
        }
    }
}

/// Cache tier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub memory_capacity: usize,
    pub shared_enabled: bool,
    pub shared_ttl_secs: u64,
    pub corpus_enabled: bool,
    /// Corpus database path. None = `<data dir>/corpus.db`.
    pub corpus_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: 1_024,
            shared_enabled: true,
            shared_ttl_secs: 7 * 24 * 3600,
            corpus_enabled: true,
            corpus_path: None,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_mode: AnalysisMode,
    pub engines: EnginesConfig,
    pub disambiguation: DisambiguationConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration with standard priority. `path` comes from the CLI;
    /// when absent, VAKYA_CONFIG is consulted, then `<data dir>/vakya.toml`.
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let resolved: Option<PathBuf> = match path {
            Some(p) => Some(p.to_path_buf()),
            None => match std::env::var("VAKYA_CONFIG") {
                Ok(v) if !v.is_empty() => Some(PathBuf::from(v)),
                _ => {
                    let default = Self::data_dir().join("vakya.toml");
                    default.exists().then_some(default)
                }
            },
        };

        let config = match resolved {
            Some(p) => {
                let raw = std::fs::read_to_string(&p)?;
                let config: Config = toml::from_str(&raw)
                    .map_err(|e| Error::Config(format!("{}: {e}", p.display())))?;
                tracing::info!("Loaded configuration from {}", p.display());
                config
            }
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Config::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the analyzer cannot run with.
    pub fn validate(&self) -> Result<()> {
        let enabled = self.engines.enabled();
        if enabled.is_empty() {
            return Err(Error::Config("no engines enabled".to_string()));
        }
        let total: f64 = enabled.iter().map(|(_, e)| e.weight).sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "enabled engine weights must sum to 1.0, got {total:.4}"
            )));
        }
        for (name, engine) in &enabled {
            if engine.endpoint.is_empty() {
                return Err(Error::Config(format!("engine {name} has no endpoint")));
            }
            if engine.weight <= 0.0 {
                return Err(Error::Config(format!(
                    "engine {name} has non-positive weight {}",
                    engine.weight
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.disambiguation.skip_threshold) {
            return Err(Error::Config("skip_threshold must be in [0,1]".to_string()));
        }
        if self.cache.memory_capacity == 0 {
            return Err(Error::Config("memory_capacity must be > 0".to_string()));
        }
        Ok(())
    }

    /// Data directory: VAKYA_DATA_DIR, or the platform-local data dir.
    pub fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("VAKYA_DATA_DIR") {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vakya")
    }

    /// Resolved corpus database path.
    pub fn corpus_path(&self) -> PathBuf {
        self.cache
            .corpus_path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("corpus.db"))
    }

    /// Maximum candidates kept in the forest for a mode.
    pub fn max_candidates(&self, mode: AnalysisMode) -> usize {
        match mode {
            AnalysisMode::Production => 3,
            AnalysisMode::Educational => 5,
            AnalysisMode::Academic => 8,
        }
    }

    /// Whether a mode returns the full forest or just the selection.
    pub fn returns_all_candidates(&self, mode: AnalysisMode) -> bool {
        !matches!(mode, AnalysisMode::Production)
    }
}
