//! TOML configuration for the `ftx` binary.
//!
//! Every section and key is optional; omitted values take the defaults
//! below. A missing config file yields [`Config::default`].
//!
//! ```toml
//! [textify]
//! intro_chars = 1200
//! fallback_intro_chars = 1500
//! slice_token_limit = 7800
//! max_record_chars = 30000
//!
//! [query]
//! token_budget = 7500
//! min_slice = 50
//! trim_priority = ["semantics", "fields", "headings"]
//!
//! [fusion]
//! top_k = 5
//! identity_fallback = "parentId"
//! [fusion.weights]
//! layout = 0.0
//!
//! [neighbors]
//! top = 3
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use formtext_core::budget::TokenBudget;
use formtext_core::emit::EmitOptions;
use formtext_core::fusion::FusionOptions;
use formtext_core::query::{ComposeOptions, QueryPart, SignalOptions, SignalWeights};
use formtext_core::record::RecordOptions;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub textify: TextifyConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub neighbors: NeighborsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TextifyConfig {
    #[serde(default = "default_intro_chars")]
    pub intro_chars: usize,
    #[serde(default = "default_fallback_intro_chars")]
    pub fallback_intro_chars: usize,
    #[serde(default = "default_slice_token_limit")]
    pub slice_token_limit: usize,
    #[serde(default = "default_max_record_chars")]
    pub max_record_chars: usize,
    #[serde(default = "default_field_clues")]
    pub field_clues: Vec<String>,
}

impl Default for TextifyConfig {
    fn default() -> Self {
        Self {
            intro_chars: default_intro_chars(),
            fallback_intro_chars: default_fallback_intro_chars(),
            slice_token_limit: default_slice_token_limit(),
            max_record_chars: default_max_record_chars(),
            field_clues: default_field_clues(),
        }
    }
}

fn default_intro_chars() -> usize {
    1200
}
fn default_fallback_intro_chars() -> usize {
    1500
}
fn default_slice_token_limit() -> usize {
    7800
}
fn default_max_record_chars() -> usize {
    30_000
}
fn default_field_clues() -> Vec<String> {
    [
        "signature",
        "date",
        "ssn",
        "social security",
        "email",
        "address",
        "phone",
        "tax id",
        "federal id",
        "permit",
        "license",
        "credit",
        "complaint",
        "exemption",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
    #[serde(default = "default_min_slice")]
    pub min_slice: usize,
    #[serde(default = "default_trim_priority")]
    pub trim_priority: Vec<String>,
    /// Maximum field candidates per query; `0` keeps all of them.
    #[serde(default)]
    pub field_limit: usize,
    #[serde(default = "default_signal_char_limit")]
    pub signal_char_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            min_slice: default_min_slice(),
            trim_priority: default_trim_priority(),
            field_limit: 0,
            signal_char_limit: default_signal_char_limit(),
        }
    }
}

fn default_token_budget() -> usize {
    7500
}
fn default_min_slice() -> usize {
    50
}
fn default_trim_priority() -> Vec<String> {
    vec![
        "semantics".to_string(),
        "fields".to_string(),
        "headings".to_string(),
    ]
}
fn default_signal_char_limit() -> usize {
    8000
}

#[derive(Debug, Deserialize, Clone)]
pub struct FusionConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub weights: SignalWeights,
    #[serde(default = "default_identity_fallback")]
    pub identity_fallback: String,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            weights: SignalWeights::default(),
            identity_fallback: default_identity_fallback(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_identity_fallback() -> String {
    "parentId".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NeighborsConfig {
    #[serde(default = "default_top")]
    pub top: usize,
    #[serde(default = "default_window_chars")]
    pub window_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for NeighborsConfig {
    fn default() -> Self {
        Self {
            top: default_top(),
            window_chars: default_window_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_top() -> usize {
    3
}
fn default_window_chars() -> usize {
    4000
}
fn default_overlap_chars() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn record_options(&self) -> RecordOptions {
        RecordOptions {
            emit: EmitOptions {
                fallback_intro_chars: self.textify.fallback_intro_chars,
            },
            slice_token_limit: self.textify.slice_token_limit,
            max_record_chars: self.textify.max_record_chars,
        }
    }

    /// Compose options; `token_budget` overrides the configured budget.
    pub fn compose_options(&self, token_budget: Option<usize>) -> Result<ComposeOptions> {
        Ok(ComposeOptions {
            budget: TokenBudget {
                limit: token_budget.unwrap_or(self.query.token_budget),
                min_slice: self.query.min_slice,
            },
            trim_priority: self.trim_priority()?,
            field_limit: self.field_limit(),
        })
    }

    pub fn signal_options(&self) -> SignalOptions {
        SignalOptions {
            weights: self.fusion.weights,
            char_limit: self.query.signal_char_limit,
            field_limit: self.field_limit(),
        }
    }

    pub fn fusion_options(&self, top_k: Option<usize>) -> FusionOptions {
        FusionOptions {
            top_k: top_k.unwrap_or(self.fusion.top_k),
            identity_fallback: self.fusion.identity_fallback.clone(),
        }
    }

    pub fn trim_priority(&self) -> Result<Vec<QueryPart>> {
        self.query
            .trim_priority
            .iter()
            .map(|s| s.parse::<QueryPart>())
            .collect()
    }

    fn field_limit(&self) -> Option<usize> {
        (self.query.field_limit > 0).then_some(self.query.field_limit)
    }
}

/// Load and validate the config at `path`; a missing file yields defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.query.token_budget == 0 {
        anyhow::bail!("query.token_budget must be > 0");
    }

    config
        .trim_priority()
        .with_context(|| "Invalid query.trim_priority")?;

    if config.fusion.top_k < 1 {
        anyhow::bail!("fusion.top_k must be >= 1");
    }

    let w = &config.fusion.weights;
    for (name, weight) in [
        ("semantics", w.semantics),
        ("fields", w.fields),
        ("headings", w.headings),
        ("layout", w.layout),
    ] {
        if !weight.is_finite() || weight < 0.0 {
            anyhow::bail!("fusion.weights.{} must be a finite number >= 0", name);
        }
    }

    if config.fusion.identity_fallback.trim().is_empty() {
        anyhow::bail!("fusion.identity_fallback must not be empty");
    }

    if config.neighbors.top < 1 {
        anyhow::bail!("neighbors.top must be >= 1");
    }

    if config.neighbors.window_chars == 0 {
        anyhow::bail!("neighbors.window_chars must be > 0");
    }

    if config.neighbors.overlap_chars >= config.neighbors.window_chars {
        anyhow::bail!("neighbors.overlap_chars must be < neighbors.window_chars");
    }

    Ok(())
}
