//! `prepcast.toml` loading.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, environment
//! variables (including those loaded from `.env`).

use prepcast_core::{PrepcastError, PrepcastResult};
use prepcast_orchestrator::{PipelineConfig, StrategyKind, StrategyProfiles, GENERATION_STEP};
use prepcast_steps::StepConfig;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct PrepcastConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default = "default_max_questions")]
    pub max_questions_per_run: usize,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    /// `[strategies.<kind>.<step>]` tables overlaid on the built-in profiles.
    #[serde(default)]
    pub strategies: BTreeMap<String, BTreeMap<String, StepConfig>>,
}

/// Which text generator backs `llm_processing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI if its key is set, then Anthropic, then templates.
    #[default]
    Auto,
    Openai,
    Anthropic,
    /// Never call a provider.
    Template,
}

/// A provider that has its credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedProvider {
    Openai { api_key: String },
    Anthropic { api_key: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// OpenAI key.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    /// Model for whichever provider is selected.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub anthropic_base_url: Option<String>,
    /// Per-request bound on generation calls.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Applied to `llm_processing` in direct mode only.
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub engine_id: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for PrepcastConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            log_level: default_log_level(),
            log_json: false,
            max_questions_per_run: default_max_questions(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            strategies: BTreeMap::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_questions() -> usize {
    1
}

fn key(value: Option<&str>) -> Option<&str> {
    value.filter(|k| !k.trim().is_empty())
}

impl PrepcastConfig {
    /// Parse a TOML document.
    pub fn from_toml(source: &str) -> PrepcastResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| PrepcastError::Config(e.to_string()))?;
        config.strategy_profiles()?;
        Ok(config)
    }

    /// Read `path` if it exists, otherwise start from defaults.
    pub fn load(path: &Path) -> PrepcastResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(source) => Self::from_toml(&source).map_err(|e| {
                PrepcastError::Config(format!("{}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in the binary.
    pub fn apply_env<F>(&mut self, lookup: F) -> PrepcastResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = non_empty("OPENAI_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = non_empty("ANTHROPIC_API_KEY") {
            self.llm.anthropic_api_key = Some(v);
        }
        if let Some(v) = non_empty("ANTHROPIC_BASE_URL") {
            self.llm.anthropic_base_url = Some(v);
        }
        if let Some(v) = non_empty("GOOGLE_API_KEY") {
            self.search.api_key = Some(v);
        }
        if let Some(v) = non_empty("GOOGLE_CSE_ID") {
            self.search.engine_id = Some(v);
        }
        if let Some(v) = non_empty("PREPCAST_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty("PREPCAST_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty("LOG_LEVEL") {
            self.log_level = v.to_lowercase();
        }
        if let Some(v) = non_empty("MAX_QUESTIONS_PER_RUN") {
            self.max_questions_per_run = v.trim().parse().map_err(|_| {
                PrepcastError::Config(format!("MAX_QUESTIONS_PER_RUN is not a count: {v}"))
            })?;
        }
        Ok(())
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("questions.db")
    }

    /// Whether any paid provider key is present.
    pub fn has_paid_llm(&self) -> bool {
        let llm = &self.llm;
        key(llm.api_key.as_deref()).is_some() || key(llm.anthropic_api_key.as_deref()).is_some()
    }

    /// Pick the generation provider. `None` means template explanations.
    ///
    /// An explicitly named provider without its key is an error rather than a
    /// silent fallback.
    pub fn llm_provider(&self) -> PrepcastResult<Option<ResolvedProvider>> {
        let openai = key(self.llm.api_key.as_deref()).map(|k| ResolvedProvider::Openai {
            api_key: k.to_string(),
        });
        let anthropic =
            key(self.llm.anthropic_api_key.as_deref()).map(|k| ResolvedProvider::Anthropic {
                api_key: k.to_string(),
            });
        match self.llm.provider {
            LlmProvider::Auto => Ok(openai.or(anthropic)),
            LlmProvider::Openai => openai.map(Some).ok_or_else(|| {
                PrepcastError::Config("llm provider is openai but no OpenAI API key is set".into())
            }),
            LlmProvider::Anthropic => anthropic.map(Some).ok_or_else(|| {
                PrepcastError::Config(
                    "llm provider is anthropic but no Anthropic API key is set".into(),
                )
            }),
            LlmProvider::Template => Ok(None),
        }
    }

    /// Whether both search credentials are present.
    pub fn has_search(&self) -> bool {
        self.search.api_key.is_some() && self.search.engine_id.is_some()
    }

    /// Built-in strategy profiles with the configured overrides applied.
    pub fn strategy_profiles(&self) -> PrepcastResult<StrategyProfiles> {
        let mut profiles = StrategyProfiles::default();
        for (name, steps) in &self.strategies {
            let kind: StrategyKind = serde_json::from_value(json!(name)).map_err(|_| {
                PrepcastError::Config(format!("unknown strategy: {name}"))
            })?;
            for (step, settings) in steps {
                profiles.merge_step(kind, step, settings.clone());
            }
        }
        Ok(profiles)
    }

    /// Per-step settings used for runs without the coordinator.
    pub fn direct_pipeline_config(&self) -> PipelineConfig {
        let mut settings = StepConfig::new();
        if let Some(t) = self.llm.temperature {
            settings.insert("temperature".into(), json!(t));
        }
        if let Some(m) = self.llm.max_tokens {
            settings.insert("max_tokens".into(), json!(m));
        }

        let mut config = PipelineConfig::new();
        if !settings.is_empty() {
            config.insert(GENERATION_STEP.to_string(), settings);
        }
        config
    }
}
