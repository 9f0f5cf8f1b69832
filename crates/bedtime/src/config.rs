//! Configuration file support for bedtime.
//!
//! Settings are layered, highest priority first: command-line flags,
//! `bedtime.toml` in the working directory, `<config_dir>/bedtime/config.toml`,
//! then built-in defaults.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bedtime_agent::{ModelConfig, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, OPENAI_API_BASE};
use bedtime_core::DEFAULT_CALL_TIMEOUT;
use bedtime_critic::{ReadinessThreshold, ReviewOptions};

/// The project config file name
pub const CONFIG_FILE_NAME: &str = "bedtime.toml";
/// Directory under the platform config dir holding the global config
pub const GLOBAL_CONFIG_DIR: &str = "bedtime";
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";
/// Environment variable holding the API key unless `api_key_env` says otherwise
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

const STORYTELLER_TEMPERATURE: f64 = 0.1;
const STORYTELLER_MAX_TOKENS: u32 = 3000;
const JUDGE_TEMPERATURE: f64 = 0.1;
const JUDGE_MAX_TOKENS: u32 = 600;

/// One configuration layer as written on disk
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default model for both roles
    pub model: Option<String>,
    pub api_base: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Readiness threshold; validated when settings are resolved
    pub threshold: Option<i64>,
    pub timeout_secs: Option<u64>,
    pub system_prompt_file: Option<PathBuf>,
    #[serde(default)]
    pub storyteller: StorytellerConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StorytellerConfig {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JudgeConfig {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub child_age: Option<u32>,
    pub tone: Option<String>,
    pub length_target: Option<u32>,
}

impl FileConfig {
    /// Load a config file.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(config_path: &Path) -> Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    pub fn load_project(working_dir: &Path) -> Result<Option<Self>> {
        Self::load(&working_dir.join(CONFIG_FILE_NAME))
    }

    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILE))
    }

    pub fn load_global() -> Result<Option<Self>> {
        match Self::global_path() {
            Some(path) => Self::load(&path),
            None => Ok(None),
        }
    }

    /// Project layer over global layer
    pub fn load_layered(working_dir: &Path) -> Result<Self> {
        let project = Self::load_project(working_dir)?.unwrap_or_default();
        let global = Self::load_global()?.unwrap_or_default();
        Ok(project.or(global))
    }

    /// Fill every unset field from a lower-priority layer
    pub fn or(self, lower: FileConfig) -> FileConfig {
        FileConfig {
            model: self.model.or(lower.model),
            api_base: self.api_base.or(lower.api_base),
            api_key_env: self.api_key_env.or(lower.api_key_env),
            threshold: self.threshold.or(lower.threshold),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
            system_prompt_file: self.system_prompt_file.or(lower.system_prompt_file),
            storyteller: StorytellerConfig {
                model: self.storyteller.model.or(lower.storyteller.model),
                temperature: self.storyteller.temperature.or(lower.storyteller.temperature),
                max_tokens: self.storyteller.max_tokens.or(lower.storyteller.max_tokens),
            },
            judge: JudgeConfig {
                model: self.judge.model.or(lower.judge.model),
                temperature: self.judge.temperature.or(lower.judge.temperature),
                max_tokens: self.judge.max_tokens.or(lower.judge.max_tokens),
                child_age: self.judge.child_age.or(lower.judge.child_age),
                tone: self.judge.tone.or(lower.judge.tone),
                length_target: self.judge.length_target.or(lower.judge.length_target),
            },
        }
    }
}

/// Values taken from command-line flags
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub model: Option<String>,
    pub judge_model: Option<String>,
    pub threshold: Option<i64>,
    pub timeout_secs: Option<u64>,
    pub system_prompt_file: Option<PathBuf>,
}

/// Fully resolved settings for a session
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base: String,
    pub api_key_env: String,
    pub storyteller: ModelConfig,
    pub judge: ModelConfig,
    pub review: ReviewOptions,
    pub threshold: ReadinessThreshold,
    pub call_timeout: Duration,
    pub system_prompt_file: Option<PathBuf>,
}

impl Settings {
    pub fn resolve(overrides: &Overrides, file: FileConfig) -> Result<Self> {
        let raw_threshold = overrides.threshold.or(file.threshold);
        let threshold = match raw_threshold {
            Some(value) => ReadinessThreshold::new(value)?,
            None => ReadinessThreshold::default(),
        };

        let timeout_secs = overrides.timeout_secs.or(file.timeout_secs);
        let call_timeout = match timeout_secs {
            Some(0) => bail!("timeout_secs must be greater than zero"),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_CALL_TIMEOUT,
        };

        let storyteller_model = overrides
            .model
            .clone()
            .or(file.storyteller.model)
            .or_else(|| file.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let judge_model = overrides
            .judge_model
            .clone()
            .or_else(|| overrides.model.clone())
            .or(file.judge.model)
            .or(file.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let defaults = ReviewOptions::default();
        let review = ReviewOptions {
            child_age: file.judge.child_age.unwrap_or(defaults.child_age),
            tone: file.judge.tone.unwrap_or(defaults.tone),
            length_target: file.judge.length_target.unwrap_or(defaults.length_target),
        };

        Ok(Self {
            api_base: file
                .api_base
                .unwrap_or_else(|| OPENAI_API_BASE.to_string()),
            api_key_env: file
                .api_key_env
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
            storyteller: ModelConfig::new(storyteller_model)
                .with_temperature(
                    file.storyteller
                        .temperature
                        .unwrap_or(STORYTELLER_TEMPERATURE),
                )
                .with_max_tokens(file.storyteller.max_tokens.unwrap_or(STORYTELLER_MAX_TOKENS)),
            judge: ModelConfig::new(judge_model)
                .with_temperature(file.judge.temperature.unwrap_or(JUDGE_TEMPERATURE))
                .with_max_tokens(file.judge.max_tokens.unwrap_or(JUDGE_MAX_TOKENS)),
            review,
            threshold,
            call_timeout,
            system_prompt_file: overrides
                .system_prompt_file
                .clone()
                .or(file.system_prompt_file),
        })
    }

    /// Storyteller framing from the configured file, or the built-in one
    pub fn system_prompt(&self) -> Result<String> {
        match &self.system_prompt_file {
            Some(path) => {
                let content = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read system prompt file {}", path.display())
                })?;
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    bail!("System prompt file {} is empty", path.display());
                }
                Ok(trimmed.to_string())
            }
            None => Ok(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    /// API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!(
                "No API key found. Set the {} environment variable.",
                self.api_key_env
            ),
        }
    }
}
