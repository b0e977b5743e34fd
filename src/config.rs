use serde::{Deserialize, Serialize};

use crate::clients::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_MS};
use crate::prompts::SURVEY_PROMPT_ID;

/// Main configuration structure loaded from satisfaction_survey.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub survey: SurveyConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Hosted model the survey runs against
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    pub timeout_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            max_output_tokens: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Survey presentation options
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Print instructions, output and usage panels while surveying
    pub verbose: bool,
    pub panel_width: usize,
    /// Registry id of the instruction prompt
    pub prompt_id: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            panel_width: 80,
            prompt_id: SURVEY_PROMPT_ID.to_string(),
        }
    }
}

pub const MIN_PANEL_WIDTH: usize = 20;

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub openai_api_key: Option<String>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            log_level: "satisfaction_survey=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_env() -> Self {
        let mut config = Self {
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            ..Self::default()
        };
        if let Ok(level) = std::env::var("RUST_LOG")
            && !level.trim().is_empty()
        {
            config.log_level = level;
        }
        config
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses SATISFACTION_SURVEY_CONFIG environment variable or defaults to "satisfaction_survey.toml"
    pub fn load() -> anyhow::Result<Self> {
        // SURVEY_ENV_FILE if set, otherwise ./.env
        if let Ok(env_path) = std::env::var("SURVEY_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path = std::env::var("SATISFACTION_SURVEY_CONFIG")
            .unwrap_or_else(|_| "satisfaction_survey.toml".to_string());

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate();

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Invalid survey config: {}", e))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("SURVEY_MODEL") {
            self.model.name = model;
            tracing::debug!("SURVEY_MODEL env override applied");
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            self.model.base_url = base_url;
            tracing::debug!("OPENAI_BASE_URL env override applied");
        }
        if let Some(t) = std::env::var("SURVEY_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
        {
            self.model.temperature = t;
        }
        if let Some(max) = std::env::var("SURVEY_MAX_OUTPUT_TOKENS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            self.model.max_output_tokens = Some(max);
        }
        if let Some(ms) = std::env::var("SURVEY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.model.timeout_ms = ms;
        }
        if let Ok(verbose) = std::env::var("SURVEY_VERBOSE") {
            self.survey.verbose = verbose == "1" || verbose.eq_ignore_ascii_case("true");
        }
        if let Ok(prompt_id) = std::env::var("SURVEY_PROMPT_ID") {
            self.survey.prompt_id = prompt_id;
        }
        if let Some(width) = std::env::var("SURVEY_PANEL_WIDTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.survey.panel_width = width;
        }
    }

    /// Clamp out-of-range values, warning about each adjustment
    pub fn validate(&mut self) {
        if !self.model.base_url.starts_with("http://") && !self.model.base_url.starts_with("https://")
        {
            tracing::warn!(
                "Model base URL '{}' doesn't start with http:// or https://",
                self.model.base_url
            );
        }

        if !self.model.temperature.is_finite() || !(0.0..=2.0).contains(&self.model.temperature) {
            let clamped = if self.model.temperature.is_finite() {
                self.model.temperature.clamp(0.0, 2.0)
            } else {
                0.0
            };
            tracing::warn!(
                "temperature {} outside 0.0..=2.0, clamping to {}",
                self.model.temperature,
                clamped
            );
            self.model.temperature = clamped;
        }

        if self.model.timeout_ms == 0 {
            tracing::warn!("timeout_ms 0 is not usable, falling back to {}", DEFAULT_TIMEOUT_MS);
            self.model.timeout_ms = DEFAULT_TIMEOUT_MS;
        }

        if self.survey.panel_width < MIN_PANEL_WIDTH {
            tracing::warn!(
                "panel_width {} below minimum {}, clamping",
                self.survey.panel_width,
                MIN_PANEL_WIDTH
            );
            self.survey.panel_width = MIN_PANEL_WIDTH;
        }
    }
}
