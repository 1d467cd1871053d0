use crate::adapters::gemini::{GeminiConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::core::crowding::{CrowdingThresholds, SimulationParams, MAX_AGENTS};
use crate::core::orchestrator::{PromptSettings, DEFAULT_SYSTEM_PROMPT};
use crate::core::ScoreScale;
use crate::utils::error::{AdvisorError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "commute-advisor.toml";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub dataset: DatasetConfig,
    pub scores: ScoresConfig,
    pub simulation: SimulationConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: "data/commuter_data.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoresConfig {
    pub min: f64,
    pub max: f64,
}

impl Default for ScoresConfig {
    fn default() -> Self {
        let scale = ScoreScale::default();
        Self {
            min: scale.min,
            max: scale.max,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub capacity: u32,
    pub agents: u32,
    pub steps: u32,
    pub seed: u64,
    pub medium_threshold: f64,
    pub high_threshold: f64,
    pub routes: HashMap<String, u32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let params = SimulationParams::default();
        Self {
            capacity: params.capacity,
            agents: params.agents,
            steps: params.steps,
            seed: params.seed,
            medium_threshold: params.thresholds.medium,
            high_threshold: params.thresholds.high,
            routes: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub timeout_seconds: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_seconds: 30,
            temperature: 0.7,
            max_output_tokens: 150,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub system_prompt: String,
    pub history_limit: usize,
    pub local_recommendations: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_limit: 20,
            local_recommendations: true,
        }
    }
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// An explicitly requested file must exist; the default path is optional.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path);
                Self::from_file(path)
            }
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                tracing::info!("Loading configuration from {}", DEFAULT_CONFIG_PATH);
                Self::from_file(DEFAULT_CONFIG_PATH)
            }
            None => {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| AdvisorError::configuration(format!("TOML parsing error: {}", e)))
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| AdvisorError::configuration(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn score_scale(&self) -> ScoreScale {
        ScoreScale {
            min: self.scores.min,
            max: self.scores.max,
        }
    }

    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams {
            capacity: self.simulation.capacity,
            agents: self.simulation.agents,
            steps: self.simulation.steps,
            seed: self.simulation.seed,
            thresholds: CrowdingThresholds {
                medium: self.simulation.medium_threshold,
                high: self.simulation.high_threshold,
            },
            route_capacities: self.simulation.routes.clone(),
        }
    }

    pub fn prompt_settings(&self) -> PromptSettings {
        PromptSettings {
            system_prompt: self.chat.system_prompt.clone(),
            history_limit: self.chat.history_limit,
        }
    }

    /// The key comes from `[llm] api_key` when it resolved to a value, and
    /// from the environment otherwise.
    pub fn gemini_config(&self) -> Result<GeminiConfig> {
        let configured = self
            .llm
            .api_key
            .as_ref()
            .filter(|key| {
                let key = key.expose_secret();
                !key.trim().is_empty() && !key.starts_with("${")
            })
            .cloned();

        let api_key = match configured {
            Some(key) => key,
            None => std::env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from)
                .ok_or_else(|| {
                    AdvisorError::configuration(format!(
                        "no API key configured; set {} or [llm] api_key",
                        API_KEY_ENV
                    ))
                })?,
        };

        Ok(GeminiConfig {
            endpoint: self.llm.endpoint.clone(),
            model: self.llm.model.clone(),
            api_key,
            timeout: Duration::from_secs(self.llm.timeout_seconds),
            temperature: self.llm.temperature,
            max_output_tokens: self.llm.max_output_tokens,
        })
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("dataset.path", &self.dataset.path)?;

        if !(self.scores.min < self.scores.max) {
            return Err(AdvisorError::InvalidConfigValue {
                field: "scores".to_string(),
                value: format!("{}..{}", self.scores.min, self.scores.max),
                reason: "min must be lower than max".to_string(),
            });
        }

        validation::validate_positive_number(
            "simulation.capacity",
            self.simulation.capacity as usize,
            1,
        )?;
        validation::validate_range("simulation.agents", self.simulation.agents, 1, MAX_AGENTS)?;
        validation::validate_positive_number("simulation.steps", self.simulation.steps as usize, 1)?;
        for (route, capacity) in &self.simulation.routes {
            validation::validate_positive_number(
                &format!("simulation.routes.{}", route),
                *capacity as usize,
                1,
            )?;
        }
        validation::validate_range(
            "simulation.medium_threshold",
            self.simulation.medium_threshold,
            0.0,
            1.0,
        )?;
        validation::validate_range(
            "simulation.high_threshold",
            self.simulation.high_threshold,
            0.0,
            1.0,
        )?;
        if self.simulation.medium_threshold >= self.simulation.high_threshold {
            return Err(AdvisorError::InvalidConfigValue {
                field: "simulation.medium_threshold".to_string(),
                value: self.simulation.medium_threshold.to_string(),
                reason: "must be lower than simulation.high_threshold".to_string(),
            });
        }

        validation::validate_url("llm.endpoint", &self.llm.endpoint)?;
        validation::validate_non_empty_string("llm.model", &self.llm.model)?;
        validation::validate_positive_number(
            "llm.timeout_seconds",
            self.llm.timeout_seconds as usize,
            1,
        )?;
        validation::validate_range("llm.temperature", self.llm.temperature, 0.0, 2.0)?;
        validation::validate_positive_number(
            "llm.max_output_tokens",
            self.llm.max_output_tokens as usize,
            1,
        )?;

        validation::validate_non_empty_string("chat.system_prompt", &self.chat.system_prompt)?;

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
