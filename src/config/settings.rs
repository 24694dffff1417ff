use super::{ConfigError, DEFAULT_TASK_CONFIG_DIR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAi,
    Anthropic,
    Azure,
}

impl LlmProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Azure => "azure",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "azure" => Ok(Self::Azure),
            _ => Err(format!("Unsupported llm_provider '{raw}'")),
        }
    }
}

impl std::fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_task_config_dir")]
    pub task_config_dir: PathBuf,
    #[serde(default)]
    pub llm_enabled: bool,
    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub llm_temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    pub llm_timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub llm_fallback_to_rules: bool,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub openai_base_url: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub azure_openai_api_key: Option<String>,
    #[serde(default)]
    pub azure_openai_endpoint: Option<String>,
    #[serde(default = "default_azure_api_version")]
    pub azure_openai_api_version: String,
    #[serde(default)]
    pub azure_openai_deployment: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            task_config_dir: default_task_config_dir(),
            llm_enabled: false,
            llm_provider: default_llm_provider(),
            llm_model: default_llm_model(),
            llm_temperature: 0.0,
            llm_timeout_seconds: default_llm_timeout_seconds(),
            llm_fallback_to_rules: true,
            openai_api_key: None,
            openai_base_url: None,
            anthropic_api_key: None,
            azure_openai_api_key: None,
            azure_openai_endpoint: None,
            azure_openai_api_version: default_azure_api_version(),
            azure_openai_deployment: None,
        }
    }
}

fn default_task_config_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TASK_CONFIG_DIR)
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_seconds() -> u64 {
    30
}

fn default_azure_api_version() -> String {
    "2024-02-15-preview".to_string()
}

fn default_true() -> bool {
    true
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            var: var.to_string(),
            reason: format!("expected a boolean, got `{raw}`"),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|err| ConfigError::Env {
        var: var.to_string(),
        reason: err.to_string(),
    })
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Applies `P4AGENT_*` overrides plus the provider credential variables.
    /// Blank values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(raw) = get("P4AGENT_TASK_CONFIG_DIR") {
            self.task_config_dir = PathBuf::from(raw.trim());
        }
        if let Some(raw) = get("P4AGENT_LLM_ENABLED") {
            self.llm_enabled = parse_bool("P4AGENT_LLM_ENABLED", &raw)?;
        }
        if let Some(raw) = get("P4AGENT_LLM_PROVIDER") {
            self.llm_provider = raw.trim().to_string();
        }
        if let Some(raw) = get("P4AGENT_LLM_MODEL") {
            self.llm_model = raw.trim().to_string();
        }
        if let Some(raw) = get("P4AGENT_LLM_TEMPERATURE") {
            self.llm_temperature = parse_number("P4AGENT_LLM_TEMPERATURE", &raw)?;
        }
        if let Some(raw) = get("P4AGENT_LLM_TIMEOUT_SECONDS") {
            self.llm_timeout_seconds = parse_number("P4AGENT_LLM_TIMEOUT_SECONDS", &raw)?;
        }
        if let Some(raw) = get("P4AGENT_LLM_FALLBACK_TO_RULES") {
            self.llm_fallback_to_rules = parse_bool("P4AGENT_LLM_FALLBACK_TO_RULES", &raw)?;
        }

        let secrets: [(&str, &mut Option<String>); 6] = [
            ("OPENAI_API_KEY", &mut self.openai_api_key),
            ("OPENAI_BASE_URL", &mut self.openai_base_url),
            ("ANTHROPIC_API_KEY", &mut self.anthropic_api_key),
            ("AZURE_OPENAI_API_KEY", &mut self.azure_openai_api_key),
            ("AZURE_OPENAI_ENDPOINT", &mut self.azure_openai_endpoint),
            ("AZURE_OPENAI_DEPLOYMENT", &mut self.azure_openai_deployment),
        ];
        for (var, slot) in secrets {
            if let Some(raw) = get(var) {
                *slot = Some(raw.trim().to_string());
            }
        }
        if let Some(raw) = get("AZURE_OPENAI_API_VERSION") {
            self.azure_openai_api_version = raw.trim().to_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.task_config_dir.as_os_str().is_empty() {
            return Err(ConfigError::Settings(
                "`task_config_dir` must be non-empty".to_string(),
            ));
        }
        if self.llm_provider.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`llm_provider` must be non-empty".to_string(),
            ));
        }
        if !self.llm_temperature.is_finite() || self.llm_temperature < 0.0 {
            return Err(ConfigError::Settings(
                "`llm_temperature` must be a non-negative number".to_string(),
            ));
        }
        if self.llm_timeout_seconds == 0 {
            return Err(ConfigError::Settings(
                "`llm_timeout_seconds` must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
