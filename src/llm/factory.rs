use crate::config::{LlmProviderKind, Settings};
use crate::llm::anthropic::AnthropicAdapter;
use crate::llm::openai::OpenAiAdapter;
use crate::llm::{LlmAdapter, LlmError};
use std::sync::Arc;
use std::time::Duration;

fn required<'a>(
    value: &'a Option<String>,
    provider: &'static str,
    var: &'static str,
) -> Result<&'a str, LlmError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(LlmError::MissingCredential { provider, var })
}

/// Builds the configured provider adapter.
pub fn build_llm_adapter(settings: &Settings) -> Result<Arc<dyn LlmAdapter>, LlmError> {
    let provider = LlmProviderKind::parse(&settings.llm_provider)
        .map_err(|_| LlmError::UnsupportedProvider(settings.llm_provider.clone()))?;
    let timeout = Duration::from_secs(settings.llm_timeout_seconds);
    let temperature = settings.llm_temperature;

    let adapter: Arc<dyn LlmAdapter> = match provider {
        LlmProviderKind::OpenAi => {
            let key = required(&settings.openai_api_key, "openai", "OPENAI_API_KEY")?;
            Arc::new(OpenAiAdapter::openai(
                key,
                settings.openai_base_url.as_deref(),
                &settings.llm_model,
                temperature,
                timeout,
            ))
        }
        LlmProviderKind::Anthropic => {
            let key = required(&settings.anthropic_api_key, "anthropic", "ANTHROPIC_API_KEY")?;
            Arc::new(AnthropicAdapter::new(
                key,
                &settings.llm_model,
                temperature,
                timeout,
            ))
        }
        LlmProviderKind::Azure => {
            let key = required(&settings.azure_openai_api_key, "azure", "AZURE_OPENAI_API_KEY")?;
            let endpoint = required(
                &settings.azure_openai_endpoint,
                "azure",
                "AZURE_OPENAI_ENDPOINT",
            )?;
            let deployment = settings
                .azure_openai_deployment
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(settings.llm_model.as_str());
            Arc::new(OpenAiAdapter::azure(
                key,
                endpoint,
                deployment,
                &settings.azure_openai_api_version,
                temperature,
                timeout,
            ))
        }
    };
    Ok(adapter)
}
