use crate::llm::{parse_json_text, post_json, LlmAdapter, LlmError, OutputSchema};
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Auth {
    Bearer(String),
    ApiKey(String),
}

/// Chat-completions adapter for OpenAI and Azure OpenAI deployments.
pub struct OpenAiAdapter {
    agent: ureq::Agent,
    endpoint: String,
    auth: Auth,
    model: Option<String>,
    temperature: f32,
}

impl OpenAiAdapter {
    pub fn openai(
        api_key: &str,
        base_url: Option<&str>,
        model: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        let base = base_url
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_OPENAI_BASE_URL)
            .trim_end_matches('/');
        Self {
            agent: build_agent(timeout),
            endpoint: format!("{base}/chat/completions"),
            auth: Auth::Bearer(api_key.to_string()),
            model: Some(model.to_string()),
            temperature,
        }
    }

    pub fn azure(
        api_key: &str,
        endpoint: &str,
        deployment: &str,
        api_version: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        let base = endpoint.trim().trim_end_matches('/');
        Self {
            agent: build_agent(timeout),
            endpoint: format!(
                "{base}/openai/deployments/{deployment}/chat/completions?api-version={api_version}"
            ),
            auth: Auth::ApiKey(api_key.to_string()),
            model: None,
            temperature,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, prompt: &str, schema: &OutputSchema) -> Value {
        let mut body = json!({
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": "Respond only with JSON that matches the provided schema."},
                {"role": "user", "content": prompt}
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "description": schema.description,
                    "schema": schema.json_schema
                }
            }
        });
        if let (Some(model), Some(map)) = (&self.model, body.as_object_mut()) {
            map.insert("model".to_string(), Value::String(model.clone()));
        }
        body
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

fn message_content(response: &Value) -> Result<&str, LlmError> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            LlmError::Response("chat completion response has no message content".to_string())
        })
}

impl LlmAdapter for OpenAiAdapter {
    fn invoke_structured(&self, prompt: &str, schema: &OutputSchema) -> Result<Value, LlmError> {
        let bearer;
        let headers: [(&str, &str); 1] = match &self.auth {
            Auth::Bearer(key) => {
                bearer = format!("Bearer {key}");
                [("authorization", bearer.as_str())]
            }
            Auth::ApiKey(key) => [("api-key", key.as_str())],
        };
        let response = post_json(
            &self.agent,
            &self.endpoint,
            &headers,
            &self.request_body(prompt, schema),
        )?;
        parse_json_text(message_content(&response)?)
    }
}
