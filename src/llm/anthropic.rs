use crate::llm::{post_json, LlmAdapter, LlmError, OutputSchema};
use serde_json::{json, Value};
use std::time::Duration;

pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Messages API adapter; structured output comes back as a forced tool call.
pub struct AnthropicAdapter {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    temperature: f32,
}

impl AnthropicAdapter {
    pub fn new(api_key: &str, model: &str, temperature: f32, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
        }
    }

    fn request_body(&self, prompt: &str, schema: &OutputSchema) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
            "tools": [{
                "name": schema.name,
                "description": schema.description,
                "input_schema": schema.json_schema
            }],
            "tool_choice": {"type": "tool", "name": schema.name}
        })
    }
}

fn tool_input(response: &Value, tool_name: &str) -> Result<Value, LlmError> {
    response
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|block| {
            block.get("type").and_then(Value::as_str) == Some("tool_use")
                && block.get("name").and_then(Value::as_str) == Some(tool_name)
        })
        .and_then(|block| block.get("input"))
        .cloned()
        .ok_or_else(|| LlmError::Response(format!("response has no `{tool_name}` tool_use block")))
}

impl LlmAdapter for AnthropicAdapter {
    fn invoke_structured(&self, prompt: &str, schema: &OutputSchema) -> Result<Value, LlmError> {
        let response = post_json(
            &self.agent,
            ANTHROPIC_MESSAGES_URL,
            &[
                ("x-api-key", self.api_key.as_str()),
                ("anthropic-version", ANTHROPIC_VERSION),
            ],
            &self.request_body(prompt, schema),
        )?;
        tool_input(&response, schema.name)
    }
}
