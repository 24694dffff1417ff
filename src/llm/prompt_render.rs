use crate::llm::LlmError;
use std::collections::BTreeMap;

/// Replaces `{{name}}` placeholders with values from `vars`. Unknown,
/// empty or unclosed placeholders are errors.
pub fn render_prompt(template: &str, vars: &BTreeMap<&str, String>) -> Result<String, LlmError> {
    let mut rendered = String::with_capacity(template.len());
    let mut cursor = template;

    while let Some(start) = cursor.find("{{") {
        rendered.push_str(&cursor[..start]);
        let after_open = &cursor[start + 2..];
        let Some(close_offset) = after_open.find("}}") else {
            return Err(LlmError::Prompt(
                "unclosed placeholder in template".to_string(),
            ));
        };
        let token = after_open[..close_offset].trim();
        if token.is_empty() {
            return Err(LlmError::Prompt("empty placeholder in template".to_string()));
        }
        let value = vars
            .get(token)
            .ok_or_else(|| LlmError::Prompt(format!("unknown placeholder `{token}`")))?;
        rendered.push_str(value);
        cursor = &after_open[close_offset + 2..];
    }

    rendered.push_str(cursor);
    Ok(rendered)
}
