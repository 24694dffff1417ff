use crate::orchestration::AgentService;
use crate::tasks::Payload;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub task_id: String,
    pub payload: Payload,
}

/// Parses `--task-id <id>` plus one of `--input-json <json>` or
/// `--target-file <path>`.
pub fn parse_run_args(args: &[String]) -> Result<RunRequest, String> {
    let mut task_id = None;
    let mut input_json = None;
    let mut target_file = None;
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        let slot = match flag {
            "--task-id" => &mut task_id,
            "--input-json" => &mut input_json,
            "--target-file" => &mut target_file,
            other => return Err(format!("unknown option `{other}`")),
        };
        let value = args
            .get(i + 1)
            .ok_or_else(|| format!("missing value for {flag}"))?;
        *slot = Some(value.clone());
        i += 2;
    }

    let task_id = task_id.ok_or_else(|| {
        "usage: run --task-id <id> (--input-json <json> | --target-file <path>)".to_string()
    })?;
    let payload = build_payload(input_json.as_deref(), target_file.as_deref())?;
    Ok(RunRequest { task_id, payload })
}

pub fn build_payload(
    input_json: Option<&str>,
    target_file: Option<&str>,
) -> Result<Payload, String> {
    if let Some(raw) = input_json {
        return match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(payload)) => Ok(payload),
            Ok(_) => Err("--input-json must decode to a JSON object".to_string()),
            Err(err) => Err(format!("--input-json is not valid json: {err}")),
        };
    }
    if let Some(path) = target_file {
        let mut payload = Payload::new();
        payload.insert("target_file".to_string(), Value::String(path.to_string()));
        return Ok(payload);
    }
    Err("Provide either --input-json or --target-file".to_string())
}

pub fn cmd_run(service: &AgentService, request: RunRequest) -> Result<String, String> {
    let response = service.run_task(&request.task_id, request.payload);
    serde_json::to_string_pretty(&response)
        .map_err(|err| format!("failed to encode task response: {err}"))
}

pub fn cmd_tasks(service: &AgentService) -> Result<String, String> {
    Ok(service.list_tasks().join("\n"))
}
