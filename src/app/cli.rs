#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Run,
    Tasks,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "run" => CliVerb::Run,
        "tasks" => CliVerb::Tasks,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Usage: p4agent <command> [options]".to_string(),
        String::new(),
        "Commands:".to_string(),
        "  run --task-id <id> --input-json <json>   Run one task and print its JSON response"
            .to_string(),
        "  run --task-id <id> --target-file <path>  Shorthand for {\"target_file\": <path>}"
            .to_string(),
        "  tasks                                    List runnable task ids".to_string(),
        "  help                                     Show this message".to_string(),
        String::new(),
        "Environment:".to_string(),
        "  P4AGENT_CONFIG                           Settings file (default ./p4agent.yaml)"
            .to_string(),
        "  P4AGENT_LOG                              Log filter when RUST_LOG is unset".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
