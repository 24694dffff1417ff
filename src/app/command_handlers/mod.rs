use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::orchestration::AgentService;

pub mod tasks;

fn load_service() -> Result<AgentService, String> {
    AgentService::load().map_err(|err| err.to_string())
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Run => {
            let request = tasks::parse_run_args(&args[1..])?;
            tasks::cmd_run(&load_service()?, request)
        }
        CliVerb::Tasks => tasks::cmd_tasks(&load_service()?),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}
