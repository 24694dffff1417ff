use std::path::PathBuf;

pub const DEFAULT_TASK_CONFIG_DIR: &str = "configs/tasks";
pub const DEFAULT_SETTINGS_FILE_NAME: &str = "p4agent.yaml";
pub const SETTINGS_FILE_ENV: &str = "P4AGENT_CONFIG";

/// Explicit `P4AGENT_CONFIG` path, else `p4agent.yaml` in the working
/// directory when it exists.
pub fn resolve_settings_file<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(explicit) = lookup(SETTINGS_FILE_ENV).filter(|v| !v.trim().is_empty()) {
        return Some(PathBuf::from(explicit.trim()));
    }
    let local = PathBuf::from(DEFAULT_SETTINGS_FILE_NAME);
    local.is_file().then_some(local)
}
