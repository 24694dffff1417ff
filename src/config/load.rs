use super::{resolve_settings_file, ConfigError, Settings};

/// Defaults, then the optional settings file, then environment overrides.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_with(|key| std::env::var(key).ok())
}

pub fn load_settings_with<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match resolve_settings_file(&lookup) {
        Some(path) => Settings::from_path(&path)?,
        None => Settings::default(),
    };
    settings.apply_env_overrides(&lookup)?;
    settings.validate()?;
    Ok(settings)
}
