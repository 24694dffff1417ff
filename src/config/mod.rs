pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_settings, load_settings_with};
pub use paths::{
    resolve_settings_file, DEFAULT_SETTINGS_FILE_NAME, DEFAULT_TASK_CONFIG_DIR, SETTINGS_FILE_ENV,
};
pub use settings::{LlmProviderKind, Settings};
