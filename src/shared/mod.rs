pub mod files;
pub mod ids;
pub mod logging;
