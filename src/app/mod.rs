pub mod cli;
pub mod command_handlers;

pub use command_handlers::run_cli;
