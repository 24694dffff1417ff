pub mod app;
pub mod config;
pub mod handlers;
pub mod llm;
pub mod news;
pub mod orchestration;
pub mod shared;
pub mod tasks;
