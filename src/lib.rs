pub mod cli;
pub mod commands;
pub mod config;
pub mod demo_log;
pub mod dsn;
pub mod plan;
pub mod presenter;
pub mod process;
pub mod script;
pub mod sequencer;
pub mod style;
