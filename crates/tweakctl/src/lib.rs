//! Tweakctl library - exposes the CLI pieces for testing

pub mod cli;
pub mod commands;
pub mod display;
pub mod logging;

pub use cli::{Cli, Commands};
pub use commands::{load_config, App};
