//! Client settings: a TOML file per build profile plus `GYMTRACK__*`
//! environment overrides, and the command line that picks the file.
//! `bin/settings_demo.rs` prints what gets loaded.

mod cli;
pub use clap::{Parser, Subcommand};
pub use cli::*;

mod settings;
pub use settings::*;
