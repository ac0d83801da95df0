//! Channel presence occupancy analyzer CLI.
//!
//! This crate provides the command-line interface around the analysis core.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
