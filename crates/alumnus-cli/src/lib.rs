//! Alumnus CLI library
//!
//! Command-line front end for alumni outreach campaigns: argument parsing,
//! YAML configuration, logging setup, progress output and the command
//! handlers the `alumnus` binary dispatches to.

#![allow(clippy::format_push_string)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{CheckLoginArgs, Cli, ColorArg, Commands, ConfigArgs, PreviewArgs, RunArgs};
pub use config::{AppConfig, CampaignConfig, ColorChoice, LoggingConfig, SheetConfig, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{summary_lines, ProgressReporter};
