//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Alumnus: send personalised LinkedIn messages to alumni listed in a spreadsheet
#[derive(Parser, Debug)]
#[command(name = "alumnus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Configuration file
    #[arg(long, global = true, env = "ALUMNUS_CONFIG", default_value = "alumnus.yaml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Message every pending contact, up to the session cap
    Run(RunArgs),

    /// Render messages for pending contacts without opening a browser
    Preview(PreviewArgs),

    /// List the built-in message templates
    Templates,

    /// Open the browser and report whether the profile is logged in
    CheckLogin(CheckLoginArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Maximum contacts to process in this session
    #[arg(long)]
    pub max_contacts: Option<usize>,

    /// Seconds to wait between contacts
    #[arg(long)]
    pub delay: Option<u64>,

    /// Template key (tr_formal, tr_semiformal, en_formal, quick)
    #[arg(short, long)]
    pub template: Option<String>,

    /// Contact sheet (CSV)
    #[arg(long)]
    pub sheet: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,
}

/// Arguments for the preview command
#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Template key
    #[arg(short, long)]
    pub template: Option<String>,

    /// Number of contacts to preview
    #[arg(short, long, default_value = "3")]
    pub limit: usize,

    /// Contact sheet (CSV)
    #[arg(long)]
    pub sheet: Option<PathBuf>,
}

/// Arguments for the check-login command
#[derive(Parser, Debug)]
pub struct CheckLoginArgs {
    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show the effective configuration
    #[arg(long)]
    pub show: bool,

    /// Show the built-in defaults
    #[arg(long, conflicts_with = "show")]
    pub default: bool,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
