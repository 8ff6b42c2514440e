//! Alumnus CLI: alumni outreach over LinkedIn direct messages
//!
//! ## Usage
//!
//! ```bash
//! alumnus preview --template quick      # Check the messages first
//! alumnus check-login                   # Make sure the browser profile is logged in
//! alumnus run --max-contacts 10         # Send to the next ten pending contacts
//! ```

use alumnus_cli::{
    handlers, logging, AppConfig, Cli, CliResult, ColorChoice, Commands, ProgressReporter,
    Verbosity,
};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();
    let config = AppConfig::load(&cli.config)?;

    // Only commands that drive the browser write log files
    let _guard = match cli.command {
        Commands::Run(_) | Commands::CheckLogin(_) => logging::init_logging(&config.logging, verbosity)?,
        _ => None,
    };
    let mut reporter = ProgressReporter::new(color.should_color(), verbosity.is_quiet());

    match cli.command {
        Commands::Run(args) => handlers::execute_run(&config, &args, &mut reporter),
        Commands::Preview(args) => handlers::execute_preview(&config, &args),
        Commands::Templates => {
            handlers::execute_templates();
            Ok(())
        }
        Commands::CheckLogin(args) => handlers::execute_check_login(&config, &args, &reporter),
        Commands::Config(args) => handlers::execute_config(&config, &args),
    }
}
