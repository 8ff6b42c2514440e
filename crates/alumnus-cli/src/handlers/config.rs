//! Config command handler

use crate::config::AppConfig;
use crate::error::CliResult;
use crate::ConfigArgs;

/// Execute the config command
pub fn execute_config(config: &AppConfig, args: &ConfigArgs) -> CliResult<()> {
    let yaml = if args.default {
        AppConfig::default().to_yaml()?
    } else {
        config.to_yaml()?
    };
    print!("{yaml}");
    Ok(())
}
