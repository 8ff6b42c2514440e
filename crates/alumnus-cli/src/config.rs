//! CLI configuration
//!
//! Settings come from a YAML file whose sections map onto the library's
//! own config types. Every section and field is optional; a missing file
//! means all defaults.

use crate::error::{CliError, CliResult};
use alumnus::{
    BrowserConfig, CampaignOptions, ColumnMapping, Language, LocatorTable, MessageRenderer,
    MessageTemplate, StatusLabels, TemplateDefaults, Timings, TypingProfile, DEFAULT_MAX_CONTACTS,
    FEED_URL,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// From the -q / -v flags
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Log filter for this level; `None` defers to the configured level
    #[must_use]
    pub const fn log_filter(self) -> Option<&'static str> {
        match self {
            Self::Quiet => Some("warn"),
            Self::Normal => None,
            Self::Verbose => Some("debug"),
            Self::Debug => Some("trace"),
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stderr().features().colors_supported(),
        }
    }
}

/// Contact sheet location and layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// CSV file
    pub path: PathBuf,
    pub columns: ColumnMapping,
    pub labels: StatusLabels,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("alumni.csv"),
            columns: ColumnMapping::default(),
            labels: StatusLabels::default(),
        }
    }
}

/// Campaign pacing and message choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    pub max_contacts: usize,
    /// Seconds between contacts
    pub delay_secs: u64,
    /// Built-in template key
    pub template: String,
    /// Custom template body; overrides `template` when set
    pub template_file: Option<PathBuf>,
    /// Fallback phrases for a custom template
    pub template_language: Language,
    pub skip_processed: bool,
    pub screenshot_on_error: bool,
    /// Page used for the login check
    pub feed_url: String,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            max_contacts: DEFAULT_MAX_CONTACTS,
            delay_secs: 45,
            template: "tr_formal".to_string(),
            template_file: None,
            template_language: Language::Turkish,
            skip_processed: true,
            screenshot_on_error: true,
            feed_url: FEED_URL.to_string(),
        }
    }
}

/// Logging setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for log files, the audit log and screenshots
    pub dir: PathBuf,
    pub level: String,
    pub console: bool,
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            level: "info".to_string(),
            console: true,
            file: true,
        }
    }
}

impl LoggingConfig {
    /// Audit log path
    #[must_use]
    pub fn audit_path(&self) -> PathBuf {
        self.dir.join("campaign_log.csv")
    }

    /// Error screenshot directory
    #[must_use]
    pub fn screenshot_dir(&self) -> PathBuf {
        self.dir.join("screenshots")
    }
}

/// Everything the YAML file can set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub sheet: SheetConfig,
    pub campaign: CampaignConfig,
    pub message: TemplateDefaults,
    pub logging: LoggingConfig,
    pub timings: Timings,
    pub typing: TypingProfile,
    /// Extra locators per role, tried before the built-in ones
    pub locators: LocatorTable,
    /// Use `locators` instead of the built-in list for each role it names
    pub replace_locators: bool,
}

impl AppConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse YAML text
    pub fn from_yaml(text: &str) -> CliResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> CliResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    fn validate(&self) -> CliResult<()> {
        if self.campaign.max_contacts == 0 {
            return Err(CliError::config("campaign.max_contacts must be at least 1"));
        }
        if self.typing.min_delay_ms > self.typing.max_delay_ms {
            return Err(CliError::config(
                "typing.min_delay_ms is larger than typing.max_delay_ms",
            ));
        }
        Ok(())
    }

    /// Built-in locators with the configured overrides applied
    #[must_use]
    pub fn locator_table(&self) -> LocatorTable {
        let mut table = LocatorTable::linkedin();
        table.merge(&self.locators, self.replace_locators);
        table
    }

    /// Renderer for the configured template, or `key` when given
    pub fn renderer(&self, key: Option<&str>) -> CliResult<MessageRenderer> {
        let template = match (key, &self.campaign.template_file) {
            (None, Some(file)) => {
                let body = std::fs::read_to_string(file)?;
                MessageTemplate::custom(body, self.campaign.template_language)
            }
            (key, _) => {
                let key = key.unwrap_or(&self.campaign.template);
                MessageTemplate::from_key(key).ok_or_else(|| {
                    let known: Vec<&str> = MessageTemplate::BUILT_IN.iter().map(MessageTemplate::key).collect();
                    CliError::invalid_argument(format!(
                        "unknown template '{key}' (available: {})",
                        known.join(", ")
                    ))
                })?
            }
        };
        let renderer = MessageRenderer::new(template, self.message.clone());
        renderer.validate()?;
        Ok(renderer)
    }

    /// Campaign options from the campaign and logging sections
    #[must_use]
    pub fn campaign_options(&self) -> CampaignOptions {
        let options = CampaignOptions::default()
            .with_max_contacts(self.campaign.max_contacts)
            .with_delay(Duration::from_secs(self.campaign.delay_secs))
            .with_skip_processed(self.campaign.skip_processed);
        if self.campaign.screenshot_on_error {
            options.with_screenshot_dir(self.logging.screenshot_dir())
        } else {
            options
        }
    }
}
