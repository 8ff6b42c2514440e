//! Run command handler: one outreach campaign

use crate::config::AppConfig;
use crate::error::CliResult;
use crate::output::ProgressReporter;
use crate::RunArgs;
use alumnus::{CsvRecordSource, RecordSource};

/// Config with the command-line flags applied on top
#[must_use]
pub fn apply_overrides(config: &AppConfig, args: &RunArgs) -> AppConfig {
    let mut config = config.clone();
    if let Some(max) = args.max_contacts {
        config.campaign.max_contacts = max.max(1);
    }
    if let Some(delay) = args.delay {
        config.campaign.delay_secs = delay;
    }
    if let Some(template) = &args.template {
        config.campaign.template.clone_from(template);
        config.campaign.template_file = None;
    }
    if let Some(sheet) = &args.sheet {
        config.sheet.path.clone_from(sheet);
    }
    if args.headless {
        config.browser.headless = true;
    }
    config
}

fn record_source(config: &AppConfig) -> CsvRecordSource {
    CsvRecordSource::new(config.sheet.path.clone())
        .with_columns(config.sheet.columns.clone())
        .with_labels(config.sheet.labels.clone())
}

/// Execute the run command
pub fn execute_run(config: &AppConfig, args: &RunArgs, reporter: &mut ProgressReporter) -> CliResult<()> {
    let config = apply_overrides(config, args);
    let renderer = config.renderer(None)?;
    let mut records = record_source(&config);
    let pending = records.fetch_pending()?;

    reporter.header("Alumni outreach");
    reporter.info(&format!(
        "{} pending in {}, template '{}', up to {} this session",
        pending.len(),
        records.path().display(),
        renderer.template().key(),
        config.campaign.max_contacts
    ));
    if pending.is_empty() {
        reporter.info("Nothing to do");
        return Ok(());
    }

    run_campaign(&config, &renderer, &mut records, pending, reporter)
}

#[cfg(feature = "browser")]
fn run_campaign(
    config: &AppConfig,
    renderer: &alumnus::MessageRenderer,
    records: &mut CsvRecordSource,
    pending: Vec<alumnus::Contact>,
    reporter: &mut ProgressReporter,
) -> CliResult<()> {
    use super::check_login::ensure_logged_in;
    use alumnus::{AuditLog, Campaign, ChromiumDriver, Session};
    use std::time::Instant;

    let audit = AuditLog::open(config.logging.audit_path())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let session = Session::<ChromiumDriver>::launch(config.browser.clone(), config.locator_table())
            .await?
            .with_timings(config.timings)
            .with_typing(config.typing.clone());

        let started = Instant::now();
        let result = match ensure_logged_in(&session, &config.campaign.feed_url, reporter).await {
            Ok(()) => Campaign::new(&session, records, renderer)
                .with_audit(&audit)
                .with_options(config.campaign_options())
                .run(pending, reporter)
                .await
                .map_err(crate::CliError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "browser did not close cleanly");
        }

        let summary = result?;
        reporter.summary(&summary, started.elapsed());
        reporter.info(&format!("Audit log: {}", audit.path().display()));
        Ok::<(), crate::CliError>(())
    })
}

#[cfg(not(feature = "browser"))]
fn run_campaign(
    _config: &AppConfig,
    _renderer: &alumnus::MessageRenderer,
    _records: &mut CsvRecordSource,
    _pending: Vec<alumnus::Contact>,
    _reporter: &mut ProgressReporter,
) -> CliResult<()> {
    Err(crate::CliError::feature_disabled("browser"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_overrides() {
        let args = RunArgs {
            max_contacts: Some(5),
            delay: Some(90),
            template: Some("quick".to_string()),
            sheet: Some(PathBuf::from("mezunlar.csv")),
            headless: true,
        };
        let mut base = AppConfig::default();
        base.campaign.template_file = Some(PathBuf::from("ozel.txt"));
        let config = apply_overrides(&base, &args);
        assert_eq!(config.campaign.max_contacts, 5);
        assert_eq!(config.campaign.delay_secs, 90);
        assert_eq!(config.campaign.template, "quick");
        assert_eq!(config.campaign.template_file, None);
        assert_eq!(config.sheet.path, PathBuf::from("mezunlar.csv"));
        assert!(config.browser.headless);
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let config = apply_overrides(&AppConfig::default(), &RunArgs::default());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_nothing_pending_needs_no_browser() {
        let mut sheet = tempfile::NamedTempFile::new().unwrap();
        writeln!(sheet, "Ad Soyad,LinkedIn URL,Durum").unwrap();
        writeln!(sheet, "Ayşe Yılmaz,linkedin.com/in/ayse,Gönderildi").unwrap();
        let args = RunArgs {
            sheet: Some(sheet.path().to_path_buf()),
            ..RunArgs::default()
        };
        let mut reporter = ProgressReporter::new(false, true);
        execute_run(&AppConfig::default(), &args, &mut reporter).unwrap();
    }

    #[test]
    fn test_unknown_template_fails_before_launch() {
        let args = RunArgs {
            template: Some("nope".to_string()),
            ..RunArgs::default()
        };
        let mut reporter = ProgressReporter::new(false, true);
        assert!(execute_run(&AppConfig::default(), &args, &mut reporter).is_err());
    }
}
