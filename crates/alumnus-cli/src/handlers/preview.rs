//! Preview command handler

use crate::config::AppConfig;
use crate::error::CliResult;
use crate::PreviewArgs;
use alumnus::{Contact, CsvRecordSource, MessageRenderer, RecordSource};

/// Execute the preview command
pub fn execute_preview(config: &AppConfig, args: &PreviewArgs) -> CliResult<()> {
    let renderer = config.renderer(args.template.as_deref())?;
    let path = args.sheet.clone().unwrap_or_else(|| config.sheet.path.clone());
    let mut records = CsvRecordSource::new(path)
        .with_columns(config.sheet.columns.clone())
        .with_labels(config.sheet.labels.clone());

    let pending = records.fetch_pending()?;
    if pending.is_empty() {
        println!("No pending contacts in {}", records.path().display());
        return Ok(());
    }
    for preview in render_previews(&renderer, &pending, args.limit)? {
        println!("{preview}");
    }
    if pending.len() > args.limit {
        println!("... and {} more pending", pending.len() - args.limit);
    }
    Ok(())
}

/// Framed previews for the first `limit` contacts
pub fn render_previews(
    renderer: &MessageRenderer,
    contacts: &[Contact],
    limit: usize,
) -> CliResult<Vec<String>> {
    contacts
        .iter()
        .take(limit)
        .map(|contact| Ok(renderer.preview(contact)?))
        .collect()
}
