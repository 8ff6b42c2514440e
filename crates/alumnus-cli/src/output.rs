//! Output formatting and progress reporting

use alumnus::{CampaignObserver, CampaignSummary, Contact, ContactStatus};
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for campaign runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` contacts
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Update progress message
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    /// Finish progress bar
    pub fn finish(&mut self) {
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(self.prefix("✓", "OK", Style::new().green().bold()), message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        self.line(self.prefix("✗", "FAIL", Style::new().red().bold()), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(self.prefix("⚠", "WARN", Style::new().yellow().bold()), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(self.prefix("ℹ", "INFO", Style::new().blue().bold()), message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print the campaign summary
    pub fn summary(&self, summary: &CampaignSummary, duration: Duration) {
        if self.quiet && summary.errors == 0 {
            return;
        }
        let _ = self.term.write_line("");
        for line in summary_lines(summary, duration) {
            let line = if self.use_color && line.starts_with("Errors") && summary.errors > 0 {
                style(line).red().bold().to_string()
            } else {
                line
            };
            let _ = self.term.write_line(&line);
        }
    }

    fn prefix(&self, symbol: &str, plain: &str, styled: Style) -> String {
        if self.use_color {
            styled.apply_to(symbol).to_string()
        } else {
            plain.to_string()
        }
    }

    /// Print above the progress bar when one is running
    fn line(&self, prefix: String, message: &str) {
        let text = format!("{prefix} {message}");
        match &self.progress_bar {
            Some(pb) => pb.println(text),
            None => {
                let _ = self.term.write_line(&text);
            }
        }
    }
}

impl CampaignObserver for ProgressReporter {
    fn on_start(&mut self, total: usize) {
        self.start_progress(total as u64, "starting");
    }

    fn on_contact(&mut self, _index: usize, contact: &Contact) {
        self.set_message(&contact.name);
    }

    fn on_result(&mut self, contact: &Contact, status: ContactStatus, notes: &str) {
        let message = format!("{}: {notes}", contact.name);
        match status {
            ContactStatus::Sent => self.success(&message),
            ContactStatus::Error => self.failure(&message),
            ContactStatus::Skipped | ContactStatus::Pending => self.warning(&message),
        }
        self.increment(1);
    }

    fn on_waiting(&mut self, delay: Duration) {
        self.set_message(&format!("waiting {}s", delay.as_secs()));
    }

    fn on_finish(&mut self, _summary: &CampaignSummary) {
        self.finish();
    }
}

/// Plain summary text, one line per count
#[must_use]
pub fn summary_lines(summary: &CampaignSummary, duration: Duration) -> Vec<String> {
    vec![
        format!("Campaign finished in {:.0}s", duration.as_secs_f64()),
        format!("Sent:              {}", summary.sent),
        format!("Connection needed: {}", summary.connection_needed),
        format!("Skipped:           {}", summary.skipped),
        format!("Errors:            {}", summary.errors),
        format!("Total:             {}", summary.total),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines() {
        let summary = CampaignSummary {
            sent: 3,
            connection_needed: 1,
            skipped: 2,
            errors: 1,
            total: 7,
        };
        let lines = summary_lines(&summary, Duration::from_secs(90));
        assert_eq!(lines[0], "Campaign finished in 90s");
        assert!(lines[1].ends_with(" 3"));
        assert!(lines[5].starts_with("Total"));
        assert!(lines[5].ends_with(" 7"));
    }

    #[test]
    fn test_quiet_reporter_has_no_bar() {
        let mut reporter = ProgressReporter::new(false, true);
        reporter.on_start(5);
        assert!(reporter.progress_bar.is_none());
        let contact = Contact::new(0, "Ayşe Yılmaz", "linkedin.com/in/ayse");
        reporter.on_result(&contact, ContactStatus::Sent, "sent");
        reporter.on_finish(&CampaignSummary::default());
    }

    #[test]
    fn test_bar_cleared_on_finish() {
        let mut reporter = ProgressReporter::new(false, false);
        reporter.on_start(2);
        assert!(reporter.progress_bar.is_some());
        reporter.on_waiting(Duration::from_secs(45));
        reporter.on_finish(&CampaignSummary::default());
        assert!(reporter.progress_bar.is_none());
    }
}
