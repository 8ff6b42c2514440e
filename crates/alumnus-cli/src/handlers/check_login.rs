//! Check-login command handler

use crate::config::AppConfig;
use crate::error::CliResult;
use crate::output::ProgressReporter;
use crate::CheckLoginArgs;

/// Execute the check-login command
#[cfg(feature = "browser")]
pub fn execute_check_login(
    config: &AppConfig,
    args: &CheckLoginArgs,
    reporter: &ProgressReporter,
) -> CliResult<()> {
    use alumnus::{ChromiumDriver, Session};

    let mut browser = config.browser.clone();
    if args.headless {
        browser = browser.with_headless(true);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let session = Session::<ChromiumDriver>::launch(browser, config.locator_table())
            .await?
            .with_timings(config.timings);
        let logged_in = session.is_logged_in(&config.campaign.feed_url).await;
        session.close().await?;
        if logged_in? {
            reporter.success("Logged in");
        } else {
            reporter.failure("Not logged in: log in once in the opened browser profile");
        }
        Ok::<(), crate::CliError>(())
    })
}

/// Execute the check-login command
#[cfg(not(feature = "browser"))]
pub fn execute_check_login(
    _config: &AppConfig,
    _args: &CheckLoginArgs,
    _reporter: &ProgressReporter,
) -> CliResult<()> {
    Err(crate::CliError::feature_disabled("browser"))
}

/// Make sure the session is logged in, asking the operator to log in by
/// hand when someone is at the terminal.
#[cfg(feature = "browser")]
pub async fn ensure_logged_in<D: alumnus::UiDriver>(
    session: &alumnus::Session<D>,
    feed_url: &str,
    reporter: &ProgressReporter,
) -> CliResult<()> {
    await_login(session, feed_url, reporter, console::user_attended()).await
}

#[cfg(feature = "browser")]
async fn await_login<D: alumnus::UiDriver>(
    session: &alumnus::Session<D>,
    feed_url: &str,
    reporter: &ProgressReporter,
    attended: bool,
) -> CliResult<()> {
    if session.is_logged_in(feed_url).await? {
        reporter.success("Logged in");
        return Ok(());
    }
    if !attended {
        return Err(crate::CliError::not_logged_in(
            "the browser profile has no session and there is no terminal to wait on",
        ));
    }
    reporter.warning("Not logged in. Log in in the browser window, then press Enter here.");
    let term = console::Term::stderr();
    tokio::task::spawn_blocking(move || term.read_line().map(|_| ()))
        .await
        .map_err(|e| crate::CliError::not_logged_in(e.to_string()))??;

    if session.is_logged_in(feed_url).await? {
        reporter.success("Logged in");
        Ok(())
    } else {
        Err(crate::CliError::not_logged_in("still on the login page"))
    }
}
