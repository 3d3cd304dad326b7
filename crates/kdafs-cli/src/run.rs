//! Session lifecycle around one extraction run.

use kdafs_core::AppConfig;
use kdafs_scraper::{JsonFileSink, Traversal, TraversalOutcome, WebDriverSurface};

/// Starts a browser session, runs the traversal, and always closes the
/// session before returning.
///
/// The output file is only reset once the session is up, so a failed
/// connection leaves the previous run's output in place.
pub(crate) async fn run_extraction(config: &AppConfig) -> anyhow::Result<()> {
    let browser = WebDriverSurface::connect(&config.webdriver_url, config.headless).await?;

    let sink = match JsonFileSink::create(&config.output_path) {
        Ok(sink) => sink,
        Err(err) => {
            close_best_effort(browser).await;
            return Err(err.into());
        }
    };

    let (report, sink) = Traversal::new(&browser, config, sink).run().await;
    close_best_effort(browser).await;

    tracing::info!(
        path = %sink.path().display(),
        records = report.records_persisted,
        pages = report.pages_visited,
        "output written"
    );

    match report.outcome {
        TraversalOutcome::Completed => Ok(()),
        TraversalOutcome::Failed { state, reason } => anyhow::bail!(
            "extraction failed during {state:?} on page {} after {} records: {reason}",
            report.last_page,
            report.records_persisted
        ),
    }
}

async fn close_best_effort(browser: WebDriverSurface) {
    if let Err(err) = browser.close().await {
        tracing::warn!(error = %err, "failed to close browser session");
    }
}
