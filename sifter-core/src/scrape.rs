use crate::config::{Engine, ScrapeConfig};
use crate::error::{Result, RunError};
use crate::outcome::RunOutcome;
use crate::output::{OutputSink, WrittenFiles};
use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use sifter_scanner::traversal::ProgressCallback;
use sifter_scanner::{
    ChromeConfig, ChromePage, Page, PageProgress, ScanError, StaticPage, Traversal, TraversalMode,
    Traverser,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Callback for human-readable progress lines
pub type ScrapeProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Everything the report needs about a finished run
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub url: String,
    pub fields: Vec<String>,
    pub mode: TraversalMode,
    pub engine: Engine,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
    /// Present whenever traversal finished, even if writing output failed
    pub traversal: Option<Traversal>,
    pub files: WrittenFiles,
    pub error: Option<RunError>,
}

impl RunSummary {
    pub fn record_count(&self) -> usize {
        self.traversal.as_ref().map_or(0, |t| t.records.len())
    }
}

/// Open the page backend selected by `engine`
pub fn open_page(
    engine: Engine,
    chrome: &ChromeConfig,
) -> std::result::Result<Box<dyn Page>, ScanError> {
    match engine {
        Engine::Chrome => Ok(Box::new(ChromePage::launch(chrome)?)),
        Engine::Static => Ok(Box::new(StaticPage::new(chrome.page_load_timeout)?)),
    }
}

/// Execute a scrape with the given configuration
///
/// Never panics on run failures; the outcome and any error are in the summary.
pub async fn execute_scrape(
    config: ScrapeConfig,
    progress_callback: Option<ScrapeProgressCallback>,
) -> RunSummary {
    let started_at = Local::now();
    let start = Instant::now();

    let mut summary = RunSummary {
        outcome: RunOutcome::Failed,
        url: config.traversal.start_url.clone(),
        fields: config.traversal.fields.clone(),
        mode: config.traversal.mode,
        engine: config.engine,
        started_at,
        elapsed: Duration::ZERO,
        traversal: None,
        files: WrittenFiles::default(),
        error: None,
    };

    let traversal = match run_traversal(&config, progress_callback).await {
        Ok(traversal) => traversal,
        Err(e) => {
            error!("Scrape failed: {}", e);
            summary.error = Some(e);
            summary.elapsed = start.elapsed();
            return summary;
        }
    };

    if traversal.has_data() {
        let sink = OutputSink::new(config.output.clone());
        match sink.write(&traversal.columns, &traversal.records) {
            Ok(files) => {
                summary.files = files;
                summary.outcome = RunOutcome::Success;
            }
            Err(e) => {
                error!("{}", e);
                summary.error = Some(e);
            }
        }
    } else {
        warn!("No data extracted from {}", config.traversal.start_url);
        summary.outcome = RunOutcome::NoData;
    }

    summary.traversal = Some(traversal);
    summary.elapsed = start.elapsed();
    summary
}

async fn run_traversal(
    config: &ScrapeConfig,
    progress_callback: Option<ScrapeProgressCallback>,
) -> Result<Traversal> {
    config.validate()?;
    let table = config.strategy_table()?;

    // Spinner only in interactive mode
    let progress_bar = if config.show_progress {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Loading {}...", config.traversal.start_url));
        Some(pb)
    } else {
        None
    };

    let page_callback: ProgressCallback = {
        let pb = progress_bar.clone();
        let external = progress_callback.clone();
        Arc::new(move |progress: PageProgress| {
            let line = format!(
                "Page {}: {} record(s) extracted, {} skipped ({} total)",
                progress.page, progress.extracted, progress.skipped, progress.total
            );
            if let Some(ref pb) = pb {
                pb.set_message(line.clone());
            }
            if let Some(ref cb) = external {
                cb(line);
            }
        })
    };

    let traverser =
        Traverser::new(table, config.traversal.clone()).with_progress_callback(page_callback);
    let engine = config.engine;
    let chrome = config.chrome_config();

    info!("Starting {} scrape of {}", engine.as_str(), config.traversal.start_url);
    let result = tokio::task::spawn_blocking(move || {
        traverser.run(|| open_page(engine, &chrome))
    })
    .await
    .map_err(ScanError::from)
    .and_then(|inner| inner);

    match result {
        Ok(traversal) => {
            if let Some(ref pb) = progress_bar {
                pb.finish_with_message(format!(
                    "Scrape complete! {} record(s) from {} page(s)",
                    traversal.records.len(),
                    traversal.pages_visited
                ));
            }
            Ok(traversal)
        }
        Err(e) => {
            if let Some(ref pb) = progress_bar {
                pb.abandon_with_message("Scrape failed");
            }
            Err(e.into())
        }
    }
}
