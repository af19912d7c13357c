use crate::dom::{ElementHandle, Page};
use crate::error::{Result, ScanError};
use crate::extractor::FieldExtractor;
use crate::locator::{StrategyTable, first_match};
use crate::pager::{PageAdvance, Pager};
use crate::reconcile::{columns, reconcile};
use crate::result::{PageProgress, RawRecord, RecordSet, UniformRecord};
use crate::scroller::{ScrollOutcome, Scroller};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub type ProgressCallback = Arc<dyn Fn(PageProgress) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalMode {
    #[default]
    DiscretePages,
    InfiniteScroll,
}

impl TraversalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalMode::DiscretePages => "discrete-pages",
            TraversalMode::InfiniteScroll => "infinite-scroll",
        }
    }
}

impl fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraversalMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "discrete-pages" => Ok(TraversalMode::DiscretePages),
            "infinite-scroll" => Ok(TraversalMode::InfiniteScroll),
            other => Err(ScanError::Other(format!("unknown traversal mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    Init,
    LoadingPage,
    Extracting,
    Paginating,
    Done,
    Failed,
}

/// Knobs for one traversal
#[derive(Debug, Clone)]
pub struct TraversalOptions {
    pub start_url: String,
    pub fields: Vec<String>,
    pub mode: TraversalMode,
    /// Total load attempts for the start URL, at least 1
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Wait after activating the next-page control
    pub settle_delay: Duration,
    /// Wait between scroll samples
    pub scroll_delay: Duration,
    pub max_pages: Option<usize>,
    pub max_scroll_rounds: Option<usize>,
}

impl TraversalOptions {
    pub fn new(start_url: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            start_url: start_url.into(),
            fields,
            mode: TraversalMode::default(),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            settle_delay: Duration::from_secs(2),
            scroll_delay: Duration::from_secs(2),
            max_pages: None,
            max_scroll_rounds: None,
        }
    }

    /// No waits anywhere; used where the backend is not a real browser
    pub fn without_delays(mut self) -> Self {
        self.retry_delay = Duration::ZERO;
        self.settle_delay = Duration::ZERO;
        self.scroll_delay = Duration::ZERO;
        self
    }
}

/// What a completed traversal produced
#[derive(Debug, Clone)]
pub struct Traversal {
    /// Reconciled records, page-then-DOM order
    pub records: Vec<UniformRecord>,
    /// Column order shared by every record
    pub columns: Vec<String>,
    pub pages_visited: usize,
    pub nodes_seen: usize,
    pub skipped_nodes: usize,
    pub final_url: String,
    pub scroll: Option<ScrollOutcome>,
    pub state: TraversalState,
}

impl Traversal {
    /// At least one record carries a real value
    pub fn has_data(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.values().any(|v| v.is_available()))
    }
}

/// Drives navigation, scrolling, pagination and extraction for one listing
pub struct Traverser {
    table: StrategyTable,
    options: TraversalOptions,
    progress_callback: Option<ProgressCallback>,
}

#[derive(Default)]
struct Tally {
    records: RecordSet,
    nodes_seen: usize,
    skipped: usize,
    scroll: Option<ScrollOutcome>,
    /// Fingerprints of the pages extracted so far
    seen: HashSet<u64>,
}

/// Identity of a listing page: where it is and what it showed
fn page_fingerprint(url: &str, records: &[RawRecord]) -> u64 {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    records.hash(&mut hasher);
    hasher.finish()
}

impl Traverser {
    pub fn new(table: StrategyTable, options: TraversalOptions) -> Self {
        Self {
            table,
            options,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    /// Open a page with `open` and traverse the listing.
    ///
    /// The page is closed before this returns, whatever the outcome.
    pub fn run<P, F>(&self, open: F) -> Result<Traversal>
    where
        P: Page,
        F: FnOnce() -> Result<P>,
    {
        let session = Session::open(open()?);
        self.traverse(session)
    }

    fn traverse<P: Page>(&self, mut session: Session<P>) -> Result<Traversal> {
        info!(
            "Scraping {} ({}) for fields: {}",
            self.options.start_url,
            self.options.mode,
            self.options.fields.join(", ")
        );

        let extractor = FieldExtractor::new(&self.table);
        let pager = Pager::new(&self.table.next_page, self.options.settle_delay);
        let mut tally = Tally::default();
        let mut state = TraversalState::Init;
        let mut failure: Option<ScanError> = None;

        loop {
            debug!("Traversal state: {:?}", state);
            state = match state {
                TraversalState::Init => {
                    match self.load_with_retry(session.page_mut(), &self.options.start_url) {
                        Ok(()) => {
                            session.page_index = 1;
                            TraversalState::LoadingPage
                        }
                        Err(e) => {
                            error!("{}", e);
                            failure = Some(e);
                            TraversalState::Failed
                        }
                    }
                }
                TraversalState::LoadingPage => {
                    if self.options.mode == TraversalMode::InfiniteScroll {
                        tally.scroll = self.scroll(session.page_mut());
                    }
                    TraversalState::Extracting
                }
                TraversalState::Extracting => {
                    if !self.extract_page(&session, &extractor, &mut tally) {
                        // A cycle or a control that did not move anywhere
                        session.page_index -= 1;
                        session.terminal = true;
                        TraversalState::Done
                    } else if self.options.mode == TraversalMode::DiscretePages {
                        TraversalState::Paginating
                    } else {
                        session.terminal = true;
                        TraversalState::Done
                    }
                }
                TraversalState::Paginating => {
                    if let Some(max) = self.options.max_pages
                        && session.page_index >= max
                    {
                        info!("Reached page limit of {}", max);
                        TraversalState::Done
                    } else {
                        let advance = pager.advance_with(session.page_mut(), |page, url| {
                            self.load_with_retry(page, url)
                        });
                        match advance {
                            Ok(PageAdvance::Advanced) => {
                                session.page_index += 1;
                                debug!("Advanced to page {}", session.page_index);
                                TraversalState::LoadingPage
                            }
                            Ok(PageAdvance::NoMoreListingPages) => {
                                session.terminal = true;
                                TraversalState::Done
                            }
                            Err(e) => {
                                error!("{}", e);
                                failure = Some(e);
                                TraversalState::Failed
                            }
                        }
                    }
                }
                TraversalState::Done => break,
                // Session is released by its guard
                TraversalState::Failed => {
                    return Err(failure
                        .take()
                        .unwrap_or_else(|| ScanError::Other("traversal failed".to_string())));
                }
            };
        }

        let columns = columns(&tally.records);
        let records = reconcile(&tally.records);
        info!(
            "Traversal finished: {} record(s) from {} page(s), {} node(s) skipped",
            records.len(),
            session.page_index,
            tally.skipped
        );

        let traversal = Traversal {
            records,
            columns,
            pages_visited: session.page_index,
            nodes_seen: tally.nodes_seen,
            skipped_nodes: tally.skipped,
            final_url: session.current_url(),
            scroll: tally.scroll,
            state,
        };

        if let Err(e) = session.close() {
            warn!("Failed to release browser session: {}", e);
        }
        Ok(traversal)
    }

    fn load_with_retry<P: Page + ?Sized>(&self, page: &mut P, url: &str) -> Result<()> {
        let attempts = self.options.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match page.navigate(url) {
                Ok(()) => {
                    debug!("Loaded {} on attempt {}", url, attempt);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Attempt {}/{} to load {} failed: {}", attempt, attempts, url, e);
                    last_error = Some(e);
                    if attempt < attempts && !self.options.retry_delay.is_zero() {
                        thread::sleep(self.options.retry_delay);
                    }
                }
            }
        }

        Err(ScanError::Navigation {
            url: url.to_string(),
            attempts,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    fn scroll<P: Page + ?Sized>(&self, page: &mut P) -> Option<ScrollOutcome> {
        let scroller =
            Scroller::new(self.options.scroll_delay).with_max_rounds(self.options.max_scroll_rounds);
        match scroller.scroll_to_stable_end(page) {
            Ok(outcome) => {
                info!(
                    "Scrolled {} time(s), final extent {}",
                    outcome.rounds, outcome.final_extent
                );
                Some(outcome)
            }
            Err(e) => {
                warn!("Scrolling failed, extracting what is loaded: {}", e);
                None
            }
        }
    }

    /// Record-bearing nodes from the first node locator that matches anything
    fn record_nodes<P: Page + ?Sized>(&self, page: &P) -> Vec<ElementHandle> {
        let hit = first_match(&self.table.record_nodes, |locator| {
            match page.find_all(None, locator) {
                Ok(nodes) if nodes.is_empty() => Ok(None),
                Ok(nodes) => Ok(Some(nodes)),
                Err(e) => {
                    warn!("Record lookup with {} failed: {}", locator, e);
                    Ok(None)
                }
            }
        });

        match hit {
            Ok(Some((idx, nodes))) => {
                debug!(
                    "{} record node(s) matched {}",
                    nodes.len(),
                    self.table.record_nodes[idx]
                );
                nodes
            }
            Ok(None) | Err(_) => Vec::new(),
        }
    }

    /// Extract the current page into `tally`.
    ///
    /// Returns false, leaving `tally` untouched, when the page is one that was
    /// already extracted.
    fn extract_page<P: Page>(
        &self,
        session: &Session<P>,
        extractor: &FieldExtractor<'_>,
        tally: &mut Tally,
    ) -> bool {
        let page = session.page();
        let url = session.current_url();
        let nodes = self.record_nodes(page);
        if nodes.is_empty() {
            warn!("No record nodes found on page {} ({})", session.page_index, url);
        }

        let mut extracted: Vec<RawRecord> = Vec::with_capacity(nodes.len());
        let mut skipped = 0;
        for (idx, node) in nodes.iter().enumerate() {
            match extractor.extract_record(page, node, &self.options.fields) {
                Ok(record) => extracted.push(record),
                Err(e) => {
                    warn!(
                        "Skipping record {} on page {}: {}",
                        idx + 1,
                        session.page_index,
                        e
                    );
                    skipped += 1;
                }
            }
        }

        if !tally.seen.insert(page_fingerprint(&url, &extracted)) {
            warn!(
                "Page {} ({}) repeats an earlier page, stopping pagination",
                session.page_index, url
            );
            return false;
        }

        info!(
            "Page {}: extracted {} record(s) ({} skipped)",
            session.page_index,
            extracted.len(),
            skipped
        );

        tally.nodes_seen += nodes.len();
        tally.skipped += skipped;
        let count = extracted.len();
        tally.records.extend(extracted);

        if let Some(ref cb) = self.progress_callback {
            cb(PageProgress {
                page: session.page_index,
                url,
                extracted: count,
                skipped,
                total: tally.records.len(),
            });
        }
        true
    }
}
