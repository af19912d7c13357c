use crate::dom::Page;
use crate::error::Result;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// How a scroll-to-stable-end pass finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    /// Number of scrolls triggered
    pub rounds: usize,
    pub final_extent: u64,
    /// False when the round cap stopped the loop before the extent settled
    pub stable: bool,
}

/// Grows an infinite-scroll page until its extent stops changing
pub struct Scroller {
    delay: Duration,
    max_rounds: Option<usize>,
}

impl Scroller {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_rounds: None,
        }
    }

    /// Stop after `rounds` scrolls even if the page is still growing
    pub fn with_max_rounds(mut self, rounds: Option<usize>) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Scroll, wait, sample; stop when two consecutive samples are equal.
    ///
    /// The first sample is taken before any scroll, so a page whose extents
    /// read `[100, 200, 200]` is scrolled twice.
    pub fn scroll_to_stable_end<P: Page + ?Sized>(&self, page: &mut P) -> Result<ScrollOutcome> {
        let mut last = page.extent()?;
        let mut rounds = 0;

        loop {
            if let Some(max) = self.max_rounds
                && rounds >= max
            {
                warn!(
                    "Page still growing after {} scroll(s) (extent {}), giving up",
                    rounds, last
                );
                return Ok(ScrollOutcome {
                    rounds,
                    final_extent: last,
                    stable: false,
                });
            }

            page.scroll_to_end()?;
            rounds += 1;
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }

            let current = page.extent()?;
            debug!("Scroll {}: extent {} -> {}", rounds, last, current);
            if current == last {
                return Ok(ScrollOutcome {
                    rounds,
                    final_extent: current,
                    stable: true,
                });
            }
            last = current;
        }
    }
}
