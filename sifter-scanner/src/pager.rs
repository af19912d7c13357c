use crate::dom::{ElementHandle, Page};
use crate::error::Result;
use crate::locator::{Locator, first_match};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAdvance {
    Advanced,
    NoMoreListingPages,
}

/// Finds and activates the "next page" control.
///
/// Stateless: on a terminal page every call returns
/// [`PageAdvance::NoMoreListingPages`]. Lookup and activation failures are
/// logged and end the traversal; only the caller's loader can fail a call.
pub struct Pager<'t> {
    strategies: &'t [Locator],
    settle: Duration,
}

impl<'t> Pager<'t> {
    pub fn new(strategies: &'t [Locator], settle: Duration) -> Self {
        Self { strategies, settle }
    }

    /// First visible, enabled control produced by the strategies, in order
    pub fn find_control<P: Page + ?Sized>(&self, page: &P) -> Result<Option<ElementHandle>> {
        let hit = first_match(self.strategies, |locator| {
            let controls = match page.find_all(None, locator) {
                Ok(controls) => controls,
                Err(e) => {
                    warn!("Next-page lookup with {} failed: {}", locator, e);
                    return Ok(None);
                }
            };

            for control in controls {
                match page.is_interactable(&control) {
                    Ok(true) => return Ok(Some(control)),
                    Ok(false) => debug!("{} matched {} but it is not usable", locator, control),
                    Err(e) => warn!("Could not inspect {} from {}: {}", control, locator, e),
                }
            }
            Ok(None)
        })?;

        Ok(hit.map(|(idx, control)| {
            debug!("Next-page control found with {}", self.strategies[idx]);
            control
        }))
    }

    /// Activate the next-page control, loading link targets with `page.navigate`.
    ///
    /// A failed load is logged and ends pagination.
    pub fn advance<P: Page + ?Sized>(&self, page: &mut P) -> PageAdvance {
        match self.advance_with(page, |page, url| page.navigate(url)) {
            Ok(advance) => advance,
            Err(e) => {
                warn!("Next page failed to load: {}", e);
                PageAdvance::NoMoreListingPages
            }
        }
    }

    /// Activate the next-page control.
    ///
    /// When the control is a plain link its target is loaded with `load`, and
    /// an error from `load` is returned as is. Everything else that goes wrong
    /// (lookup, inspection, click) is logged and reported as
    /// [`PageAdvance::NoMoreListingPages`].
    pub fn advance_with<P, L>(&self, page: &mut P, load: L) -> Result<PageAdvance>
    where
        P: Page + ?Sized,
        L: FnOnce(&mut P, &str) -> Result<()>,
    {
        let control = match self.find_control(page) {
            Ok(Some(control)) => control,
            Ok(None) => {
                info!("No next-page control on {}", page.current_url());
                return Ok(PageAdvance::NoMoreListingPages);
            }
            Err(e) => {
                warn!("Pagination lookup failed: {}", e);
                return Ok(PageAdvance::NoMoreListingPages);
            }
        };

        match page.activation_target(&control) {
            Ok(Some(url)) => {
                debug!("Following next-page link {}", url);
                load(page, &url)?;
            }
            Ok(None) => {
                if let Err(e) = page.click(&control) {
                    warn!("Failed to activate next-page control {}: {}", control, e);
                    return Ok(PageAdvance::NoMoreListingPages);
                }
            }
            Err(e) => {
                warn!("Failed to activate next-page control {}: {}", control, e);
                return Ok(PageAdvance::NoMoreListingPages);
            }
        }

        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        Ok(PageAdvance::Advanced)
    }
}
