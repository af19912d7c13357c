use crate::dom::Page;
use crate::error::Result;
use tracing::{debug, warn};

/// Exclusive ownership of one browser-backed navigation context.
///
/// The page is closed by [`Session::close`] or, on any other exit path
/// (early return, `?`, panic unwinding), when the session is dropped.
pub struct Session<P: Page> {
    page: P,
    /// 1-based index of the listing page currently loaded
    pub page_index: usize,
    /// Set once pagination reports there is nothing further
    pub terminal: bool,
    closed: bool,
}

impl<P: Page> Session<P> {
    pub fn open(page: P) -> Self {
        Self {
            page,
            page_index: 0,
            terminal: false,
            closed: false,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn current_url(&self) -> String {
        self.page.current_url()
    }

    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("Releasing session after {} page(s)", self.page_index);
        self.page.close()
    }
}

impl<P: Page> Drop for Session<P> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release browser session: {}", e);
        }
    }
}
