//! The DOM query seam between the engine and a rendering backend.
//!
//! Nothing here retries. "Not found" is `Ok(None)` or an empty vector;
//! `Err` is reserved for the backend itself failing (dead tab, script
//! error, stale handle).

use crate::error::Result;
use crate::locator::Locator;
use std::fmt;

/// Opaque reference to an element on the currently loaded page.
///
/// Handles are only meaningful to the page that issued them and become stale
/// after the next navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A rendered page that can be navigated and queried
pub trait Page {
    /// Load `url` and block until it is rendered or the backend times out
    fn navigate(&mut self, url: &str) -> Result<()>;

    fn current_url(&self) -> String;

    /// All elements matching `locator`, in document order.
    ///
    /// With a `scope` the search is limited to that element's descendants.
    fn find_all(&self, scope: Option<&ElementHandle>, locator: &Locator)
    -> Result<Vec<ElementHandle>>;

    fn find_one(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>> {
        Ok(self.find_all(scope, locator)?.into_iter().next())
    }

    /// Visible text content of the element
    fn text(&self, element: &ElementHandle) -> Result<String>;

    fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// Visible and enabled, i.e. a user could activate it
    fn is_interactable(&self, element: &ElementHandle) -> Result<bool>;

    /// Programmatic activation (no simulated pointer event)
    fn click(&mut self, element: &ElementHandle) -> Result<()>;

    /// URL that activating `element` would load, when activation is a plain
    /// link navigation. `None` means the element has to be clicked.
    fn activation_target(&self, _element: &ElementHandle) -> Result<Option<String>> {
        Ok(None)
    }

    /// Scroll to the maximum extent and return the extent afterwards
    fn scroll_to_end(&mut self) -> Result<u64>;

    /// Current scrollable extent of the document
    fn extent(&self) -> Result<u64>;

    /// Release the underlying session. Must be safe to call more than once.
    fn close(&mut self) -> Result<()>;
}

impl<P: Page + ?Sized> Page for Box<P> {
    fn navigate(&mut self, url: &str) -> Result<()> {
        (**self).navigate(url)
    }

    fn current_url(&self) -> String {
        (**self).current_url()
    }

    fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        (**self).find_all(scope, locator)
    }

    fn find_one(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>> {
        (**self).find_one(scope, locator)
    }

    fn text(&self, element: &ElementHandle) -> Result<String> {
        (**self).text(element)
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        (**self).attribute(element, name)
    }

    fn is_interactable(&self, element: &ElementHandle) -> Result<bool> {
        (**self).is_interactable(element)
    }

    fn click(&mut self, element: &ElementHandle) -> Result<()> {
        (**self).click(element)
    }

    fn activation_target(&self, element: &ElementHandle) -> Result<Option<String>> {
        (**self).activation_target(element)
    }

    fn scroll_to_end(&mut self) -> Result<u64> {
        (**self).scroll_to_end()
    }

    fn extent(&self) -> Result<u64> {
        (**self).extent()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
