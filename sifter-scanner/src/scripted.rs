//! In-memory `Page` with a scripted listing, for engine tests.
//!
//! Record nodes match `.item`, the next-page control matches `.next`, and
//! inside a node `.<name>` matches the field called `<name>`.

use crate::dom::{ElementHandle, Page};
use crate::error::{Result, ScanError};
use crate::locator::{Locator, LocatorKind, StrategyTable};
use std::cell::Cell;
use std::rc::Rc;

pub struct ScriptedNode {
    fields: Vec<(String, String)>,
    broken: bool,
}

impl ScriptedNode {
    pub fn new(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            broken: false,
        }
    }

    /// A node whose every text read fails, like a detached element
    pub fn broken() -> Self {
        Self {
            fields: vec![("title".to_string(), "unreachable".to_string())],
            broken: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    Missing,
    Disabled,
    Usable,
    /// Present and enabled, but activation fails
    Broken,
    /// Enabled, clicks fine, and nothing changes
    Inert,
    /// A plain link to the 1-based listing page
    LinkTo(usize),
}

pub struct ScriptedListing {
    nodes: Vec<ScriptedNode>,
    next: NextControl,
}

impl ScriptedListing {
    pub fn new(nodes: Vec<ScriptedNode>, next: NextControl) -> Self {
        Self { nodes, next }
    }
}

pub struct ScriptedPage {
    listings: Vec<ScriptedListing>,
    current: usize,
    loaded: bool,
    failing_loads: u32,
    flaky: Option<(usize, u32)>,
    loads: Rc<Cell<u32>>,
    extents: Vec<u64>,
    cursor: usize,
    scrolls: Rc<Cell<usize>>,
    closes: Rc<Cell<usize>>,
}

impl ScriptedPage {
    pub fn new(listings: Vec<ScriptedListing>) -> Self {
        Self {
            listings,
            current: 0,
            loaded: false,
            failing_loads: 0,
            flaky: None,
            loads: Rc::new(Cell::new(0)),
            extents: Vec::new(),
            cursor: 0,
            scrolls: Rc::new(Cell::new(0)),
            closes: Rc::new(Cell::new(0)),
        }
    }

    /// Already showing the first listing, without a navigate call
    pub fn loaded(mut self) -> Self {
        self.loaded = true;
        self
    }

    /// The first `n` navigations fail
    pub fn failing_loads(mut self, n: u32) -> Self {
        self.failing_loads = n;
        self
    }

    /// Loads of the 1-based listing `page` fail `times` times, then succeed
    pub fn flaky_page(mut self, page: usize, times: u32) -> Self {
        self.flaky = Some((page, times));
        self
    }

    /// Successive extent samples; each scroll moves to the next one
    pub fn with_extents(mut self, extents: &[u64]) -> Self {
        self.extents = extents.to_vec();
        self
    }

    pub fn load_counter(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.loads)
    }

    pub fn scroll_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.scrolls)
    }

    pub fn close_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.closes)
    }

    /// Strategy table matching the scripted markup
    pub fn table() -> StrategyTable {
        StrategyTable {
            record_nodes: vec![Locator::css(".row"), Locator::css(".item")],
            next_page: vec![Locator::aria_label("Next"), Locator::css(".next")],
            ..StrategyTable::default()
        }
    }

    fn listing(&self) -> Result<&ScriptedListing> {
        if !self.loaded {
            return Err(ScanError::Browser("nothing loaded".to_string()));
        }
        self.listings
            .get(self.current)
            .ok_or_else(|| ScanError::Browser("listing out of range".to_string()))
    }

    fn node(&self, id: &str) -> Result<&ScriptedNode> {
        let idx: usize = id
            .strip_prefix("node:")
            .and_then(|rest| rest.split('/').next())
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ScanError::Extraction(format!("bad handle {}", id)))?;
        self.listing()?
            .nodes
            .get(idx)
            .ok_or_else(|| ScanError::Extraction(format!("stale handle {}", id)))
    }
}

impl Page for ScriptedPage {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.loads.set(self.loads.get() + 1);
        if self.failing_loads > 0 {
            self.failing_loads -= 1;
            return Err(ScanError::Browser("net::ERR_CONNECTION_RESET".to_string()));
        }

        let page = url
            .rsplit_once("?page=")
            .and_then(|(_, n)| n.parse::<usize>().ok())
            .unwrap_or(1);
        if let Some((flaky, times)) = self.flaky.as_mut()
            && *flaky == page
            && *times > 0
        {
            *times -= 1;
            return Err(ScanError::Browser("HTTP 503".to_string()));
        }
        if page == 0 || page > self.listings.len() {
            return Err(ScanError::Browser(format!("HTTP 404 for {}", url)));
        }

        self.loaded = true;
        self.current = page - 1;
        Ok(())
    }

    fn current_url(&self) -> String {
        format!("https://shop.test/list?page={}", self.current + 1)
    }

    fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        let listing = self.listing()?;
        if locator.kind != LocatorKind::Css {
            return Ok(Vec::new());
        }

        match scope {
            None if locator.value == ".item" => Ok((0..listing.nodes.len())
                .map(|i| ElementHandle::new(format!("node:{}", i)))
                .collect()),
            None if locator.value == ".next" && listing.next != NextControl::Missing => {
                Ok(vec![ElementHandle::new("next")])
            }
            None => Ok(Vec::new()),
            Some(handle) => {
                let node = self.node(handle.id())?;
                let Some(class) = locator.value.strip_prefix('.') else {
                    return Ok(Vec::new());
                };
                Ok(node
                    .fields
                    .iter()
                    .filter(|(name, _)| name == class)
                    .map(|(name, _)| ElementHandle::new(format!("{}/{}", handle.id(), name)))
                    .collect())
            }
        }
    }

    fn text(&self, element: &ElementHandle) -> Result<String> {
        let node = self.node(element.id())?;
        if node.broken {
            return Err(ScanError::Script("element is detached".to_string()));
        }
        let field = element.id().rsplit('/').next().unwrap_or_default();
        node.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| ScanError::Extraction(format!("no text for {}", element)))
    }

    fn attribute(&self, _element: &ElementHandle, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn is_interactable(&self, element: &ElementHandle) -> Result<bool> {
        let next = self.listing()?.next;
        Ok(element.id() == "next"
            && !matches!(next, NextControl::Missing | NextControl::Disabled))
    }

    fn click(&mut self, element: &ElementHandle) -> Result<()> {
        let next = self.listing()?.next;
        match next {
            NextControl::Usable if element.id() == "next" => {
                if self.current + 1 >= self.listings.len() {
                    return Err(ScanError::Browser("next leads nowhere".to_string()));
                }
                self.current += 1;
                Ok(())
            }
            NextControl::Inert if element.id() == "next" => Ok(()),
            _ => Err(ScanError::Script(format!("{} is not clickable", element))),
        }
    }

    fn activation_target(&self, element: &ElementHandle) -> Result<Option<String>> {
        match self.listing()?.next {
            NextControl::LinkTo(page) if element.id() == "next" => {
                Ok(Some(format!("https://shop.test/list?page={}", page)))
            }
            _ => Ok(None),
        }
    }

    fn scroll_to_end(&mut self) -> Result<u64> {
        self.scrolls.set(self.scrolls.get() + 1);
        if self.cursor + 1 < self.extents.len() {
            self.cursor += 1;
        }
        self.extent()
    }

    fn extent(&self) -> Result<u64> {
        Ok(self.extents.get(self.cursor).copied().unwrap_or(0))
    }

    fn close(&mut self) -> Result<()> {
        self.closes.set(self.closes.get() + 1);
        self.loaded = false;
        Ok(())
    }
}
