//! Plain HTTP backend for sites that render listings server-side.
//!
//! Pages are fetched with a blocking `reqwest` client and queried with
//! `scraper`. There is no script engine: XPath locators match nothing,
//! `click` follows the element's link target and the document never grows
//! when scrolled.

use crate::dom::{ElementHandle, Page};
use crate::error::{Result, ScanError};
use crate::locator::{Locator, LocatorKind, normalize_label};
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub struct StaticPage {
    client: Option<Client>,
    url: Option<Url>,
    document: Option<Html>,
}

impl StaticPage {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("Sifter/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client: Some(client),
            url: None,
            document: None,
        })
    }

    /// A page over already-fetched markup, with no network access
    pub fn from_html(url: &str, html: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(Self {
            client: None,
            url: Some(url),
            document: Some(Html::parse_document(html)),
        })
    }

    fn document(&self) -> Result<&Html> {
        self.document
            .as_ref()
            .ok_or_else(|| ScanError::Other("no page loaded".to_string()))
    }

    fn all_elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
        document.root_element().descendants().filter_map(ElementRef::wrap)
    }

    /// Handles are element ordinals in document order
    fn resolve<'a>(&self, document: &'a Html, handle: &ElementHandle) -> Result<ElementRef<'a>> {
        let ordinal: usize = handle
            .id()
            .parse()
            .map_err(|_| ScanError::Extraction(format!("foreign element handle {}", handle)))?;
        Self::all_elements(document)
            .nth(ordinal)
            .ok_or_else(|| ScanError::Extraction(format!("stale element {}", handle)))
    }

    fn parse_selector(css: &str) -> Result<Selector> {
        Selector::parse(css)
            .map_err(|e| ScanError::InvalidLocator(format!("css '{}': {:?}", css, e)))
    }

    fn matching<'a>(root: ElementRef<'a>, locator: &Locator) -> Result<Vec<ElementRef<'a>>> {
        let found = match locator.kind {
            LocatorKind::Css => {
                let selector = Self::parse_selector(&locator.value)?;
                root.select(&selector).collect()
            }
            LocatorKind::LinkText => {
                let selector = Self::parse_selector("a, button, [role=\"button\"]")?;
                let want = normalize_label(&locator.value);
                root.select(&selector)
                    .filter(|el| normalize_label(&el.text().collect::<String>()) == want)
                    .collect()
            }
            LocatorKind::AriaLabel => {
                let selector = Self::parse_selector("[aria-label]")?;
                let want = normalize_label(&locator.value);
                root.select(&selector)
                    .filter(|el| {
                        el.value()
                            .attr("aria-label")
                            .is_some_and(|label| normalize_label(label) == want)
                    })
                    .collect()
            }
            LocatorKind::Xpath => {
                debug!("XPath locator {} is not supported without a browser", locator);
                Vec::new()
            }
        };
        Ok(found)
    }

    fn is_disabled(element: &ElementRef<'_>) -> bool {
        let el = element.value();
        el.attr("disabled").is_some()
            || el.attr("aria-disabled") == Some("true")
            || el.classes().any(|c| c == "disabled")
    }

    fn is_hidden(element: &ElementRef<'_>) -> bool {
        let el = element.value();
        let style = el
            .attr("style")
            .map(|s| s.replace(' ', "").to_lowercase())
            .unwrap_or_default();
        el.attr("hidden").is_some()
            || style.contains("display:none")
            || style.contains("visibility:hidden")
    }

    fn resolve_link(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        let mut target = self.url.as_ref()?.join(href).ok()?;
        target.set_fragment(None);
        Some(target)
    }
}

impl Page for StaticPage {
    fn navigate(&mut self, url: &str) -> Result<()> {
        let parsed =
            Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ScanError::Other("page has no HTTP client".to_string()))?;

        debug!("Fetching {}", url);
        let response = client.get(parsed).send()?.error_for_status()?;
        // Redirects are followed, so relative links resolve against the final URL
        let final_url = response.url().clone();
        let body = response.text()?;

        self.document = Some(Html::parse_document(&body));
        self.url = Some(final_url);
        Ok(())
    }

    fn current_url(&self) -> String {
        self.url.as_ref().map(|u| u.to_string()).unwrap_or_default()
    }

    fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        let document = self.document()?;
        let root = match scope {
            Some(handle) => self.resolve(document, handle)?,
            None => document.root_element(),
        };

        let matched: HashSet<_> = Self::matching(root, locator)?
            .into_iter()
            .map(|el| el.id())
            .collect();
        if matched.is_empty() {
            return Ok(Vec::new());
        }

        Ok(Self::all_elements(document)
            .enumerate()
            .filter(|(_, el)| matched.contains(&el.id()))
            .map(|(ordinal, _)| ElementHandle::new(ordinal.to_string()))
            .collect())
    }

    fn text(&self, element: &ElementHandle) -> Result<String> {
        let document = self.document()?;
        Ok(self.resolve(document, element)?.text().collect())
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let document = self.document()?;
        let el = self.resolve(document, element)?;
        let Some(raw) = el.value().attr(name) else {
            return Ok(None);
        };
        if (name == "href" || name == "src")
            && let Some(resolved) = self.url.as_ref().and_then(|base| base.join(raw).ok())
        {
            return Ok(Some(resolved.to_string()));
        }
        Ok(Some(raw.to_string()))
    }

    fn is_interactable(&self, element: &ElementHandle) -> Result<bool> {
        let document = self.document()?;
        let el = self.resolve(document, element)?;

        let blocked = std::iter::successors(Some(el), |e| e.parent().and_then(ElementRef::wrap))
            .any(|e| Self::is_disabled(&e) || Self::is_hidden(&e));
        Ok(!blocked)
    }

    fn click(&mut self, element: &ElementHandle) -> Result<()> {
        let target = self
            .activation_target(element)?
            .ok_or_else(|| ScanError::Other(format!("{} has no link target", element)))?;
        if self.current_url() == target {
            return Err(ScanError::Other(format!("{} links back to the current page", element)));
        }
        self.navigate(&target)
    }

    /// Without a script engine every activation is a link navigation
    fn activation_target(&self, element: &ElementHandle) -> Result<Option<String>> {
        let document = self.document()?;
        let el = self.resolve(document, element)?;
        let href = std::iter::successors(Some(el), |e| e.parent().and_then(ElementRef::wrap))
            .find_map(|e| e.value().attr("href"))
            .ok_or_else(|| ScanError::Other(format!("{} has no link target", element)))?;
        let target = self
            .resolve_link(href)
            .ok_or_else(|| ScanError::Other(format!("{} link '{}' is not navigable", element, href)))?;
        Ok(Some(target.to_string()))
    }

    fn scroll_to_end(&mut self) -> Result<u64> {
        self.extent()
    }

    fn extent(&self) -> Result<u64> {
        Ok(self.document()?.html().len() as u64)
    }

    fn close(&mut self) -> Result<()> {
        self.document = None;
        self.client = None;
        Ok(())
    }
}
