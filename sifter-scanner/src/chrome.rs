//! Headless Chrome backend.
//!
//! Every query runs as in-page JavaScript. Matched elements are tagged with a
//! `data-sifter-id` attribute and the tag value is the [`ElementHandle`], so
//! CSS, XPath, link-text and ARIA locators share one code path and `click`
//! is a plain `element.click()`.

use crate::dom::{ElementHandle, Page};
use crate::error::{Result, ScanError};
use crate::locator::Locator;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the headless browser session
#[derive(Debug, Clone)]
pub struct ChromeConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Upper bound for a single page load
    pub page_load_timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            page_load_timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

const PRELUDE: &str = r#"
const __sifter = {
  resolve(id) {
    if (id === null) return document;
    const el = document.querySelector('[data-sifter-id="' + id + '"]');
    if (!el) throw new Error('stale element ' + id);
    return el;
  },
  tag(el) {
    if (!el.dataset.sifterId) {
      window.__sifterSeq = (window.__sifterSeq || 0) + 1;
      el.dataset.sifterId = String(window.__sifterSeq);
    }
    return el.dataset.sifterId;
  },
  norm(text) {
    return (text || '')
      .replace(/^[^\p{L}\p{N}]+|[^\p{L}\p{N}]+$/gu, '')
      .replace(/\s+/g, ' ')
      .toLowerCase();
  },
  query(root, kind, value) {
    try {
      return this.select(root, kind, value);
    } catch (e) {
      if (e && e.name === 'SyntaxError') {
        throw { sifterInvalid: kind + ' \'' + value + '\': ' + e.message };
      }
      throw e;
    }
  },
  select(root, kind, value) {
    switch (kind) {
      case 'css':
        return Array.from(root.querySelectorAll(value));
      case 'xpath': {
        const snap = document.evaluate(value, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
        const out = [];
        for (let i = 0; i < snap.snapshotLength; i++) {
          const node = snap.snapshotItem(i);
          if (node.nodeType === 1) out.push(node);
        }
        return out;
      }
      case 'link-text': {
        const want = this.norm(value);
        return Array.from(root.querySelectorAll('a, button, [role="button"]'))
          .filter(el => this.norm(el.innerText || el.textContent) === want);
      }
      case 'aria-label': {
        const want = this.norm(value);
        return Array.from(root.querySelectorAll('[aria-label]'))
          .filter(el => this.norm(el.getAttribute('aria-label')) === want);
      }
    }
    throw new Error('unknown locator kind ' + kind);
  }
};
"#;

#[derive(Deserialize)]
struct ScriptReply<T> {
    ok: Option<T>,
    error: Option<String>,
    /// Set when a locator could not be parsed by the page
    invalid: Option<String>,
}

/// Decode the JSON envelope produced by [`ChromePage::run`]
fn decode_reply<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let reply: ScriptReply<T> =
        serde_json::from_str(raw).map_err(|e| ScanError::Script(e.to_string()))?;

    match (reply.ok, reply.error, reply.invalid) {
        (_, _, Some(invalid)) => Err(ScanError::InvalidLocator(invalid)),
        (_, Some(error), None) => Err(ScanError::Script(error)),
        (Some(value), None, None) => Ok(value),
        (None, None, None) => serde_json::from_value(serde_json::Value::Null)
            .map_err(|e| ScanError::Script(e.to_string())),
    }
}

pub struct ChromePage {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromePage {
    /// Launch a browser process and open a single tab
    pub fn launch(config: &ChromeConfig) -> Result<Self> {
        info!(
            "Launching Chrome (headless: {}, {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
            ])
            .build()
            .map_err(|e| ScanError::Browser(format!("Invalid launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| ScanError::Browser(format!("Failed to launch Chrome: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScanError::Browser(format!("Failed to open tab: {}", e)))?;

        tab.set_default_timeout(config.page_load_timeout);
        if let Some(ref ua) = config.user_agent {
            tab.set_user_agent(ua, None, None)
                .map_err(|e| ScanError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        Ok(Self {
            browser: Some(browser),
            tab,
        })
    }

    /// Run `body` inside the prelude and decode its JSON reply.
    ///
    /// `body` is a JavaScript function body that may `return` any
    /// JSON-serializable value. Exceptions come back as `ScanError::Script`,
    /// unparseable locators as `ScanError::InvalidLocator`.
    fn run<T: DeserializeOwned>(&self, body: &str) -> Result<T> {
        let script = format!(
            "(() => {{ {} try {{ const __r = (() => {{ {} }})(); \
             return JSON.stringify({{ ok: __r === undefined ? null : __r }}); }} \
             catch (e) {{ return JSON.stringify(e && e.sifterInvalid \
             ? {{ invalid: e.sifterInvalid }} : {{ error: String(e) }}); }} }})()",
            PRELUDE, body
        );

        let remote = self
            .tab
            .evaluate(&script, false)
            .map_err(|e| ScanError::Script(e.to_string()))?;

        let raw = remote
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScanError::Script("script returned no value".to_string()))?;

        decode_reply(raw)
    }

    fn js_string(value: &str) -> String {
        // A JSON string literal is a valid JavaScript string literal
        serde_json::Value::String(value.to_string()).to_string()
    }

    fn js_scope(scope: Option<&ElementHandle>) -> String {
        scope
            .map(|h| Self::js_string(h.id()))
            .unwrap_or_else(|| "null".to_string())
    }
}

impl Page for ChromePage {
    fn navigate(&mut self, url: &str) -> Result<()> {
        debug!("Chrome navigating to {}", url);
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| ScanError::Browser(format!("Failed to load {}: {}", url, e)))?;
        Ok(())
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        let body = format!(
            "const root = __sifter.resolve({}); \
             return __sifter.query(root, {}, {}).map(el => __sifter.tag(el));",
            Self::js_scope(scope),
            Self::js_string(locator.kind.as_str()),
            Self::js_string(&locator.value)
        );
        let ids: Vec<String> = self.run(&body)?;
        Ok(ids.into_iter().map(ElementHandle::new).collect())
    }

    fn text(&self, element: &ElementHandle) -> Result<String> {
        let body = format!(
            "const el = __sifter.resolve({}); return el.innerText || el.textContent || '';",
            Self::js_string(element.id())
        );
        self.run(&body)
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        // Properties resolve relative href/src values against the page URL
        let body = format!(
            "const el = __sifter.resolve({id}); const name = {name}; \
             if (!el.hasAttribute(name)) return null; \
             const prop = el[name]; \
             return (typeof prop === 'string' && (name === 'href' || name === 'src')) \
               ? prop : el.getAttribute(name);",
            id = Self::js_string(element.id()),
            name = Self::js_string(name)
        );
        self.run(&body)
    }

    fn is_interactable(&self, element: &ElementHandle) -> Result<bool> {
        let body = format!(
            "const el = __sifter.resolve({}); \
             const style = getComputedStyle(el); \
             const visible = style.display !== 'none' && style.visibility !== 'hidden' \
               && el.getClientRects().length > 0; \
             const disabled = el.disabled === true || el.hasAttribute('disabled') \
               || el.closest('.disabled, [aria-disabled=\"true\"]') !== null; \
             return visible && !disabled;",
            Self::js_string(element.id())
        );
        self.run(&body)
    }

    fn click(&mut self, element: &ElementHandle) -> Result<()> {
        let body = format!(
            "__sifter.resolve({}).click(); return true;",
            Self::js_string(element.id())
        );
        let _: bool = self.run(&body)?;
        Ok(())
    }

    /// Plain anchors are followed by URL so the load goes through the
    /// navigation path; script-driven controls return `None` and are clicked.
    fn activation_target(&self, element: &ElementHandle) -> Result<Option<String>> {
        let body = format!(
            "const a = __sifter.resolve({}).closest('a[href]'); \
             if (!a || a.hasAttribute('onclick')) return null; \
             const target = new URL(a.href, location.href); \
             if (target.protocol !== 'http:' && target.protocol !== 'https:') return null; \
             const here = new URL(location.href); \
             target.hash = ''; here.hash = ''; \
             return target.href === here.href ? null : target.href;",
            Self::js_string(element.id())
        );
        self.run(&body)
    }

    fn scroll_to_end(&mut self) -> Result<u64> {
        self.run(
            "const h = Math.max(document.body.scrollHeight, document.documentElement.scrollHeight); \
             window.scrollTo(0, h); return h;",
        )
    }

    fn extent(&self) -> Result<u64> {
        self.run("return Math.max(document.body.scrollHeight, document.documentElement.scrollHeight);")
    }

    fn close(&mut self) -> Result<()> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };
        if let Err(e) = self.tab.close(true) {
            warn!("Failed to close tab cleanly: {}", e);
        }
        // Dropping the Browser terminates the Chrome process
        drop(browser);
        debug!("Chrome session closed");
        Ok(())
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
