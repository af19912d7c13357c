//! Declarative locator strategies.
//!
//! A [`StrategyTable`] maps semantic names (a field such as `price`, the
//! record-bearing node, the "next page" control) to ranked candidate
//! [`Locator`]s. Candidates are evaluated by [`first_match`]; the first one
//! that yields something wins.

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorKind {
    /// CSS selector
    Css,
    /// XPath expression
    Xpath,
    /// Clickable element (`a`, `button`, `[role=button]`) whose visible text matches
    LinkText,
    /// Element whose `aria-label` matches
    AriaLabel,
}

impl LocatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorKind::Css => "css",
            LocatorKind::Xpath => "xpath",
            LocatorKind::LinkText => "link-text",
            LocatorKind::AriaLabel => "aria-label",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub kind: LocatorKind,
    pub value: String,
}

impl Locator {
    pub fn new(kind: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Css, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Xpath, value)
    }

    pub fn link_text(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::LinkText, value)
    }

    pub fn aria_label(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::AriaLabel, value)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.value)
    }
}

/// Normalize visible text for link-text and aria-label comparison.
///
/// Surrounding punctuation and arrows are ignored, so `"Next »"` and
/// `"→ next"` both compare equal to `"next"`.
pub fn normalize_label(text: &str) -> String {
    text.trim_matches(|c: char| !c.is_alphanumeric())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Evaluate candidates in declared order and return the first hit along with
/// the index of the candidate that produced it.
///
/// `Ok(None)` from the probe means "nothing here, try the next one". An `Err`
/// stops the evaluation and is handed back to the caller, which decides
/// whether it is recoverable.
pub fn first_match<T, F>(candidates: &[Locator], mut probe: F) -> Result<Option<(usize, T)>>
where
    F: FnMut(&Locator) -> Result<Option<T>>,
{
    for (idx, locator) in candidates.iter().enumerate() {
        if let Some(hit) = probe(locator)? {
            return Ok(Some((idx, hit)));
        }
    }
    Ok(None)
}

/// Where a field's value is read from once its element is found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    #[default]
    Text,
    Attribute(String),
}

/// Post-processing applied to the matched text, in declared order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Remove a leading prefix, compared case-insensitively
    StripPrefix(String),
    /// Remove a trailing suffix, compared case-insensitively
    StripSuffix(String),
    CollapseWhitespace,
    Lowercase,
}

impl Transform {
    pub fn apply(&self, value: String) -> String {
        match self {
            Transform::StripPrefix(prefix) => {
                let matches = value
                    .get(..prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
                if matches {
                    value[prefix.len()..].trim_start().to_string()
                } else {
                    value
                }
            }
            Transform::StripSuffix(suffix) => {
                let at = value.len().saturating_sub(suffix.len());
                let matches = value.len() >= suffix.len()
                    && value
                        .get(at..)
                        .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix));
                if matches {
                    value[..at].trim_end().to_string()
                } else {
                    value
                }
            }
            Transform::CollapseWhitespace => value.split_whitespace().collect::<Vec<_>>().join(" "),
            Transform::Lowercase => value.to_lowercase(),
        }
    }
}

/// Candidate locators and post-processing for one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub candidates: Vec<Locator>,
    #[serde(default)]
    pub source: ValueSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<Transform>,
}

impl FieldRule {
    pub fn new(candidates: Vec<Locator>) -> Self {
        Self {
            candidates,
            source: ValueSource::Text,
            transforms: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: ValueSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Trim, then run every transform in order
    pub fn finish(&self, raw: &str) -> String {
        self.transforms
            .iter()
            .fold(raw.trim().to_string(), |value, t| t.apply(value))
            .trim()
            .to_string()
    }
}

/// Semantic name -> ranked candidates, for fields and navigation actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyTable {
    #[serde(default)]
    pub record_nodes: Vec<Locator>,
    #[serde(default)]
    pub next_page: Vec<Locator>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldRule>,
}

impl StrategyTable {
    /// Field lookup: exact name first, then case-insensitive
    pub fn rule_for(&self, field: &str) -> Option<&FieldRule> {
        self.fields.get(field).or_else(|| {
            self.fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(field))
                .map(|(_, rule)| rule)
        })
    }

    pub fn with_field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.insert(name.into(), rule);
        self
    }

    /// Layer `overrides` on top of this table.
    ///
    /// Field rules are replaced per name; node and next-page candidate lists
    /// are replaced only when the override provides a non-empty list.
    pub fn merged_with(mut self, overrides: StrategyTable) -> Self {
        if !overrides.record_nodes.is_empty() {
            self.record_nodes = overrides.record_nodes;
        }
        if !overrides.next_page.is_empty() {
            self.next_page = overrides.next_page;
        }
        self.fields.extend(overrides.fields);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let table: StrategyTable = serde_json::from_str(json)
            .map_err(|e| ScanError::InvalidLocator(format!("Invalid strategy table: {}", e)))?;
        table.validate()?;
        Ok(table)
    }

    /// Load a strategy file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ScanError::Other(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        let all = self
            .record_nodes
            .iter()
            .chain(self.next_page.iter())
            .chain(self.fields.values().flat_map(|r| r.candidates.iter()));
        for locator in all {
            if locator.value.trim().is_empty() {
                return Err(ScanError::InvalidLocator(format!(
                    "empty {} locator",
                    locator.kind.as_str()
                )));
            }
        }
        Ok(())
    }

    /// Built-in table covering common listing markup
    pub fn builtin() -> Self {
        let text = |selectors: &[&str]| {
            FieldRule::new(selectors.iter().map(|s| Locator::css(*s)).collect())
        };

        StrategyTable {
            record_nodes: [
                ".product",
                ".product-tile",
                ".product-item",
                "[data-component-type=\"s-search-result\"]",
                ".item",
                ".listing",
                ".result",
                "article",
            ]
            .iter()
            .map(|s| Locator::css(*s))
            .collect(),
            next_page: vec![
                Locator::css(".pagination .next"),
                Locator::css(".s-pagination-next"),
                Locator::aria_label("Next"),
                Locator::aria_label("Next page"),
                Locator::css("a[rel=\"next\"]"),
                Locator::link_text("Next"),
                Locator::link_text("Next page"),
            ],
            fields: BTreeMap::new(),
        }
        .with_field(
            "title",
            text(&[".item-title", ".title", "[itemprop=\"name\"]", "h2", "h3"]),
        )
        .with_field(
            "price",
            text(&[".item-price", ".price", ".a-price .a-offscreen", "[itemprop=\"price\"]"]),
        )
        .with_field(
            "description",
            text(&[".item-description", ".description", "[itemprop=\"description\"]", "p"]),
        )
        .with_field(
            "author",
            text(&[".author", ".byline", "[itemprop=\"author\"]"])
                .with_transform(Transform::StripPrefix("by ".to_string())),
        )
        .with_field(
            "rating",
            text(&[".rating", ".stars", "[itemprop=\"ratingValue\"]"]),
        )
        .with_field(
            "link",
            text(&["a[href]"]).with_source(ValueSource::Attribute("href".to_string())),
        )
        .with_field(
            "image",
            text(&["img[src]"]).with_source(ValueSource::Attribute("src".to_string())),
        )
    }
}

/// Turn a free-form field name into a likely class-name token.
///
/// `"Product Name"` becomes `product-name`, `"unit_price"` becomes
/// `unit-price`. Returns `None` when nothing usable is left.
pub fn derived_class_token(field: &str) -> Option<String> {
    let mut token = String::with_capacity(field.len());
    for c in field.trim().chars().flat_map(char::to_lowercase) {
        let mapped = if c.is_whitespace() || c == '_' || c == '-' {
            '-'
        } else if c.is_ascii_alphanumeric() {
            c
        } else {
            continue;
        };
        if mapped == '-' && (token.is_empty() || token.ends_with('-')) {
            continue;
        }
        token.push(mapped);
    }
    let token = token.trim_end_matches('-').to_string();

    // A CSS class selector cannot start with a digit
    if token.is_empty() || token.starts_with(|c: char| c.is_ascii_digit()) {
        None
    } else {
        Some(token)
    }
}

/// Last-resort locator guessed from the field name
pub fn derived_locator(field: &str) -> Option<Locator> {
    derived_class_token(field).map(|token| Locator::css(format!(".{}", token)))
}
