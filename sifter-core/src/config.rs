use crate::error::{Result, RunError};
use serde::{Deserialize, Serialize};
use sifter_scanner::{ChromeConfig, StrategyTable, TraversalMode, TraversalOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_BASE_NAME: &str = "extracted_data";

/// Which page backend renders the listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Chrome,
    /// Plain HTTP fetch, no JavaScript
    Static,
}

impl Engine {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chrome" | "browser" => Some(Engine::Chrome),
            "static" | "http" => Some(Engine::Static),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Chrome => "chrome",
            Engine::Static => "static",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    #[default]
    Both,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            "both" => Some(OutputFormat::Both),
            _ => None,
        }
    }

    pub fn writes_csv(&self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }

    pub fn writes_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

/// Where and how results are written
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub dir: PathBuf,
    /// File stem; the run timestamp and extension are appended
    pub base_name: String,
    pub format: OutputFormat,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            base_name: DEFAULT_BASE_NAME.to_string(),
            format: OutputFormat::default(),
        }
    }
}

/// Everything needed to run one scrape
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub traversal: TraversalOptions,
    pub engine: Engine,
    pub page_load_timeout: Duration,
    pub headless: bool,
    /// JSON strategy table layered over the built-in one
    pub strategy_path: Option<PathBuf>,
    pub output: OutputOptions,
    pub show_progress: bool,
}

impl ScrapeConfig {
    pub fn new(url: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            traversal: TraversalOptions::new(url, fields),
            engine: Engine::default(),
            page_load_timeout: Duration::from_secs(30),
            headless: true,
            strategy_path: None,
            output: OutputOptions::default(),
            show_progress: true,
        }
    }

    pub fn with_mode(mut self, mode: TraversalMode) -> Self {
        self.traversal.mode = mode;
        self
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.traversal.start_url).map_err(|e| {
            RunError::Config(format!("invalid URL '{}': {}", self.traversal.start_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RunError::Config(format!(
                "unsupported URL scheme '{}', expected http or https",
                url.scheme()
            )));
        }

        if self.traversal.fields.is_empty() {
            return Err(RunError::Config("at least one field is required".to_string()));
        }
        if self.traversal.fields.iter().any(|f| f.trim().is_empty()) {
            return Err(RunError::Config("field names must not be blank".to_string()));
        }
        if self.traversal.max_retries < 1 {
            return Err(RunError::Config("retries must be at least 1".to_string()));
        }
        if self.traversal.max_pages == Some(0) {
            return Err(RunError::Config("max pages must be at least 1".to_string()));
        }

        let base = &self.output.base_name;
        if base.trim().is_empty() || base.contains(['/', '\\']) {
            return Err(RunError::Config(format!(
                "output name '{}' must be a plain file name",
                base
            )));
        }
        Ok(())
    }

    /// Built-in strategies, overridden by the strategy file if one is set
    pub fn strategy_table(&self) -> Result<StrategyTable> {
        let builtin = StrategyTable::builtin();
        match self.strategy_path {
            Some(ref path) => Ok(builtin.merged_with(load_strategy(path)?)),
            None => Ok(builtin),
        }
    }

    pub fn chrome_config(&self) -> ChromeConfig {
        ChromeConfig {
            headless: self.headless,
            page_load_timeout: self.page_load_timeout,
            ..ChromeConfig::default()
        }
    }
}

fn load_strategy(path: &Path) -> Result<StrategyTable> {
    StrategyTable::load(path).map_err(|e| RunError::Strategy {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Split repeated and comma-separated field arguments into an ordered list.
///
/// Names are trimmed and duplicates dropped, keeping the first occurrence.
pub fn parse_fields<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut fields: Vec<String> = Vec::new();
    for arg in raw {
        for name in arg.as_ref().split(',') {
            let name = name.trim().to_string();
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields_splits_and_dedupes() {
        let fields = parse_fields(["title, price", "price", "Author"]);
        assert_eq!(fields, vec!["title", "price", "Author"]);
    }

    #[test]
    fn test_parse_fields_keeps_blank_for_validation() {
        let config = ScrapeConfig::new("https://shop.test", parse_fields(["title,,price"]));
        assert!(matches!(config.validate(), Err(RunError::Config(_))));
    }

    #[test]
    fn test_format_selection() {
        assert!(OutputFormat::Both.writes_csv() && OutputFormat::Both.writes_json());
        assert!(!OutputFormat::Csv.writes_json());
        assert!(!OutputFormat::Json.writes_csv());
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }

    #[test]
    fn test_engine_from_str() {
        assert_eq!(Engine::from_str("static"), Some(Engine::Static));
        assert_eq!(Engine::from_str("Chrome"), Some(Engine::Chrome));
        assert_eq!(Engine::from_str("firefox"), None);
    }
}
