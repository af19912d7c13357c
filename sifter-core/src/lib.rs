pub mod config;
pub mod error;
pub mod outcome;
pub mod output;
pub mod report;
pub mod scrape;

use colored::Colorize;

pub use config::{Engine, OutputFormat, OutputOptions, ScrapeConfig, parse_fields};
pub use error::{OutputError, RunError};
pub use outcome::RunOutcome;
pub use output::{OutputSink, WrittenFiles};
pub use report::generate_scrape_report;
pub use scrape::{RunSummary, ScrapeProgressCallback, execute_scrape};

const BANNER: &str = r#"
   ___  _  __  _
  / __|(_)/ _|| |_  ___  _ _
  \__ \| ||  _||  _|/ -_)| '_|
  |___/|_||_|   \__|\___||_|
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "listing scraper".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
