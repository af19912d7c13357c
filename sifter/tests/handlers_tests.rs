use sifter::handlers::*;
use sifter::command_argument_builder;
use sifter_core::config::{Engine, OutputFormat};
use sifter_scanner::{Locator, TraversalMode};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};

fn scrape_matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["sifter", "scrape"];
    argv.extend_from_slice(args);
    let matches = command_argument_builder()
        .try_get_matches_from(argv)
        .expect("arguments should parse");
    matches
        .subcommand_matches("scrape")
        .expect("scrape subcommand")
        .clone()
}

// ============================================================================
// Argument Parsing
// ============================================================================

#[test]
fn test_defaults() {
    let args = scrape_matches(&["-u", "https://shop.example/list", "-F", "title"]);
    let config = build_scrape_config(&args, false).unwrap();

    assert_eq!(config.traversal.start_url, "https://shop.example/list");
    assert_eq!(config.traversal.fields, vec!["title"]);
    assert_eq!(config.traversal.mode, TraversalMode::DiscretePages);
    assert_eq!(config.traversal.max_retries, 3);
    assert_eq!(config.traversal.retry_delay, Duration::from_secs(2));
    assert_eq!(config.traversal.max_pages, None);
    assert_eq!(config.engine, Engine::Chrome);
    assert_eq!(config.page_load_timeout, Duration::from_secs(30));
    assert!(config.headless);
    assert_eq!(config.output.dir, PathBuf::from("data"));
    assert_eq!(config.output.base_name, "extracted_data");
    assert_eq!(config.output.format, OutputFormat::Both);
    assert!(config.show_progress);
}

#[test]
fn test_fields_repeat_and_split() {
    let args = scrape_matches(&[
        "-u",
        "https://shop.example/list",
        "-F",
        "title, price",
        "--field",
        "author",
        "-F",
        "price",
    ]);
    let config = build_scrape_config(&args, true).unwrap();
    assert_eq!(config.traversal.fields, vec!["title", "price", "author"]);
    assert!(!config.show_progress);
}

#[test]
fn test_all_options() {
    let args = scrape_matches(&[
        "-u",
        "https://feed.example/",
        "-F",
        "title",
        "-m",
        "infinite-scroll",
        "-e",
        "static",
        "--retries",
        "5",
        "--retry-delay-ms",
        "10",
        "--settle-delay-ms",
        "0",
        "--scroll-delay-ms",
        "250",
        "--max-pages",
        "4",
        "--max-scroll-rounds",
        "20",
        "--timeout",
        "9",
        "--headed",
        "-o",
        "/tmp/sifter-out",
        "-n",
        "feed",
        "-f",
        "json",
    ]);
    let config = build_scrape_config(&args, false).unwrap();

    assert_eq!(config.traversal.mode, TraversalMode::InfiniteScroll);
    assert_eq!(config.engine, Engine::Static);
    assert_eq!(config.traversal.max_retries, 5);
    assert_eq!(config.traversal.retry_delay, Duration::from_millis(10));
    assert_eq!(config.traversal.settle_delay, Duration::ZERO);
    assert_eq!(config.traversal.scroll_delay, Duration::from_millis(250));
    assert_eq!(config.traversal.max_pages, Some(4));
    assert_eq!(config.traversal.max_scroll_rounds, Some(20));
    assert_eq!(config.page_load_timeout, Duration::from_secs(9));
    assert!(!config.headless);
    assert_eq!(config.output.dir, PathBuf::from("/tmp/sifter-out"));
    assert_eq!(config.output.base_name, "feed");
    assert_eq!(config.output.format, OutputFormat::Json);
}

#[test]
fn test_output_dir_tilde_is_expanded() {
    let args = scrape_matches(&["-u", "https://shop.example/", "-F", "title", "-o", "~/scrapes"]);
    let config = build_scrape_config(&args, false).unwrap();
    assert!(!config.output.dir.to_string_lossy().starts_with('~'));
    assert!(config.output.dir.ends_with("scrapes"));
}

#[test]
fn test_zero_retries_rejected_by_parser() {
    let result = command_argument_builder().try_get_matches_from([
        "sifter",
        "scrape",
        "-u",
        "https://shop.example/",
        "-F",
        "title",
        "--retries",
        "0",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_missing_field_rejected_by_parser() {
    let result = command_argument_builder().try_get_matches_from([
        "sifter",
        "scrape",
        "-u",
        "https://shop.example/",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_unknown_mode_rejected_by_parser() {
    let result = command_argument_builder().try_get_matches_from([
        "sifter",
        "scrape",
        "-u",
        "https://shop.example/",
        "-F",
        "title",
        "-m",
        "sideways",
    ]);
    assert!(result.is_err());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_blank_field_rejected() {
    let args = scrape_matches(&["-u", "https://shop.example/", "-F", "title,,price"]);
    assert!(build_scrape_config(&args, false).is_err());
}

#[test]
fn test_non_http_url_rejected() {
    let args = scrape_matches(&["-u", "ftp://files.example/", "-F", "title"]);
    let err = build_scrape_config(&args, false).unwrap_err();
    assert!(format!("{:#}", err).contains("scheme"));
}

#[test]
fn test_output_name_with_separator_rejected() {
    let args = scrape_matches(&["-u", "https://shop.example/", "-F", "title", "-n", "a/b"]);
    assert!(build_scrape_config(&args, false).is_err());
}

// ============================================================================
// Strategy Tables
// ============================================================================

#[test]
fn test_builtin_strategy_round_trips_through_json() {
    let table = effective_strategy(None).unwrap();
    let json = table.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert!(value["fields"]["title"]["candidates"].is_array());
    assert!(value["next_page"].as_array().unwrap().len() > 1);
}

#[test]
fn test_strategy_file_is_merged() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"{{"next_page": [{{"kind": "css", "value": "button.more"}}]}}"#
    )?;

    let table = effective_strategy(Some(file.path()))?;
    assert_eq!(table.next_page, vec![Locator::css("button.more")]);
    // Untouched sections keep the built-in entries
    assert!(table.rule_for("title").is_some());
    Ok(())
}

#[test]
fn test_missing_strategy_file() {
    let result = effective_strategy(Some(std::path::Path::new("/nonexistent/strategy.json")));
    assert!(result.is_err());
}

#[test]
fn test_strategy_command_writes_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("strategy.json");
    let matches = command_argument_builder()
        .try_get_matches_from(["sifter", "strategy", "-o", out.to_str().unwrap()])
        .unwrap();

    let code = handle_strategy(matches.subcommand_matches("strategy").unwrap());

    assert_eq!(code, 0);
    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("\"record_nodes\""));
}

#[test]
fn test_strategy_output_is_loadable_json() {
    let json = strategy_json(None).unwrap();

    // Everything printed must parse; nothing precedes the table
    assert!(json.starts_with('{'));
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["record_nodes"].is_array());

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    let reloaded = effective_strategy(Some(file.path())).unwrap();
    assert_eq!(reloaded, effective_strategy(None).unwrap());
}

// ============================================================================
// Banner And Quiet Mode
// ============================================================================

#[test]
fn test_banner_skipped_for_strategy_output() {
    let matches = command_argument_builder()
        .try_get_matches_from(["sifter", "strategy"])
        .unwrap();
    assert!(!shows_banner(&matches));
}

#[test]
fn test_banner_shown_for_scrape() {
    let matches = command_argument_builder()
        .try_get_matches_from(["sifter", "scrape", "-u", "https://shop.example/", "-F", "title"])
        .unwrap();
    assert!(shows_banner(&matches));
}

#[test]
fn test_quiet_accepted_after_subcommand() {
    let matches = command_argument_builder()
        .try_get_matches_from([
            "sifter",
            "scrape",
            "-u",
            "https://shop.example/",
            "-F",
            "title",
            "-q",
        ])
        .expect("-q should be accepted after the subcommand");

    assert!(matches.get_flag("quiet"));
    assert!(!shows_banner(&matches));
    let scrape = matches.subcommand_matches("scrape").unwrap();
    assert!(scrape.get_flag("quiet"));
}
