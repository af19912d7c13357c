use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use sifter_core::config::{Engine, OutputFormat, OutputOptions, ScrapeConfig, parse_fields};
use sifter_core::{RunOutcome, execute_scrape, generate_scrape_report};
use sifter_scanner::{StrategyTable, TraversalMode};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Log to stderr; `RUST_LOG` wins over the default level
pub fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// Expand `~` in a user-supplied directory
pub fn expand_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Assemble and validate a scrape configuration from `scrape` arguments
pub fn build_scrape_config(args: &ArgMatches, quiet: bool) -> Result<ScrapeConfig> {
    let url = args
        .get_one::<Url>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    let fields = parse_fields(
        args.get_many::<String>("field")
            .ok_or_else(|| anyhow!("at least one --field is required"))?,
    );

    let mode_arg = args
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or("discrete-pages");
    let mode: TraversalMode = mode_arg.parse()?;

    let engine_arg = args
        .get_one::<String>("engine")
        .map(String::as_str)
        .unwrap_or("chrome");
    let engine = Engine::from_str(engine_arg).ok_or_else(|| anyhow!("unknown engine '{}'", engine_arg))?;

    let format_arg = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("both");
    let format =
        OutputFormat::from_str(format_arg).ok_or_else(|| anyhow!("unknown format '{}'", format_arg))?;

    let millis = |name: &str| Duration::from_millis(*args.get_one::<u64>(name).unwrap_or(&2000));

    let output = OutputOptions {
        dir: expand_dir(
            args.get_one::<String>("output-dir")
                .map(String::as_str)
                .unwrap_or(sifter_core::config::DEFAULT_OUTPUT_DIR),
        ),
        base_name: args
            .get_one::<String>("name")
            .cloned()
            .unwrap_or_else(|| sifter_core::config::DEFAULT_BASE_NAME.to_string()),
        format,
    };

    let mut config = ScrapeConfig::new(url.as_str(), fields)
        .with_mode(mode)
        .with_engine(engine)
        .with_output(output);

    config.traversal.max_retries = *args.get_one::<u32>("retries").unwrap_or(&3);
    config.traversal.retry_delay = millis("retry-delay-ms");
    config.traversal.settle_delay = millis("settle-delay-ms");
    config.traversal.scroll_delay = millis("scroll-delay-ms");
    config.traversal.max_pages = args.get_one::<usize>("max-pages").copied();
    config.traversal.max_scroll_rounds = args.get_one::<usize>("max-scroll-rounds").copied();
    config.page_load_timeout = Duration::from_secs(*args.get_one::<u64>("timeout").unwrap_or(&30));
    config.headless = !args.get_flag("headed");
    config.strategy_path = args.get_one::<PathBuf>("strategy").cloned();
    config.show_progress = !quiet;

    config.validate()?;
    debug!("Scrape configuration: {:?}", config);
    Ok(config)
}

fn print_scrape_plan(config: &ScrapeConfig) {
    print_divider();
    println!("{}", "  SIFTER SCRAPE".bright_white().bold());
    print_divider();
    println!();
    println!(
        "{} Target: {}",
        "→".blue(),
        config.traversal.start_url.bright_white()
    );
    println!(
        "{} Fields: {}",
        "→".blue(),
        config.traversal.fields.join(", ").bright_white()
    );
    println!(
        "{} Mode: {} via {}",
        "→".blue(),
        config.traversal.mode,
        config.engine.as_str()
    );
    if let Some(max) = config.traversal.max_pages {
        println!("{} Page limit: {}", "→".blue(), max);
    }
    if let Some(ref path) = config.strategy_path {
        println!("{} Strategy: {}", "→".blue(), path.display());
    }
    println!(
        "{} Output: {}",
        "→".blue(),
        config.output.dir.display().to_string().bright_white()
    );
    println!();
}

/// Run `sifter scrape`; returns the process exit code
pub async fn handle_scrape(args: &ArgMatches, quiet: bool) -> i32 {
    let config = match build_scrape_config(args, quiet) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            return RunOutcome::Failed.exit_code();
        }
    };

    if !quiet {
        print_scrape_plan(&config);
    }

    let summary = execute_scrape(config, None).await;

    println!();
    print!("{}", generate_scrape_report(&summary));
    summary.outcome.exit_code()
}

/// The strategy table `sifter scrape` would use with `overrides`
pub fn effective_strategy(overrides: Option<&Path>) -> Result<StrategyTable> {
    let table = StrategyTable::builtin();
    match overrides {
        Some(path) => {
            let extra = StrategyTable::load(path)
                .with_context(|| format!("Failed to load strategy table {}", path.display()))?;
            Ok(table.merged_with(extra))
        }
        None => Ok(table),
    }
}

/// Whether the banner goes to stdout for this invocation.
///
/// `strategy` output is JSON meant to be redirected into a file, so it never
/// gets one.
pub fn shows_banner(matches: &ArgMatches) -> bool {
    !matches.get_flag("quiet") && !matches!(matches.subcommand(), Some(("strategy", _)))
}

/// Pretty JSON for the effective strategy table, newline terminated
pub fn strategy_json(overrides: Option<&Path>) -> Result<String> {
    let json = effective_strategy(overrides)?.to_json()?;
    Ok(format!("{}\n", json))
}

/// Run `sifter strategy`; returns the process exit code
pub fn handle_strategy(args: &ArgMatches) -> i32 {
    let result = strategy_json(args.get_one::<PathBuf>("strategy").map(PathBuf::as_path))
        .and_then(|json| match args.get_one::<PathBuf>("output") {
            Some(path) => {
                fs::write(path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("{} Strategy table written to {}", "✓".green().bold(), path.display());
                Ok(())
            }
            None => {
                print!("{}", json);
                Ok(())
            }
        });

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            1
        }
    }
}
