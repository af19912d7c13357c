use crate::CLAP_STYLING;
use clap::{arg, command};
use sifter_core::config::{DEFAULT_BASE_NAME, DEFAULT_OUTPUT_DIR};
use url::Url;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sifter")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sifter")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("scrape")
                .about(
                    "Walk a paginated or infinite-scroll listing and extract the requested \
                fields from every item into CSV and JSON files.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The listing page to start from")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-F --"field" <NAME>)
                        .required(true)
                        .help("Field to extract; repeat or separate with commas (e.g. -F title,price)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(-m --"mode" <MODE>)
                        .required(false)
                        .help("How the listing grows")
                        .value_parser(["discrete-pages", "infinite-scroll"])
                        .default_value("discrete-pages"),
                )
                .arg(
                    arg!(-e --"engine" <ENGINE>)
                        .required(false)
                        .help("Page backend: a headless Chrome, or plain HTTP for server-rendered sites")
                        .value_parser(["chrome", "static"])
                        .default_value("chrome"),
                )
                .arg(
                    arg!(--"retries" <ATTEMPTS>)
                        .required(false)
                        .help("Load attempts for the start URL")
                        .value_parser(clap::value_parser!(u32).range(1..))
                        .default_value("3"),
                )
                .arg(
                    arg!(--"retry-delay-ms" <MS>)
                        .required(false)
                        .help("Delay between load attempts")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("2000"),
                )
                .arg(
                    arg!(--"settle-delay-ms" <MS>)
                        .required(false)
                        .help("Wait after moving to the next page")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("2000"),
                )
                .arg(
                    arg!(--"scroll-delay-ms" <MS>)
                        .required(false)
                        .help("Wait between scrolls in infinite-scroll mode")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("2000"),
                )
                .arg(
                    arg!(--"max-pages" <COUNT>)
                        .required(false)
                        .help("Stop after this many listing pages")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"max-scroll-rounds" <COUNT>)
                        .required(false)
                        .help("Give up scrolling after this many rounds")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Page load timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"headed")
                        .required(false)
                        .help("Show the browser window")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-s --"strategy" <PATH>)
                        .required(false)
                        .help("JSON strategy table layered over the built-in one")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-o --"output-dir" <PATH>)
                        .required(false)
                        .help("Directory for output files")
                        .default_value(DEFAULT_OUTPUT_DIR),
                )
                .arg(
                    arg!(-n --"name" <BASE>)
                        .required(false)
                        .help("Output file name prefix")
                        .default_value(DEFAULT_BASE_NAME),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: csv, json, both")
                        .value_parser(["csv", "json", "both"])
                        .default_value("both"),
                ),
        )
        .subcommand(
            command!("strategy")
                .about("Print the locator strategy table as JSON, ready to edit and pass to --strategy")
                .arg(
                    arg!(-s --"strategy" <PATH>)
                        .required(false)
                        .help("Show the built-in table merged with this file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Write to a file instead of the screen")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
