use sifter::command_argument_builder;
use sifter::handlers::{handle_scrape, handle_strategy, init_tracing, shows_banner};
use sifter_core::print_banner;

/// Exit code for an interrupted run, as a shell reports SIGINT
const INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    if shows_banner(&chosen_command) {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    init_tracing(quiet);

    let code = match chosen_command.subcommand() {
        Some(("scrape", primary_command)) => {
            tokio::select! {
                code = handle_scrape(primary_command, quiet) => code,
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("\n✗ Interrupted");
                    INTERRUPTED
                }
            }
        }
        Some(("strategy", primary_command)) => handle_strategy(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    std::process::exit(code);
}
