pub mod commands;
pub mod handlers;

pub use commands::command_argument_builder;
pub use handlers::{
    build_scrape_config, effective_strategy, handle_scrape, handle_strategy, shows_banner,
    strategy_json,
};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
