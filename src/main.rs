mod backends;
mod cli;
mod config;
mod registry;
mod system;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use backends::backends::Provider;
use cli::{ask::ask_cmd, list::list_cmd};
use utils::errors::configure_color;

#[derive(Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "modelhub")]
#[command(
    about = "A CLI for cataloguing chat-model backends and routing prompts",
    version = "0.1.0"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
    /// Read configuration from the specified file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a prompt to a model
    Ask(AskArgs),
    /// List catalogued models and providers
    List(ListArgs),
}

#[derive(Parser, Default)]
pub(crate) struct AskArgs {
    /// Pin the request to the specified model id for this run
    #[arg(short, long)]
    model: Option<String>,
    /// Prefer an on-device model
    #[arg(long)]
    privacy: bool,
    /// Prefer a more capable model
    #[arg(long)]
    complexity: bool,
    /// Prefer a faster model
    #[arg(long)]
    speed: bool,
    /// Override the sampling temperature for this request
    #[arg(long)]
    temperature: Option<f64>,
    /// Override the completion-length limit for this request
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Print the full completion as JSON
    #[arg(long)]
    json: bool,
    /// The prompt to route
    prompt: Option<String>,
}

/// Possible listings
#[derive(Subcommand)]
pub(crate) enum ListObject {
    /// Catalogued models
    Models(ListModelArgs),
    /// Providers
    Providers,
}

/// Output formats
#[derive(ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// List the specified object
    #[command(subcommand)]
    object: ListObject,
}

#[derive(Parser, Default)]
pub(crate) struct ListModelArgs {
    /// Limit the listing to the specified provider
    #[arg(short, long)]
    provider: Option<Provider>,
    /// Limit the listing to on-device models
    #[arg(long, conflicts_with = "cloud")]
    local: bool,
    /// Limit the listing to remote models
    #[arg(long)]
    cloud: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    configure_color(cli.color);

    let config = config::read_config(cli.config);

    match &cli.command {
        Commands::Ask(args) => ask_cmd(&config, args).await,
        Commands::List(args) => list_cmd(&config, args).await,
    }
}
