use crate::site::EntryStrategy;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Search a keyword and extract every result page")]
    Search {
        #[arg(help = "Search keyword (falls back to the configured default keyword)")]
        keyword: Option<String>,
        #[arg(long, value_enum, help = "How to reach the results")]
        strategy: Option<EntryStrategy>,
        #[arg(short, long, help = "Write the merged document to this file")]
        output: Option<PathBuf>,
        #[arg(long, help = "Write the merged document to a timestamped file")]
        save: bool,
        #[arg(long, help = "Print only the page summary instead of the merged document")]
        pages: bool,
    },

    #[command(about = "Serve the extraction API over HTTP")]
    Serve {
        #[arg(long, help = "Address to bind")]
        host: Option<String>,
        #[arg(short, long, help = "Port to listen on")]
        port: Option<u16>,
    },

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    #[command(about = "Initialize config file with defaults")]
    Init,

    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Show config file path")]
    Path,
}
