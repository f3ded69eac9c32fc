pub mod commands;
pub mod dispatch;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "map-extractor")]
#[command(version, about = "Extract structured search results from a map site")]
#[command(
    long_about = "Drives a headless Chrome through every result page of a map search and merges the client-side state of each page into one JSON document"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<commands::Command>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Run Chrome in headless mode")]
    pub headless: Option<bool>,

    #[arg(long, global = true, help = "Path to Chrome executable")]
    pub chrome_path: Option<PathBuf>,

    #[arg(long, global = true, help = "Per-operation timeout in seconds")]
    pub timeout: Option<u64>,
}

pub async fn run() -> crate::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        crate::config::Config::from_file(config_path)?
    } else {
        crate::config::Config::load()?
    };

    let strategy = match &cli.command {
        Some(commands::Command::Search { strategy, .. }) => *strategy,
        _ => None,
    };

    let overrides = crate::config::ConfigOverrides {
        headless: cli.headless,
        chrome_path: cli.chrome_path.clone(),
        timeout: cli.timeout,
        strategy,
    };

    let config = Arc::new(config.load_with_overrides(overrides));
    config.validate()?;

    dispatch::dispatch(cli, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::EntryStrategy;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::parse_from([
            "map-extractor",
            "search",
            "pizza",
            "--strategy",
            "deep-link",
            "--save",
            "--headless",
            "false",
        ]);
        assert_eq!(cli.headless, Some(false));
        match cli.command {
            Some(commands::Command::Search {
                keyword,
                strategy,
                save,
                pages,
                ..
            }) => {
                assert_eq!(keyword.as_deref(), Some("pizza"));
                assert_eq!(strategy, Some(EntryStrategy::DeepLink));
                assert!(save);
                assert!(!pages);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["map-extractor", "serve", "--port", "8080", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Some(commands::Command::Serve {
                port: Some(8080),
                ..
            })
        ));
    }
}
