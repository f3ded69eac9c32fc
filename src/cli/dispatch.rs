use super::{
    Cli,
    commands::{Command, ConfigCommand},
};
use crate::{
    ExtractError, Result,
    chrome::ChromeLauncher,
    config::Config,
    events::{EventBroadcaster, SubscriptionGuard},
    extract::{ExtractionRequest, ExtractionSettings, SessionController},
    handlers::{self, search::ExportTarget},
    output,
    server::HttpServer,
};
use std::path::PathBuf;
use std::sync::Arc;

pub async fn dispatch(mut cli: Cli, config: Arc<Config>) -> Result<()> {
    let command = cli.command.take().ok_or_else(|| {
        ExtractError::General("No command provided. Use --help for usage.".into())
    })?;

    match command {
        Command::Search {
            keyword,
            output,
            save,
            pages,
            ..
        } => handle_search_command(keyword, output, save, pages, &cli, config).await,
        Command::Serve { host, port } => handle_serve_command(host, port, config).await,
        Command::Config { subcommand } => handle_config_command(subcommand, &cli, &config),
    }
}

async fn handle_search_command(
    keyword: Option<String>,
    output_path: Option<PathBuf>,
    save: bool,
    pages_only: bool,
    cli: &Cli,
    config: Arc<Config>,
) -> Result<()> {
    let keyword = keyword
        .or_else(|| config.server.default_keyword.clone())
        .unwrap_or_default();
    let request = ExtractionRequest::new(keyword, config.site.entry_strategy)?;
    let export = ExportTarget::from_args(output_path, save);

    let broadcaster = Arc::new(EventBroadcaster::new());
    let subscription = broadcaster.subscribe();
    let guard = SubscriptionGuard::new(broadcaster.clone(), subscription.id);
    let mut receiver = subscription.receiver;
    let printer = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            eprintln!("{}", output::format_event(&event));
        }
    });

    let controller = SessionController::new(
        Arc::new(ChromeLauncher::new(&config)),
        broadcaster,
        ExtractionSettings::from_config(&config),
    );
    let result = handlers::search::handle_search(&controller, &request, &export).await;

    // Dropping the guard closes the channel so the printer drains and exits.
    drop(guard);
    let _ = printer.await;

    let (merged, report) = result?;
    if pages_only || report.saved_to.is_some() {
        output::print_output(&report, cli.json, true)
    } else {
        println!("{}", output::to_json(&merged.data, true)?);
        Ok(())
    }
}

async fn handle_serve_command(
    host: Option<String>,
    port: Option<u16>,
    config: Arc<Config>,
) -> Result<()> {
    let mut config = (*config).clone();
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let config = Arc::new(config);

    let launcher = Arc::new(ChromeLauncher::new(&config));
    HttpServer::new(config, launcher).run().await
}

fn handle_config_command(subcommand: ConfigCommand, cli: &Cli, config: &Config) -> Result<()> {
    match subcommand {
        ConfigCommand::Init => {
            let result = handlers::config_handler::handle_config_init()?;
            output::print_output(&result, cli.json, true)
        }
        ConfigCommand::Show => {
            let result = handlers::config_handler::handle_config_show(config);
            output::print_output(&result, cli.json, true)
        }
        ConfigCommand::Path => {
            let result = handlers::config_handler::handle_config_path()?;
            output::print_output(&result, cli.json, true)
        }
    }
}
