use std::io::IsTerminal;

use clap::Parser;
use taskgraph::cli::{Cli, Commands};
use taskgraph::cli_handlers::handle_command;
use taskgraph::config::ServerConfig;
use taskgraph::error::{ErrorResponse, TrackerError};
use taskgraph::logging::{init_logging, log_file_path, ApplicationMode, LoggingConfig};
use taskgraph::memory::MemoryState;
use taskgraph::server::TaskServer;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(logging_config(&cli)) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&cli).await {
        let response = match e.downcast_ref::<TrackerError>() {
            Some(err) => err.to_error_response(),
            None => ErrorResponse {
                error: format!("{:#}", e),
                code: "INTERNAL_ERROR".to_string(),
            },
        };
        let rendered = serde_json::to_string_pretty(&response)
            .unwrap_or_else(|_| format!("{}: {}", response.code, response.error));
        eprintln!("{}", rendered);
        std::process::exit(1);
    }
}

fn logging_config(cli: &Cli) -> LoggingConfig {
    let serving = matches!(cli.command, Commands::Serve { .. });
    let mut config = if serving {
        let mut server = LoggingConfig::for_mode(ApplicationMode::Server);
        server.json_format = cli.json;
        if cli.verbose > 0 {
            server.level = tracing::Level::DEBUG;
        }
        server
    } else {
        LoggingConfig::from_args(cli.quiet, cli.verbose > 0, cli.json)
    };

    if let Some(path) = &cli.log_file {
        config = config.with_file(path.clone());
    } else if serving && !std::io::stdout().is_terminal() {
        // Detached server: keep a log on disk
        if let Ok(path) = log_file_path(ApplicationMode::Server) {
            config = config.with_file(path);
        }
    }
    config
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Serve { bind, seed_admin } => {
            let config = ServerConfig::resolve(bind.clone(), seed_admin.clone());
            TaskServer::new(config, MemoryState::new()).run().await?;
        },
        _ => handle_command(cli).await?,
    }
    Ok(())
}
