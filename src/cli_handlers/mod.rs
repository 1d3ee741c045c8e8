// CLI command handlers
//
// Every command except `serve` opens a session against the configured
// collaborator, runs one action and prints the outcome.

pub mod task_commands;
pub mod user_commands;
pub mod utils;

use crate::cli::{Cli, Commands};
use crate::client::HttpBackend;
use crate::config::{ClientConfig, ClientOverrides};
use crate::confirm::{AlwaysConfirm, Confirmer, DialoguerConfirmer};
use crate::error::{Result, TrackerError};
use crate::session::TrackerSession;

pub use task_commands::{handle_child_command, handle_parent_command};
pub use user_commands::handle_user_command;
pub use utils::{finish, print_json, status_badge};

pub type CliSession = TrackerSession<HttpBackend, Box<dyn Confirmer>>;

fn overrides(cli: &Cli) -> ClientOverrides {
    ClientOverrides {
        server_url: cli.server.clone(),
        user_id: cli.user_id,
        role: cli.role,
        timeout_secs: cli.timeout,
    }
}

/// Resolve configuration, connect and load the task collection
pub async fn open_session(cli: &Cli) -> Result<CliSession> {
    let config = ClientConfig::resolve(overrides(cli))?;
    let backend = HttpBackend::with_timeout(&config.server_url, config.user_id, config.timeout)?;
    let confirmer: Box<dyn Confirmer> = if cli.yes {
        Box::new(AlwaysConfirm)
    } else {
        Box::new(DialoguerConfirmer)
    };

    tracing::debug!(
        server = %config.server_url,
        user_id = config.user_id,
        role = %config.role,
        "Opening session"
    );
    let mut session = TrackerSession::new(backend, confirmer, config.identity());
    let summary = session.refresh().await?;
    tracing::info!(task_count = summary.task_count, "Tasks loaded");
    if session.identity().is_admin() {
        let loaded = session.load_users().await;
        if loaded.is_error() {
            return Err(TrackerError::Rejected(loaded.message));
        }
    }
    Ok(session)
}

/// Run any command other than `serve`
pub async fn handle_command(cli: &Cli) -> Result<()> {
    let mut session = open_session(cli).await?;

    match cli.command.clone() {
        Commands::List { query, format } => {
            task_commands::handle_list(&mut session, query, &format)
        },
        Commands::Show { id, format } => task_commands::handle_show(&session, id, &format).await,
        Commands::Graph { id, format } => task_commands::handle_graph(&mut session, id, &format),
        Commands::Tree { ticks, format } => {
            task_commands::handle_tree(&mut session, ticks, &format)
        },
        Commands::Create {
            title,
            description,
            parents,
        } => task_commands::handle_create(&mut session, &title, description, parents).await,
        Commands::Edit {
            id,
            title,
            description,
        } => finish(session.edit_task(id, title, description).await),
        Commands::Delete { id } => finish(session.delete_task(id).await),
        Commands::Status { id, status } => {
            task_commands::handle_status(&mut session, id, status).await
        },
        Commands::Claim { id } => finish(session.claim(id).await),
        Commands::Abandon { id } => finish(session.abandon(id).await),
        Commands::Unassign { id } => finish(session.unassign(id).await),
        Commands::Assign { id, user } => finish(session.assign(id, user).await),
        Commands::Doc { id, text } => finish(session.save_documentation(id, &text).await),
        Commands::Parent(cmd) => handle_parent_command(&mut session, cmd).await,
        Commands::Child(cmd) => handle_child_command(&mut session, cmd).await,
        Commands::Users(cmd) => handle_user_command(&mut session, cmd).await,
        Commands::Serve { .. } => Err(TrackerError::InvalidInput(
            "serve does not take a session".to_string(),
        )),
    }
}
