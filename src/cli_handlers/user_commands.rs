use crate::cli::UserCommands;
use crate::error::{Result, TrackerError};

use super::utils::{finish, is_json, print_json};
use super::CliSession;

/// Handle all `tg users` subcommands
pub async fn handle_user_command(session: &mut CliSession, cmd: UserCommands) -> Result<()> {
    // The directory is only preloaded for admins
    let loaded = session.load_users().await;
    if loaded.is_error() {
        return Err(TrackerError::Rejected(loaded.message));
    }

    match cmd {
        UserCommands::List { format } => {
            let users = session.users().users();
            if is_json(format.as_str()) {
                return print_json(users);
            }
            if users.is_empty() {
                println!("No users found");
                return Ok(());
            }
            for user in users {
                println!(
                    "#{:<5} {:<24} {:<10} created {:>3}  assigned {:>3}",
                    user.id,
                    user.username,
                    user.role,
                    user.created_tasks_count,
                    user.assigned_tasks_count
                );
            }
            Ok(())
        },

        UserCommands::Add { username, role } => finish(session.create_user(&username, role).await),

        UserCommands::Update { id, username, role } => {
            if username.is_none() && role.is_none() {
                return Err(TrackerError::InvalidInput(
                    "Nothing to update. Pass --username or --role".to_string(),
                ));
            }
            if session.users().find(id).is_none() {
                return Err(TrackerError::UserNotFound(id));
            }
            finish(session.update_user(id, username, role).await)
        },

        UserCommands::Delete { id } => {
            if session.users().find(id).is_none() {
                return Err(TrackerError::UserNotFound(id));
            }
            finish(session.delete_user(id).await)
        },
    }
}
