use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::Role;
use crate::status::TaskStatus;

const LONG_ABOUT: &str = r#"
taskgraph - collaborative task tracker

Tasks form a dependency graph: a task may have several parents and several
children. Work moves through five statuses:

  not_started -> started -> functional -> documented -> integrated

Connection:
  --server / TG_SERVER_URL   collaborator base URL (default http://127.0.0.1:5000)
  --user-id / TG_USER_ID     acting user (required)
  --role / TG_USER_ROLE      developer or admin (default developer)

Typical flow:
  tg list                  tasks ranked mine, unassigned, everyone else
  tg claim 12              take an unassigned task
  tg status 12 functional  move it along
  tg graph 12              levelled view of its dependencies

Run `tg serve` to start an in-memory collaborator for local use.
"#;

#[derive(Parser, Clone)]
#[command(name = "tg")]
#[command(about = "Collaborative task tracker over a dependency graph")]
#[command(long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Collaborator base URL
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Acting user id
    #[arg(long, global = true)]
    pub user_id: Option<i64>,

    /// Acting user role (developer, admin)
    #[arg(long, global = true)]
    pub role: Option<Role>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose output (-v)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// List tasks in sidebar order
    ///
    /// Examples:
    ///   tg list
    ///   tg list --query physics --format json
    List {
        /// Case-insensitive filter on title or description
        #[arg(long)]
        query: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show one task with relations, status history and available actions
    Show {
        /// Task ID
        id: i64,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Levelled dependency view around a task
    ///
    /// Level 0 is the task itself, parents sit one level above their deepest child.
    Graph {
        /// Focal task ID
        id: i64,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Force-directed positions for every task
    Tree {
        /// Simulation steps to run before printing
        #[arg(long, default_value_t = 300)]
        ticks: usize,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create a task
    ///
    /// Examples:
    ///   tg create --title "Particle system"
    ///   tg create --title "Sparks" --parent 4 --parent 9
    Create {
        /// Task title
        #[arg(long)]
        title: String,

        /// Task description
        #[arg(short, long)]
        description: Option<String>,

        /// Parent task IDs (repeatable)
        #[arg(short, long = "parent")]
        parents: Vec<i64>,
    },

    /// Edit a task's title or description
    Edit {
        /// Task ID
        id: i64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: i64,
    },

    /// Change a task's status
    ///
    /// Skipping ahead, or integrating with unfinished children, asks for
    /// confirmation first.
    ///
    /// Examples:
    ///   tg status 12 started
    ///   tg status 12 integrated --yes
    Status {
        /// Task ID
        id: i64,

        /// Target status
        status: TaskStatus,
    },

    /// Assign an unassigned task to yourself
    Claim {
        /// Task ID
        id: i64,
    },

    /// Give up a task assigned to you
    Abandon {
        /// Task ID
        id: i64,
    },

    /// Clear a task's assignee (admin)
    Unassign {
        /// Task ID
        id: i64,
    },

    /// Assign a task to a user (admin); omit --user to clear
    Assign {
        /// Task ID
        id: i64,

        /// User ID
        #[arg(long)]
        user: Option<i64>,
    },

    /// Save a task's documentation
    Doc {
        /// Task ID
        id: i64,

        /// Documentation text
        text: String,
    },

    /// Parent relationship management
    #[command(subcommand)]
    Parent(ParentCommands),

    /// Child relationship management
    #[command(subcommand)]
    Child(ChildCommands),

    /// User management (admin)
    #[command(subcommand)]
    Users(UserCommands),

    /// Run an in-memory collaborator over HTTP
    Serve {
        /// Address to bind (default 127.0.0.1:5000, env TG_BIND)
        #[arg(long)]
        bind: Option<String>,

        /// Create an admin with this username at startup
        #[arg(long)]
        seed_admin: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ParentCommands {
    /// Add a parent to a task
    Add {
        /// Task ID
        id: i64,

        /// Parent task ID
        parent: i64,
    },

    /// Remove a parent from a task
    Remove {
        /// Task ID
        id: i64,

        /// Parent task ID
        parent: i64,
    },
}

#[derive(Subcommand, Clone)]
pub enum ChildCommands {
    /// Add a child to a task
    Add {
        /// Task ID
        id: i64,

        /// Child task ID
        child: i64,
    },
}

#[derive(Subcommand, Clone)]
pub enum UserCommands {
    /// List users
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create a user
    Add {
        /// Username
        username: String,

        /// Role (developer, admin)
        #[arg(long, default_value = "developer")]
        role: Role,
    },

    /// Rename a user or change their role
    Update {
        /// User ID
        id: i64,

        /// New username
        #[arg(long)]
        username: Option<String>,

        /// New role
        #[arg(long)]
        role: Option<Role>,
    },

    /// Delete a user
    Delete {
        /// User ID
        id: i64,
    },
}
