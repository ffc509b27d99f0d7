use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use todomaster::clock::SystemClock;
use todomaster::commands::*;
use todomaster::config::db_path;
use todomaster::error::TaskError;
use todomaster::storage::TaskStore;
use todomaster::ui::render_error;

#[derive(Parser)]
#[command(name = "todomaster", version)]
#[command(about = "A command-line todo list", long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log store activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task description (quoted if it has spaces)
        description: String,
        /// Task priority (low, medium, high)
        #[arg(short, long)]
        priority: Option<String>,
        /// Due date: today, tomorrow, +3d, +1w, YYYY-MM-DD, ...
        #[arg(short, long)]
        due: Option<String>,
        /// Tags, comma-separated
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// List tasks with optional filtering
    List {
        /// Show all tasks (including completed)
        #[arg(short, long, conflicts_with_all = ["pending", "overdue"])]
        all: bool,
        /// Show only pending tasks
        #[arg(long, conflicts_with = "overdue")]
        pending: bool,
        /// Show only overdue tasks
        #[arg(long)]
        overdue: bool,
        /// Filter by priority
        #[arg(short, long)]
        priority: Option<String>,
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Mark a task as completed
    Done {
        id: String,
    },
    /// Edit an existing task
    Edit {
        id: String,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        /// New priority
        #[arg(short, long)]
        priority: Option<String>,
        /// New due date
        #[arg(long)]
        due: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Option<String>,
        /// Tags to remove
        #[arg(long)]
        remove_tag: Option<String>,
    },
    /// Delete a task
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Remove all completed tasks
    Clear,
    /// Show detailed information about a task
    Show {
        id: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show tasks due today and overdue tasks
    Today,
    /// Show tasks for the next 7 days
    Upcoming,
    /// Search tasks by description or tags
    Search {
        query: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show task statistics
    Stats {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("todomaster=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands, store: &TaskStore) -> Result<(), TaskError> {
    match command {
        Commands::Add { description, priority, due, tag } => {
            cmd_add(store, &description, priority.as_deref(), due.as_deref(), tag.as_deref(), false)
                .map(drop)
        }
        Commands::List { all, pending: _, overdue, priority, tag, json } => {
            let scope = if overdue {
                ListScope::Overdue
            } else if all {
                ListScope::All
            } else {
                ListScope::Pending
            };
            cmd_list(store, scope, priority.as_deref(), tag.as_deref(), json, false).map(drop)
        }
        Commands::Done { id } => cmd_done(store, &id, false).map(drop),
        Commands::Edit { id, description, priority, due, tag, remove_tag } => cmd_edit(
            store,
            &id,
            description.as_deref(),
            priority.as_deref(),
            due.as_deref(),
            tag.as_deref(),
            remove_tag.as_deref(),
            false,
        )
        .map(drop),
        Commands::Delete { id, force } => cmd_delete(store, &id, force, false).map(drop),
        Commands::Clear => cmd_clear(store, false).map(drop),
        Commands::Show { id, json } => cmd_show(store, &id, json, false).map(drop),
        Commands::Today => cmd_today(store, false).map(drop),
        Commands::Upcoming => cmd_upcoming(store, false).map(drop),
        Commands::Search { query, json } => cmd_search(store, &query, json, false).map(drop),
        Commands::Stats { json } => cmd_stats(store, json, false).map(drop),
        Commands::Completions { .. } => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "todomaster", &mut io::stdout());
            return ExitCode::SUCCESS;
        }
        Some(command) => command,
        None => Commands::List {
            all: false,
            pending: true,
            overdue: false,
            priority: None,
            tag: None,
            json: false,
        },
    };

    let path = db_path(cli.db);
    let result = TaskStore::open(&path, Arc::new(SystemClock))
        .and_then(|store| run(command, &store));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            render_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
