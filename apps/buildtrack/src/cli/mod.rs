//! # Buildtrack CLI Module
//!
//! ## Available Commands
//!
//! - `stages` - List stages with access, completion and status
//! - `show` - Show one stage (refused while gated)
//! - `record` - Record an artifact for a stage
//! - `status` - Mark a stage success or error
//! - `next` - Print the stage after the given one
//! - `proof` - Completion grid and submission state
//! - `submit` - Compose the final submission
//! - `reset` - Clear all stage progress
//! - `init` - Initialize a new database
//! - `compact` - Reclaim free space in the database file
//! - `export` / `import` - Binary progress dump
//! - `resume` - Edit the resume profile
//! - `server` - Start the HTTP server
//!
//! A `<stage>` argument takes a stage id (`03`), a route
//! (`/rb/03-architecture` or `03-architecture`), or `#<index>`.

mod commands;

use buildtrack_core::{SectionKind, StageStatus, TrackError};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Buildtrack - sequential step tracker
///
/// Each step unlocks once the step before it has an artifact on record.
#[derive(Parser, Debug)]
#[command(name = "buildtrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the progress database
    #[arg(short = 'D', long, global = true, default_value = "buildtrack.redb")]
    pub database: PathBuf,

    /// Storage backend
    #[arg(short = 'B', long, global = true, value_enum, default_value_t = BackendKind::Redb)]
    pub backend: BackendKind,

    /// Workflow config file (TOML)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Storage backend selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Disk-backed redb database
    Redb,
    /// Volatile, lost when the process exits
    Memory,
}

/// Status that can be set from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Success,
    Error,
}

impl From<StatusArg> for StageStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Success => StageStatus::Success,
            StatusArg::Error => StageStatus::Error,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// List all stages
    Stages,

    /// Show a stage's prompt and state
    Show {
        /// Stage id, route, or #index
        stage: String,
    },

    /// Record an artifact for a stage
    Record {
        /// Stage id, route, or #index
        stage: String,

        /// Artifact text
        #[arg(short, long, conflicts_with = "file")]
        artifact: Option<String>,

        /// File to store as the artifact (base64-encoded)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Set a stage's status
    Status {
        /// Stage id, route, or #index
        stage: String,

        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Print the stage after the given one
    Next {
        /// Stage id, route, or #index
        stage: String,
    },

    /// Show the completion grid
    Proof,

    /// Compose the final submission
    Submit {
        /// Lovable project link
        #[arg(long)]
        lovable: String,

        /// GitHub repository link
        #[arg(long)]
        github: String,

        /// Deployment URL
        #[arg(long)]
        deploy: String,
    },

    /// Clear all stage progress
    Reset {
        /// Reset even if progress exists
        #[arg(short, long)]
        force: bool,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Compact the redb database file
    Compact,

    /// Export progress to a binary dump
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Replace progress with a binary dump
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Edit the resume profile
    Resume {
        #[command(subcommand)]
        action: ResumeCommand,
    },
}

/// Resume subcommands.
#[derive(Subcommand, Debug)]
pub enum ResumeCommand {
    /// Print the saved resume
    Show,

    /// Replace the resume with sample data
    Sample,

    /// Append a blank item to a section
    Add {
        /// education, experience, or projects
        section: SectionKind,
    },

    /// Remove an item from a section
    Remove {
        /// education, experience, or projects
        section: SectionKind,

        /// 0-based item position
        index: usize,
    },

    /// Set a field
    ///
    /// Without --section, sets a top-level field (name, email, phone,
    /// location, summary, skills, github, linkedin).
    Set {
        /// Field name
        field: String,

        /// New value
        value: String,

        /// Section of the item to edit
        #[arg(short, long, requires = "index")]
        section: Option<SectionKind>,

        /// 0-based item position
        #[arg(short, long, requires = "section")]
        index: Option<usize>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TrackError> {
    let ctx = Context::from_cli(&cli)?;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&ctx, &host, port).await,
        Some(Commands::Stages) | None => cmd_stages(&ctx),
        Some(Commands::Show { stage }) => cmd_show(&ctx, &stage),
        Some(Commands::Record {
            stage,
            artifact,
            file,
        }) => cmd_record(&ctx, &stage, artifact, file.as_deref()),
        Some(Commands::Status { stage, status }) => cmd_status(&ctx, &stage, status.into()),
        Some(Commands::Next { stage }) => cmd_next(&ctx, &stage),
        Some(Commands::Proof) => cmd_proof(&ctx),
        Some(Commands::Submit {
            lovable,
            github,
            deploy,
        }) => cmd_submit(&ctx, lovable, github, deploy),
        Some(Commands::Reset { force }) => cmd_reset(&ctx, force),
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Compact) => cmd_compact(&ctx),
        Some(Commands::Export { output }) => cmd_export(&ctx, &output),
        Some(Commands::Import { input }) => cmd_import(&ctx, &input),
        Some(Commands::Resume { action }) => cmd_resume(&ctx, action),
    }
}
