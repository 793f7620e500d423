use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cfgsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative sync of Keboola project configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// State file (defaults to the state directory)
    #[arg(long, global = true, env = "CFGSYNC_STATE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Make the project match the manifest
    Apply(ApplyArgs),

    /// Read every entity in the state back from the project
    Refresh(RefreshArgs),

    /// Delete every entity in the state from the project
    Destroy(DestroyArgs),

    /// Inspect the state file
    #[command(subcommand)]
    State(StateCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared Arguments
// ============================================================================

#[derive(Args, Clone)]
pub struct ManifestArgs {
    /// Desired-state manifest
    #[arg(short, long, default_value = "cfgsync.toml")]
    pub manifest: PathBuf,
}

#[derive(Args, Clone)]
pub struct TargetArgs {
    /// Only act on a kind or one entity (e.g. "configuration.extractor")
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,

    /// Number of entities processed in parallel (defaults to settings)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

// ============================================================================
// Plan / Apply
// ============================================================================

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

// ============================================================================
// Refresh / Destroy
// ============================================================================

#[derive(Args)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Number of entities processed in parallel (defaults to settings)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

// ============================================================================
// State Commands
// ============================================================================

#[derive(Subcommand)]
pub enum StateCommand {
    /// List addresses in the state file
    List {
        /// Only list addresses matching a kind or address
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Show one persisted snapshot as JSON
    Show {
        /// Entity address (kind.label)
        address: String,
    },
}
