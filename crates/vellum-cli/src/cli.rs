use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vellum_migrate::Tier;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl LogLevel {
    /// Directive fragment for an EnvFilter.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Migration tier selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    /// 200-10K notes, ~30-50% reduction
    Medium,
    /// 10K-100K notes, ~70-80% reduction
    Large,
    /// 100K-1M notes, ~90-95% reduction
    Massive,
}

impl From<TierArg> for Tier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::Medium => Tier::Medium,
            TierArg::Large => Tier::Large,
            TierArg::Massive => Tier::Massive,
        }
    }
}

#[derive(Parser)]
#[command(name = "vellum")]
#[command(about = "vellum - note-graph indexing and relevance scoring for a personal vault")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Vault root directory (must contain _meta/conventions.md)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// Config file path (defaults to ~/.config/vellum/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild the persisted note index from vault files
    Index,

    /// Surface the most relevant notes for session start
    Surface {
        /// Project name used for contextual keyword matching
        /// (defaults to the current directory name)
        #[arg(long)]
        project: Option<String>,
    },

    /// Run structural health checks and write maintenance reports
    Maintain,

    /// Score an external note collection for migration
    Prefilter {
        /// Path to the source vault directory
        source: PathBuf,

        /// Migration tier (affects cutoff threshold)
        #[arg(long, value_enum, default_value = "medium")]
        tier: TierArg,

        /// Output path (default: migration/_pre-filter-scores.jsonl)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Partition pre-filtered notes into per-domain catalogs
    Partition {
        /// Migration tier (must match the prefilter run)
        #[arg(long, value_enum, default_value = "medium")]
        tier: TierArg,

        /// Maximum notes per domain catalog
        #[arg(long, default_value_t = 5000)]
        max_domain_size: usize,

        /// Source vault path stored in catalogs for the migrate step
        #[arg(long, default_value = "")]
        source_path: String,

        /// Input JSONL path (default: migration/_pre-filter-scores.jsonl)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Execute the next batch of a prepared migration catalog
    Migrate {
        /// Show what would be done without writing files
        #[arg(long)]
        dry_run: bool,

        /// Override batch_size from the catalog (0 = use catalog value)
        #[arg(long, default_value_t = 0)]
        batch_size: usize,

        /// Path to the migration catalog
        /// (default: <vault>/_meta/migration-catalog.json)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Merge per-domain link maps and resolve cross-domain wikilinks
    MergeLinks {
        /// Show what would be rewritten without modifying files
        #[arg(long)]
        dry_run: bool,
    },
}
