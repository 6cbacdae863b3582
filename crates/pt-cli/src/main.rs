use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "ptk")]
#[command(about = "Production unit tracker CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

/// Snapshot inputs shared by the reconciliation commands.
#[derive(clap::Args, Debug)]
struct SnapshotArgs {
    /// JSON array of units
    #[arg(long)]
    units: String,

    /// JSON array of scan events
    #[arg(long)]
    scans: String,

    /// Layered config paths in merge order (optional)
    #[arg(long = "config")]
    config_paths: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> line...)
        #[arg(required = true)]
        paths: Vec<String>,

        /// What to do about keys nothing reads
        #[arg(long, value_enum, default_value_t = UnusedKeys::Warn)]
        unused: UnusedKeys,
    },

    /// Normalise one raw scan identifier
    Match {
        raw: String,

        /// Station the scan came from
        #[arg(long, default_value = "")]
        device: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Reconcile a snapshot; with --apply, write statuses back to the units file
    Reconcile {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Persist resolved statuses into the --units file
        #[arg(long, default_value_t = false)]
        apply: bool,

        /// Audit JSONL path (overrides config audit.path)
        #[arg(long)]
        audit: Option<String>,
    },

    /// Dashboard counts over a window
    Aggregate {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Reference instant for "today" (RFC 3339)
        #[arg(long)]
        now: DateTime<Utc>,

        /// Window start, inclusive (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Window end, exclusive (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },

    /// Role-filtered dashboard
    Dashboard {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        #[arg(long)]
        now: DateTime<Utc>,

        #[arg(long)]
        role: String,

        #[arg(long)]
        from: Option<DateTime<Utc>>,

        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },

    /// Operator queues: resolved units bucketed by status
    Queue {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Only the buckets this role may see
        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        from: Option<DateTime<Utc>>,

        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },

    /// Audit trail utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of an audit JSONL file
    Verify { path: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum UnusedKeys {
    Warn,
    Fail,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths, unused } => {
            let policy = match unused {
                UnusedKeys::Warn => pt_config::UnusedKeyPolicy::Warn,
                UnusedKeys::Fail => pt_config::UnusedKeyPolicy::Fail,
            };
            commands::config_hash(&paths, policy)?;
        }

        Commands::Match {
            raw,
            device,
            config_paths,
        } => commands::tracker::match_one(&raw, &device, &config_paths)?,

        Commands::Reconcile {
            snapshot,
            apply,
            audit,
        } => {
            commands::tracker::reconcile(
                &snapshot.units,
                &snapshot.scans,
                &snapshot.config_paths,
                apply,
                audit.as_deref(),
            )
            .await?
        }

        Commands::Aggregate {
            snapshot,
            now,
            from,
            to,
        } => commands::tracker::aggregate(
            &snapshot.units,
            &snapshot.scans,
            &snapshot.config_paths,
            now,
            commands::window(from, to),
        )?,

        Commands::Dashboard {
            snapshot,
            now,
            role,
            from,
            to,
        } => {
            commands::tracker::dashboard(
                &snapshot.units,
                &snapshot.scans,
                &snapshot.config_paths,
                now,
                &role,
                commands::window(from, to),
            )
            .await?
        }

        Commands::Queue {
            snapshot,
            role,
            from,
            to,
        } => commands::tracker::queue(
            &snapshot.units,
            &snapshot.scans,
            &snapshot.config_paths,
            role.as_deref(),
            commands::window(from, to),
        )?,

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => commands::audit_verify(&path)?,
        },
    }

    Ok(())
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
