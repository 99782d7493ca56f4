mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use editor_agent::EditorAgent;
use hookswitch_core::{PendingSlot, Session, TargetConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hookswitch",
    about = "Manage the target editor's machine identity, saved accounts, and runtime hook",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ~/.hookswitch/config.yaml)
    #[arg(long, global = true, env = "HOOKSWITCH_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show identity, hook status, and anything pending
    Status,

    /// Apply the runtime hook to the target's entry script
    Apply {
        /// Close a running target instead of stopping at confirmation
        #[arg(long)]
        force_kill: bool,
    },

    /// Remove the runtime hook
    Restore {
        /// Close a running target instead of stopping at confirmation
        #[arg(long)]
        force_kill: bool,
    },

    /// Supply the entry script path and replay the deferred operation
    SetEntry { path: PathBuf },

    /// Regenerate the machine identity
    Reset,

    /// Switch the signed-in account
    Switch {
        #[arg(long)]
        email: String,
        #[arg(long)]
        token: String,
        /// Close a running target first
        #[arg(long)]
        force_kill: bool,
    },

    /// Reset the machine identity and switch the account in one step
    Quick {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        token: Option<String>,
        /// Close a running target first
        #[arg(long)]
        force_kill: bool,
    },

    /// Show per-model usage for the stored token
    Usage,

    /// Show recent operations
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Start the target application
    Launch,

    /// Inspect or scaffold the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Apply { .. } | Commands::Restore { .. } | Commands::Quick { .. } => {
            tracing::Level::INFO
        }
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let result = rt.block_on(dispatch(cli));

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => TargetConfig::default_path()?,
    };
    let config = TargetConfig::load(&config_path)?;

    let mut session = Session::new(EditorAgent::new(config.clone()), &config);

    // The CLI is one-shot per invocation; the pending-action slot lives on
    // disk so a deferred apply/restore survives until `set-entry`.
    let pending_path = editor_agent::paths::hookswitch_home()?.join("pending.yaml");
    session.hydrate_pending(PendingSlot::load(&pending_path)?);

    let result = match cli.command {
        Commands::Status => cmd::status::run(&mut session, cli.json).await,
        Commands::Apply { force_kill } => {
            cmd::hook::apply(&mut session, force_kill, cli.json).await
        }
        Commands::Restore { force_kill } => {
            cmd::hook::restore(&mut session, force_kill, cli.json).await
        }
        Commands::SetEntry { path } => cmd::hook::set_entry(&mut session, &path, cli.json).await,
        Commands::Reset => cmd::identity::reset(&mut session, cli.json).await,
        Commands::Switch {
            email,
            token,
            force_kill,
        } => cmd::identity::switch(&mut session, &email, &token, force_kill, cli.json).await,
        Commands::Quick {
            email,
            token,
            force_kill,
        } => {
            cmd::identity::quick(
                &mut session,
                email.as_deref(),
                token.as_deref(),
                force_kill,
                cli.json,
            )
            .await
        }
        Commands::Usage => cmd::usage::run(&mut session, cli.json).await,
        Commands::History { limit } => cmd::history::run(limit, cli.json),
        Commands::Launch => cmd::launch::run(&session).await,
        Commands::Config { subcommand } => {
            cmd::config::run(&config, &config_path, subcommand, cli.json)
        }
    };

    if let Err(e) = session.store().pending.save(&pending_path) {
        tracing::warn!(error = %e, "failed to persist pending action");
    }

    result
}
