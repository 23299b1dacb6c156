mod apply_cmd;
mod config;
mod plan_cmds;
mod prompt;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use config::{CliOverrides, TrellisConfig};

#[derive(Parser)]
#[command(name = "trellis", about = "Plan-driven project scaffolding")]
struct Cli {
    /// Backend binary (overrides TRELLIS_BACKEND_BINARY env var)
    #[arg(long, global = true)]
    backend_binary: Option<String>,

    /// Model passed to the backend (overrides TRELLIS_MODEL env var)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a trellis config file
    Init {
        /// Starting conflict mode: ask, overwrite, or skip
        #[arg(long, default_value = config::DEFAULT_CONFLICT_MODE)]
        conflict_mode: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Generate and validate a plan, then persist it
    Plan {
        /// What to build, in plain language
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Write the plan here instead of <root>/.trellis/plan.json
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print a persisted plan
    Show {
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Plan file (defaults to <root>/.trellis/plan.json)
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Materialize a persisted plan
    Apply {
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Plan file (defaults to <root>/.trellis/plan.json)
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Only generate this file (repeatable)
        #[arg(long = "only", value_name = "PATH")]
        only: Vec<String>,
        /// Conflict mode for this run (overrides TRELLIS_CONFLICT_MODE)
        #[arg(long)]
        conflict: Option<String>,
    },
    /// Generate a plan and materialize it in one go
    New {
        /// What to build, in plain language
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Only generate this file (repeatable)
        #[arg(long = "only", value_name = "PATH")]
        only: Vec<String>,
        /// Conflict mode for this run (overrides TRELLIS_CONFLICT_MODE)
        #[arg(long)]
        conflict: Option<String>,
    },
}

/// Execute the `trellis init` command: write config file.
fn cmd_init(
    backend_binary: Option<&str>,
    model: Option<&str>,
    conflict_mode: &str,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let binary = backend_binary.unwrap_or(config::DEFAULT_BACKEND_BINARY);
    let cfg = config::ConfigFile {
        backend: config::BackendSection {
            binary: Some(binary.to_string()),
            model: model.map(str::to_string),
        },
        scaffold: config::ScaffoldSection {
            conflict_mode: Some(conflict_mode.to_string()),
        },
    };

    let path = config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  backend.binary         = {binary}");
    if let Some(model) = model {
        println!("  backend.model          = {model}");
    }
    println!("  scaffold.conflict_mode = {conflict_mode}");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let overrides = |conflict: Option<&str>| -> anyhow::Result<TrellisConfig> {
        TrellisConfig::resolve(&CliOverrides {
            backend_binary: cli.backend_binary.as_deref(),
            model: cli.model.as_deref(),
            conflict_mode: conflict,
        })
    };

    match &cli.command {
        Commands::Init {
            conflict_mode,
            force,
        } => {
            cmd_init(
                cli.backend_binary.as_deref(),
                cli.model.as_deref(),
                conflict_mode,
                *force,
            )?;
        }
        Commands::Plan {
            description,
            root,
            output,
        } => {
            let resolved = overrides(None)?;
            plan_cmds::run_plan(&resolved, &description.join(" "), root, output.as_deref())
                .await?;
        }
        Commands::Show { root, plan } => {
            plan_cmds::run_show(root, plan.as_deref())?;
        }
        Commands::Apply {
            root,
            plan,
            only,
            conflict,
        } => {
            let resolved = overrides(conflict.as_deref())?;
            apply_cmd::run_apply(&resolved, root, plan.as_deref(), only).await?;
        }
        Commands::New {
            description,
            root,
            only,
            conflict,
        } => {
            let resolved = overrides(conflict.as_deref())?;
            apply_cmd::run_new(&resolved, &description.join(" "), root, only).await?;
        }
    }

    Ok(())
}
