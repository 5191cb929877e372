use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, EnvFilter};
use warden::authz::loader;
use warden::authz::{MemoryRuleStore, RuleStore, SecurityManager};
use warden::settings::{Backend, Settings};
use warden::storage;

#[derive(Parser, Debug)]
#[command(
    name = "warden",
    version,
    about = "Hierarchical resource authorization"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide whether a user may access a resource identifier
    Check {
        /// Resource identifier, e.g. "/reports?dept=eng&year=2024"
        identifier: String,
        #[arg(short, long)]
        user: String,
        #[arg(short, long, env = "WARDEN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// List stored authorization rules
    Rules,
    /// Seed the store from the policies directory and exit
    Load,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    let manager = SecurityManager::new(open_store(&settings).await?);

    let always_load = matches!(cli.command, Command::Load);
    if always_load || settings.authz.load_policies_on_start {
        loader::load_policies(&manager, &settings.authz.policies_dir).await?;
    }

    match cli.command {
        Command::Check {
            identifier,
            user,
            password,
        } => {
            let granted = manager
                .check_permission(&identifier, &user, &password)
                .await?;
            if granted {
                println!("granted");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("denied");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Rules => {
            for rule in manager.authorization_rules().await? {
                println!("{}", serde_json::to_string(&rule).into_diagnostic()?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Load => Ok(ExitCode::SUCCESS),
    }
}

async fn open_store(settings: &Settings) -> Result<Arc<dyn RuleStore>> {
    match settings.authz.backend {
        Backend::Memory => Ok(Arc::new(MemoryRuleStore::new())),
        Backend::Sql => {
            let db = storage::init(&settings.database).await?;
            storage::migrate(&db).await?;
            Ok(Arc::new(storage::SqlRuleStore::new(db)))
        }
    }
}
