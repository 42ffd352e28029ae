use anyhow::{bail, Result};
use atelier_core::{
    telemetry, AnonWork, AtelierConfig, AuthController, ChatMessage, FileAnonWorkStore,
    FileProjectStore, FileSystemData, InMemoryCredentialExchange, LoggingNavigator, ProjectStore,
    Reconciler,
};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "xtask", version, about = "Automation helpers for Atelier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign up against throwaway stores and check that anonymous work migrates.
    Smoke,
    /// Sign in with the configured auth service and reconcile the local workspace.
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Register a new account instead of signing in.
        #[arg(long)]
        sign_up: bool,
    },
}

fn main() -> Result<()> {
    telemetry::init_tracing(EnvFilter::new("info"))?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Smoke => smoke_test(),
        Commands::SignIn {
            email,
            password,
            sign_up,
        } => sign_in(&email, &password, sign_up),
    }
}

fn smoke_test() -> Result<()> {
    let runtime = Runtime::new()?;
    let temp_dir = TempDir::new()?;
    let anon = FileAnonWorkStore::new(temp_dir.path());
    let projects = FileProjectStore::new(temp_dir.path());

    let mut files = FileSystemData::new();
    files.insert("/App.jsx".into(), "export default () => <h1>smoke</h1>".into());
    anon.save(&AnonWork::new(
        vec![ChatMessage::user("ping from xtask")],
        files,
    ))?;

    let reconciler = Reconciler::new(
        Arc::new(anon.clone()),
        Arc::new(projects.clone()),
        Arc::new(LoggingNavigator),
    );
    let controller = AuthController::new(Arc::new(InMemoryCredentialExchange::new()), reconciler);

    let result = runtime.block_on(controller.sign_up("smoke@example.com", "smoke-password"))?;
    if !result.success {
        bail!("smoke sign-up rejected: {}", result.error.unwrap_or_default());
    }
    let listed = runtime.block_on(projects.list())?;
    if listed.len() != 1 || anon.path().exists() {
        bail!("anonymous work was not migrated");
    }
    info!(
        "project" = %listed[0].name,
        "smoke test migrated anonymous work"
    );

    Ok(())
}

fn sign_in(email: &str, password: &str, sign_up: bool) -> Result<()> {
    let config = AtelierConfig::load().map_err(|err| anyhow::anyhow!(err.user_message()))?;
    let runtime = Runtime::new()?;
    let controller = AuthController::from_config(&config, Arc::new(LoggingNavigator));

    let result = if sign_up {
        runtime.block_on(controller.sign_up(email, password))?
    } else {
        runtime.block_on(controller.sign_in(email, password))?
    };
    if !result.success {
        let error = result
            .error
            .unwrap_or_else(|| "credentials rejected".to_string());
        bail!(error);
    }
    info!("signed in");

    Ok(())
}
