//! `prbuddy` binary: the CLI entrypoint (spec §10.4).
//!
//! ```text
//! prbuddy serve [--config PATH] [--bind ADDR]
//! prbuddy models
//! prbuddy model set <NAME>
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use prbuddy_core::{load_config, Validate, ValidationLevel};
use prbuddy_daemon::{port_file, CompanionRegistry, ContextLog, ConversationStore, DraftStore, Orchestrator};
use prbuddy_llm::LlmClient;
use prbuddy_vcs::{DiffSource, VcsCli};
use prbuddy_web::{run_web_server, AppState, ServerOptions};

#[derive(Parser)]
#[command(name = "prbuddy")]
#[command(about = "Developer-workstation agent: DCE, QuickAssist, and PR-draft helpers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP surface that editor extensions talk to.
    Serve {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        bind: Option<String>,
    },
    /// List models known to the LLM backend.
    Models {
        #[arg(long)]
        endpoint: Option<String>,
    },
    #[command(subcommand)]
    Model(ModelCommand),
}

#[derive(Subcommand)]
enum ModelCommand {
    /// Set the active model for subsequent LLM calls on this backend.
    Set {
        name: String,
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("prbuddy=info".parse().unwrap()))
        .init();

    if let Err(err) = run().await {
        eprintln!("prbuddy: {err}");
        std::process::exit(1);
    }
}

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error("failed to load config: {0}")]
    Config(#[from] prbuddy_core::ConfigError),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Server(#[from] prbuddy_web::ServerError),
    #[error(transparent)]
    Llm(#[from] prbuddy_llm::LlmError),
}

async fn run() -> Result<(), MainError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config, bind } => serve(config, bind).await,
        Command::Models { endpoint } => models(endpoint).await,
        Command::Model(ModelCommand::Set { name, endpoint }) => set_model(name, endpoint).await,
    }
}

async fn serve(config_path: Option<PathBuf>, bind_override: Option<String>) -> Result<(), MainError> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from("prbuddy.toml"));
    let mut config = load_config(&config_path)?;
    config.apply_env_overrides();

    let issues = config.validate();
    let errors: Vec<_> = issues
        .iter()
        .filter(|issue| issue.level == ValidationLevel::Error)
        .collect();
    if !errors.is_empty() {
        let rendered = errors
            .iter()
            .map(|issue| format!("{}: {}", issue.code, issue.message))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(MainError::InvalidConfig(rendered));
    }
    for issue in issues.iter().filter(|issue| issue.level == ValidationLevel::Warning) {
        tracing::warn!(code = issue.code, message = %issue.message, "config validation warning");
    }

    let repo_root = discover_repo_root();
    let diff_source = Arc::new(DiffSource::new(&repo_root));
    let llm = Arc::new(LlmClient::with_config(
        config.llm.endpoint.clone(),
        config.llm.model.clone(),
        Duration::from_secs(config.llm.request_timeout_secs),
        config.llm.num_ctx,
    ));
    let vcs_metadata_dir = repo_root.join(".git");
    let orchestrator = Orchestrator::new(
        ConversationStore::new(),
        CompanionRegistry::new(
            Arc::clone(&diff_source),
            Duration::from_secs(config.companion.poll_interval_secs),
        ),
        diff_source,
        llm,
        DraftStore::new(&vcs_metadata_dir),
        ContextLog::new(vcs_metadata_dir.join("pr_buddy_db").join("context.jsonl")),
    );

    let bind_addr = bind_override.unwrap_or_else(|| config.server.bind.clone());
    let port_file_path = port_file::default_port_file_path().ok();

    let state = AppState::new(orchestrator, config.clone());
    let options = ServerOptions {
        bind_addr,
        port_file_path,
        shutdown_grace: Duration::from_secs(config.server.shutdown_grace_secs),
        cleanup_interval: Duration::from_secs(config.conversation.max_age_secs.max(60)),
        cleanup_max_age: chrono::Duration::seconds(config.conversation.max_age_secs as i64),
    };

    run_web_server(state, options).await?;
    Ok(())
}

fn discover_repo_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match VcsCli::default().run(&cwd, ["rev-parse", "--show-toplevel"]) {
        Ok(output) => PathBuf::from(output.stdout.trim()),
        Err(_) => cwd,
    }
}

/// `models`/`model set` are thin conveniences over the same HTTP
/// surface an editor extension would use: if a `prbuddy serve` is
/// running locally (port file present), talk to it so the change
/// actually lands on its process-wide active-model state; otherwise
/// fall back to querying the LLM backend directly.
async fn running_server_base_url() -> Option<String> {
    let path = port_file::default_port_file_path().ok()?;
    let port = port_file::read_port_file(&path).ok()?;
    Some(format!("http://127.0.0.1:{port}"))
}

async fn models(endpoint: Option<String>) -> Result<(), MainError> {
    if endpoint.is_none() {
        if let Some(base_url) = running_server_base_url().await {
            let http = reqwest::Client::new();
            if let Ok(response) = http.get(format!("{base_url}/extension/models")).send().await {
                if let Ok(models) = response.json::<Vec<serde_json::Value>>().await {
                    for model in models {
                        if let Some(name) = model.get("name").and_then(|v| v.as_str()) {
                            println!("{name}");
                        }
                    }
                    return Ok(());
                }
            }
        }
    }

    let endpoint = endpoint.unwrap_or_else(LlmClient::default_endpoint);
    let client = LlmClient::new(endpoint, LlmClient::default_fallback_model());
    let models = client.list_models().await?;
    for model in models {
        println!("{}", model.name);
    }
    Ok(())
}

async fn set_model(name: String, endpoint: Option<String>) -> Result<(), MainError> {
    if endpoint.is_none() {
        if let Some(base_url) = running_server_base_url().await {
            let http = reqwest::Client::new();
            let response = http
                .post(format!("{base_url}/extension/model"))
                .json(&serde_json::json!({ "model": name }))
                .send()
                .await;
            if let Ok(response) = response {
                if response.status().is_success() {
                    println!("active model on the running server set to {name}");
                    return Ok(());
                }
            }
        }
    }

    let endpoint = endpoint.unwrap_or_else(LlmClient::default_endpoint);
    let client = LlmClient::new(endpoint, LlmClient::default_fallback_model());
    client.set_active_model(name.clone()).await;
    println!("no running `prbuddy serve` found; active model set for this one-off process only");
    Ok(())
}
