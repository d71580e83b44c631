//! # docchat CLI
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat chat` | Interactive session: upload, ask, search |
//! | `docchat ask "<question>" --doc <path>` | One question over the given documents |
//! | `docchat search "<query>" --doc <path>` | Local search, no provider needed |
//! | `docchat summarize <file>` | Summarise one document |
//! | `docchat extract <file>` | Print the extracted text of a file |
//! | `docchat config save <provider> <key>` | Validate and persist provider settings |
//! | `docchat config show` | Show the active settings, key masked |
//! | `docchat config test` | Round-trip a tiny prompt to the provider |
//! | `docchat config clear` | Forget saved provider settings |
//!
//! ## Examples
//!
//! ```bash
//! docchat config save gemini AIza... --model gemini-1.5-pro
//! docchat ask "What was revenue growth?" --doc ./reports
//! docchat search "revenue" --doc q3.pdf --doc notes.md --limit 5
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use docchat::app::App;
use docchat::config::{self, Config};
use docchat::credentials::{run_config_show, test_connection, CredentialManager};
use docchat::extract::extract;
use docchat::ingest::{load_documents, read_upload, LoadReport};
use docchat::logging::init_logging;
use docchat::models::{ConnectionStatus, Provider};
use docchat::orchestrator::{Orchestrator, APOLOGY};
use docchat::search::run_search;
use docchat::storage::{FileStorage, LocalStorage};
use docchat::store::{document_id, DocumentStore};
use docchat::terminal::{LineEvents, TerminalSurface, HELP};
use docchat::transport::HttpTransport;

/// docchat: ask questions about your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means defaults.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "Chat with PDF, DOCX, TXT and Markdown documents using Gemini, OpenAI or Anthropic",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session on stdin/stdout.
    Chat,

    /// Ask one question about a set of documents.
    ///
    /// Without a configured provider the answer is a canned placeholder.
    Ask {
        question: String,

        /// File or directory to load. Repeatable.
        #[arg(long = "doc", required = true)]
        docs: Vec<PathBuf>,

        /// Glob of paths to skip when walking directories. Repeatable.
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Search documents locally.
    Search {
        query: String,

        /// File or directory to load. Repeatable.
        #[arg(long = "doc", required = true)]
        docs: Vec<PathBuf>,

        /// Glob of paths to skip when walking directories. Repeatable.
        #[arg(long)]
        exclude: Vec<String>,

        /// Maximum number of results to print.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Summarise a single document.
    Summarize { file: PathBuf },

    /// Print the text extracted from a file.
    Extract { file: PathBuf },

    /// Manage provider settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate and save provider, key and model.
    Save {
        /// `gemini`, `openai`, or `anthropic`.
        provider: Provider,
        api_key: String,
        /// Defaults to the provider's first model.
        #[arg(long)]
        model: Option<String>,
    },
    /// Show the active settings with the key masked.
    Show,
    /// Send a minimal prompt to check the saved settings.
    Test,
    /// Remove saved provider settings.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;
    init_logging(&cfg.logging)?;

    let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(&cfg.storage.path));

    match cli.command {
        Commands::Chat => run_chat(&cfg, storage).await?,
        Commands::Ask {
            question,
            docs,
            exclude,
        } => {
            let report = load_documents(&docs, &exclude)?;
            let store = report_skipped(report);
            let credentials = CredentialManager::open(storage);
            let transport = HttpTransport::new(&cfg.http)?;
            let orchestrator = Orchestrator::new(&transport, &cfg.providers);
            match orchestrator
                .try_answer(&question, &store, credentials.current())
                .await
            {
                Ok(answer) => println!("{}", answer),
                Err(e) => {
                    eprintln!("Error communicating with AI service: {}", e);
                    println!("{}", APOLOGY);
                }
            }
        }
        Commands::Search {
            query,
            docs,
            exclude,
            limit,
        } => {
            let report = load_documents(&docs, &exclude)?;
            let store = report_skipped(report);
            if store.is_empty() {
                println!("Please upload documents first to enable search.");
            } else {
                run_search(&query, &store, limit);
            }
        }
        Commands::Summarize { file } => {
            let upload = read_upload(&file)?;
            let id = document_id(&upload.name);
            let text = extract(&upload)?;
            let credentials = CredentialManager::open(storage);
            let transport = HttpTransport::new(&cfg.http)?;
            let orchestrator = Orchestrator::new(&transport, &cfg.providers);
            let summary = orchestrator
                .summarize(&text, &id, credentials.current())
                .await;
            println!("{}", summary);
        }
        Commands::Extract { file } => {
            let upload = read_upload(&file)?;
            println!("{}", extract(&upload)?);
        }
        Commands::Config { action } => run_config(action, &cfg, storage).await?,
    }

    Ok(())
}

async fn run_chat(cfg: &Config, storage: Arc<dyn LocalStorage>) -> Result<()> {
    let transport = HttpTransport::new(&cfg.http)?;
    let mut app = App::new(
        TerminalSurface,
        Box::new(transport),
        cfg.providers.clone(),
        storage,
    );
    let current = app.state().credentials.current();
    if current.configured {
        eprintln!("docchat ready ({} / {})", current.provider, current.model);
    } else {
        eprintln!("docchat ready (no provider configured; answers are placeholders)");
    }
    eprintln!("{}\n", HELP);

    let mut events = LineEvents::new(tokio::io::stdin());
    app.run(&mut events).await;
    Ok(())
}

async fn run_config(
    action: ConfigAction,
    cfg: &Config,
    storage: Arc<dyn LocalStorage>,
) -> Result<()> {
    let mut credentials = CredentialManager::open(storage);
    match action {
        ConfigAction::Save {
            provider,
            api_key,
            model,
        } => {
            let model = model.unwrap_or_else(|| provider.default_model().to_string());
            credentials.save(provider, &api_key, &model)?;
            println!("API configuration saved successfully! ({} / {})", provider, model);
        }
        ConfigAction::Show => run_config_show(&credentials),
        ConfigAction::Test => {
            let transport = HttpTransport::new(&cfg.http)?;
            match test_connection(credentials.current(), &cfg.providers, &transport).await {
                ConnectionStatus::Connected => println!("connected"),
                ConnectionStatus::Error(message) => bail!("connection test failed: {}", message),
            }
        }
        ConfigAction::Clear => {
            credentials.clear()?;
            println!("Provider settings cleared.");
        }
    }
    Ok(())
}

fn report_skipped(report: LoadReport) -> DocumentStore {
    for (path, reason) in &report.skipped {
        eprintln!("skipped {}: {}", path.display(), reason);
    }
    report.store
}
