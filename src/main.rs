use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdb_gpt::config::{find_config_file, get_config, load_config, Config};
use pdb_gpt::models::{ContextSelection, PublicationSet};
use pdb_gpt::qa::{IndexedEngine, QaCache, QaEngine};
use pdb_gpt::resolver::PublicationResolver;
use pdb_gpt::ui::{self, Spinner, Status};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Example question asked when none is given
const DEFAULT_QUESTION: &str = "What molecules are of interest?";

/// PDB GPT - Ask questions about the publications behind a PDB entry
#[derive(Parser, Debug)]
#[command(name = "pdb-gpt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Look up the publications of a PDB entry and ask questions about them", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides the configuration file)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the publications of a PDB entry
    #[command(alias = "pubs")]
    Publications {
        /// PDB identifier (e.g. 1cbs)
        id: String,

        /// Print the publication set as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer questions from the selected publications
    Ask {
        /// PDB identifier (e.g. 1cbs)
        id: String,

        /// Publication titles to use as context (default: the primary citation)
        #[arg(long = "context", short = 'c')]
        contexts: Vec<String>,

        /// Questions to ask, in order (default: "What molecules are of interest?")
        #[arg(long = "question", short = 'q')]
        questions: Vec<String>,
    },

    /// Answer questions read line by line from stdin
    Chat {
        /// PDB identifier (e.g. 1cbs)
        id: String,

        /// Publication titles to use as context (default: the primary citation)
        #[arg(long = "context", short = 'c')]
        contexts: Vec<String>,
    },
}

/// Print all available environment variables
fn print_env_vars() {
    println!("PDB GPT - Environment Variables");
    println!();
    println!("API Keys:");
    println!("  OPENAI_API_KEY              OpenAI key; when set, OpenAI is used for embeddings and answers");
    println!("  COHERE_API_KEY              Cohere key (default embedding provider)");
    println!("  AI21_API_KEY                AI21 key (default generation provider)");
    println!();
    println!("Configuration Overrides:");
    println!("  PDB_GPT_ENDPOINTS__PDBE_BASE         PDBe publications endpoint");
    println!("  PDB_GPT_ENDPOINTS__RCSB_BASE         RCSB data API base URL");
    println!("  PDB_GPT_HTTP__TIMEOUT_SECONDS        Request timeout (default: 30)");
    println!("  PDB_GPT_LLM__EMBEDDING_PROVIDER      cohere | openai");
    println!("  PDB_GPT_LLM__GENERATION_PROVIDER     cohere | openai | ai21");
    println!("  PDB_GPT_LLM__TOP_K                   Chunks retrieved per question (default: 4)");
    println!();
    println!("Global Proxy Settings:");
    println!("  HTTP_PROXY                  HTTP proxy URL (e.g., http://proxy:8080)");
    println!("  HTTPS_PROXY                 HTTPS proxy URL (e.g., https://proxy:8080)");
    println!("  NO_PROXY                    Comma-separated list of hosts to bypass proxy");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export COHERE_API_KEY=\"your-key-here\"");
    println!("  export AI21_API_KEY=\"your-key-here\"");
    println!("  pdb-gpt ask 1cbs");
}

fn load_settings(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        load_config(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?
    } else {
        get_config()?
    };

    if let Some(timeout) = cli.timeout {
        config.http.timeout_seconds = timeout;
    }
    Ok(config)
}

async fn resolve(resolver: &PublicationResolver, id: &str, quiet: bool) -> Result<PublicationSet> {
    let spinner = (!quiet).then(|| Spinner::new(&format!("Looking up publications for {}", id)));
    match resolver.resolve_publications(id).await {
        Ok((primary_title, set)) => {
            if let Some(spinner) = spinner {
                spinner.finish_with_success(&format!(
                    "{} publication(s); primary: {}",
                    set.len(),
                    primary_title
                ));
            }
            Ok(set)
        }
        Err(e) => {
            if let Some(spinner) = spinner {
                spinner.finish_with_error(&e.to_string());
            }
            Err(e.into())
        }
    }
}

async fn prepare_engine(
    config: &Config,
    cache: &QaCache,
    set: &PublicationSet,
    contexts: Vec<String>,
    quiet: bool,
) -> Result<Arc<IndexedEngine>> {
    let selection = if contexts.is_empty() {
        ContextSelection::primary_only(set)
    } else {
        contexts.into_iter().collect()
    };
    let snippets = selection.snippets(set)?;
    let engine = QaEngine::from_config(config)?;

    let spinner = (!quiet).then(|| {
        Spinner::new(&format!(
            "Indexing {} publication(s)",
            selection.titles().len()
        ))
    });
    let indexed = cache.indexed_engine(&engine, &snippets).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    Ok(indexed?)
}

async fn answer(cache: &QaCache, indexed: &IndexedEngine, question: &str, quiet: bool) -> Result<()> {
    let spinner = (!quiet).then(|| Spinner::new("Thinking..."));
    let result = cache.answer(indexed, question).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    ui::print_answer(question.trim(), &result?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
        return Ok(());
    }

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pdb_gpt={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_settings(&cli)?;
    let resolver = PublicationResolver::from_config(&config)?;
    let cache = QaCache::new();

    match cli.command {
        Some(Commands::Publications { id, json }) => {
            let set = resolve(&resolver, &id, cli.quiet || json).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&set)?);
            } else {
                ui::print_publications(&id, &set);
            }
        }
        Some(Commands::Ask {
            id,
            contexts,
            questions,
        }) => {
            let set = resolve(&resolver, &id, cli.quiet).await?;
            let indexed = prepare_engine(&config, &cache, &set, contexts, cli.quiet).await?;

            let questions = if questions.is_empty() {
                vec![DEFAULT_QUESTION.to_string()]
            } else {
                questions
            };
            for question in &questions {
                answer(&cache, &indexed, question, cli.quiet).await?;
            }
        }
        Some(Commands::Chat { id, contexts }) => {
            let set = resolve(&resolver, &id, cli.quiet).await?;
            let indexed = prepare_engine(&config, &cache, &set, contexts, cli.quiet).await?;

            if !cli.quiet {
                ui::print_status(
                    Status::Info,
                    &format!("Ask about {} (empty line or Ctrl-D to quit)", id),
                );
            }

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let question = line.trim();
                if question.is_empty() {
                    break;
                }
                if let Err(e) = answer(&cache, &indexed, question, cli.quiet).await {
                    ui::print_status(Status::Error, &e.to_string());
                }
            }
            tracing::debug!("Answered {} distinct question(s)", cache.answer_count());
        }
        None => {
            // No command specified, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
