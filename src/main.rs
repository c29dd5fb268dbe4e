//! sqlrag CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sqlrag::{
    commands::{
        cmd_ask, cmd_index, cmd_init, cmd_status, print_ask_result, print_index_stats,
        print_status, resolve_init_paths, IndexOptions,
    },
    config::Config,
    embed::create_embedder,
    error::{Error, Result},
    exec::{connect_pool, MySqlExecutor},
    llm::OpenAiClient,
    naming::schema_collection,
    progress::LogWriterFactory,
    schema::MySqlSchemaCollector,
    store::QdrantStore,
};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sqlrag")]
#[command(version, about = "Ask questions of a MySQL database in plain language", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Index the database schema into the vector store
    Index {
        /// Sample rows to include per table
        #[arg(long)]
        sample_rows: Option<u32>,

        /// Drop and recreate the collection first
        #[arg(long)]
        reset: bool,
    },

    /// Turn a question into SQL and run it
    Ask {
        /// The question, in plain language
        question: String,

        /// Print the SQL without running it
        #[arg(long)]
        no_execute: bool,
    },

    /// Show system status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{} failed: {}", e.stage(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            let (base_dir, config_path) = resolve_init_paths(cli.config.as_deref());
            let config = cmd_init(base_dir, config_path, force).await?;

            println!("✓ sqlrag initialized successfully");
            println!("  Config: {}", config.paths.config_file.display());
            println!("\nNext steps:");
            println!("  1. Edit the config file to point at your MySQL database");
            println!("  2. Start Qdrant: docker run -p 6334:6334 qdrant/qdrant");
            println!("  3. Index the schema: sqlrag index");
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "sqlrag", &mut std::io::stdout());
        }

        Commands::Index { sample_rows, reset } => {
            let config = load_config(cli.config.as_deref())?;
            let embedder = create_embedder(&config.embedding)?;
            let store = open_store(&config, embedder.dimension())?;
            let pool = connect_pool(&config.database)?;
            let collector = MySqlSchemaCollector::new(pool, config.database.name.clone());

            let options = IndexOptions { sample_rows, reset };
            let stats = cmd_index(&config, &collector, embedder.as_ref(), &store, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_index_stats(&stats);
            }
        }

        Commands::Ask {
            question,
            no_execute,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let embedder = create_embedder(&config.embedding)?;
            let store = open_store(&config, embedder.dimension())?;
            let llm = OpenAiClient::new(&config.llm)?;
            let executor = MySqlExecutor::from_config(&config.database)?;

            let result = cmd_ask(
                &config,
                embedder.as_ref(),
                &store,
                &llm,
                &executor,
                &question,
                !no_execute,
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_ask_result(&result);
            }
        }

        Commands::Status => {
            let config = load_config(cli.config.as_deref())?;
            let store = open_store(&config, config.embedding.resolved_dimension())?;
            let status = cmd_status(&config, &store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        return Err(Error::NotInitialized);
    }

    Config::load(&config_path)
}

fn open_store(config: &Config, dimension: usize) -> Result<QdrantStore> {
    let collection = schema_collection(&config.database.name)?;
    QdrantStore::new(
        &config.qdrant_url,
        config.qdrant_api_key(),
        &collection,
        dimension,
    )
}
