//! # pdf-chat CLI
//!
//! ```bash
//! pdf-chat init                 # create the SQLite database
//! pdf-chat serve                # start the HTTP server
//! pdf-chat get <document-id>    # print stored upload metadata
//! ```
//!
//! `serve` needs `GOOGLE_GEMINI_API_KEY` in the environment or in `.env`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pdf_chat::store::{DocumentStore, SqliteDocumentStore};
use pdf_chat::{config, db, migrate, server};

/// pdf-chat — upload PDFs and ask questions about them.
#[derive(Parser)]
#[command(name = "pdf-chat", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply if it does not exist.
    #[arg(long, global = true, default_value = "./config/pdf-chat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Start the HTTP server.
    Serve,

    /// Print the metadata of an upload by document id.
    Get {
        /// Document UUID returned by `POST /upload/`.
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Get { id } => {
            let pool = db::connect(&cfg).await?;
            migrate::migrate_pool(&pool).await?;
            let store = SqliteDocumentStore::new(pool);
            let doc = store.get_by_id(&id).await?;
            store.pool().close().await;

            let Some(doc) = doc else {
                anyhow::bail!("document not found: {}", id);
            };
            println!("--- Document ---");
            println!("id:          {}", doc.id);
            println!("filename:    {}", doc.filename);
            println!("upload_date: {}", doc.upload_date.to_rfc3339());
        }
    }

    Ok(())
}
