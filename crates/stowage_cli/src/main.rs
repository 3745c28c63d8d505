use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stowage_core::prelude::*;
use stowage_fs::LocalFileStore;
use stowage_server::StowageServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stowage")]
#[command(about = "CLI for the Stowage asset storage backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage configuration file (TOML)
    #[arg(short, long, env = "STOWAGE_CONFIG", default_value = "stowage.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        #[arg(long, env = "STOWAGE_ADDR", default_value = "0.0.0.0:3000")]
        addr: String,
    },
    /// Store a local file and print its public URL
    Save {
        path: PathBuf,

        /// Asset category, e.g. "images"
        #[arg(short = 't', long, default_value = "images")]
        category: String,

        /// Directory to store into instead of the monthly default
        #[arg(long)]
        target_dir: Option<PathBuf>,
    },
    /// Remove a stored file; succeeds if it is already gone
    Delete {
        file_name: String,

        #[arg(long)]
        target_dir: Option<PathBuf>,
    },
    /// Check whether a path exists
    Exists { path: PathBuf },
}

fn load_config(path: &Path) -> anyhow::Result<StorageConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let storage = LocalFileStore::new(config);

    match cli.command {
        Commands::Serve { addr } => {
            let app = StowageServer::new().build(storage)?;
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Server listening on http://{addr}");
            axum::serve(listener, app).await?;
        }
        Commands::Save {
            path,
            category,
            target_dir,
        } => {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .with_context(|| format!("{} has no file name", path.display()))?;
            let url = storage
                .save(&UploadedFile::new(&path, name), &category, target_dir.as_deref())
                .await?;
            println!("{url}");
        }
        Commands::Delete {
            file_name,
            target_dir,
        } => {
            storage.delete(&file_name, target_dir.as_deref()).await?;
            println!("Deleted {file_name}");
        }
        Commands::Exists { path } => {
            let exists = storage.exists(&path).await;
            println!("{exists}");
            if !exists {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
