use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use taskquest_db::{DbConfig, SqliteDatabase};
use taskquest_service::LocalService;

#[derive(Parser)]
#[command(name = "taskquest-server", about = "Data service for the taskquest board")]
struct Cli {
    /// Address to bind to
    #[arg(long, env = "TASKQUEST_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(long, env = "TASKQUEST_PORT", default_value_t = 3710)]
    port: u16,

    /// SQLite database file (defaults to <data dir>/taskquest.db)
    #[arg(long, env = "TASKQUEST_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete expired sessions and exit
    PurgeSessions,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db = Arc::new(SqliteDatabase::open(&DbConfig {
        sqlite_path: cli.db.clone(),
    })?);

    match cli.command {
        Some(Commands::PurgeSessions) => {
            let removed = LocalService::new(db).purge_expired_sessions().await?;
            eprintln!("Removed {removed} expired session(s)");
        }
        None => {
            let addr = SocketAddr::new(cli.bind.parse()?, cli.port);
            let listener = TcpListener::bind(addr).await?;
            info!("taskquest-server listening on http://{addr}");
            taskquest_server::serve(listener, db).await?;
        }
    }

    Ok(())
}
