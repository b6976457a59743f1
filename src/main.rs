use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use photofind::api::create_router;
use photofind::client::{HttpTransport, SearchController};
use photofind::config::CONFIG;
use photofind::db::Database;
use photofind::enroll::{Enroller, HttpFaceEmbedder, parse_records};
use photofind::matcher::PhotoMatcher;
use photofind::store::MongoStore;
use photofind::terminal::TerminalSurface;

#[derive(Parser)]
#[command(name = "photofind", about = "Find a student's photos in the school gallery")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },
    /// Search a running server for a student's photos
    Find {
        student_id: String,
        #[arg(long)]
        server: Option<String>,
    },
    /// Enroll students from a JSON file of {student_id, name, school_id, photo_url}
    Enroll {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    match Cli::parse().command {
        Command::Serve { addr } => serve(addr.as_deref().unwrap_or(&CONFIG.bind_addr)).await,
        Command::Find { student_id, server } => {
            let transport = HttpTransport::new(server.as_deref().unwrap_or(&CONFIG.server_url))?;
            let mut controller =
                SearchController::new(transport, TerminalSurface::new(std::io::stdout()));
            if controller.execute_search(&student_id).await.is_err() {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Enroll { file, concurrency } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let records = parse_records(&json)?;
            if records.is_empty() {
                tracing::warn!("no students in {}", file.display());
                return Ok(());
            }

            let db = Database::from_config().await?;
            let embedder = HttpFaceEmbedder::new(&CONFIG.embedding_url)?;
            let enroller = Enroller::new(embedder, MongoStore::new(&db))?;

            let summary = enroller.enroll_all(&records, concurrency).await;
            tracing::info!(
                created = summary.created,
                updated = summary.updated,
                skipped = summary.skipped,
                failed = summary.failed,
                "enrollment finished"
            );
            Ok(())
        }
    }
}

async fn serve(addr: &str) -> anyhow::Result<()> {
    let db = Database::from_config().await?;
    let matcher = Arc::new(PhotoMatcher::new(
        MongoStore::new(&db),
        CONFIG.match_threshold,
    ));
    let app = create_router(matcher, &CONFIG.static_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
