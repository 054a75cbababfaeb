use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autoanalyst::{
    api::report_filename,
    config::Config,
    connectivity::spawn_banner,
    routes::create_router,
    AppState, AutoAnalyst,
};

#[derive(Parser)]
#[command(name = "autoanalyst", version, about = "AutoAnalyst backend gateway and connectivity tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the /api proxy with background health polling
    Serve,
    /// Check backend health once
    Health,
    /// Poll backend health and report connectivity and banner changes
    Watch,
    /// Show system statistics (fallback snapshot when offline)
    Stats,
    /// List uploaded documents (fallback snapshot when offline)
    Documents,
    /// Delete a document by id
    Delete { id: String },
    /// Ask the analysis agent a question
    Ask {
        query: String,
        #[arg(long)]
        session: Option<String>,
    },
    /// Upload a document for retrieval
    Upload { path: PathBuf },
    /// Export a chat session as a PDF report
    Export {
        session: String,
        /// Output file (defaults to autoanalyst_report_<session prefix>.pdf)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoanalyst=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    info!(backend = %config.backend.url, "Configuration loaded");

    let service = AutoAnalyst::new(&config)?;

    match cli.command {
        Command::Serve => serve(config, service).await?,
        Command::Health => {
            service.check_health().await?;
            print_json(&service.connectivity().current())?;
        }
        Command::Watch => watch(&config, &service).await?,
        Command::Stats => print_json(&service.get_system_stats().await?)?,
        Command::Documents => print_json(&service.list_documents().await?)?,
        Command::Delete { id } => {
            service.delete_document(&id).await?;
            println!("Deleted {}", id);
        }
        Command::Ask { query, session } => print_json(&service.ask(&query, session).await?)?,
        Command::Upload { path } => print_json(&service.upload_path(&path).await?)?,
        Command::Export { session, out } => {
            let pdf = service.export_pdf(&session).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(report_filename(session.trim())));
            tokio::fs::write(&out, &pdf).await?;
            println!("Exported {} bytes to {}", pdf.len(), out.display());
        }
    }

    Ok(())
}

async fn serve(config: Config, service: AutoAnalyst) -> anyhow::Result<()> {
    let connectivity = Arc::clone(service.connectivity());
    let _polling = connectivity.spawn();

    // Create shared state
    let state = AppState::new(config.clone(), connectivity)?;

    // Create router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Proxy listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn watch(config: &Config, service: &AutoAnalyst) -> anyhow::Result<()> {
    let connectivity = service.connectivity();
    let mut state_rx = connectivity.subscribe();
    let (mut banner_rx, _banner) = spawn_banner(
        connectivity.subscribe(),
        config.connectivity.banner_hide_delay(),
    );
    let _polling = connectivity.spawn();

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                info!(
                    status = %state.status,
                    consecutive = state.consecutive_checks,
                    total = state.total_checks,
                    "Health check completed"
                );
            }
            changed = banner_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if *banner_rx.borrow_and_update() {
                    warn!("Backend offline - showing offline banner");
                } else {
                    info!("Backend back online - offline banner hidden");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
