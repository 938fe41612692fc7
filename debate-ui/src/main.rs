//! Debate UI server: read-only live view of a debate output directory.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use debate::io::paths::DEFAULT_OUTPUT_DIR;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "debate-ui")]
#[command(about = "Read-only live view of a running debate")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    #[arg(long, default_value = "8150")]
    port: u16,

    /// Debate output directory (contains state.json)
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    dir: PathBuf,

    /// Directory of static viewer files served at `/`
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debate_ui=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let output_dir = args.dir.canonicalize().unwrap_or(args.dir);
    info!(output_dir = %output_dir.display(), "starting debate-ui");

    let state = AppState::new(output_dir);
    sse::start_file_watcher(state.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    match args.static_dir {
        Some(dir) if dir.exists() => {
            info!(static_dir = %dir.display(), "serving static files");
            app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
        }
        Some(dir) => {
            info!(static_dir = %dir.display(), "static directory not found, API-only mode");
        }
        None => {}
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
