//! Crossbar gateway binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

use crossbar::api;
use crossbar::recommend::ControlPlaneClient;
use crossbar::state::AppState;
use crossbar::store::PolicyStore;
use crossbar::warmup;

/// Inference gateway routing chat, code, vision and speech requests.
#[derive(Debug, Parser)]
#[command(name = "crossbar", version, about)]
struct Cli {
    /// Path to the routing configuration file.
    #[arg(long, env = "CROSSBAR_CONFIG", default_value = "crossbar.toml")]
    config: PathBuf,

    /// Path to the active-profile state file. Defaults to
    /// ~/.crossbar/state.json.
    #[arg(long, env = "CROSSBAR_STATE")]
    state: Option<PathBuf>,

    /// Socket address the gateway listens on.
    #[arg(long, env = "CROSSBAR_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Base URL of the recommendation control plane. Leaving it unset
    /// disables dynamic routing entirely.
    #[arg(long, env = "CONTROL_PLANE_URL")]
    control_plane_url: Option<Url>,

    /// Directory download markers are written to.
    #[arg(long, env = "CROSSBAR_DOWNLOADS_DIR", default_value = "downloads")]
    downloads_dir: PathBuf,
}

fn default_state_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".crossbar")
        .join("state.json")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crossbar=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A broken configuration must stop the process before it binds.
    let store = PolicyStore::load(&cli.config)
        .with_context(|| format!("loading routing configuration from {}", cli.config.display()))?;
    info!(config = %cli.config.display(), "routing configuration loaded");

    let control_plane = cli.control_plane_url.map(ControlPlaneClient::new);
    if control_plane.is_some() {
        info!("control plane configured, dynamic routing available");
    }

    let state_path = cli.state.unwrap_or_else(default_state_path);
    let state = AppState::new(store, state_path, control_plane, cli.downloads_dir);

    // Fire-and-forget: warmup never delays readiness.
    tokio::spawn(warmup::ping_backends(state.store.snapshot()));

    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("binding {}", cli.listen))?;
    info!("crossbar listening on http://{}", cli.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
