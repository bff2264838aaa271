use anyhow::Context;
use metavertex_core::config;
use metavertex_server::state::AppState;
use metavertex_server::{build_router, serve, ws_server};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "starting metavertex: http {}:{}, websocket {}:{}",
        config.server.host, config.server.port, config.server.host, config.ws_port
    );

    let state = AppState::from_config(&config)?;

    let ws_listener = TcpListener::bind((config.server.host.as_str(), config.ws_port))
        .await
        .with_context(|| format!("failed to bind WebSocket port {}", config.ws_port))?;
    let ws_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = ws_server::run(ws_listener, ws_state).await {
            error!("WebSocket server stopped: {e:#}");
        }
    });

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("failed to bind HTTP port {}", config.server.port))?;
    serve(listener, build_router(state, &config.cors.allowed_origins)).await
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("metavertex_server=info,metavertex_core=info,tower_http=info,warn")
        }))
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
