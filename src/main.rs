use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eap_aka::clients::{S6aClient, SwxClient, VectorSupplier};
use eap_aka::providers::{AkaProvider, ProviderRegistry};
use eap_aka::routes;
use eap_aka::types::config::VectorSource;
use eap_aka::types::{AkaConfig, AppState, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("SERVER_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()?;

    let config = AkaConfig::from_env().map_err(|e| anyhow::anyhow!("{}", e))?;

    let supplier: Arc<dyn VectorSupplier> = match config.vector_source {
        VectorSource::Swx => {
            tracing::info!("Using SWx vector supplier at {}", config.swx_uri);
            Arc::new(SwxClient::with_base_url(config.swx_uri.clone()))
        }
        VectorSource::S6a => {
            tracing::info!("Using S6a vector supplier at {}", config.s6a_uri);
            Arc::new(S6aClient::with_base_url(config.s6a_uri.clone()))
        }
    };

    if config.plmn_filter.is_empty() {
        tracing::warn!("AKA_PLMN_IDS not set, serving subscribers of every PLMN");
    }

    let session_store = Arc::new(SessionStore::new(config.timeouts.session));
    let provider = AkaProvider::new(config, Arc::clone(&session_store), supplier);
    let registry = ProviderRegistry::new().register(Arc::new(provider));

    let app_state = AppState::new(registry, Arc::clone(&session_store));

    let app = routes::create_routes(app_state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("EAP-AKA server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, dropping {} session(s)", session_store.len().await);
            session_store.shutdown().await;
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
