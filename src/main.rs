use anyhow::Context;
use dotenvy::dotenv;
use rust_cdn_backend::config::CdnConfig;
use rust_cdn_backend::infrastructure::storage;
use rust_cdn_backend::services::mime::MimeRegistry;
use rust_cdn_backend::{AppState, create_app};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_cdn_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Rust CDN Backend...");

    let config = CdnConfig::from_env();
    info!(
        "⚙️  Config: Max Upload={}MB, WebP Quality={}, Copy Buffer={}KB",
        config.max_upload_size / 1024 / 1024,
        config.webp_quality,
        config.copy_buffer_size / 1024
    );

    let storage_service = storage::setup_storage(&config)
        .await
        .context("storage bootstrap failed")?;

    let addr = config.bind_addr;
    let state = AppState::new(config, storage_service, MimeRegistry::standard());
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
