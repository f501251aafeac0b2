mod config;
mod domain;
mod error;
mod handlers;
mod middleware;
mod repositories;
mod routes;
mod utils;

use config::AppState;
use routes::create_routes;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Entry point of the payment and refund reconciliation service
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Setup logging based on environment
    setup_logging();

    // Create application state (includes database connection)
    let app_state = AppState::from_env().await?;

    info!(
        "🚀 Payment Service starting on {}:{}",
        app_state.config.server_host, app_state.config.server_port
    );
    info!(
        "💳 Environment: {} | Razorpay API: {}",
        app_state.config.environment, app_state.config.razorpay_api_url
    );

    // Build and start server with graceful shutdown
    start_server(app_state).await
}

/// Initialize structured logging based on environment
fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("payment_service=debug,tower_http=debug")
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Start the server with graceful shutdown
async fn start_server(app_state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_routes(app_state.clone()).await;

    let listener = TcpListener::bind(format!(
        "{}:{}",
        app_state.config.server_host, app_state.config.server_port
    ))
    .await?;

    info!(
        "🌐 Server running on http://{}:{}",
        app_state.config.server_host, app_state.config.server_port
    );
    info!(
        "📚 API Docs: http://{}:{}/docs",
        app_state.config.server_host, app_state.config.server_port
    );
    info!(
        "🏥 Health Check: http://{}:{}/health",
        app_state.config.server_host, app_state.config.server_port
    );

    // Graceful shutdown signal handler
    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("🛑 Received shutdown signal");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("✅ Payment Service shutdown successfully");
    Ok(())
}
