// Payment Service Configuration
use crate::handlers::razorpay_service::{PaymentGateway, RazorpayService};
use crate::repositories::booking_repo::BookingRepository;
use crate::repositories::refund_request_repo::RefundRequestRepository;
use crate::utils::locks::RefundLocks;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::env;
use std::sync::Arc;
use std::time::Duration;

// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_api_url: String,
    pub app_version: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set")?;

        if !cfg!(debug_assertions) && jwt_secret.contains("change-this") {
            return Err("JWT_SECRET is still the default! Change it for production".to_string());
        }

        let server_host = env::var("PAYMENT_SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("PAYMENT_SERVICE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8084);

        let environment = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());

        let razorpay_key_id =
            env::var("RAZORPAY_KEY_ID").map_err(|_| "RAZORPAY_KEY_ID must be set")?;

        let razorpay_key_secret =
            env::var("RAZORPAY_KEY_SECRET").map_err(|_| "RAZORPAY_KEY_SECRET must be set")?;

        let razorpay_api_url = env::var("RAZORPAY_API_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());

        let app_version = env::var("APP_VERSION").unwrap_or_else(|_| "1.0.0".to_string());

        Ok(AppConfig {
            database_url,
            server_host,
            server_port,
            environment,
            jwt_secret,
            razorpay_key_id,
            razorpay_key_secret,
            razorpay_api_url,
            app_version,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

// Initialize the database connection pool
pub async fn init_db_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Initializing payment service database connection...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(3)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    tracing::info!("Payment service database pool initialized");
    Ok(pool)
}

// Health check database connection
pub async fn check_db_health(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").fetch_optional(pool).await.is_ok()
}

// Application state shared with every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: AppConfig,
    pub gateway: Arc<dyn PaymentGateway>,
    pub booking_repository: BookingRepository,
    pub refund_request_repository: RefundRequestRepository,
    pub refund_locks: RefundLocks,
}

impl axum::extract::FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self, String> {
        let db = init_db_pool(&config.database_url)
            .await
            .map_err(|e| format!("Failed to init database: {}", e))?;

        let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayService::new(
            config.razorpay_key_id.clone(),
            config.razorpay_key_secret.clone(),
            config.razorpay_api_url.clone(),
        ));

        let booking_repository = BookingRepository::new(db.clone());
        let refund_request_repository = RefundRequestRepository::new(db.clone());

        Ok(AppState {
            db,
            config,
            gateway,
            booking_repository,
            refund_request_repository,
            refund_locks: RefundLocks::new(),
        })
    }

    pub async fn from_env() -> Result<Self, String> {
        let config = AppConfig::from_env()?;
        Self::new(config).await
    }

    // Health check for all dependencies
    pub async fn health_check(&self) -> HealthStatus {
        let db_healthy = check_db_health(&self.db).await;

        HealthStatus {
            database: if db_healthy { "healthy" } else { "unhealthy" }.to_string(),
            overall: if db_healthy { "healthy" } else { "degraded" }.to_string(),
        }
    }
}

// Response for the health check endpoint
#[derive(Debug, serde::Serialize)]
pub struct HealthStatus {
    pub database: String,
    pub overall: String,
}
