// API routes for the payment and refund reconciliation service

use crate::config::AppState;
use crate::handlers::{payment_handler, refund_request_handler};
use crate::middleware::auth::jwt_auth_middleware;
use axum::{
    extract::Request,
    http::{header::HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// OpenAPI documentation for the payment service
#[derive(OpenApi)]
#[openapi(
    paths(
        payment_handler::create_order,
        payment_handler::verify_payment,
        payment_handler::issue_refund,
        payment_handler::get_refund,
        payment_handler::reconcile_refunds,
        refund_request_handler::submit_refund_request,
        refund_request_handler::get_refund_request,
        payment_handler::health_check,
        payment_handler::get_service_info,
    ),
    components(
        schemas(
            crate::domain::payment::CreateOrderRequest,
            crate::domain::payment::VerifyPaymentRequest,
            crate::domain::payment::IssueRefundRequest,
            crate::domain::payment::RefundStatus,
            crate::domain::refund_request::SubmitRefundRequest,
            crate::domain::refund_request::RefundReason,
            crate::domain::refund_request::RefundMethod,
            crate::domain::refund_request::RefundRequestStatus,
        )
    ),
    tags(
        (name = "Payment Service", description = "Razorpay order, verification and refund operations"),
        (name = "Refund Requests", description = "Customer refund request intake")
    ),
    info(
        title = "Payment Service API",
        description = "Payment and refund reconciliation service for the hotel booking platform with Razorpay integration\n\n## Features\n\n- 💳 Razorpay order creation\n- 🔒 HMAC SHA256 payment verification\n- 💰 Full and partial refunds with booking reconciliation\n- 📝 Customer refund request intake",
        version = "1.0.0",
        contact(
            name = "StayEasy Support",
            email = "support@stayeasy.in"
        )
    ),
    servers(
        (url = "https://api.stayeasy.in", description = "Production server")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub struct ApiDoc;

// Security scheme modifier for Bearer JWT authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

// Security headers middleware
async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("Content-Security-Policy",
        "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; font-src 'self'; connect-src 'self'; frame-ancestors 'none';"
            .parse().unwrap());
    headers.insert("X-Content-Type-Options", "nosniff".parse().unwrap());
    headers.insert("X-Frame-Options", "DENY".parse().unwrap());
    headers.insert("X-XSS-Protection", "1; mode=block".parse().unwrap());
    headers.insert(
        "Referrer-Policy",
        "strict-origin-when-cross-origin".parse().unwrap(),
    );
    headers.insert(
        "Permissions-Policy",
        "camera=(), microphone=(), geolocation=()".parse().unwrap(),
    );
    headers.insert(
        "Strict-Transport-Security",
        "max-age=31536000; includeSubDomains".parse().unwrap(),
    );

    response
}

// Build the router with JWT-only security
pub async fn create_routes(state: AppState) -> Router {
    if state.config.is_production() {
        tracing::warn!("Payment Service running in PRODUCTION mode");
    } else {
        tracing::info!("Payment Service running in DEVELOPMENT mode");
    }

    // CORS configuration
    let frontend_url = std::env::var("FRONTEND_URL")
        .expect("FRONTEND_URL environment variable must be set in the .env file");

    let allowed_origin = frontend_url
        .parse::<HeaderValue>()
        .expect("FRONTEND_URL must be a valid URL");

    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
            axum::http::header::CONTENT_TYPE,
        ])
        .allow_credentials(false)
        .max_age(Duration::from_secs(86400));

    // Setup OpenAPI documentation
    let mut openapi = ApiDoc::openapi();
    SecurityAddon.modify(&mut openapi);

    // Public routes, no JWT authentication
    let public_routes = Router::new()
        .route("/health", get(payment_handler::health_check))
        .route("/info", get(payment_handler::get_service_info))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi))
        .with_state(state.clone());

    // Protected API routes behind JWT authentication
    let protected_routes = build_api_routes(state.clone()).layer(
        axum::middleware::from_fn_with_state(state.clone(), jwt_auth_middleware),
    );

    // Combine all routes with the shared middleware stack
    public_routes
        .nest("/api", protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(30),
                ))
                .layer(cors),
        )
        .layer(axum::middleware::from_fn(security_headers_middleware))
}

// API routes behind JWT authentication
fn build_api_routes(state: AppState) -> Router {
    Router::new()
        // ===== Payment Operations =====
        .route("/payments/order", post(payment_handler::create_order))
        .route("/payments/verify", post(payment_handler::verify_payment))
        // ===== Refund Operations (admin) =====
        .route(
            "/payments/refund",
            post(payment_handler::issue_refund).get(payment_handler::get_refund),
        )
        .route(
            "/payments/refund/reconcile/{booking_id}",
            post(payment_handler::reconcile_refunds),
        )
        // ===== Customer Refund Requests =====
        .route(
            "/refund-requests",
            post(refund_request_handler::submit_refund_request),
        )
        .route(
            "/refund-requests/{booking_id}",
            get(refund_request_handler::get_refund_request),
        )
        .with_state(state)
}
