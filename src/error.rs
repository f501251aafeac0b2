use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;

// Consistent error response shape for every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// Every error the payment service can produce
#[derive(Debug)]
pub enum AppError {
    DatabaseError(sqlx::Error),
    ValidationError(String),
    UnauthorizedError(String),
    ForbiddenError(String),
    NotFoundError(String),
    InvalidAmount(String),
    MissingVerificationData(String),
    VerificationFailed,
    MissingPaymentId,
    // Upstream gateway rejected the call; code/description are Razorpay's own
    GatewayError { code: String, description: String },
    GatewayTimeout(String),
    OrderCreationFailed(String),
    RefundFetchFailed(String),
    // Upstream refund succeeded but the local booking write did not.
    // Requires manual reconciliation against the gateway's refund list.
    ReconciliationWriteFailed(String),
    TokenError(String),
    HttpClientError(reqwest::Error),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::UnauthorizedError(msg) => write!(f, "Unauthorized error: {}", msg),
            AppError::ForbiddenError(msg) => write!(f, "Forbidden error: {}", msg),
            AppError::NotFoundError(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            AppError::MissingVerificationData(msg) => {
                write!(f, "Missing verification data: {}", msg)
            }
            AppError::VerificationFailed => write!(f, "Payment signature verification failed"),
            AppError::MissingPaymentId => write!(f, "Payment ID is required"),
            AppError::GatewayError { code, description } => {
                write!(f, "Gateway error {}: {}", code, description)
            }
            AppError::GatewayTimeout(msg) => write!(f, "Gateway timeout: {}", msg),
            AppError::OrderCreationFailed(msg) => write!(f, "Order creation failed: {}", msg),
            AppError::RefundFetchFailed(msg) => write!(f, "Refund fetch failed: {}", msg),
            AppError::ReconciliationWriteFailed(msg) => {
                write!(f, "Reconciliation write failed: {}", msg)
            }
            AppError::TokenError(msg) => write!(f, "Token error: {}", msg),
            AppError::HttpClientError(e) => write!(f, "HTTP client error: {}", e),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::TokenError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::GatewayTimeout(err.to_string())
        } else {
            AppError::HttpClientError(err)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Verification failure carries an explicit verified flag so the
        // client never confuses it with a transport-level error
        if matches!(self, AppError::VerificationFailed) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "verified": false,
                    "error": "verification_failed",
                    "message": "Payment signature verification failed"
                })),
            )
                .into_response();
        }

        let (status, error_type, message, details) = match &self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                    if cfg!(debug_assertions) {
                        Some(e.to_string())
                    } else {
                        None
                    },
                )
            }
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
                None,
            ),
            AppError::UnauthorizedError(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone(), None)
            }
            AppError::ForbiddenError(msg) => {
                (StatusCode::FORBIDDEN, "forbidden", msg.clone(), None)
            }
            AppError::NotFoundError(msg) => {
                (StatusCode::NOT_FOUND, "not_found", msg.clone(), None)
            }
            AppError::InvalidAmount(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_amount",
                msg.clone(),
                None,
            ),
            AppError::MissingVerificationData(msg) => (
                StatusCode::BAD_REQUEST,
                "missing_verification_data",
                msg.clone(),
                None,
            ),
            AppError::VerificationFailed => unreachable!(),
            AppError::MissingPaymentId => (
                StatusCode::BAD_REQUEST,
                "missing_payment_id",
                "Payment ID is required".to_string(),
                None,
            ),
            // Surface the gateway's own code/description verbatim so
            // operators can decide between retry and terminal failure
            AppError::GatewayError { code, description } => {
                tracing::error!("Gateway error: {} - {}", code, description);
                (
                    StatusCode::BAD_REQUEST,
                    "gateway_error",
                    description.clone(),
                    Some(code.clone()),
                )
            }
            AppError::GatewayTimeout(msg) => {
                tracing::error!("Gateway timeout: {}", msg);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "gateway_timeout",
                    "Payment gateway did not respond in time".to_string(),
                    if cfg!(debug_assertions) {
                        Some(msg.clone())
                    } else {
                        None
                    },
                )
            }
            AppError::OrderCreationFailed(msg) => {
                tracing::error!("Order creation failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "order_creation_failed",
                    "Failed to create payment order".to_string(),
                    if cfg!(debug_assertions) {
                        Some(msg.clone())
                    } else {
                        None
                    },
                )
            }
            AppError::RefundFetchFailed(msg) => {
                tracing::error!("Refund fetch failed: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    "refund_fetch_failed",
                    msg.clone(),
                    None,
                )
            }
            AppError::ReconciliationWriteFailed(msg) => {
                // Logged distinctly: money moved upstream but local state lags
                tracing::error!("RECONCILIATION REQUIRED - booking write failed after successful refund: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "reconciliation_write_failed",
                    "Refund succeeded at the gateway but the booking record was not updated".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::TokenError(msg) => (
                StatusCode::UNAUTHORIZED,
                "token_error",
                "Token is invalid or expired".to_string(),
                if cfg!(debug_assertions) {
                    Some(msg.clone())
                } else {
                    None
                },
            ),
            AppError::HttpClientError(e) => {
                tracing::error!("HTTP client error: {:?}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "http_client_error",
                    "Failed to reach an external service".to_string(),
                    if cfg!(debug_assertions) {
                        Some(e.to_string())
                    } else {
                        None
                    },
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal server error occurred".to_string(),
                    if cfg!(debug_assertions) {
                        Some(msg.clone())
                    } else {
                        None
                    },
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(error_response)).into_response()
    }
}

// Helper constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFoundError(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        AppError::InvalidAmount(msg.into())
    }

    pub fn missing_verification_data(msg: impl Into<String>) -> Self {
        AppError::MissingVerificationData(msg.into())
    }

    pub fn gateway(code: impl Into<String>, description: impl Into<String>) -> Self {
        AppError::GatewayError {
            code: code.into(),
            description: description.into(),
        }
    }

    pub fn order_creation(msg: impl Into<String>) -> Self {
        AppError::OrderCreationFailed(msg.into())
    }

    pub fn refund_fetch(msg: impl Into<String>) -> Self {
        AppError::RefundFetchFailed(msg.into())
    }

    pub fn reconciliation(msg: impl Into<String>) -> Self {
        AppError::ReconciliationWriteFailed(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::UnauthorizedError(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::ForbiddenError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::InternalError(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }
}

// Result alias with AppError as the error type
pub type AppResult<T> = Result<T, AppError>;
