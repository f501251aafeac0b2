// JWT authentication middleware for the payment service

use crate::{config::AppState, error::AppError, utils::jwt};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

// Authentication context for the current request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin" || self.role == "super_admin"
    }
}

// Axum extractor implementation for AuthUser
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

// Extract Bearer token from the Authorization header
fn extract_jwt_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Authorization header with Bearer token required"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid Authorization header format"))?;

    if !auth_header.starts_with("Bearer ") {
        return Err(AppError::unauthorized("Bearer token format required"));
    }

    Ok(auth_header[7..].to_string())
}

// JWT authentication middleware
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Health and service-info endpoints stay public
    let path = request.uri().path().to_string();
    if path == "/health" || path == "/info" {
        return Ok(next.run(request).await);
    }

    let token = extract_jwt_token(request.headers())?;

    let claims = jwt::validate_token(&token, &state.config.jwt_secret)
        .map_err(|_| AppError::unauthorized("Token invalid, expired, or of the wrong type"))?;

    let auth_user = AuthUser {
        user_id: claims.sub,
        email: claims.email.clone(),
        role: claims.role.clone(),
    };

    // Inject into request extensions so handlers can extract it
    request.extensions_mut().insert(auth_user.clone());

    tracing::debug!(
        "User authenticated - ID: {}, Role: {}, Endpoint: {}",
        auth_user.user_id,
        auth_user.role,
        path
    );

    Ok(next.run(request).await)
}
