use crate::domain::refund_request::{RefundRequest, SubmitRefundRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use utoipa;

/// Submit a customer refund request
#[utoipa::path(
    post,
    path = "/api/refund-requests",
    tag = "Refund Requests",
    summary = "Submit refund request",
    description = "File a refund request against a booking. At most one active (pending or \
                   approved) request may exist per booking; duplicates return the existing one.",
    request_body = SubmitRefundRequest,
    responses(
        (status = 200, description = "Refund request recorded", body = serde_json::Value),
        (status = 400, description = "Booking not eligible for a refund request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Booking belongs to another guest"),
        (status = 404, description = "Booking not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn submit_refund_request(
    auth: AuthUser,
    State(app_state): State<crate::config::AppState>,
    Json(request): Json<SubmitRefundRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = app_state
        .booking_repository
        .find_by_id(request.booking_id)
        .await?
        .ok_or_else(|| AppError::not_found("Booking not found"))?;

    if booking.guest_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::forbidden(
            "You can only request refunds for your own bookings",
        ));
    }

    if !booking.can_be_refunded() {
        return Err(AppError::validation(
            "Refund requests are only accepted for confirmed, paid bookings",
        ));
    }

    if booking.has_refund() {
        return Err(AppError::validation(
            "This booking has already been refunded",
        ));
    }

    // The partial unique index on active requests is the authority here;
    // a concurrent duplicate insert comes back as None
    let created = app_state
        .refund_request_repository
        .create_if_absent(&booking, &request, auth.user_id)
        .await?;

    let existing = if created.is_none() {
        app_state
            .refund_request_repository
            .find_active_by_booking_id(booking.id)
            .await?
    } else {
        None
    };

    let (refund_request, was_created) = resolve_submission(created, existing)?;

    if was_created {
        tracing::info!(
            "Refund request {} filed for booking {} by user {}",
            refund_request.id,
            booking.booking_reference,
            auth.user_id
        );
    } else {
        tracing::info!(
            "Duplicate refund request for booking {} ignored, returning {}",
            booking.booking_reference,
            refund_request.id
        );
    }

    Ok(Json(submission_body(&refund_request, was_created)))
}

// Outcome of the conditional insert: either a newly created request, or the
// surviving active request when the unique index rejected a duplicate.
fn resolve_submission(
    created: Option<RefundRequest>,
    existing: Option<RefundRequest>,
) -> Result<(RefundRequest, bool), AppError> {
    match created {
        Some(request) => Ok((request, true)),
        None => existing.map(|request| (request, false)).ok_or_else(|| {
            AppError::internal("Active refund request vanished during submission")
        }),
    }
}

fn submission_body(request: &RefundRequest, created: bool) -> Value {
    if created {
        json!({
            "success": true,
            "created": true,
            "refund_request": format_refund_request(request)
        })
    } else {
        json!({
            "success": true,
            "created": false,
            "message": "An active refund request already exists for this booking",
            "refund_request": format_refund_request(request)
        })
    }
}

/// Fetch the active refund request for a booking
#[utoipa::path(
    get,
    path = "/api/refund-requests/{booking_id}",
    tag = "Refund Requests",
    summary = "Get refund request",
    description = "Return the latest active refund request for a booking, if any.",
    params(
        ("booking_id" = i32, Path, description = "Booking database ID")
    ),
    responses(
        (status = 200, description = "Refund request state", body = serde_json::Value),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Booking belongs to another guest"),
        (status = 404, description = "Booking not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_refund_request(
    auth: AuthUser,
    State(app_state): State<crate::config::AppState>,
    Path(booking_id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let booking = app_state
        .booking_repository
        .find_by_id(booking_id)
        .await?
        .ok_or_else(|| AppError::not_found("Booking not found"))?;

    if booking.guest_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::forbidden(
            "You can only view refund requests for your own bookings",
        ));
    }

    let refund_request = app_state
        .refund_request_repository
        .find_active_by_booking_id(booking.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "booking_id": booking.id,
        "refund_request": refund_request.as_ref().map(format_refund_request)
    })))
}

fn format_refund_request(request: &RefundRequest) -> Value {
    json!({
        "id": request.id,
        "booking_id": request.booking_id,
        "booking_reference": request.booking_reference,
        "total_amount": request.total_amount,
        "reason": request.reason,
        "description": request.description,
        "contact_phone": request.contact_phone,
        "preferred_refund_method": request.preferred_refund_method,
        "status": request.status,
        "admin_notes": request.admin_notes,
        "requested_at": request.requested_at,
        "updated_at": request.updated_at
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_request(id: i32) -> RefundRequest {
        RefundRequest {
            id,
            booking_id: 1,
            booking_reference: "BK001234".to_string(),
            total_amount: 1495,
            reason: "change_of_plans".to_string(),
            description: Some("Trip cancelled".to_string()),
            contact_phone: "+919876543210".to_string(),
            preferred_refund_method: "original_payment".to_string(),
            status: "pending".to_string(),
            admin_notes: None,
            requested_by: 42,
            requested_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_submission_reports_created() {
        let (request, created) = resolve_submission(Some(sample_request(3)), None).unwrap();
        assert!(created);
        assert_eq!(request.id, 3);

        let body = submission_body(&request, created);
        assert_eq!(body["success"], true);
        assert_eq!(body["created"], true);
        assert_eq!(body["refund_request"]["id"], 3);
        assert!(body.get("message").is_none());
    }

    #[test]
    fn test_duplicate_submission_returns_surviving_request() {
        // The conditional insert lost to an existing active request; the
        // caller gets that request back instead of a duplicate or an error
        let (request, created) = resolve_submission(None, Some(sample_request(7))).unwrap();
        assert!(!created);
        assert_eq!(request.id, 7);

        let body = submission_body(&request, created);
        assert_eq!(body["success"], true);
        assert_eq!(body["created"], false);
        assert_eq!(body["refund_request"]["id"], 7);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("already exists"));
    }

    #[test]
    fn test_vanished_active_request_is_an_internal_error() {
        let result = resolve_submission(None, None);
        assert!(matches!(result.unwrap_err(), AppError::InternalError(_)));
    }
}
