use crate::domain::booking::Booking;
use crate::domain::payment::{
    default_receipt, to_major_units, to_minor_units, CreateOrderRequest, IssueRefundRequest,
    Refund, RefundQuery, RefundStatus, VerifyPaymentRequest,
};
use crate::error::{AppError, AppResult};
use crate::handlers::razorpay_service::PaymentGateway;
use crate::middleware::auth::AuthUser;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use utoipa;

/// Create a payment order with the gateway
#[utoipa::path(
    post,
    path = "/api/payments/order",
    tag = "Payment Service",
    summary = "Create payment order",
    description = "Create a Razorpay order for a checkout attempt. Amount is in major units (rupees).",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created successfully", body = serde_json::Value),
        (status = 400, description = "Invalid amount"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Order creation failed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_order(
    auth: AuthUser,
    State(app_state): State<crate::config::AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Value>, AppError> {
    let response = create_order_upstream(app_state.gateway.as_ref(), request).await?;

    tracing::info!(
        "Payment order created: {} by user: {}",
        response["order"]["id"],
        auth.user_id
    );

    Ok(Json(response))
}

/// Verify a client-reported payment completion
#[utoipa::path(
    post,
    path = "/api/payments/verify",
    tag = "Payment Service",
    summary = "Verify payment signature",
    description = "Validate the (order_id, payment_id, signature) triple returned by Razorpay checkout. \
                   On success the referenced booking transitions to confirmed.",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Signature verified", body = serde_json::Value),
        (status = 400, description = "Missing verification data or verification failed"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_payment(
    auth: AuthUser,
    State(app_state): State<crate::config::AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let (order_id, payment_id, signature) = require_verification_fields(&request)?;

    // The client is untrusted; only a signature matching the shared secret
    // proves the gateway produced this result. Fail closed.
    let verified = app_state
        .gateway
        .verify_payment_signature(&order_id, &payment_id, &signature);

    if !verified {
        tracing::warn!(
            "Payment verification failed: order_id={}, payment_id={}, user={}",
            order_id,
            payment_id,
            auth.user_id
        );
        return Err(AppError::VerificationFailed);
    }

    // Booking state may only reach confirmed through this path
    if let Some(booking_id) = request.booking_id {
        let booking = app_state
            .booking_repository
            .confirm_payment(booking_id, &order_id, &payment_id)
            .await?;

        tracing::info!(
            "Booking confirmed after payment verification: {} ({})",
            booking.booking_reference,
            payment_id
        );
    }

    tracing::info!(
        "Payment verified: order_id={}, payment_id={}",
        order_id,
        payment_id
    );

    Ok(Json(json!({
        "success": true,
        "verified": true,
        "payment_id": payment_id,
        "order_id": order_id
    })))
}

/// Issue a refund against a captured payment
#[utoipa::path(
    post,
    path = "/api/payments/refund",
    tag = "Payment Service",
    summary = "Issue refund",
    description = "Issue a full or partial refund for a captured payment and record the \
                   refund snapshot on the booking. Admin only.",
    request_body = IssueRefundRequest,
    responses(
        (status = 200, description = "Refund issued successfully", body = serde_json::Value),
        (status = 400, description = "Validation or gateway error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Reconciliation write failed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn issue_refund(
    auth: AuthUser,
    State(app_state): State<crate::config::AppState>,
    Json(request): Json<IssueRefundRequest>,
) -> Result<Json<Value>, AppError> {
    if !auth.is_admin() {
        return Err(AppError::forbidden("Only admins can issue refunds"));
    }

    let payment_id = require_payment_id(request.payment_id.as_deref())?;
    check_refund_amount(request.amount)?;

    // One in-flight refund per payment. The booking is read and its
    // eligibility checked under this lock, so a concurrent refund that just
    // cancelled the booking is rejected here, before the gateway is called,
    // instead of surfacing as a reconciliation failure after money moved.
    let lock = app_state.refund_locks.lock_for(&payment_id);
    let _guard = lock.lock().await;

    let booking = app_state
        .booking_repository
        .find_by_payment_id(&payment_id)
        .await?
        .ok_or_else(|| AppError::not_found("No booking found for this payment"))?;

    let refund = refund_eligible_booking(
        app_state.gateway.as_ref(),
        &booking,
        &payment_id,
        request.amount,
        request.notes.clone(),
    )
    .await?;

    // Not transactional with the upstream call. If this write fails the
    // money has already moved; surface it as a reconciliation gap rather
    // than pretending the refund failed.
    let booking = app_state
        .booking_repository
        .record_refund(
            booking.id,
            &refund.id,
            to_major_units(refund.amount),
            refund.status.as_str(),
            request.reason.as_deref(),
            auth.user_id,
        )
        .await
        .map_err(|e| {
            AppError::reconciliation(format!(
                "refund {} for payment {} succeeded upstream but booking {} was not updated: {}",
                refund.id, payment_id, booking.id, e
            ))
        })?;

    tracing::info!(
        "Refund issued: {} for payment {} ({} INR) by admin {}",
        refund.id,
        payment_id,
        to_major_units(refund.amount),
        auth.user_id
    );

    Ok(Json(json!({
        "success": true,
        "refund": format_refund_response(&refund),
        "booking": {
            "id": booking.id,
            "booking_reference": booking.booking_reference,
            "status": booking.status,
            "refund_info": booking.refund_info()
        }
    })))
}

/// Look up refunds at the gateway
#[utoipa::path(
    get,
    path = "/api/payments/refund",
    tag = "Payment Service",
    summary = "Fetch refund status",
    description = "Fetch a single refund by refund_id, or every refund for a payment_id. \
                   Read-only; used to rebuild refund history. Admin only.",
    params(
        ("refund_id" = Option<String>, Query, description = "Gateway refund id"),
        ("payment_id" = Option<String>, Query, description = "Gateway payment id")
    ),
    responses(
        (status = 200, description = "Refund data retrieved", body = serde_json::Value),
        (status = 400, description = "Missing parameters or gateway error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_refund(
    auth: AuthUser,
    State(app_state): State<crate::config::AppState>,
    Query(query): Query<RefundQuery>,
) -> Result<Json<Value>, AppError> {
    if !auth.is_admin() {
        return Err(AppError::forbidden("Only admins can view refunds"));
    }

    if let Some(refund_id) = query.refund_id {
        let refund = app_state.gateway.fetch_refund(refund_id).await?;
        return Ok(Json(json!({
            "success": true,
            "refund": format_refund_response(&refund)
        })));
    }

    if let Some(payment_id) = query.payment_id {
        let refunds = app_state
            .gateway
            .fetch_refunds_for_payment(payment_id)
            .await?;
        return Ok(Json(json!({
            "success": true,
            "count": refunds.len(),
            "refunds": refunds.iter().map(format_refund_response).collect::<Vec<_>>()
        })));
    }

    Err(AppError::validation(
        "refund_id or payment_id query parameter is required",
    ))
}

/// Reconcile a booking against the gateway's refund list
#[utoipa::path(
    post,
    path = "/api/payments/refund/reconcile/{booking_id}",
    tag = "Payment Service",
    summary = "Reconcile booking refunds",
    description = "Re-query the gateway's authoritative refund list for a booking's payment \
                   and record the refund snapshot locally if it is missing. Idempotent. Admin only.",
    params(
        ("booking_id" = i32, Path, description = "Booking database ID")
    ),
    responses(
        (status = 200, description = "Reconciliation result", body = serde_json::Value),
        (status = 400, description = "Booking has no captured payment"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Booking not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn reconcile_refunds(
    auth: AuthUser,
    State(app_state): State<crate::config::AppState>,
    Path(booking_id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    if !auth.is_admin() {
        return Err(AppError::forbidden("Only admins can run reconciliation"));
    }

    let booking = app_state
        .booking_repository
        .find_by_id(booking_id)
        .await?
        .ok_or_else(|| AppError::not_found("Booking not found"))?;

    if booking.has_refund() {
        return Ok(Json(json!({
            "success": true,
            "reconciled": false,
            "message": "Booking refund already recorded",
            "refund_info": booking.refund_info()
        })));
    }

    let payment_id = booking
        .payment_id
        .clone()
        .ok_or_else(|| AppError::validation("Booking has no captured payment"))?;

    let refunds = app_state
        .gateway
        .fetch_refunds_for_payment(payment_id.clone())
        .await?;

    let Some(refund) = pick_reconcilable_refund(refunds) else {
        return Ok(Json(json!({
            "success": true,
            "reconciled": false,
            "message": "No gateway refunds found for this payment"
        })));
    };

    let booking = app_state
        .booking_repository
        .record_refund(
            booking.id,
            &refund.id,
            to_major_units(refund.amount),
            refund.status.as_str(),
            Some("Reconciled from gateway refund list"),
            auth.user_id,
        )
        .await?;

    tracing::info!(
        "Reconciled refund {} onto booking {} (payment {})",
        refund.id,
        booking.id,
        payment_id
    );

    Ok(Json(json!({
        "success": true,
        "reconciled": true,
        "refund": format_refund_response(&refund),
        "refund_info": booking.refund_info()
    })))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Payment Service",
    summary = "Health check",
    description = "Check if the payment service is running",
    responses(
        (status = 200, description = "Service is healthy", body = serde_json::Value)
    )
)]
pub async fn health_check(
    State(app_state): State<crate::config::AppState>,
) -> Result<Json<Value>, AppError> {
    let health = app_state.health_check().await;

    Ok(Json(json!({
        "status": health.overall,
        "database": health.database,
        "service": "payment-service",
        "timestamp": Utc::now(),
        "version": app_state.config.app_version,
    })))
}

/// Get service information
#[utoipa::path(
    get,
    path = "/info",
    tag = "Payment Service",
    summary = "Get service information",
    description = "Payment service details and supported features",
    responses(
        (status = 200, description = "Service information retrieved", body = serde_json::Value)
    )
)]
pub async fn get_service_info(
    State(config): State<crate::config::AppConfig>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "service": "payment-service",
        "version": config.app_version,
        "environment": config.environment,
        "gateway": "razorpay",
        "currency": "INR",
        "features": [
            "Payment order creation",
            "HMAC SHA256 signature verification",
            "Full and partial refunds",
            "Refund status lookups",
            "Booking refund reconciliation",
            "Customer refund requests"
        ],
        "timestamp": Utc::now()
    })))
}

// Orchestration: validate, convert to minor units, create the order
// upstream, and convert the echo back to major units for the response.
pub(crate) async fn create_order_upstream(
    gateway: &dyn PaymentGateway,
    request: CreateOrderRequest,
) -> AppResult<Value> {
    // Rejected before any network call
    if request.amount <= 0 {
        return Err(AppError::invalid_amount("Amount must be greater than 0"));
    }

    let currency = request.currency.unwrap_or_else(|| "INR".to_string());
    let receipt = request.receipt.unwrap_or_else(default_receipt);
    let amount_minor = to_minor_units(request.amount);

    let order = gateway
        .create_order(amount_minor, currency, receipt, request.notes)
        .await
        .map_err(|e| match e {
            AppError::GatewayTimeout(_) => e,
            other => AppError::order_creation(other.to_string()),
        })?;

    Ok(json!({
        "success": true,
        "order": {
            "id": order.id,
            "amount": to_major_units(order.amount),
            "currency": order.currency,
            "receipt": order.receipt
        }
    }))
}

// Eligibility check and upstream call together. The caller holds the
// per-payment lock, so a booking already cancelled by an earlier refund is
// rejected here without contacting the gateway.
pub(crate) async fn refund_eligible_booking(
    gateway: &dyn PaymentGateway,
    booking: &Booking,
    payment_id: &str,
    amount: Option<i64>,
    notes: Option<std::collections::HashMap<String, String>>,
) -> AppResult<Refund> {
    if !booking.can_be_refunded() {
        return Err(AppError::validation(
            "Refunds are only available for confirmed bookings",
        ));
    }

    if let Some(amount) = amount {
        if amount > booking.total_amount {
            return Err(AppError::validation(
                "Refund amount cannot exceed the original charge",
            ));
        }
    }

    issue_refund_upstream(gateway, payment_id, amount, notes).await
}

// Orchestration: convert an optional major-unit amount and call the gateway.
// A None amount is passed through as None so the wire payload omits the
// field and the gateway refunds the full captured amount.
pub(crate) async fn issue_refund_upstream(
    gateway: &dyn PaymentGateway,
    payment_id: &str,
    amount: Option<i64>,
    notes: Option<std::collections::HashMap<String, String>>,
) -> AppResult<Refund> {
    let amount_minor = amount.map(to_minor_units);

    gateway
        .refund_payment(payment_id.to_string(), amount_minor, notes)
        .await
}

// Require all three checkout-completion fields; empty counts as missing
fn require_verification_fields(
    request: &VerifyPaymentRequest,
) -> AppResult<(String, String, String)> {
    let order_id = non_empty(request.razorpay_order_id.as_deref());
    let payment_id = non_empty(request.razorpay_payment_id.as_deref());
    let signature = non_empty(request.razorpay_signature.as_deref());

    match (order_id, payment_id, signature) {
        (Some(o), Some(p), Some(s)) => Ok((o, p, s)),
        _ => Err(AppError::missing_verification_data(
            "razorpay_order_id, razorpay_payment_id and razorpay_signature are required",
        )),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn require_payment_id(payment_id: Option<&str>) -> AppResult<String> {
    non_empty(payment_id).ok_or(AppError::MissingPaymentId)
}

fn check_refund_amount(amount: Option<i64>) -> AppResult<()> {
    if let Some(amount) = amount {
        if amount <= 0 {
            return Err(AppError::invalid_amount(
                "Refund amount must be greater than 0",
            ));
        }
    }
    Ok(())
}

// Prefer a refund the gateway considers live; failed refunds never moved money
fn pick_reconcilable_refund(refunds: Vec<Refund>) -> Option<Refund> {
    refunds
        .into_iter()
        .find(|r| r.status != RefundStatus::Failed)
}

// Format a refund for the API (amount back in major units)
fn format_refund_response(refund: &Refund) -> Value {
    json!({
        "id": refund.id,
        "amount": to_major_units(refund.amount),
        "currency": refund.currency,
        "payment_id": refund.payment_id,
        "status": refund.status,
        "created_at": refund.created_at,
        "notes": refund.notes
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentOrder;
    use crate::handlers::razorpay_service::MockPaymentGateway;

    fn order_request(amount: i64) -> CreateOrderRequest {
        CreateOrderRequest {
            amount,
            currency: None,
            receipt: Some("BK001234".to_string()),
            notes: None,
        }
    }

    fn gateway_order(amount_minor: i64, receipt: &str) -> PaymentOrder {
        PaymentOrder {
            id: "order_EKwxwAgItmmXdp".to_string(),
            amount: amount_minor,
            currency: "INR".to_string(),
            receipt: Some(receipt.to_string()),
            status: Some("created".to_string()),
            notes: None,
        }
    }

    fn booking_with_status(status: &str, payment_id: &str) -> Booking {
        Booking {
            id: 1,
            booking_reference: "BK001234".to_string(),
            guest_id: 42,
            hotel_id: 7,
            check_in: chrono::Utc::now(),
            check_out: chrono::Utc::now(),
            total_amount: 1495,
            status: status.to_string(),
            payment_order_id: Some("order_EKwxwAgItmmXdp".to_string()),
            payment_id: Some(payment_id.to_string()),
            refund_id: None,
            refund_amount: None,
            refund_status: None,
            refund_reason: None,
            refunded_at: None,
            refunded_by: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn gateway_refund(amount_minor: i64, status: RefundStatus) -> Refund {
        Refund {
            id: "rfnd_FP8QHiV938haTz".to_string(),
            amount: amount_minor,
            currency: "INR".to_string(),
            payment_id: "pay_29QQoUBi66xm2f".to_string(),
            status,
            created_at: 1597078124,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_order_converts_to_minor_units() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_order()
            .withf(|amount_minor, currency, receipt, _notes| {
                *amount_minor == 149500 && currency == "INR" && receipt == "BK001234"
            })
            .times(1)
            .returning(|amount_minor, _, receipt, _| {
                Ok(gateway_order(amount_minor, &receipt))
            });

        let response = create_order_upstream(&gateway, order_request(1495))
            .await
            .unwrap();

        assert_eq!(response["success"], true);
        // Echoed back in major units
        assert_eq!(response["order"]["amount"], 1495);
        assert_eq!(response["order"]["receipt"], "BK001234");
    }

    #[tokio::test]
    async fn test_create_order_rejects_non_positive_amount_without_calling_gateway() {
        for amount in [0, -1, -1495] {
            let mut gateway = MockPaymentGateway::new();
            gateway.expect_create_order().times(0);

            let result = create_order_upstream(&gateway, order_request(amount)).await;
            assert!(matches!(result.unwrap_err(), AppError::InvalidAmount(_)));
        }
    }

    #[tokio::test]
    async fn test_create_order_defaults_receipt_and_currency() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_order()
            .withf(|_, currency, receipt, _| currency == "INR" && receipt.starts_with("receipt_"))
            .times(1)
            .returning(|amount_minor, _, receipt, _| Ok(gateway_order(amount_minor, &receipt)));

        let request = CreateOrderRequest {
            amount: 500,
            currency: None,
            receipt: None,
            notes: None,
        };
        create_order_upstream(&gateway, request).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_order_wraps_gateway_errors() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_order()
            .times(1)
            .returning(|_, _, _, _| Err(AppError::gateway("SERVER_ERROR", "upstream down")));

        let result = create_order_upstream(&gateway, order_request(1495)).await;
        assert!(matches!(
            result.unwrap_err(),
            AppError::OrderCreationFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_full_refund_omits_amount() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund_payment()
            .withf(|payment_id, amount_minor, _| {
                payment_id == "pay_29QQoUBi66xm2f" && amount_minor.is_none()
            })
            .times(1)
            .returning(|_, _, _| Ok(gateway_refund(149500, RefundStatus::Processed)));

        let refund = issue_refund_upstream(&gateway, "pay_29QQoUBi66xm2f", None, None)
            .await
            .unwrap();
        assert_eq!(refund.status, RefundStatus::Processed);
    }

    #[tokio::test]
    async fn test_partial_refund_converts_amount_to_minor_units() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund_payment()
            .withf(|_, amount_minor, _| *amount_minor == Some(149500))
            .times(1)
            .returning(|_, amount_minor, _| {
                Ok(gateway_refund(amount_minor.unwrap(), RefundStatus::Processed))
            });

        let refund = issue_refund_upstream(&gateway, "pay_29QQoUBi66xm2f", Some(1495), None)
            .await
            .unwrap();

        // Snapshot amount written to the booking is major units again
        assert_eq!(to_major_units(refund.amount), 1495);
    }

    #[tokio::test]
    async fn test_refund_rejected_for_cancelled_booking_without_gateway_call() {
        // A booking cancelled by an earlier refund must be turned away
        // before the gateway sees a second refund for the same payment
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund_payment().times(0);

        let booking = booking_with_status("cancelled", "pay_29QQoUBi66xm2f");
        let result =
            refund_eligible_booking(&gateway, &booking, "pay_29QQoUBi66xm2f", Some(100), None)
                .await;
        assert!(matches!(result.unwrap_err(), AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_refund_rejected_for_pending_booking_without_gateway_call() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund_payment().times(0);

        let booking = booking_with_status("pending", "pay_29QQoUBi66xm2f");
        let result =
            refund_eligible_booking(&gateway, &booking, "pay_29QQoUBi66xm2f", None, None).await;
        assert!(matches!(result.unwrap_err(), AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_refund_exceeding_charge_rejected_without_gateway_call() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund_payment().times(0);

        let booking = booking_with_status("confirmed", "pay_29QQoUBi66xm2f");
        let result =
            refund_eligible_booking(&gateway, &booking, "pay_29QQoUBi66xm2f", Some(2000), None)
                .await;
        assert!(matches!(result.unwrap_err(), AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_refund_for_confirmed_booking_reaches_gateway() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund_payment()
            .withf(|_, amount_minor, _| *amount_minor == Some(149500))
            .times(1)
            .returning(|_, amount_minor, _| {
                Ok(gateway_refund(amount_minor.unwrap(), RefundStatus::Processed))
            });

        let booking = booking_with_status("confirmed", "pay_29QQoUBi66xm2f");
        let refund =
            refund_eligible_booking(&gateway, &booking, "pay_29QQoUBi66xm2f", Some(1495), None)
                .await
                .unwrap();
        assert_eq!(refund.status, RefundStatus::Processed);
    }

    #[tokio::test]
    async fn test_refund_gateway_error_resurfaced_verbatim() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund_payment().times(1).returning(|_, _, _| {
            Err(AppError::gateway(
                "BAD_REQUEST_ERROR",
                "The refund amount exceeds the captured amount",
            ))
        });

        let result = issue_refund_upstream(&gateway, "pay_1", Some(9999), None).await;
        match result.unwrap_err() {
            AppError::GatewayError { code, description } => {
                assert_eq!(code, "BAD_REQUEST_ERROR");
                assert!(description.contains("exceeds"));
            }
            other => panic!("Expected GatewayError, got {:?}", other),
        }
    }

    #[test]
    fn test_require_verification_fields_missing_or_empty() {
        let cases = [
            (None, Some("pay_1"), Some("sig")),
            (Some("order_1"), None, Some("sig")),
            (Some("order_1"), Some("pay_1"), None),
            (Some(""), Some("pay_1"), Some("sig")),
            (Some("order_1"), Some("  "), Some("sig")),
        ];

        for (order_id, payment_id, signature) in cases {
            let request = VerifyPaymentRequest {
                razorpay_order_id: order_id.map(str::to_string),
                razorpay_payment_id: payment_id.map(str::to_string),
                razorpay_signature: signature.map(str::to_string),
                booking_id: None,
            };
            assert!(matches!(
                require_verification_fields(&request).unwrap_err(),
                AppError::MissingVerificationData(_)
            ));
        }
    }

    #[test]
    fn test_require_verification_fields_present() {
        let request = VerifyPaymentRequest {
            razorpay_order_id: Some("order_1".to_string()),
            razorpay_payment_id: Some("pay_1".to_string()),
            razorpay_signature: Some("abc123".to_string()),
            booking_id: Some(1),
        };
        let (order_id, payment_id, signature) = require_verification_fields(&request).unwrap();
        assert_eq!(order_id, "order_1");
        assert_eq!(payment_id, "pay_1");
        assert_eq!(signature, "abc123");
    }

    #[test]
    fn test_require_payment_id() {
        assert!(matches!(
            require_payment_id(None).unwrap_err(),
            AppError::MissingPaymentId
        ));
        assert!(matches!(
            require_payment_id(Some("")).unwrap_err(),
            AppError::MissingPaymentId
        ));
        assert_eq!(require_payment_id(Some("pay_1")).unwrap(), "pay_1");
    }

    #[test]
    fn test_check_refund_amount() {
        assert!(check_refund_amount(None).is_ok());
        assert!(check_refund_amount(Some(1)).is_ok());
        assert!(check_refund_amount(Some(0)).is_err());
        assert!(check_refund_amount(Some(-5)).is_err());
    }

    #[test]
    fn test_pick_reconcilable_refund_skips_failed() {
        let refunds = vec![
            gateway_refund(100, RefundStatus::Failed),
            gateway_refund(149500, RefundStatus::Processed),
        ];
        let picked = pick_reconcilable_refund(refunds).unwrap();
        assert_eq!(picked.amount, 149500);

        assert!(pick_reconcilable_refund(vec![gateway_refund(100, RefundStatus::Failed)]).is_none());
        assert!(pick_reconcilable_refund(vec![]).is_none());
    }

    #[test]
    fn test_format_refund_response_major_units() {
        let refund = gateway_refund(149500, RefundStatus::Processed);
        let value = format_refund_response(&refund);
        assert_eq!(value["amount"], 1495);
        assert_eq!(value["status"], "processed");
        assert_eq!(value["payment_id"], "pay_29QQoUBi66xm2f");
    }
}
