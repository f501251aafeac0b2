use crate::domain::booking::Booking;
use crate::domain::refund_request::{RefundRequest, RefundRequestStatus, SubmitRefundRequest};
use crate::error::AppError;
use sqlx::PgPool;

// Repository for customer refund-request tickets
#[derive(Clone)]
pub struct RefundRequestRepository {
    pool: PgPool,
}

impl RefundRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Latest non-terminal request for a booking, if any
    pub async fn find_active_by_booking_id(
        &self,
        booking_id: i32,
    ) -> Result<Option<RefundRequest>, AppError> {
        let request = sqlx::query_as(
            "SELECT * FROM refund_requests
             WHERE booking_id = $1 AND status IN ($2, $3)
             ORDER BY requested_at DESC
             LIMIT 1",
        )
        .bind(booking_id)
        .bind(RefundRequestStatus::Pending.as_str())
        .bind(RefundRequestStatus::Approved.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    // Insert a new request unless an active one already exists. Uniqueness
    // is enforced by a partial unique index on (booking_id) over active
    // statuses, so two concurrent submissions cannot both insert; the loser
    // gets None and the caller returns the surviving request instead.
    pub async fn create_if_absent(
        &self,
        booking: &Booking,
        payload: &SubmitRefundRequest,
        requested_by: i32,
    ) -> Result<Option<RefundRequest>, AppError> {
        let request = sqlx::query_as(
            "INSERT INTO refund_requests (
                booking_id, booking_reference, total_amount,
                reason, description, contact_phone,
                preferred_refund_method, status, requested_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (booking_id) WHERE status IN ('pending', 'approved')
            DO NOTHING
            RETURNING *",
        )
        .bind(booking.id)
        .bind(&booking.booking_reference)
        .bind(booking.total_amount)
        .bind(payload.reason.as_str())
        .bind(&payload.description)
        .bind(&payload.contact_phone)
        .bind(payload.preferred_refund_method.as_str())
        .bind(RefundRequestStatus::Pending.as_str())
        .bind(requested_by)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }
}
