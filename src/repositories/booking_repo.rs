use crate::domain::booking::{Booking, BookingStatus};
use crate::error::AppError;
use sqlx::PgPool;

// Repository for the payment/refund columns of booking records
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    pub async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as("SELECT * FROM bookings WHERE payment_id = $1")
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    // Transition pending -> confirmed after a verified payment signature.
    // The status predicate makes a concurrent double-confirm fail loudly
    // instead of silently overwriting.
    pub async fn confirm_payment(
        &self,
        booking_id: i32,
        order_id: &str,
        payment_id: &str,
    ) -> Result<Booking, AppError> {
        let booking: Option<Booking> = sqlx::query_as(
            "UPDATE bookings
             SET status = $1,
                 payment_order_id = $2,
                 payment_id = $3,
                 updated_at = NOW()
             WHERE id = $4 AND status = $5
             RETURNING *",
        )
        .bind(BookingStatus::Confirmed.as_str())
        .bind(order_id)
        .bind(payment_id)
        .bind(booking_id)
        .bind(BookingStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;

        booking.ok_or_else(|| {
            AppError::validation("Booking is not awaiting payment confirmation")
        })
    }

    // Transition confirmed -> cancelled and record the refund snapshot.
    // Conditional on the current status and an absent refund so a racing
    // second cancellation cannot clobber the first one's snapshot.
    pub async fn record_refund(
        &self,
        booking_id: i32,
        refund_id: &str,
        refund_amount: i64,
        refund_status: &str,
        refund_reason: Option<&str>,
        refunded_by: i32,
    ) -> Result<Booking, AppError> {
        let booking: Option<Booking> = sqlx::query_as(
            "UPDATE bookings
             SET status = $1,
                 refund_id = $2,
                 refund_amount = $3,
                 refund_status = $4,
                 refund_reason = $5,
                 refunded_at = NOW(),
                 refunded_by = $6,
                 updated_at = NOW()
             WHERE id = $7 AND status = $8 AND refund_id IS NULL
             RETURNING *",
        )
        .bind(BookingStatus::Cancelled.as_str())
        .bind(refund_id)
        .bind(refund_amount)
        .bind(refund_status)
        .bind(refund_reason)
        .bind(refunded_by)
        .bind(booking_id)
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_optional(&self.pool)
        .await?;

        booking.ok_or_else(|| {
            AppError::validation(
                "Booking already cancelled or refunded by a concurrent operation",
            )
        })
    }
}
