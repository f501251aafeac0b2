use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Booking record from the database. Owned by the booking service; this
// service only touches the payment and refund columns.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: i32,
    pub booking_reference: String,
    pub guest_id: i32,
    pub hotel_id: i32,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    // Major currency units (rupees)
    pub total_amount: i64,
    pub status: String,

    // Payment linkage, set once the signature verifies
    pub payment_order_id: Option<String>,
    pub payment_id: Option<String>,

    // Denormalized refund snapshot, set at most once per cancellation
    pub refund_id: Option<String>,
    pub refund_amount: Option<i64>,
    pub refund_status: Option<String>,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refunded_by: Option<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Booking payment states this service transitions between
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Refund snapshot as exposed on the booking API
#[derive(Debug, Serialize, ToSchema)]
pub struct RefundInfo {
    pub refund_id: String,
    // Major units
    pub refund_amount: i64,
    pub refund_status: String,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refunded_by: Option<i32>,
}

impl Booking {
    pub fn has_refund(&self) -> bool {
        self.refund_id.is_some()
    }

    // A booking is refundable only after payment capture was verified
    pub fn can_be_refunded(&self) -> bool {
        self.status == BookingStatus::Confirmed.as_str() && self.payment_id.is_some()
    }

    pub fn refund_info(&self) -> Option<RefundInfo> {
        let refund_id = self.refund_id.clone()?;
        Some(RefundInfo {
            refund_id,
            refund_amount: self.refund_amount.unwrap_or(0),
            refund_status: self
                .refund_status
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            refund_reason: self.refund_reason.clone(),
            refunded_at: self.refunded_at,
            refunded_by: self.refunded_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_booking(status: BookingStatus, payment_id: Option<&str>) -> Booking {
        Booking {
            id: 1,
            booking_reference: "BK001234".to_string(),
            guest_id: 42,
            hotel_id: 7,
            check_in: Utc::now(),
            check_out: Utc::now(),
            total_amount: 1495,
            status: status.as_str().to_string(),
            payment_order_id: None,
            payment_id: payment_id.map(|s| s.to_string()),
            refund_id: None,
            refund_amount: None,
            refund_status: None,
            refund_reason: None,
            refunded_at: None,
            refunded_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::from_str("checked_in"), None);
    }

    #[test]
    fn test_refund_eligibility() {
        assert!(sample_booking(BookingStatus::Confirmed, Some("pay_1")).can_be_refunded());
        assert!(!sample_booking(BookingStatus::Pending, Some("pay_1")).can_be_refunded());
        assert!(!sample_booking(BookingStatus::Confirmed, None).can_be_refunded());
        assert!(!sample_booking(BookingStatus::Cancelled, Some("pay_1")).can_be_refunded());
    }

    #[test]
    fn test_refund_info_absent_without_refund() {
        let booking = sample_booking(BookingStatus::Confirmed, Some("pay_1"));
        assert!(booking.refund_info().is_none());
        assert!(!booking.has_refund());
    }
}
