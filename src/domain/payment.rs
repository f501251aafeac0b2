use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

// Razorpay deals in minor currency units (paise); the API boundary of this
// service deals in major units (rupees). 1 rupee = 100 paise.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Convert a major-unit amount to gateway minor units
pub fn to_minor_units(amount: i64) -> i64 {
    amount * MINOR_UNITS_PER_MAJOR
}

/// Convert a gateway minor-unit amount back to major units
pub fn to_major_units(amount: i64) -> i64 {
    amount / MINOR_UNITS_PER_MAJOR
}

// Fallback receipt when the caller does not supply one. Millisecond
// granularity, so this is a reference string, not a strong idempotency key.
pub fn default_receipt() -> String {
    format!("receipt_{}", Utc::now().timestamp_millis())
}

// Request to create a payment order (amount in major units)
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[schema(example = 1495)]
    pub amount: i64,
    #[schema(example = "INR")]
    pub currency: Option<String>,
    #[schema(example = "BK001234")]
    pub receipt: Option<String>,
    pub notes: Option<HashMap<String, String>>,
}

// Gateway-side payment order, as returned by Razorpay (amount in minor units)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    // Razorpay serializes empty notes as an array, so keep this loose
    #[serde(default)]
    pub notes: Option<serde_json::Value>,
}

// Checkout completion triple reported by the client. Fields are optional so
// a missing field surfaces as MissingVerificationData instead of a 422.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
    // When present, the booking is confirmed after a successful verification
    pub booking_id: Option<i32>,
}

// Gateway-side refund record (amount in minor units)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Refund {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub payment_id: String,
    pub status: RefundStatus,
    pub created_at: i64,
    #[serde(default)]
    pub notes: Option<serde_json::Value>,
}

// Refund lifecycle states reported by Razorpay
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Created,
    Processed,
    Pending,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RefundStatus::Created => "created",
            RefundStatus::Processed => "processed",
            RefundStatus::Pending => "pending",
            RefundStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Request to issue a refund (amount in major units; None = full refund)
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueRefundRequest {
    pub payment_id: Option<String>,
    #[schema(example = 1495)]
    pub amount: Option<i64>,
    #[schema(example = "Booking cancellation")]
    pub reason: Option<String>,
    pub notes: Option<HashMap<String, String>>,
}

// Query parameters for refund lookups
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefundQuery {
    pub refund_id: Option<String>,
    pub payment_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_unit_conversion_round_trip() {
        assert_eq!(to_minor_units(1495), 149500);
        assert_eq!(to_major_units(149500), 1495);
        for amount in [1, 99, 100, 1495, 1_000_000] {
            assert_eq!(to_major_units(to_minor_units(amount)), amount);
        }
    }

    #[test]
    fn test_default_receipt_format() {
        let receipt = default_receipt();
        assert!(receipt.starts_with("receipt_"));
        let millis: i64 = receipt["receipt_".len()..].parse().unwrap();
        assert!(millis > 0);
    }

    #[test]
    fn test_refund_status_serde_names() {
        let status: RefundStatus = serde_json::from_str("\"processed\"").unwrap();
        assert_eq!(status, RefundStatus::Processed);
        assert_eq!(serde_json::to_string(&RefundStatus::Failed).unwrap(), "\"failed\"");
    }

    #[test]
    fn test_refund_deserializes_razorpay_shape() {
        let body = r#"{
            "id": "rfnd_FP8QHiV938haTz",
            "amount": 149500,
            "currency": "INR",
            "payment_id": "pay_29QQoUBi66xm2f",
            "status": "processed",
            "created_at": 1597078124,
            "notes": []
        }"#;
        let refund: Refund = serde_json::from_str(body).unwrap();
        assert_eq!(refund.amount, 149500);
        assert_eq!(refund.status, RefundStatus::Processed);
        assert_eq!(to_major_units(refund.amount), 1495);
    }
}
