use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Customer-filed refund request ticket. Holds no authority to move money;
// an admin later converts an approved request into an actual gateway refund.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefundRequest {
    pub id: i32,
    pub booking_id: i32,
    pub booking_reference: String,
    // Major units, copied from the booking at submission time
    pub total_amount: i64,
    pub reason: String,
    pub description: Option<String>,
    pub contact_phone: String,
    pub preferred_refund_method: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub requested_by: i32,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Canned cancellation reasons offered on the refund form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    ChangeOfPlans,
    BookingMistake,
    PriceIssue,
    ServiceIssue,
    Other,
}

impl RefundReason {
    pub fn as_str(&self) -> &str {
        match self {
            RefundReason::ChangeOfPlans => "change_of_plans",
            RefundReason::BookingMistake => "booking_mistake",
            RefundReason::PriceIssue => "price_issue",
            RefundReason::ServiceIssue => "service_issue",
            RefundReason::Other => "other",
        }
    }
}

// How the customer prefers to receive the money
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    OriginalPayment,
    BankTransfer,
    UpiTransfer,
}

impl RefundMethod {
    pub fn as_str(&self) -> &str {
        match self {
            RefundMethod::OriginalPayment => "original_payment",
            RefundMethod::BankTransfer => "bank_transfer",
            RefundMethod::UpiTransfer => "upi_transfer",
        }
    }
}

// Request lifecycle; only pending/approved count as active for uniqueness
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RefundRequestStatus {
    Pending,
    Approved,
    Rejected,
    Processed,
}

impl RefundRequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RefundRequestStatus::Pending => "pending",
            RefundRequestStatus::Approved => "approved",
            RefundRequestStatus::Rejected => "rejected",
            RefundRequestStatus::Processed => "processed",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RefundRequestStatus::Pending | RefundRequestStatus::Approved
        )
    }
}

// Intake payload from the customer-facing refund form
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRefundRequest {
    #[schema(example = 1)]
    pub booking_id: i32,
    pub reason: RefundReason,
    #[schema(example = "Trip cancelled due to a family emergency")]
    pub description: Option<String>,
    #[schema(example = "+919876543210")]
    pub contact_phone: String,
    pub preferred_refund_method: RefundMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_deserializes_snake_case() {
        let reason: RefundReason = serde_json::from_str("\"change_of_plans\"").unwrap();
        assert_eq!(reason, RefundReason::ChangeOfPlans);
        assert_eq!(reason.as_str(), "change_of_plans");
    }

    #[test]
    fn test_active_statuses() {
        assert!(RefundRequestStatus::Pending.is_active());
        assert!(RefundRequestStatus::Approved.is_active());
        assert!(!RefundRequestStatus::Rejected.is_active());
        assert!(!RefundRequestStatus::Processed.is_active());
    }
}
