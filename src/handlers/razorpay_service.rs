use crate::domain::payment::{PaymentOrder, Refund};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

// Gateway seam. Handlers depend on this trait instead of a concrete SDK
// client so tests can swap in a double.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment order upstream. Amount is in minor units.
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: String,
        receipt: String,
        notes: Option<HashMap<String, String>>,
    ) -> AppResult<PaymentOrder>;

    /// Issue a refund against a captured payment. A `None` amount refunds
    /// the full captured amount (the amount field is omitted on the wire).
    async fn refund_payment(
        &self,
        payment_id: String,
        amount_minor: Option<i64>,
        notes: Option<HashMap<String, String>>,
    ) -> AppResult<Refund>;

    /// Look up a single refund by its gateway id
    async fn fetch_refund(&self, refund_id: String) -> AppResult<Refund>;

    /// List all refunds issued against a payment
    async fn fetch_refunds_for_payment(&self, payment_id: String) -> AppResult<Vec<Refund>>;

    /// Verify the checkout-completion signature reported by the client
    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

// Razorpay REST integration
pub struct RazorpayService {
    client: Client,
    key_id: String,
    key_secret: String,
    api_url: String,
}

impl RazorpayService {
    pub fn new(key_id: String, key_secret: String, api_url: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            key_id,
            key_secret,
            api_url,
        }
    }

    // Order payload in Razorpay wire format (minor units)
    fn build_order_payload(
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        notes: Option<&HashMap<String, String>>,
    ) -> Value {
        let mut payload = json!({
            "amount": amount_minor,
            "currency": currency,
            "receipt": receipt,
        });

        if let Some(notes) = notes {
            payload["notes"] = json!(notes);
        }

        payload
    }

    // Refund payload; omitting the amount field asks the gateway to refund
    // the full captured amount
    fn build_refund_payload(
        amount_minor: Option<i64>,
        notes: Option<&HashMap<String, String>>,
    ) -> Value {
        let mut payload = json!({});

        if let Some(amount) = amount_minor {
            payload["amount"] = json!(amount);
        }

        if let Some(notes) = notes {
            payload["notes"] = json!(notes);
        }

        payload
    }

    // Compute hex(HMAC-SHA256(secret, "<order_id>|<payment_id>"))
    fn compute_signature(&self, order_id: &str, payment_id: &str) -> String {
        let message = format!("{}|{}", order_id, payment_id);

        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());

        hex::encode(mac.finalize().into_bytes())
    }

    // Constant-time equality over the hex strings
    fn signatures_match(expected: &str, provided: &str) -> bool {
        if expected.len() != provided.len() {
            return false;
        }

        expected
            .as_bytes()
            .iter()
            .zip(provided.as_bytes().iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    async fn post_json<T>(&self, endpoint: &str, payload: &Value) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(format!("{}{}", self.api_url, endpoint))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn get_json<T>(&self, endpoint: &str) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .get(format!("{}{}", self.api_url, endpoint))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header("Accept", "application/json")
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn parse_response<T>(response: reqwest::Response) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Self::parse_gateway_error(&body));
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::internal(format!("Failed to parse Razorpay response: {}", e)))
    }

    // Razorpay reports errors as {"error": {"code": ..., "description": ...}}.
    // Keep the upstream code/description intact for the caller.
    fn parse_gateway_error(body: &str) -> AppError {
        match serde_json::from_str::<RazorpayErrorEnvelope>(body) {
            Ok(envelope) => AppError::gateway(envelope.error.code, envelope.error.description),
            Err(_) => AppError::gateway("GATEWAY_ERROR", body.to_string()),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayService {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: String,
        receipt: String,
        notes: Option<HashMap<String, String>>,
    ) -> AppResult<PaymentOrder> {
        let payload = Self::build_order_payload(amount_minor, &currency, &receipt, notes.as_ref());

        tracing::info!(
            "Creating Razorpay order: {} {} (receipt: {})",
            amount_minor,
            currency,
            receipt
        );

        let order: PaymentOrder = self.post_json("/orders", &payload).await?;

        tracing::info!("Razorpay order created: {}", order.id);
        Ok(order)
    }

    async fn refund_payment(
        &self,
        payment_id: String,
        amount_minor: Option<i64>,
        notes: Option<HashMap<String, String>>,
    ) -> AppResult<Refund> {
        let payload = Self::build_refund_payload(amount_minor, notes.as_ref());

        tracing::info!(
            "Issuing Razorpay refund: payment_id={}, amount_minor={:?}",
            payment_id,
            amount_minor
        );

        let refund: Refund = self
            .post_json(&format!("/payments/{}/refund", payment_id), &payload)
            .await?;

        tracing::info!(
            "Razorpay refund issued: {} ({})",
            refund.id,
            refund.status
        );
        Ok(refund)
    }

    async fn fetch_refund(&self, refund_id: String) -> AppResult<Refund> {
        self.get_json(&format!("/refunds/{}", refund_id))
            .await
            .map_err(|e| match e {
                AppError::GatewayError { .. } | AppError::GatewayTimeout(_) => e,
                other => AppError::refund_fetch(other.to_string()),
            })
    }

    async fn fetch_refunds_for_payment(&self, payment_id: String) -> AppResult<Vec<Refund>> {
        let collection: RazorpayCollection<Refund> = self
            .get_json(&format!("/payments/{}/refunds", payment_id))
            .await
            .map_err(|e| match e {
                AppError::GatewayError { .. } | AppError::GatewayTimeout(_) => e,
                other => AppError::refund_fetch(other.to_string()),
            })?;

        Ok(collection.items)
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let expected = self.compute_signature(order_id, payment_id);
        Self::signatures_match(&expected, signature.trim())
    }
}

// Razorpay error envelope
#[derive(Debug, Deserialize)]
struct RazorpayErrorEnvelope {
    error: RazorpayErrorBody,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    code: String,
    description: String,
}

// List responses come wrapped as {"entity": "collection", "count": n, "items": [...]}
#[derive(Debug, Deserialize)]
struct RazorpayCollection<T> {
    #[allow(dead_code)]
    count: i64,
    items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> RazorpayService {
        RazorpayService::new(
            "rzp_test_key".to_string(),
            "test_secret".to_string(),
            "https://api.razorpay.com/v1".to_string(),
        )
    }

    #[test]
    fn test_signature_is_deterministic() {
        let service = create_test_service();
        let first = service.compute_signature("order_1", "pay_1");
        let second = service.compute_signature("order_1", "pay_1");
        assert_eq!(first, second);
        assert!(service.verify_payment_signature("order_1", "pay_1", &first));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let service = create_test_service();
        let valid = service.compute_signature("order_1", "pay_1");

        // Flip one character of the signature
        let mut tampered = valid.clone().into_bytes();
        tampered[0] = if tampered[0] == b'a' { b'b' } else { b'a' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(!service.verify_payment_signature("order_1", "pay_1", &tampered));

        // Or of either id
        assert!(!service.verify_payment_signature("order_2", "pay_1", &valid));
        assert!(!service.verify_payment_signature("order_1", "pay_2", &valid));
    }

    #[test]
    fn test_signature_rejects_arbitrary_string() {
        let service = create_test_service();
        assert!(!service.verify_payment_signature("order_1", "pay_1", "tampered"));
        assert!(!service.verify_payment_signature("order_1", "pay_1", ""));
    }

    #[test]
    fn test_different_secret_produces_different_signature() {
        let service = create_test_service();
        let other = RazorpayService::new(
            "rzp_test_key".to_string(),
            "other_secret".to_string(),
            "https://api.razorpay.com/v1".to_string(),
        );
        assert_ne!(
            service.compute_signature("order_1", "pay_1"),
            other.compute_signature("order_1", "pay_1")
        );
    }

    #[test]
    fn test_signatures_match_length_mismatch() {
        assert!(!RazorpayService::signatures_match("abcd", "abc"));
        assert!(RazorpayService::signatures_match("abcd", "abcd"));
        assert!(!RazorpayService::signatures_match("abcd", "abce"));
    }

    #[test]
    fn test_refund_payload_omits_amount_for_full_refund() {
        let payload = RazorpayService::build_refund_payload(None, None);
        assert!(payload.get("amount").is_none());

        let payload = RazorpayService::build_refund_payload(Some(149500), None);
        assert_eq!(payload["amount"], 149500);
    }

    #[test]
    fn test_order_payload_shape() {
        let mut notes = HashMap::new();
        notes.insert("booking_reference".to_string(), "BK001234".to_string());

        let payload =
            RazorpayService::build_order_payload(149500, "INR", "BK001234", Some(&notes));
        assert_eq!(payload["amount"], 149500);
        assert_eq!(payload["currency"], "INR");
        assert_eq!(payload["receipt"], "BK001234");
        assert_eq!(payload["notes"]["booking_reference"], "BK001234");
    }

    #[test]
    fn test_gateway_error_envelope_parsing() {
        let body = r#"{"error": {"code": "BAD_REQUEST_ERROR", "description": "The refund amount exceeds the captured amount"}}"#;
        let err = RazorpayService::parse_gateway_error(body);
        match err {
            AppError::GatewayError { code, description } => {
                assert_eq!(code, "BAD_REQUEST_ERROR");
                assert!(description.contains("exceeds"));
            }
            other => panic!("Expected GatewayError, got {:?}", other),
        }
    }

    #[test]
    fn test_gateway_error_fallback_on_unparseable_body() {
        let err = RazorpayService::parse_gateway_error("<html>502</html>");
        match err {
            AppError::GatewayError { code, .. } => assert_eq!(code, "GATEWAY_ERROR"),
            other => panic!("Expected GatewayError, got {:?}", other),
        }
    }
}
