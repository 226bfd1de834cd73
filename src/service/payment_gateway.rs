// service/payment_gateway.rs
//
// Stateless translation layer between the ledger's vocabulary and the
// CinetPay aggregator wire format. Never mutates ledger state.
use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::error::WalletError;
use crate::{config::Config, models::walletmodels::PaymentCurrency};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    MobileMoney,
    CreditCard,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    OrangeMoney,
    MtnMoney,
    MoovMoney,
    Visa,
    Mastercard,
}

impl PaymentProvider {
    /// Provider-imposed bounds on a single payment, in currency units.
    fn amount_bounds(&self) -> (i64, i64) {
        match self {
            PaymentProvider::OrangeMoney => (100, 1_500_000),
            PaymentProvider::MtnMoney => (100, 2_000_000),
            PaymentProvider::MoovMoney => (100, 1_000_000),
            PaymentProvider::Visa | PaymentProvider::Mastercard => (500, 10_000_000),
        }
    }

    pub fn accepts_amount(&self, amount: &BigDecimal) -> bool {
        let (min, max) = self.amount_bounds();
        *amount >= BigDecimal::from(min) && *amount <= BigDecimal::from(max)
    }
}

#[derive(Debug, Clone)]
pub struct PaymentCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenSessionRequest {
    pub transaction_id: String,
    pub amount: BigDecimal,
    pub currency: PaymentCurrency,
    pub description: String,
    pub customer: PaymentCustomer,
    pub channels: Option<String>,
    pub return_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GatewaySession {
    pub external_id: String,
    pub redirect_url: String,
}

/// Tri-state outcome of a status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentProbe {
    Completed,
    Failed(String),
    Pending,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn open(&self, request: OpenSessionRequest) -> Result<GatewaySession, WalletError>;

    async fn check_status(&self, transaction_id: &str) -> Result<PaymentProbe, WalletError>;
}

pub struct CinetPayGateway {
    client: reqwest::Client,
    api_key: String,
    site_id: String,
    base_url: String,
    version: String,
    notify_url: String,
    return_url: String,
    cancel_url: String,
}

impl CinetPayGateway {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gateway_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            api_key: config.cinetpay_api_key.clone(),
            site_id: config.cinetpay_site_id.clone(),
            base_url: config.cinetpay_base_url.clone(),
            version: config.cinetpay_version.clone(),
            notify_url: format!("{}/api/payments/webhook", config.notify_base_url),
            return_url: format!("{}/payment/success", config.return_base_url),
            cancel_url: format!("{}/payment/cancel", config.return_base_url),
        }
    }
}

#[async_trait]
impl PaymentGateway for CinetPayGateway {
    async fn open(&self, request: OpenSessionRequest) -> Result<GatewaySession, WalletError> {
        let payload = serde_json::json!({
            "apikey": self.api_key,
            "site_id": self.site_id,
            "transaction_id": request.transaction_id,
            "amount": request.amount.to_string(),
            "currency": request.currency.as_str(),
            "designation": request.description,
            "customer_name": request.customer.name,
            "customer_email": request.customer.email,
            "customer_phone": request.customer.phone,
            "notify_url": self.notify_url,
            "return_url": request.return_url.as_deref().unwrap_or(&self.return_url),
            "cancel_url": self.cancel_url,
            "channels": request.channels.as_deref().unwrap_or("ALL"),
            "lang": "fr",
        });

        let response = self
            .client
            .post(format!("{}/{}/payment", self.base_url, self.version))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| WalletError::GatewayRejected(format!("unreadable response: {}", e)))?;

        map_create_response(&body)
    }

    async fn check_status(&self, transaction_id: &str) -> Result<PaymentProbe, WalletError> {
        let payload = serde_json::json!({
            "apikey": self.api_key,
            "site_id": self.site_id,
            "transaction_id": transaction_id,
        });

        let response = self
            .client
            .post(format!("{}/{}/payment/check", self.base_url, self.version))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| WalletError::GatewayRejected(format!("unreadable response: {}", e)))?;

        let code = body["code"].as_str().unwrap_or_default();
        let message = body["message"].as_str().unwrap_or_default();
        Ok(map_check_response(code, message))
    }
}

fn map_transport_error(error: reqwest::Error) -> WalletError {
    // The provider may have accepted the request even when the client sees a
    // timeout; callers keep their local state pending for reconciliation.
    WalletError::GatewayUnreachable(error.to_string())
}

fn map_create_response(body: &Value) -> Result<GatewaySession, WalletError> {
    let code = body["code"].as_str().unwrap_or_default();
    if code != "201" {
        let message = body["message"]
            .as_str()
            .unwrap_or("payment initialization failed");
        return Err(WalletError::GatewayRejected(message.to_string()));
    }

    let data = &body["data"];
    let external_id = data["payment_token"].as_str().unwrap_or_default();
    let redirect_url = data["payment_url"].as_str().unwrap_or_default();
    if external_id.is_empty() || redirect_url.is_empty() {
        return Err(WalletError::GatewayRejected(
            "response is missing payment token or url".to_string(),
        ));
    }

    Ok(GatewaySession {
        external_id: external_id.to_string(),
        redirect_url: redirect_url.to_string(),
    })
}

fn map_check_response(code: &str, message: &str) -> PaymentProbe {
    match code {
        "00" => PaymentProbe::Completed,
        "01" => PaymentProbe::Failed(if message.is_empty() {
            "payment failed".to_string()
        } else {
            message.to_string()
        }),
        _ => PaymentProbe::Pending,
    }
}

// ===== Inbound webhook validation =====

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum WebhookStatus {
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "REFUSED")]
    Refused,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

#[derive(Debug, Deserialize)]
pub struct CinetPayWebhookPayload {
    pub cpm_trans_id: String,
    pub cpm_site_id: String,
    pub cpm_amount: String,
    pub cpm_trans_status: WebhookStatus,
    pub cpm_currency: Option<String>,
    pub cpm_error_message: Option<String>,
}

/// A webhook event that passed shape and signature validation.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub transaction_id: String,
    pub amount: BigDecimal,
    pub status: WebhookStatus,
    pub failure_reason: Option<String>,
}

/// Shape-validates the payload and cross-checks the site id. The signature
/// must have been verified before this is trusted.
pub fn parse_webhook(body: &Value, expected_site_id: &str) -> Result<WebhookEvent, WalletError> {
    let payload: CinetPayWebhookPayload = serde_json::from_value(body.clone())
        .map_err(|e| WalletError::InvalidWebhook(format!("malformed payload: {}", e)))?;

    if payload.cpm_site_id != expected_site_id {
        return Err(WalletError::InvalidWebhook("site id mismatch".to_string()));
    }

    let amount = BigDecimal::from_str(&payload.cpm_amount)
        .map_err(|_| WalletError::InvalidWebhook("unparseable amount".to_string()))?;

    Ok(WebhookEvent {
        transaction_id: payload.cpm_trans_id,
        amount,
        status: payload.cpm_trans_status,
        failure_reason: payload.cpm_error_message,
    })
}

/// HMAC-SHA256 over the raw payload, hex-encoded, compared in constant time.
pub fn verify_webhook_signature(payload: &str, signature: &str, secret: &str) -> bool {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());

    ConstantTimeEq::ct_eq(signature.as_bytes(), expected.as_bytes()).into()
}

/// Provider adapters keyed by name, built once at startup and injected.
pub struct GatewayRegistry {
    gateways: HashMap<String, Arc<dyn PaymentGateway>>,
    default_name: String,
}

impl GatewayRegistry {
    pub fn new(config: &Config) -> Self {
        let mut gateways: HashMap<String, Arc<dyn PaymentGateway>> = HashMap::new();
        gateways.insert(
            "cinetpay".to_string(),
            Arc::new(CinetPayGateway::new(config)),
        );

        Self {
            gateways,
            default_name: "cinetpay".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_gateway(name: &str, gateway: Arc<dyn PaymentGateway>) -> Self {
        let mut gateways: HashMap<String, Arc<dyn PaymentGateway>> = HashMap::new();
        gateways.insert(name.to_string(), gateway);
        Self {
            gateways,
            default_name: name.to_string(),
        }
    }

    pub fn get(&self, name: Option<&str>) -> Result<Arc<dyn PaymentGateway>, WalletError> {
        let name = name.unwrap_or(&self.default_name);
        self.gateways
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| WalletError::GatewayRejected(format!("unknown gateway: {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(v: i64) -> BigDecimal {
        BigDecimal::from(v)
    }

    #[test]
    fn provider_amount_bounds() {
        assert!(PaymentProvider::OrangeMoney.accepts_amount(&dec(100)));
        assert!(PaymentProvider::OrangeMoney.accepts_amount(&dec(1_500_000)));
        assert!(!PaymentProvider::OrangeMoney.accepts_amount(&dec(99)));
        assert!(!PaymentProvider::OrangeMoney.accepts_amount(&dec(1_500_001)));

        assert!(!PaymentProvider::Visa.accepts_amount(&dec(100)));
        assert!(PaymentProvider::Visa.accepts_amount(&dec(500)));
        assert!(PaymentProvider::MtnMoney.accepts_amount(&dec(2_000_000)));
        assert!(!PaymentProvider::MoovMoney.accepts_amount(&dec(1_000_001)));
    }

    #[test]
    fn create_response_mapping() {
        let ok = json!({
            "code": "201",
            "message": "CREATED",
            "data": {
                "payment_token": "tok_123",
                "payment_url": "https://checkout.example/pay/tok_123"
            }
        });
        let session = map_create_response(&ok).unwrap();
        assert_eq!(session.external_id, "tok_123");
        assert_eq!(session.redirect_url, "https://checkout.example/pay/tok_123");

        let rejected = json!({ "code": "608", "message": "MINIMUM_REQUIRED_FIELDS" });
        match map_create_response(&rejected) {
            Err(WalletError::GatewayRejected(msg)) => {
                assert_eq!(msg, "MINIMUM_REQUIRED_FIELDS")
            }
            other => panic!("expected GatewayRejected, got {:?}", other),
        }

        let missing_data = json!({ "code": "201", "message": "CREATED", "data": {} });
        assert!(matches!(
            map_create_response(&missing_data),
            Err(WalletError::GatewayRejected(_))
        ));
    }

    #[test]
    fn check_response_mapping_is_tri_state() {
        assert_eq!(map_check_response("00", "SUCCES"), PaymentProbe::Completed);
        assert_eq!(
            map_check_response("01", "INSUFFICIENT_BALANCE"),
            PaymentProbe::Failed("INSUFFICIENT_BALANCE".to_string())
        );
        assert_eq!(map_check_response("627", "WAITING"), PaymentProbe::Pending);
        assert_eq!(map_check_response("", ""), PaymentProbe::Pending);
    }

    #[test]
    fn webhook_parsing_validates_shape_and_site() {
        let body = json!({
            "cpm_trans_id": "WRT_1722470400000_ab12cd34",
            "cpm_site_id": "site_1",
            "cpm_amount": "5000",
            "cpm_trans_status": "ACCEPTED",
            "cpm_currency": "XOF"
        });

        let event = parse_webhook(&body, "site_1").unwrap();
        assert_eq!(event.transaction_id, "WRT_1722470400000_ab12cd34");
        assert_eq!(event.amount, dec(5000));
        assert_eq!(event.status, WebhookStatus::Accepted);

        assert!(matches!(
            parse_webhook(&body, "other_site"),
            Err(WalletError::InvalidWebhook(_))
        ));

        let malformed = json!({ "cpm_trans_id": "x" });
        assert!(matches!(
            parse_webhook(&malformed, "site_1"),
            Err(WalletError::InvalidWebhook(_))
        ));

        let bad_status = json!({
            "cpm_trans_id": "x",
            "cpm_site_id": "site_1",
            "cpm_amount": "100",
            "cpm_trans_status": "UNKNOWN"
        });
        assert!(matches!(
            parse_webhook(&bad_status, "site_1"),
            Err(WalletError::InvalidWebhook(_))
        ));
    }

    #[test]
    fn webhook_refusal_carries_provider_reason() {
        let body = json!({
            "cpm_trans_id": "WRT_1722470400000_ab12cd34",
            "cpm_site_id": "site_1",
            "cpm_amount": "5000",
            "cpm_trans_status": "REFUSED",
            "cpm_error_message": "Transaction refused by operator"
        });

        let event = parse_webhook(&body, "site_1").unwrap();
        assert_eq!(event.status, WebhookStatus::Refused);
        assert_eq!(
            event.failure_reason.as_deref(),
            Some("Transaction refused by operator")
        );
    }

    #[test]
    fn signature_verification_round_trip() {
        let payload = r#"{"cpm_trans_id":"abc"}"#;
        let secret = "whsec_test";

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_webhook_signature(payload, &signature, secret));
        assert!(!verify_webhook_signature(payload, &signature, "wrong_secret"));
        assert!(!verify_webhook_signature(payload, "deadbeef", secret));
    }

    #[test]
    fn registry_resolves_default_and_is_case_insensitive() {
        struct NullGateway;
        #[async_trait]
        impl PaymentGateway for NullGateway {
            async fn open(&self, _r: OpenSessionRequest) -> Result<GatewaySession, WalletError> {
                unreachable!()
            }
            async fn check_status(&self, _t: &str) -> Result<PaymentProbe, WalletError> {
                unreachable!()
            }
        }

        let registry = GatewayRegistry::with_gateway("cinetpay", Arc::new(NullGateway));
        assert!(registry.get(None).is_ok());
        assert!(registry.get(Some("CinetPay")).is_ok());
        assert!(matches!(
            registry.get(Some("paydunya")),
            Err(WalletError::GatewayRejected(_))
        ));
    }
}
