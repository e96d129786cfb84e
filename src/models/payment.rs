use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::models::order::OrderLineRequest;
use crate::models::user::DeliveryInfo;
use crate::models::ApiError;

/// Mobile money operators supported by MeSomb in Cameroon.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MobileOperator {
    #[serde(rename = "MTN")]
    Mtn,
    #[serde(rename = "ORANGE")]
    Orange,
}

impl std::fmt::Display for MobileOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MobileOperator::Mtn => write!(f, "MTN"),
            MobileOperator::Orange => write!(f, "ORANGE"),
        }
    }
}

/// Body of `POST /api/v1.1/payment/collect/`.
#[derive(Debug, Serialize, Clone)]
pub struct CollectRequest {
    pub amount: f64,
    pub service: MobileOperator,
    pub payer: String,
    pub country: String,
    pub currency: String,
    pub fees: bool,
    pub conversion: bool,
    #[serde(rename = "trxID", skip_serializing_if = "Option::is_none")]
    pub trx_id: Option<String>,
}

impl CollectRequest {
    pub fn new(amount: f64, service: MobileOperator, payer: String) -> Self {
        Self {
            amount,
            service,
            payer,
            country: "CM".to_string(),
            currency: "XAF".to_string(),
            fees: true,
            conversion: false,
            trx_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MesombTransaction {
    pub pk: String,
    pub status: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub fees: f64,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CollectResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub transaction: Option<MesombTransaction>,
}

impl CollectResponse {
    pub fn is_successful(&self) -> bool {
        self.success && self.status.as_deref().map_or(true, |s| s.eq_ignore_ascii_case("SUCCESS"))
    }
}

/// Error body returned by MeSomb with a 4xx status.
#[derive(Debug, Deserialize)]
pub struct MesombErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MesombPayRequest {
    pub phone: String,
    pub service: MobileOperator,
    pub items: Vec<OrderLineRequest>,
    pub address: DeliveryInfo,
    pub shipping_country: String,
    pub shipping_method: String,
}

#[derive(Error, Debug)]
pub enum MesombError {
    #[error("MeSomb credentials are not configured")]
    NotConfigured,

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("Insufficient balance on the mobile money account")]
    InsufficientBalance,

    #[error("Payment request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Payment service unavailable (HTTP {0})")]
    ServiceUnavailable(u16),

    #[error("Payment failed: {0}")]
    Rejected(String),

    #[error("Unexpected response from payment service: {0}")]
    InvalidResponse(String),
}

impl MesombError {
    /// Errors worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, MesombError::Timeout | MesombError::Network(_) | MesombError::ServiceUnavailable(_))
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            MesombError::NotConfigured => "configuration",
            MesombError::InvalidPhone(_) => "invalid_phone",
            MesombError::InsufficientBalance => "insufficient_balance",
            MesombError::Timeout => "timeout",
            MesombError::Network(_) | MesombError::ServiceUnavailable(_) => "service_unavailable",
            MesombError::Rejected(_) | MesombError::InvalidResponse(_) => "payment_failed",
        }
    }

    /// Classifies a MeSomb 4xx error body.
    pub fn from_error_body(body: &MesombErrorBody) -> Self {
        let code = body.code.as_deref().unwrap_or("").to_lowercase();
        let detail = body.detail.clone().unwrap_or_else(|| "Payment was declined".to_string());
        if code.contains("insufficient") || detail.to_lowercase().contains("insufficient") {
            MesombError::InsufficientBalance
        } else if code.contains("phone") || code.contains("subscriber-not-found") {
            MesombError::InvalidPhone(detail)
        } else if code.contains("timeout") {
            MesombError::Timeout
        } else {
            MesombError::Rejected(detail)
        }
    }
}

impl From<MesombError> for ApiError {
    fn from(err: MesombError) -> Self {
        match err {
            MesombError::NotConfigured => ApiError::InternalError(err.to_string()),
            _ => ApiError::PaymentError {
                error_type: err.error_type().to_string(),
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_classification() {
        let body = MesombErrorBody {
            detail: Some("Subscriber has insufficient balance".into()),
            code: Some("subscriber-insufficient-balance".into()),
        };
        assert!(matches!(MesombError::from_error_body(&body), MesombError::InsufficientBalance));

        let body = MesombErrorBody { detail: Some("Unknown subscriber".into()), code: Some("subscriber-not-found".into()) };
        let err = MesombError::from_error_body(&body);
        assert_eq!(err.error_type(), "invalid_phone");
        assert!(!err.is_transient());

        let body = MesombErrorBody { detail: None, code: None };
        assert_eq!(MesombError::from_error_body(&body).error_type(), "payment_failed");
    }

    #[test]
    fn test_transient_errors() {
        assert!(MesombError::Timeout.is_transient());
        assert!(MesombError::ServiceUnavailable(503).is_transient());
        assert!(!MesombError::InsufficientBalance.is_transient());
    }

    #[test]
    fn test_collect_request_wire_names() {
        let mut req = CollectRequest::new(10000.0, MobileOperator::Orange, "690000000".into());
        req.trx_id = Some("ORD-1".into());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["service"], "ORANGE");
        assert_eq!(json["trxID"], "ORD-1");
        assert_eq!(json["currency"], "XAF");
        assert_eq!(json["country"], "CM");
    }

    #[test]
    fn test_collect_response_status() {
        let resp: CollectResponse = serde_json::from_value(serde_json::json!({
            "success": true,
            "status": "SUCCESS",
            "reference": "REF1",
            "transaction": { "pk": "trx-1", "status": "SUCCESS", "amount": 100.0 }
        })).unwrap();
        assert!(resp.is_successful());

        let pending: CollectResponse = serde_json::from_value(serde_json::json!({
            "success": true,
            "status": "PENDING"
        })).unwrap();
        assert!(!pending.is_successful());
    }
}
