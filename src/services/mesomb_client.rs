use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::{info, warn, error};
use reqwest::{Client, StatusCode, Url};
use sha1::{Digest, Sha1};

use crate::config::MesombConfig;
use crate::models::payment::{CollectRequest, CollectResponse, MesombErrorBody, MesombTransaction};
use crate::models::MesombError;

const SIGNATURE_ALGORITHM: &str = "HMAC-SHA1";
const PAYMENT_SERVICE: &str = "payment";
const API_VERSION: &str = "v1.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or runs out of attempts.
/// Waits `base_delay * attempt` between attempts.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, MesombError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, MesombError>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                let delay = policy.base_delay * attempt;
                warn!("MeSomb attempt {} failed ({}), retrying in {:?}", attempt, e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Normalizes a Cameroonian mobile number to its 9-digit local form.
pub fn normalize_phone(input: &str) -> Result<String, MesombError> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '+')
        .collect();
    let local = if digits.len() == 12 && digits.starts_with("237") {
        &digits[3..]
    } else {
        digits.as_str()
    };
    if local.len() != 9 || !local.starts_with('6') || !local.chars().all(|c| c.is_ascii_digit()) {
        return Err(MesombError::InvalidPhone(input.to_string()));
    }
    Ok(local.to_string())
}

fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Builds the `Authorization` header value for a MeSomb API request.
pub fn sign_request(
    method: &str,
    url: &Url,
    date: DateTime<Utc>,
    nonce: &str,
    access_key: &str,
    secret_key: &str,
    content_type: Option<&str>,
    body: Option<&str>,
) -> Result<String, MesombError> {
    let timestamp = date.timestamp().to_string();
    let host = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str().unwrap_or_default(), port),
        None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default()),
    };

    let mut headers = BTreeMap::new();
    if let Some(content_type) = content_type {
        headers.insert("content-type", content_type.to_string());
    }
    headers.insert("host", host);
    headers.insert("x-mesomb-date", timestamp.clone());
    headers.insert("x-mesomb-nonce", nonce.to_string());

    let canonical_headers = headers
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join("\n");
    let signed_headers = headers.keys().copied().collect::<Vec<_>>().join(";");
    let payload_hash = sha1_hex(body.unwrap_or("{}").as_bytes());

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        url.path(),
        url.query().unwrap_or(""),
        canonical_headers,
        signed_headers,
        payload_hash
    );
    let scope = format!("{}/{}/mesomb_request", date.format("%Y%m%d"), PAYMENT_SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        SIGNATURE_ALGORITHM,
        timestamp,
        scope,
        sha1_hex(canonical_request.as_bytes())
    );

    let mut mac = HmacSha1::new_from_slice(secret_key.as_bytes())
        .map_err(|e| MesombError::InvalidResponse(format!("Invalid secret key: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        SIGNATURE_ALGORITHM, access_key, scope, signed_headers, signature
    ))
}

/// Client for the MeSomb mobile money gateway
#[derive(Clone)]
pub struct MesombClient {
    config: MesombConfig,
    client: Client,
    retry: RetryPolicy,
}

impl MesombClient {
    pub fn new(config: MesombConfig) -> Result<Self, MesombError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MesombError::Network(e.to_string()))?;
        info!("MeSomb client using {}", config.base_url);
        Ok(Self {
            config,
            client,
            retry: RetryPolicy::default(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn endpoint(&self, path: &str) -> Result<Url, MesombError> {
        let raw = format!("{}/api/{}/{}", self.config.base_url.trim_end_matches('/'), API_VERSION, path);
        Url::parse(&raw).map_err(|e| MesombError::InvalidResponse(format!("Bad MeSomb URL {}: {}", raw, e)))
    }

    fn nonce() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Debits the payer's mobile money account.
    pub async fn collect(&self, mut request: CollectRequest, trx_id: &str) -> Result<CollectResponse, MesombError> {
        if !self.is_configured() {
            return Err(MesombError::NotConfigured);
        }
        request.payer = normalize_phone(&request.payer)?;
        request.trx_id = Some(trx_id.to_string());

        let url = self.endpoint("payment/collect/")?;
        let body = serde_json::to_string(&request)
            .map_err(|e| MesombError::InvalidResponse(e.to_string()))?;

        info!("Collecting {} XAF from {} via {} (trx {})", request.amount, request.payer, request.service, trx_id);

        // Same trxID on every attempt so MeSomb can recognise a replay
        let response = with_retry(self.retry, |attempt| {
            let url = url.clone();
            let body = body.clone();
            async move {
                info!("MeSomb collect attempt {} for trx {}", attempt, trx_id);
                self.send_collect(url, body, trx_id).await
            }
        })
        .await?;

        if !response.is_successful() {
            let message = response.message.clone().unwrap_or_else(|| "Payment was not completed".to_string());
            error!("MeSomb collect for trx {} not successful: {}", trx_id, message);
            return Err(MesombError::Rejected(message));
        }
        info!("MeSomb collect for trx {} succeeded, reference {:?}", trx_id, response.reference);
        Ok(response)
    }

    async fn send_collect(&self, url: Url, body: String, trx_id: &str) -> Result<CollectResponse, MesombError> {
        let date = Utc::now();
        let nonce = Self::nonce();
        let authorization = sign_request(
            "POST",
            &url,
            date,
            &nonce,
            &self.config.access_key,
            &self.config.secret_key,
            Some("application/json"),
            Some(&body),
        )?;

        let response = self.client
            .post(url)
            .header("x-mesomb-date", date.timestamp().to_string())
            .header("x-mesomb-nonce", nonce)
            .header("Authorization", authorization)
            .header("Content-Type", "application/json")
            .header("X-MeSomb-Application", &self.config.app_key)
            .header("X-MeSomb-OperationMode", "synchronous")
            .header("X-MeSomb-TrxID", trx_id)
            .body(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        parse_response(response).await
    }

    /// Looks up transactions by MeSomb pk or reference.
    pub async fn transaction_status(&self, ids: &[String]) -> Result<Vec<MesombTransaction>, MesombError> {
        if !self.is_configured() {
            return Err(MesombError::NotConfigured);
        }
        let mut url = self.endpoint("payment/transactions/")?;
        url.set_query(Some(&format!("ids={}", ids.join(","))));

        with_retry(self.retry, |_| {
            let url = url.clone();
            async move {
                let date = Utc::now();
                let nonce = Self::nonce();
                let authorization = sign_request(
                    "GET",
                    &url,
                    date,
                    &nonce,
                    &self.config.access_key,
                    &self.config.secret_key,
                    None,
                    None,
                )?;
                let response = self.client
                    .get(url)
                    .header("x-mesomb-date", date.timestamp().to_string())
                    .header("x-mesomb-nonce", nonce)
                    .header("Authorization", authorization)
                    .header("X-MeSomb-Application", &self.config.app_key)
                    .send()
                    .await
                    .map_err(map_transport_error)?;
                parse_response(response).await
            }
        })
        .await
    }
}

fn map_transport_error(e: reqwest::Error) -> MesombError {
    if e.is_timeout() {
        MesombError::Timeout
    } else {
        error!("Request to MeSomb failed: {:?}", e);
        MesombError::Network(e.to_string())
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, MesombError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| MesombError::InvalidResponse(e.to_string()));
    }
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        error!("MeSomb returned HTTP {}", status);
        return Err(MesombError::ServiceUnavailable(status.as_u16()));
    }
    let text = response.text().await.unwrap_or_default();
    error!("MeSomb rejected request: HTTP {} - {}", status, text);
    match serde_json::from_str::<MesombErrorBody>(&text) {
        Ok(body) => Err(MesombError::from_error_body(&body)),
        Err(_) => Err(MesombError::Rejected(format!("HTTP {}", status))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use chrono::TimeZone;

    fn no_delay() -> RetryPolicy {
        RetryPolicy { attempts: 2, base_delay: Duration::ZERO }
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("677 00 00 00").unwrap(), "677000000");
        assert_eq!(normalize_phone("+237 690-123-456").unwrap(), "690123456");
        assert_eq!(normalize_phone("237690123456").unwrap(), "690123456");
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("577000000").is_err());
        assert!(normalize_phone("67700000a").is_err());
    }

    #[test]
    fn test_sign_request_layout() {
        let url = Url::parse("https://mesomb.hachther.com/api/v1.1/payment/collect/").unwrap();
        let date = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let header = sign_request("POST", &url, date, "nonce1", "ACCESS", "SECRET", Some("application/json"), Some("{\"amount\":100}")).unwrap();

        let prefix = "HMAC-SHA1 Credential=ACCESS/20240309/payment/mesomb_request, \
                      SignedHeaders=content-type;host;x-mesomb-date;x-mesomb-nonce, Signature=";
        assert!(header.starts_with(prefix), "{}", header);
        let signature = &header[prefix.len()..];
        assert_eq!(signature.len(), 40);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));

        // Deterministic for the same inputs, sensitive to the body
        let again = sign_request("POST", &url, date, "nonce1", "ACCESS", "SECRET", Some("application/json"), Some("{\"amount\":100}")).unwrap();
        assert_eq!(header, again);
        let other = sign_request("POST", &url, date, "nonce1", "ACCESS", "SECRET", Some("application/json"), Some("{\"amount\":200}")).unwrap();
        assert_ne!(header, other);
    }

    #[test]
    fn test_get_signature_omits_content_type() {
        let url = Url::parse("https://mesomb.hachther.com/api/v1.1/payment/transactions/?ids=a,b").unwrap();
        let header = sign_request("GET", &url, Utc::now(), "n", "ACCESS", "SECRET", None, None).unwrap();
        assert!(header.contains("SignedHeaders=host;x-mesomb-date;x-mesomb-nonce,"));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = with_retry(no_delay(), |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 1 { Err(MesombError::Timeout) } else { Ok(attempt) }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_two_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = with_retry(no_delay(), |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(MesombError::ServiceUnavailable(503)) }
        })
        .await;
        assert!(matches!(result, Err(MesombError::ServiceUnavailable(503))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_skips_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = with_retry(no_delay(), |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(MesombError::InsufficientBalance) }
        })
        .await;
        assert!(matches!(result, Err(MesombError::InsufficientBalance)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_collect_requires_credentials() {
        let client = MesombClient::new(MesombConfig {
            app_key: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            base_url: "https://mesomb.hachther.com".to_string(),
        })
        .unwrap();
        let request = CollectRequest::new(1000.0, crate::models::payment::MobileOperator::Mtn, "677000000".into());
        assert!(matches!(client.collect(request, "ORD-1").await, Err(MesombError::NotConfigured)));
    }
}
