use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::types::{
    CheckoutRequest, PaymentError, PaymentLink, PaymentResult, PaymentService, SplitRequest,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SplitResponse {
    links: Vec<PaymentLink>,
}

/// [`PaymentService`] backed by a JSON HTTP API.
///
/// Posts to `{base_url}/checkout` and `{base_url}/split`.
pub struct HttpPaymentService {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpPaymentService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> PaymentResult<R>
    where
        B: serde::Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "Payment service request");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(url = %url, status = %status, "Payment service rejected request");
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentService for HttpPaymentService {
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<String> {
        let response: CheckoutResponse = self.post("checkout", request).await?;
        Ok(response.url)
    }

    async fn split_bill(&self, request: &SplitRequest) -> PaymentResult<Vec<PaymentLink>> {
        let response: SplitResponse = self.post("split", request).await?;
        Ok(response.links)
    }
}
