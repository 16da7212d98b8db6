use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the payment collaborator.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),
    #[error("Payment service request failed: {0}")]
    RequestFailed(String),
    #[error("Payment service returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Invalid payment service response: {0}")]
    InvalidResponse(String),
}

pub type PaymentResult<T> = Result<T, PaymentError>;

/// A split participant with a resolved email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub name: String,
    pub email: String,
}

/// One participant's share of a split bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub url: String,
    pub name: String,
    pub amount_cents: u64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub amount_cents: u64,
    pub recipient_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRequest {
    pub total_cents: u64,
    pub currency: String,
    pub friends: Vec<Friend>,
}

/// Result of settling a confirmed proposal: `{url}` or `{links}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentOutcome {
    Checkout { url: String },
    Split { links: Vec<PaymentLink> },
}

impl PaymentOutcome {
    /// What to tell the user once the links exist.
    pub fn sentence(&self) -> &'static str {
        match self {
            PaymentOutcome::Checkout { .. } => {
                "Payment link generated and copied to your clipboard."
            }
            PaymentOutcome::Split { .. } => {
                "I have created the payment links and copied them to your clipboard."
            }
        }
    }
}

/// Creates payment links. Implementations talk to the real payment backend.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Create a single checkout and return its URL.
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<String>;

    /// Split a total evenly between friends and return one link each.
    async fn split_bill(&self, request: &SplitRequest) -> PaymentResult<Vec<PaymentLink>>;
}
