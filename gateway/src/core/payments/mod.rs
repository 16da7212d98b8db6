//! Payment collaborator boundary.
//!
//! The gateway never moves money itself. A confirmed proposal is turned into a
//! checkout or split request and handed to a [`PaymentService`].

mod client;
mod participants;
mod types;

pub use client::HttpPaymentService;
pub use participants::{normalize_friends, normalize_recipient};
pub use types::{
    CheckoutRequest, Friend, PaymentError, PaymentLink, PaymentOutcome, PaymentResult,
    PaymentService, SplitRequest,
};

use crate::core::conversation::PendingArgs;

const DEFAULT_CURRENCY: &str = "usd";

/// Run a confirmed proposal against the payment service.
///
/// Proposals naming friends become a split. Anything else is a single checkout
/// to the recipient.
pub async fn settle(service: &dyn PaymentService, args: &PendingArgs) -> PaymentResult<PaymentOutcome> {
    if let Some(entries) = args.friends.as_deref().filter(|f| !f.is_empty()) {
        let total_cents = args
            .total_cents
            .or(args.amount_cents)
            .ok_or_else(|| PaymentError::InvalidRequest("split needs an amount".to_string()))?;
        let request = SplitRequest {
            total_cents,
            currency: args
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            friends: normalize_friends(entries),
        };
        let links = service.split_bill(&request).await?;
        return Ok(PaymentOutcome::Split { links });
    }

    let amount_cents = args
        .amount()
        .ok_or_else(|| PaymentError::InvalidRequest("checkout needs an amount".to_string()))?;
    let recipient_email = args
        .recipient_email
        .as_deref()
        .and_then(normalize_recipient)
        .ok_or_else(|| PaymentError::InvalidRequest("checkout needs a recipient".to_string()))?;
    let url = service
        .create_checkout(&CheckoutRequest {
            amount_cents,
            recipient_email,
        })
        .await?;
    Ok(PaymentOutcome::Checkout { url })
}
