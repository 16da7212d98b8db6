use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::payments::{HttpPaymentService, PaymentService};
use crate::core::session::SessionRegistry;
use crate::handlers::session::ConnectionHub;

/// Shared application state handed to every handler.
pub struct AppState {
    pub config: ServerConfig,
    /// Conversation sessions by key
    pub registry: Arc<SessionRegistry>,
    /// Open duplex connections, for broadcasts
    pub hub: Arc<ConnectionHub>,
    /// Payment link collaborator
    pub payments: Arc<dyn PaymentService>,
}

impl AppState {
    /// Build state with the HTTP payment client pointed at the configured service.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let payments = Arc::new(HttpPaymentService::new(config.payment_service_url.clone()));
        Self::with_payments(config, payments)
    }

    pub fn with_payments(config: ServerConfig, payments: Arc<dyn PaymentService>) -> Arc<Self> {
        let registry = Arc::new(SessionRegistry::new(config.confirm_timeout));
        Arc::new(Self {
            config,
            registry,
            hub: Arc::new(ConnectionHub::new()),
            payments,
        })
    }
}
