//! Provider client: validation, wire encoding and outcome normalization

use async_trait::async_trait;
use kora_core::config::ProviderConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::outcome::{DeliveryStatus, OutcomeCategory, ProviderBalance, ProviderOutcome};
use crate::parser::{self, MALFORMED_MESSAGE};
use crate::transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
use crate::validation;

/// Upstream SMS gateway as seen by the send orchestrator
///
/// None of these calls fail: every problem is reported through the returned
/// value.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Submit one message
    async fn send(
        &self,
        recipient: &str,
        body: &str,
        sender_name: &str,
        client_message_id: &str,
    ) -> ProviderOutcome;

    /// Delivery state of a previously submitted message
    async fn delivery_status(&self, external_id: &str) -> DeliveryStatus;

    /// Balance of the platform account at the provider
    async fn provider_balance(&self) -> ProviderBalance;
}

/// HTTP implementation of [`SmsGateway`]
#[derive(Clone)]
pub struct ProviderClient {
    send_url: String,
    status_url: Option<String>,
    balance_url: Option<String>,
    api_key: String,
    message_type: String,
    delivery_report: bool,
    http: Arc<dyn HttpTransport>,
}

impl ProviderClient {
    /// Build a client backed by reqwest with the configured timeout
    pub fn from_config(config: &ProviderConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: &ProviderConfig, http: Arc<dyn HttpTransport>) -> Self {
        Self {
            send_url: config.send_url.clone(),
            status_url: config.status_url.clone(),
            balance_url: config.balance_url.clone(),
            api_key: config.api_key.clone(),
            message_type: config.message_type.clone(),
            delivery_report: config.delivery_report,
            http,
        }
    }

    fn send_query(
        &self,
        recipient: &str,
        body: &str,
        sender_name: &str,
        client_message_id: &str,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.api_key.clone()),
            ("type", self.message_type.clone()),
            ("destination", recipient.to_string()),
            ("dlr", String::from(if self.delivery_report { "1" } else { "0" })),
            ("source", sender_name.to_string()),
            ("message", body.to_string()),
            ("client_ref", client_message_id.to_string()),
        ]
    }
}

/// Turn an HTTP exchange into an outcome
fn interpret(response: HttpResponse) -> ProviderOutcome {
    let parsed = parser::parse_send_response(&response.body);
    let outcome = ProviderOutcome::from(parsed);

    if response.is_success() {
        return outcome;
    }

    // Non-2xx: trust a parsed failure, never a success
    let malformed =
        outcome.category == OutcomeCategory::Failed && outcome.message == MALFORMED_MESSAGE;
    if outcome.success || malformed {
        ProviderOutcome::failure(
            OutcomeCategory::ProviderError,
            format!("Provider returned HTTP {}", response.status),
            None,
        )
    } else {
        outcome
    }
}

fn transport_outcome(err: TransportError) -> ProviderOutcome {
    match err {
        TransportError::Timeout => {
            ProviderOutcome::failure(OutcomeCategory::Timeout, "Provider request timed out", None)
        }
        other => ProviderOutcome::failure(
            OutcomeCategory::ProviderError,
            format!("Provider unreachable: {}", other),
            None,
        ),
    }
}

#[async_trait]
impl SmsGateway for ProviderClient {
    #[instrument(skip_all, fields(recipient = %recipient, sender = %sender_name, client_ref = %client_message_id))]
    async fn send(
        &self,
        recipient: &str,
        body: &str,
        sender_name: &str,
        client_message_id: &str,
    ) -> ProviderOutcome {
        if let Err(violation) = validation::check_send(recipient, body, sender_name) {
            debug!("Wire precondition failed: {}", violation);
            return ProviderOutcome::invalid_parameters(violation.to_string());
        }

        let query = self.send_query(recipient, body, sender_name, client_message_id);
        let outcome = match self.http.get(&self.send_url, &query).await {
            Ok(response) => interpret(response),
            Err(err) => {
                warn!("Provider call failed: {}", err);
                transport_outcome(err)
            }
        };

        debug!(
            category = %outcome.category,
            external_id = ?outcome.external_id,
            "Provider responded"
        );
        outcome
    }

    #[instrument(skip(self))]
    async fn delivery_status(&self, external_id: &str) -> DeliveryStatus {
        let Some(url) = self.status_url.as_deref() else {
            return DeliveryStatus::Unknown;
        };

        let query = [
            ("api_key", self.api_key.clone()),
            ("message_id", external_id.to_string()),
        ];
        match self.http.get(url, &query).await {
            Ok(response) if response.is_success() => parser::parse_delivery_status(&response.body),
            Ok(response) => {
                warn!("Delivery status returned HTTP {}", response.status);
                DeliveryStatus::Unknown
            }
            Err(err) => {
                warn!("Delivery status lookup failed: {}", err);
                DeliveryStatus::Unknown
            }
        }
    }

    #[instrument(skip(self))]
    async fn provider_balance(&self) -> ProviderBalance {
        let Some(url) = self.balance_url.as_deref() else {
            return ProviderBalance::Unknown;
        };

        let query = [("api_key", self.api_key.clone())];
        match self.http.get(url, &query).await {
            Ok(response) if response.is_success() => parser::parse_balance(&response.body),
            Ok(response) => {
                warn!("Provider balance returned HTTP {}", response.status);
                ProviderBalance::Unknown
            }
            Err(err) => {
                warn!("Provider balance lookup failed: {}", err);
                ProviderBalance::Unknown
            }
        }
    }
}
