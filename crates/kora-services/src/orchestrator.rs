//! Send orchestrator
//!
//! Drives one message through validation, the credit pre-check, the provider
//! call and ledger reconciliation:
//!
//! 1. Resolve template, normalize and validate recipient and body
//! 2. Resolve the sender identity
//! 3. Compute the segment cost
//! 4. Pre-check the SMS account balance
//! 5. Record the message as PENDING
//! 6. Call the provider
//! 7. Classify the outcome
//! 8. Apply the terminal status
//! 9. Deduct credits when the outcome is charged
//!
//! Steps 1-4 reject without side effects. From step 5 on the send always
//! completes; a ledger or record failure after the provider call is logged as
//! a reconciliation alert and never rolled back.

use kora_core::{
    cost,
    models::{AccountType, Message, NewMessage, StatusUpdate},
    phone,
    traits::{MessageRepository, TemplateRepository},
    AppError, AppResult,
};
use kora_provider::{DeliveryStatus, OutcomeCategory, ProviderBalance, SmsGateway};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::ledger::LedgerService;
use crate::policy::classify;
use crate::sender::SenderValidator;

/// Inbound send request; `business_id` is trusted
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub business_id: Uuid,
    pub recipient: String,
    pub body: Option<String>,
    pub sender: Option<String>,
    pub template_id: Option<Uuid>,
}

/// Why a send was refused before anything was recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    InvalidRecipient {
        recipient: String,
    },
    EmptyBody,
    TemplateNotFound {
        template_id: Uuid,
    },
    SenderNotFound,
    InsufficientCredits {
        required_credits: Decimal,
        current_balance: Decimal,
        additional_needed: Decimal,
    },
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::InvalidRecipient { .. } => "invalid_recipient",
            RejectionReason::EmptyBody => "empty_body",
            RejectionReason::TemplateNotFound { .. } => "template_not_found",
            RejectionReason::SenderNotFound => "sender_not_found",
            RejectionReason::InsufficientCredits { .. } => "insufficient_credits",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::InvalidRecipient { recipient } => {
                write!(f, "Recipient {} is not a valid international number", recipient)
            }
            RejectionReason::EmptyBody => write!(f, "Message body is empty"),
            RejectionReason::TemplateNotFound { template_id } => {
                write!(f, "Template {} not found", template_id)
            }
            RejectionReason::SenderNotFound => {
                write!(f, "No approved sender identity matches the request")
            }
            RejectionReason::InsufficientCredits {
                required_credits,
                current_balance,
                additional_needed,
            } => write!(
                f,
                "Insufficient credits: required {}, balance {}, need {} more",
                required_credits, current_balance, additional_needed
            ),
        }
    }
}

/// Result of one send
#[derive(Debug, Clone)]
pub enum SendResult {
    /// Accepted by the provider
    Sent { message: Message, charged: bool },
    /// Refused before any record or provider call
    Rejected(RejectionReason),
    /// Recorded and sent, but the provider reported a failure
    Failed {
        message: Message,
        category: OutcomeCategory,
        provider_code: Option<String>,
        provider_message: String,
        charged: bool,
    },
}

impl SendResult {
    pub fn message(&self) -> Option<&Message> {
        match self {
            SendResult::Sent { message, .. } | SendResult::Failed { message, .. } => Some(message),
            SendResult::Rejected(_) => None,
        }
    }
}

pub struct SendOrchestrator {
    ledger: Arc<LedgerService>,
    senders: Arc<SenderValidator>,
    messages: Arc<dyn MessageRepository>,
    templates: Arc<dyn TemplateRepository>,
    gateway: Arc<dyn SmsGateway>,
    country_code: String,
}

impl SendOrchestrator {
    pub fn new(
        ledger: Arc<LedgerService>,
        senders: Arc<SenderValidator>,
        messages: Arc<dyn MessageRepository>,
        templates: Arc<dyn TemplateRepository>,
        gateway: Arc<dyn SmsGateway>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            senders,
            messages,
            templates,
            gateway,
            country_code: country_code.into(),
        }
    }

    /// Run the send on its own task
    ///
    /// Dropping the returned future does not cancel the send.
    pub async fn submit(self: &Arc<Self>, request: SendRequest) -> AppResult<SendResult> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.send(request).await })
            .await
            .map_err(|e| {
                error!("Send task aborted: {}", e);
                AppError::Internal(format!("Send task aborted: {}", e))
            })?
    }

    /// Send one message
    ///
    /// Only persistence failures before the provider call are returned as
    /// errors; everything else is a [`SendResult`].
    #[instrument(skip(self, request), fields(business_id = %request.business_id))]
    pub async fn send(&self, request: SendRequest) -> AppResult<SendResult> {
        let business_id = request.business_id;

        // Step 1: recipient, template and body
        let recipient = phone::normalize_recipient(&request.recipient, &self.country_code);
        if !phone::is_international_format(&recipient) {
            return Ok(self.reject(RejectionReason::InvalidRecipient { recipient }));
        }

        let mut body = request.body.unwrap_or_default();
        if let Some(template_id) = request.template_id {
            match self.templates.find_body(business_id, template_id).await? {
                Some(content) if body.trim().is_empty() => body = content,
                Some(_) => {}
                None => {
                    return Ok(self.reject(RejectionReason::TemplateNotFound { template_id }))
                }
            }
        }
        if body.trim().is_empty() {
            return Ok(self.reject(RejectionReason::EmptyBody));
        }

        // Step 2: sender
        let sender = match self
            .senders
            .validate(business_id, request.sender.as_deref())
            .await
        {
            Ok(sender) => sender,
            Err(AppError::SenderNotFound(_)) => {
                return Ok(self.reject(RejectionReason::SenderNotFound))
            }
            Err(e) => return Err(e),
        };

        // Steps 3-4: cost and credit pre-check
        let required = cost::cost(&body);
        if !self
            .ledger
            .has_sufficient_credits(business_id, AccountType::Sms, required)
            .await
        {
            let balance = self
                .ledger
                .current_balance(business_id, AccountType::Sms)
                .await;
            return Ok(self.reject(RejectionReason::InsufficientCredits {
                required_credits: required,
                current_balance: balance,
                additional_needed: (required - balance).max(Decimal::ZERO),
            }));
        }

        // Step 5: pending record
        let mut message = self
            .messages
            .create_pending(NewMessage {
                business_id,
                recipient,
                body,
                sender_id: sender.id,
                template_id: request.template_id,
                cost: required,
            })
            .await?;
        debug!("Message {} pending, cost {}", message.id, required);

        // Step 6: provider
        let outcome = self
            .gateway
            .send(
                &message.recipient,
                &message.body,
                &sender.display_name,
                &message.client_reference(),
            )
            .await;

        // Step 7: classification
        let decision = classify(outcome.category);
        let update = StatusUpdate {
            status: decision.status,
            external_id: outcome.external_id.clone(),
            error_code: outcome.error_code.clone(),
            error_message: (!outcome.success).then(|| outcome.message.clone()),
        };

        // Step 8: terminal status
        match self.messages.apply_status(message.id, &update).await {
            Ok(stored) => message = stored,
            Err(e) => {
                error!(
                    target: "kora::reconciliation",
                    message_id = %message.id,
                    status = %update.status,
                    "Failed to record provider outcome: {}", e
                );
                let _ = message.apply(&update);
            }
        }

        // Step 9: charge
        let charged = decision.charge && self.charge(&message).await;

        info!(
            "Message {} finished as {} (category {}, charged {})",
            message.id, message.status, outcome.category, charged
        );

        if outcome.success {
            Ok(SendResult::Sent { message, charged })
        } else {
            Ok(SendResult::Failed {
                message,
                category: outcome.category,
                provider_code: outcome.error_code,
                provider_message: outcome.message,
                charged,
            })
        }
    }

    fn reject(&self, reason: RejectionReason) -> SendResult {
        debug!("Send rejected: {}", reason);
        SendResult::Rejected(reason)
    }

    /// Deduct the message cost; a failure is alerted, never rolled back
    async fn charge(&self, message: &Message) -> bool {
        let description = format!("SMS to {}", message.recipient);
        match self
            .ledger
            .deduct(
                message.business_id,
                AccountType::Sms,
                message.cost,
                &description,
                Some(message.id),
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!(
                    target: "kora::reconciliation",
                    message_id = %message.id,
                    business_id = %message.business_id,
                    cost = %message.cost,
                    status = %message.status,
                    "Charged outcome recorded but credit deduction failed: {}", e
                );
                false
            }
        }
    }

    /// Message owned by the business
    pub async fn get_message(&self, business_id: Uuid, message_id: Uuid) -> AppResult<Message> {
        self.messages
            .find_by_id(business_id, message_id)
            .await?
            .ok_or_else(|| AppError::MessageNotFound(message_id.to_string()))
    }

    /// Provider delivery state of a message owned by the business
    pub async fn delivery_status(
        &self,
        business_id: Uuid,
        message_id: Uuid,
    ) -> AppResult<(Message, DeliveryStatus)> {
        let message = self.get_message(business_id, message_id).await?;
        let status = match message.external_id.as_deref() {
            Some(external_id) => self.gateway.delivery_status(external_id).await,
            None => {
                warn!("Message {} has no provider id", message.id);
                DeliveryStatus::Unknown
            }
        };
        Ok((message, status))
    }

    pub async fn provider_balance(&self) -> ProviderBalance {
        self.gateway.provider_balance().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryLedger, InMemoryMessages, InMemorySenders, InMemoryTemplates, ScriptedGateway,
    };
    use kora_core::models::{MessageStatus, TransactionType};
    use kora_provider::ProviderOutcome;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    struct Harness {
        business: Uuid,
        ledger: Arc<InMemoryLedger>,
        messages: Arc<InMemoryMessages>,
        senders: Arc<InMemorySenders>,
        templates: Arc<InMemoryTemplates>,
        gateway: Arc<ScriptedGateway>,
        orchestrator: Arc<SendOrchestrator>,
    }

    fn harness(gateway: ScriptedGateway) -> Harness {
        let business = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::new("NGN"));
        let messages = Arc::new(InMemoryMessages::new());
        let senders = Arc::new(InMemorySenders::linked(messages.clone()));
        let templates = Arc::new(InMemoryTemplates::new());
        let gateway = Arc::new(gateway);
        senders.approve(business, "AEGIS");

        let orchestrator = Arc::new(SendOrchestrator::new(
            Arc::new(LedgerService::new(ledger.clone())),
            Arc::new(SenderValidator::new(senders.clone())),
            messages.clone(),
            templates.clone(),
            gateway.clone(),
            "234",
        ));

        Harness {
            business,
            ledger,
            messages,
            senders,
            templates,
            gateway,
            orchestrator,
        }
    }

    fn request(h: &Harness, body: &str) -> SendRequest {
        SendRequest {
            business_id: h.business,
            recipient: "08012345678".to_string(),
            body: Some(body.to_string()),
            sender: Some("AEGIS".to_string()),
            template_id: None,
        }
    }

    fn provider_failure(category: OutcomeCategory, code: &str, text: &str) -> ProviderOutcome {
        ProviderOutcome::failure(category, text, Some(code.to_string()))
    }

    #[tokio::test]
    async fn test_successful_send_charges_once() {
        let h = harness(ScriptedGateway::accepting());
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(1));

        let result = h.orchestrator.send(request(&h, &"a".repeat(100))).await.unwrap();

        let message = match result {
            SendResult::Sent { message, charged } => {
                assert!(charged);
                message
            }
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(message.status, MessageStatus::Sent);
        assert_eq!(message.recipient, "2348012345678");
        assert_eq!(message.external_id.as_deref(), Some("ext-1"));
        assert_eq!(h.ledger.balance(h.business, AccountType::Sms), dec!(0));

        let txs = h.ledger.transactions(h.business);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].transaction_type, TransactionType::Usage);
        assert_eq!(txs[0].amount, dec!(-1));
        assert_eq!(txs[0].balance_after, dec!(0));
        assert_eq!(txs[0].reference_id, Some(message.id));

        let calls = h.gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sender_name, "AEGIS");
        assert_eq!(calls[0].client_message_id, message.id.simple().to_string());
    }

    #[tokio::test]
    async fn test_zero_balance_rejects_without_record() {
        let h = harness(ScriptedGateway::accepting());

        let result = h.orchestrator.send(request(&h, &"a".repeat(100))).await.unwrap();

        match result {
            SendResult::Rejected(reason) => assert_eq!(
                reason,
                RejectionReason::InsufficientCredits {
                    required_credits: dec!(1),
                    current_balance: dec!(0),
                    additional_needed: dec!(1),
                }
            ),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.messages.count(), 0);
        assert!(h.gateway.calls().is_empty());
        assert!(h.ledger.transactions(h.business).is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_balance_rejects_before_record() {
        let h = harness(ScriptedGateway::accepting());
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(10));
        h.ledger.fail_reads(true);

        let result = h.orchestrator.send(request(&h, "hello")).await.unwrap();

        match result {
            SendResult::Rejected(RejectionReason::InsufficientCredits {
                required_credits,
                current_balance,
                ..
            }) => {
                assert_eq!(required_credits, dec!(1));
                assert_eq!(current_balance, dec!(0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.messages.count(), 0);
        assert!(h.gateway.calls().is_empty());
        assert_eq!(h.ledger.balance(h.business, AccountType::Sms), dec!(10));
    }

    #[tokio::test]
    async fn test_balance_equal_to_cost_is_enough() {
        let h = harness(ScriptedGateway::accepting());
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(2));

        let result = h.orchestrator.send(request(&h, &"a".repeat(161))).await.unwrap();

        assert!(matches!(result, SendResult::Sent { charged: true, .. }));
        assert_eq!(h.ledger.balance(h.business, AccountType::Sms), dec!(0));
    }

    #[tokio::test]
    async fn test_provider_out_of_credit_is_not_charged() {
        let h = harness(ScriptedGateway::new(provider_failure(
            OutcomeCategory::InsufficientCredit,
            "1025",
            "Insufficient credit on provider account",
        )));
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(5));

        let result = h.orchestrator.send(request(&h, "hello")).await.unwrap();

        match result {
            SendResult::Failed {
                message,
                provider_code,
                charged,
                ..
            } => {
                assert_eq!(message.status, MessageStatus::FailedInsufficientProviderCredit);
                assert_eq!(message.error_code.as_deref(), Some("1025"));
                assert_eq!(provider_code.as_deref(), Some("1025"));
                assert!(!charged);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.ledger.balance(h.business, AccountType::Sms), dec!(5));
        assert!(h.ledger.transactions(h.business).is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_charged_and_failed() {
        let h = harness(ScriptedGateway::new(ProviderOutcome::failure(
            OutcomeCategory::Timeout,
            "Provider request timed out",
            None,
        )));
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(2));

        let result = h.orchestrator.send(request(&h, "hello")).await.unwrap();

        match result {
            SendResult::Failed { message, charged, .. } => {
                assert_eq!(message.status, MessageStatus::Failed);
                assert!(charged);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.ledger.balance(h.business, AccountType::Sms), dec!(1));
    }

    #[tokio::test]
    async fn test_invalid_parameters_not_charged() {
        let h = harness(ScriptedGateway::new(provider_failure(
            OutcomeCategory::InvalidDestination,
            "1706",
            "Invalid destination number",
        )));
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(2));

        let result = h.orchestrator.send(request(&h, "hello")).await.unwrap();

        let message = result.message().cloned().unwrap();
        assert_eq!(message.status, MessageStatus::FailedInvalidParameters);
        assert_eq!(message.error_message.as_deref(), Some("Invalid destination number"));
        assert_eq!(h.ledger.balance(h.business, AccountType::Sms), dec!(2));
    }

    #[tokio::test]
    async fn test_precondition_failures_leave_no_trace() {
        let h = harness(ScriptedGateway::accepting());
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(10));

        let mut bad_recipient = request(&h, "hello");
        bad_recipient.recipient = "12345".to_string();
        let mut unknown_sender = request(&h, "hello");
        unknown_sender.sender = Some("NOBODY".to_string());
        let empty_body = request(&h, "   ");
        let mut missing_template = request(&h, "");
        missing_template.template_id = Some(Uuid::new_v4());

        let expected = [
            "invalid_recipient",
            "sender_not_found",
            "empty_body",
            "template_not_found",
        ];
        for (req, code) in [bad_recipient, unknown_sender, empty_body, missing_template]
            .into_iter()
            .zip(expected)
        {
            match h.orchestrator.send(req).await.unwrap() {
                SendResult::Rejected(reason) => assert_eq!(reason.code(), code),
                other => panic!("unexpected {:?}", other),
            }
        }

        assert_eq!(h.messages.count(), 0);
        assert!(h.gateway.calls().is_empty());
        assert!(h.ledger.transactions(h.business).is_empty());
        assert_eq!(h.ledger.balance(h.business, AccountType::Sms), dec!(10));
    }

    #[tokio::test]
    async fn test_template_supplies_blank_body() {
        let h = harness(ScriptedGateway::accepting());
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(1));
        let template_id = h.templates.insert(h.business, "Your code is 1234");

        let mut req = request(&h, "");
        req.template_id = Some(template_id);
        let result = h.orchestrator.send(req).await.unwrap();

        let message = result.message().cloned().unwrap();
        assert_eq!(message.body, "Your code is 1234");
        assert_eq!(message.template_id, Some(template_id));
        assert_eq!(h.gateway.calls()[0].body, "Your code is 1234");
    }

    #[tokio::test]
    async fn test_ledger_failure_after_send_keeps_result() {
        let h = harness(ScriptedGateway::accepting());
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(1));
        h.ledger.fail_writes(true);

        let result = h.orchestrator.send(request(&h, "hello")).await.unwrap();

        match result {
            SendResult::Sent { message, charged } => {
                assert!(!charged);
                assert_eq!(h.messages.get(message.id).unwrap().status, MessageStatus::Sent);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.ledger.balance(h.business, AccountType::Sms), dec!(1));
    }

    #[tokio::test]
    async fn test_record_failure_after_send_still_charges() {
        let h = harness(ScriptedGateway::accepting());
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(1));
        h.messages.fail_updates(true);

        let result = h.orchestrator.send(request(&h, "hello")).await.unwrap();

        match result {
            SendResult::Sent { message, charged } => {
                assert!(charged);
                assert_eq!(message.status, MessageStatus::Sent);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.ledger.balance(h.business, AccountType::Sms), dec!(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sends_never_overdraw() {
        let h = harness(ScriptedGateway::accepting().with_delay(Duration::from_millis(5)));
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(3));

        let sends = (0..10).map(|_| {
            let orchestrator = h.orchestrator.clone();
            let req = request(&h, "hello");
            async move { orchestrator.submit(req).await.unwrap() }
        });
        let results = futures::future::join_all(sends).await;

        let charged = results
            .iter()
            .filter(|r| matches!(r, SendResult::Sent { charged: true, .. }))
            .count();
        let txs = h.ledger.transactions(h.business);

        assert!(charged <= 3);
        assert_eq!(txs.len(), charged);
        assert!(h.ledger.balance(h.business, AccountType::Sms) >= Decimal::ZERO);
        assert_eq!(
            h.ledger.balance(h.business, AccountType::Sms),
            dec!(3) + txs.iter().map(|t| t.amount).sum::<Decimal>()
        );
    }

    #[tokio::test]
    async fn test_dropped_submit_still_completes() {
        let h = harness(ScriptedGateway::accepting().with_delay(Duration::from_millis(50)));
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(1));

        let orchestrator = h.orchestrator.clone();
        let req = request(&h, "hello");
        let pending = tokio::spawn(async move { orchestrator.submit(req).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        pending.abort();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(h.gateway.calls().len(), 1);
        assert_eq!(h.ledger.balance(h.business, AccountType::Sms), dec!(0));
        assert_eq!(h.messages.count(), 1);
    }

    #[tokio::test]
    async fn test_message_lookup_is_scoped() {
        let h = harness(ScriptedGateway::accepting().with_delivery(DeliveryStatus::Delivered));
        h.ledger.set_balance(h.business, AccountType::Sms, dec!(1));
        let sent = h.orchestrator.send(request(&h, "hello")).await.unwrap();
        let id = sent.message().unwrap().id;

        assert_eq!(h.orchestrator.get_message(h.business, id).await.unwrap().id, id);
        assert!(matches!(
            h.orchestrator.get_message(Uuid::new_v4(), id).await,
            Err(AppError::MessageNotFound(_))
        ));

        let (_, delivery) = h.orchestrator.delivery_status(h.business, id).await.unwrap();
        assert_eq!(delivery, DeliveryStatus::Delivered);
        assert!(h.senders.count() >= 1);
    }
}
