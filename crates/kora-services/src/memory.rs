//! In-memory repositories and a scripted gateway
//!
//! Same contracts as the PostgreSQL repositories, with a single mutex standing
//! in for row locks. Used by unit tests here and by the API crate's tests
//! through the `test-util` feature.

use async_trait::async_trait;
use chrono::Utc;
use kora_core::{
    models::{
        AccountType, BusinessAccount, CreditTransaction, LedgerEntry, Message, NewMessage,
        SenderIdentity, SenderStatus, StatusUpdate, TransactionType,
    },
    traits::{LedgerRepository, MessageRepository, SenderRepository, TemplateRepository},
    AppError, AppResult,
};
use kora_provider::{DeliveryStatus, ProviderBalance, ProviderOutcome, SmsGateway};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ==================== Ledger ====================

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<(Uuid, AccountType), BusinessAccount>,
    transactions: Vec<CreditTransaction>,
    next_id: i64,
}

impl LedgerState {
    fn account(&mut self, business_id: Uuid, account_type: AccountType, currency: &str) -> BusinessAccount {
        self.accounts
            .entry((business_id, account_type))
            .or_insert_with(|| BusinessAccount::new(business_id, account_type, currency))
            .clone()
    }

    fn record(
        &mut self,
        account: &BusinessAccount,
        transaction_type: TransactionType,
        amount: Decimal,
        balance_after: Decimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> CreditTransaction {
        self.next_id += 1;
        let tx = CreditTransaction {
            id: self.next_id,
            business_id: account.business_id,
            account_id: account.id,
            transaction_type,
            amount,
            balance_after,
            description: description.to_string(),
            reference_id,
            created_at: Utc::now(),
        };
        if let Some(stored) = self
            .accounts
            .get_mut(&(account.business_id, account.account_type))
        {
            stored.balance = balance_after;
            stored.updated_at = tx.created_at;
        }
        self.transactions.push(tx.clone());
        tx
    }
}

pub struct InMemoryLedger {
    currency: String,
    state: Mutex<LedgerState>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            state: Mutex::new(LedgerState::default()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Seed a balance without recording a transaction
    pub fn set_balance(&self, business_id: Uuid, account_type: AccountType, balance: Decimal) {
        let mut state = self.state.lock();
        state.account(business_id, account_type, &self.currency);
        if let Some(account) = state.accounts.get_mut(&(business_id, account_type)) {
            account.balance = balance;
        }
    }

    pub fn balance(&self, business_id: Uuid, account_type: AccountType) -> Decimal {
        self.state
            .lock()
            .accounts
            .get(&(business_id, account_type))
            .map(|a| a.balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Every transaction of the business, oldest first
    pub fn transactions(&self, business_id: Uuid) -> Vec<CreditTransaction> {
        self.state
            .lock()
            .transactions
            .iter()
            .filter(|t| t.business_id == business_id)
            .cloned()
            .collect()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of mutation calls that reached the store
    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> AppResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("ledger store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedger {
    async fn find_account(
        &self,
        business_id: Uuid,
        account_type: AccountType,
    ) -> AppResult<Option<BusinessAccount>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Database("ledger store unavailable".to_string()));
        }
        Ok(self
            .state
            .lock()
            .accounts
            .get(&(business_id, account_type))
            .cloned())
    }

    async fn get_or_create(
        &self,
        business_id: Uuid,
        account_type: AccountType,
    ) -> AppResult<BusinessAccount> {
        Ok(self
            .state
            .lock()
            .account(business_id, account_type, &self.currency))
    }

    async fn apply_entry(&self, entry: &LedgerEntry) -> AppResult<CreditTransaction> {
        self.check_write()?;
        let mut state = self.state.lock();
        let account = state.account(entry.business_id, entry.account_type, &self.currency);
        let balance_after = entry.resulting_balance(account.balance)?;
        Ok(state.record(
            &account,
            entry.transaction_type,
            entry.signed_amount(),
            balance_after,
            &entry.description,
            entry.reference_id,
        ))
    }

    async fn transfer(
        &self,
        business_id: Uuid,
        from: AccountType,
        to: AccountType,
        amount: Decimal,
        description: &str,
    ) -> AppResult<(CreditTransaction, CreditTransaction)> {
        let debit = LedgerEntry::new(
            business_id,
            from,
            TransactionType::TransferOut,
            amount,
            description,
            None,
        )?;
        let credit = LedgerEntry::new(
            business_id,
            to,
            TransactionType::TransferIn,
            amount,
            description,
            None,
        )?;
        self.check_write()?;

        let mut state = self.state.lock();
        let source = state.account(business_id, from, &self.currency);
        let destination = state.account(business_id, to, &self.currency);
        let source_after = debit.resulting_balance(source.balance)?;
        let destination_after = credit.resulting_balance(destination.balance)?;

        let out = state.record(
            &source,
            TransactionType::TransferOut,
            debit.signed_amount(),
            source_after,
            description,
            None,
        );
        let incoming = state.record(
            &destination,
            TransactionType::TransferIn,
            credit.signed_amount(),
            destination_after,
            description,
            None,
        );
        Ok((out, incoming))
    }

    async fn list_transactions(
        &self,
        business_id: Uuid,
        account_type: AccountType,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<CreditTransaction>, i64)> {
        let state = self.state.lock();
        let Some(account) = state.accounts.get(&(business_id, account_type)) else {
            return Ok((Vec::new(), 0));
        };

        let matching: Vec<_> = state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.account_id == account.id)
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

// ==================== Senders ====================

#[derive(Default)]
pub struct InMemorySenders {
    senders: Mutex<Vec<SenderIdentity>>,
    messages: Option<Arc<InMemoryMessages>>,
}

impl InMemorySenders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Senders whose deletion consults `messages` for references
    pub fn linked(messages: Arc<InMemoryMessages>) -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
            messages: Some(messages),
        }
    }

    /// Insert an approved identity
    pub fn approve(&self, business_id: Uuid, display_name: &str) -> SenderIdentity {
        let mut sender = SenderIdentity::register(business_id, display_name)
            .unwrap_or_else(|e| panic!("invalid test sender {}: {}", display_name, e));
        sender.status = SenderStatus::Approved;
        self.senders.lock().push(sender.clone());
        sender
    }

    pub fn insert(&self, sender: SenderIdentity) {
        self.senders.lock().push(sender);
    }

    pub fn count(&self) -> usize {
        self.senders.lock().len()
    }
}

#[async_trait]
impl SenderRepository for InMemorySenders {
    async fn find_approved(
        &self,
        business_id: Uuid,
        identifier: &str,
    ) -> AppResult<Option<SenderIdentity>> {
        Ok(self
            .senders
            .lock()
            .iter()
            .rev()
            .find(|s| s.business_id == business_id && s.is_approved() && s.matches_identifier(identifier))
            .cloned())
    }

    async fn find_default_approved(&self, business_id: Uuid) -> AppResult<Option<SenderIdentity>> {
        Ok(self
            .senders
            .lock()
            .iter()
            .rev()
            .find(|s| s.business_id == business_id && s.is_approved())
            .cloned())
    }

    async fn create(&self, sender: &SenderIdentity) -> AppResult<SenderIdentity> {
        let mut senders = self.senders.lock();
        if senders
            .iter()
            .any(|s| s.business_id == sender.business_id && s.display_name == sender.display_name)
        {
            return Err(AppError::AlreadyExists(format!(
                "Sender {} already registered",
                sender.display_name
            )));
        }
        senders.push(sender.clone());
        Ok(sender.clone())
    }

    async fn delete_unused(&self, business_id: Uuid, sender_id: Uuid) -> AppResult<bool> {
        if let Some(messages) = &self.messages {
            if messages.references_sender(sender_id) {
                return Err(AppError::SenderInUse(sender_id.to_string()));
            }
        }
        let mut senders = self.senders.lock();
        let before = senders.len();
        senders.retain(|s| !(s.id == sender_id && s.business_id == business_id));
        Ok(senders.len() < before)
    }
}

// ==================== Messages ====================

#[derive(Default)]
pub struct InMemoryMessages {
    messages: Mutex<HashMap<Uuid, Message>>,
    fail_updates: AtomicBool,
}

impl InMemoryMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<Message> {
        self.messages.lock().get(&id).cloned()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn references_sender(&self, sender_id: Uuid) -> bool {
        self.messages.lock().values().any(|m| m.sender_id == sender_id)
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessages {
    async fn create_pending(&self, message: NewMessage) -> AppResult<Message> {
        let message = message.into_pending();
        self.messages.lock().insert(message.id, message.clone());
        Ok(message)
    }

    async fn apply_status(&self, id: Uuid, update: &StatusUpdate) -> AppResult<Message> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Database("message store unavailable".to_string()));
        }
        let mut messages = self.messages.lock();
        let message = messages
            .get_mut(&id)
            .ok_or_else(|| AppError::MessageNotFound(id.to_string()))?;
        message.apply(update)?;
        Ok(message.clone())
    }

    async fn find_by_id(&self, business_id: Uuid, id: Uuid) -> AppResult<Option<Message>> {
        Ok(self
            .messages
            .lock()
            .get(&id)
            .filter(|m| m.business_id == business_id)
            .cloned())
    }
}

// ==================== Templates ====================

#[derive(Default)]
pub struct InMemoryTemplates {
    templates: Mutex<HashMap<(Uuid, Uuid), String>>,
}

impl InMemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, business_id: Uuid, content: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.templates
            .lock()
            .insert((business_id, id), content.to_string());
        id
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplates {
    async fn find_body(&self, business_id: Uuid, template_id: Uuid) -> AppResult<Option<String>> {
        Ok(self.templates.lock().get(&(business_id, template_id)).cloned())
    }
}

// ==================== Gateway ====================

/// Recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub recipient: String,
    pub body: String,
    pub sender_name: String,
    pub client_message_id: String,
}

/// Gateway returning a fixed outcome
pub struct ScriptedGateway {
    outcome: Mutex<ProviderOutcome>,
    delay: Option<Duration>,
    calls: Mutex<Vec<GatewayCall>>,
    delivery: DeliveryStatus,
    balance: ProviderBalance,
}

impl ScriptedGateway {
    pub fn new(outcome: ProviderOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            delay: None,
            calls: Mutex::new(Vec::new()),
            delivery: DeliveryStatus::Unknown,
            balance: ProviderBalance::Unknown,
        }
    }

    pub fn accepting() -> Self {
        Self::new(ProviderOutcome::success(
            Some("ext-1".to_string()),
            "Message submitted successfully",
        ))
    }

    /// Sleep before answering each send
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryStatus) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_balance(mut self, balance: ProviderBalance) -> Self {
        self.balance = balance;
        self
    }

    pub fn set_outcome(&self, outcome: ProviderOutcome) {
        *self.outcome.lock() = outcome;
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SmsGateway for ScriptedGateway {
    async fn send(
        &self,
        recipient: &str,
        body: &str,
        sender_name: &str,
        client_message_id: &str,
    ) -> ProviderOutcome {
        self.calls.lock().push(GatewayCall {
            recipient: recipient.to_string(),
            body: body.to_string(),
            sender_name: sender_name.to_string(),
            client_message_id: client_message_id.to_string(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.lock().clone()
    }

    async fn delivery_status(&self, _external_id: &str) -> DeliveryStatus {
        self.delivery
    }

    async fn provider_balance(&self) -> ProviderBalance {
        self.balance.clone()
    }
}
