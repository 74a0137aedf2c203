use crate::domain::account::{Account, AccountId, Amount, UserId};
use crate::domain::card::{Card, CardId};
use crate::domain::credit::{
    Credit, CreditId, CreditStatus, Installment, InstallmentId, InstallmentStatus,
};
use crate::domain::entry::{EntryId, LedgerEntry};
use crate::domain::ports::{
    AccountStore, CardStore, CreditStore, EntryStore, PaymentStore, StoreTx, UnitOfWork,
};
use crate::error::{StoreError, TxError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    // Push order doubles as insertion order; reads walk it newest-first.
    entries: Vec<LedgerEntry>,
    cards: HashMap<CardId, Card>,
    credits: HashMap<CreditId, Credit>,
    installments: HashMap<InstallmentId, Installment>,
}

/// In-memory store backing every port, including the unit of work.
///
/// One `Arc<RwLock<State>>` holds all tables, so a commit applies its staged
/// mutations under a single write-lock acquisition: concurrent mutators of
/// the same account serialize on the lock and observe committed state only.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.accounts.insert(account.id, account);
        Ok(())
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn list_by_owner(&self, user_id: UserId) -> Result<Vec<Account>, StoreError> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn get(&self, id: EntryId) -> Result<Option<LedgerEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state.entries.iter().find(|e| e.id == id).cloned())
    }

    async fn list_by_owner(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .rev()
            .filter(|e| e.from_account == Some(account_id) || e.to_account == Some(account_id))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_by_owner_between(
        &self,
        user_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.occurred_at >= from && e.occurred_at <= to)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn insert(&self, card: Card) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.cards.insert(card.id, card);
        Ok(())
    }

    async fn get(&self, id: CardId) -> Result<Option<Card>, StoreError> {
        let state = self.state.read().await;
        Ok(state.cards.get(&id).cloned())
    }
}

#[async_trait]
impl CreditStore for MemoryStore {
    async fn get(&self, id: CreditId) -> Result<Option<Credit>, StoreError> {
        let state = self.state.read().await;
        Ok(state.credits.get(&id).cloned())
    }

    async fn list_by_owner(&self, user_id: UserId) -> Result<Vec<Credit>, StoreError> {
        let state = self.state.read().await;
        let mut credits: Vec<Credit> = state
            .credits
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        credits.sort_by_key(|c| c.created_at);
        Ok(credits)
    }

    async fn update_status(&self, id: CreditId, status: CreditStatus) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(credit) = state.credits.get_mut(&id) {
            credit.status = status;
            credit.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn list_by_credit(&self, credit_id: CreditId) -> Result<Vec<Installment>, StoreError> {
        let state = self.state.read().await;
        let mut installments: Vec<Installment> = state
            .installments
            .values()
            .filter(|i| i.credit_id == credit_id)
            .cloned()
            .collect();
        installments.sort_by_key(|i| i.due_date);
        Ok(installments)
    }

    async fn list_due_pending(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Installment>, StoreError> {
        let state = self.state.read().await;
        let mut due: Vec<Installment> = state
            .installments
            .values()
            .filter(|i| i.status == InstallmentStatus::Pending && i.due_date <= now)
            .cloned()
            .collect();
        due.sort_by_key(|i| i.due_date);
        Ok(due)
    }

    async fn update_status(
        &self,
        id: InstallmentId,
        status: InstallmentStatus,
        paid_date: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.installments.get_mut(&id) {
            Some(installment) if installment.status == InstallmentStatus::Pending => {
                installment.status = status;
                installment.paid_date = paid_date;
                installment.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

enum StagedOp {
    CreditBalance { account_id: AccountId, amount: Decimal },
    DebitBalance { account_id: AccountId, amount: Decimal },
    InsertEntry(LedgerEntry),
    InsertCredit(Credit),
    InsertInstallments(Vec<Installment>),
    MarkInstallmentPaid {
        id: InstallmentId,
        paid_date: DateTime<Utc>,
    },
}

/// Unit of work over [`MemoryStore`]: stages mutations and applies them all
/// under one write-lock acquisition. Validation runs first against current
/// state, so either every staged op lands or none does.
pub struct MemoryTx {
    state: Arc<RwLock<State>>,
    ops: Vec<StagedOp>,
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        Ok(Box::new(MemoryTx {
            state: self.state.clone(),
            ops: Vec::new(),
        }))
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    fn credit_balance(&mut self, account_id: AccountId, amount: Amount) {
        self.ops.push(StagedOp::CreditBalance {
            account_id,
            amount: amount.value(),
        });
    }

    fn debit_balance(&mut self, account_id: AccountId, amount: Amount) {
        self.ops.push(StagedOp::DebitBalance {
            account_id,
            amount: amount.value(),
        });
    }

    fn insert_entry(&mut self, entry: LedgerEntry) {
        self.ops.push(StagedOp::InsertEntry(entry));
    }

    fn insert_credit(&mut self, credit: Credit) {
        self.ops.push(StagedOp::InsertCredit(credit));
    }

    fn insert_installments(&mut self, installments: Vec<Installment>) {
        self.ops.push(StagedOp::InsertInstallments(installments));
    }

    fn mark_installment_paid(&mut self, id: InstallmentId, paid_date: DateTime<Utc>) {
        self.ops.push(StagedOp::MarkInstallmentPaid { id, paid_date });
    }

    async fn commit(self: Box<Self>) -> Result<(), TxError> {
        let MemoryTx { state, ops } = *self;
        let mut state = state.write().await;

        // Validation pass: balances are checked with the running net effect
        // of earlier staged ops, so a debit staged after a credit in the same
        // unit sees the credited funds.
        let mut deltas: HashMap<AccountId, Decimal> = HashMap::new();
        for op in &ops {
            match op {
                StagedOp::CreditBalance { account_id, amount } => {
                    if !state.accounts.contains_key(account_id) {
                        return Err(TxError::AccountMissing(account_id.0));
                    }
                    *deltas.entry(*account_id).or_default() += *amount;
                }
                StagedOp::DebitBalance { account_id, amount } => {
                    let account = state
                        .accounts
                        .get(account_id)
                        .ok_or(TxError::AccountMissing(account_id.0))?;
                    let delta = deltas.entry(*account_id).or_default();
                    *delta -= *amount;
                    if account.balance.0 + *delta < Decimal::ZERO {
                        return Err(TxError::InsufficientBalance(account_id.0));
                    }
                }
                StagedOp::MarkInstallmentPaid { id, .. } => {
                    match state.installments.get(id) {
                        Some(i) if i.status == InstallmentStatus::Pending => {}
                        _ => return Err(TxError::InstallmentNotPending(id.0)),
                    }
                }
                StagedOp::InsertEntry(_)
                | StagedOp::InsertCredit(_)
                | StagedOp::InsertInstallments(_) => {}
            }
        }

        let now = Utc::now();
        for op in ops {
            match op {
                StagedOp::CreditBalance { account_id, amount } => {
                    if let Some(account) = state.accounts.get_mut(&account_id) {
                        account.balance.0 += amount;
                        account.updated_at = now;
                    }
                }
                StagedOp::DebitBalance { account_id, amount } => {
                    if let Some(account) = state.accounts.get_mut(&account_id) {
                        account.balance.0 -= amount;
                        account.updated_at = now;
                    }
                }
                StagedOp::InsertEntry(entry) => state.entries.push(entry),
                StagedOp::InsertCredit(credit) => {
                    state.credits.insert(credit.id, credit);
                }
                StagedOp::InsertInstallments(installments) => {
                    for installment in installments {
                        state.installments.insert(installment.id, installment);
                    }
                }
                StagedOp::MarkInstallmentPaid { id, paid_date } => {
                    if let Some(installment) = state.installments.get_mut(&id) {
                        installment.status = InstallmentStatus::Paid;
                        installment.paid_date = Some(paid_date);
                        installment.updated_at = now;
                    }
                }
            }
        }

        Ok(())
    }
}
