use crate::domain::account::{AccountId, Amount, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Deposit,
    Withdraw,
    Transfer,
    Payment,
    CreditDisbursement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Completed,
}

/// Immutable record of one balance-affecting event. Append-only: entries are
/// inserted in the same unit of work as the balance mutation they describe
/// and never updated afterwards.
///
/// A transfer is a single entry carrying both account references, so each
/// transfer has exactly one audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub from_account: Option<AccountId>,
    pub to_account: Option<AccountId>,
    pub kind: EntryKind,
    pub amount: Amount,
    pub description: String,
    pub status: EntryStatus,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    fn record(
        user_id: UserId,
        kind: EntryKind,
        from_account: Option<AccountId>,
        to_account: Option<AccountId>,
        amount: Amount,
        description: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntryId::new(),
            user_id,
            from_account,
            to_account,
            kind,
            amount,
            description,
            status: EntryStatus::Completed,
            occurred_at: now,
            created_at: now,
        }
    }

    pub fn deposit(user_id: UserId, to: AccountId, amount: Amount) -> Self {
        Self::record(
            user_id,
            EntryKind::Deposit,
            None,
            Some(to),
            amount,
            "Deposit to account".to_string(),
        )
    }

    pub fn withdraw(user_id: UserId, from: AccountId, amount: Amount) -> Self {
        Self::record(
            user_id,
            EntryKind::Withdraw,
            Some(from),
            None,
            amount,
            "Withdrawal from account".to_string(),
        )
    }

    pub fn transfer(
        user_id: UserId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
        from_number: &str,
        to_number: &str,
    ) -> Self {
        Self::record(
            user_id,
            EntryKind::Transfer,
            Some(from),
            Some(to),
            amount,
            format!("Transfer from account {from_number} to account {to_number}"),
        )
    }

    pub fn card_payment(user_id: UserId, from: AccountId, amount: Amount) -> Self {
        Self::record(
            user_id,
            EntryKind::Payment,
            Some(from),
            None,
            amount,
            "Card payment".to_string(),
        )
    }

    pub fn credit_disbursement(user_id: UserId, to: AccountId, amount: Amount) -> Self {
        Self::record(
            user_id,
            EntryKind::CreditDisbursement,
            None,
            Some(to),
            amount,
            "Credit disbursement".to_string(),
        )
    }
}

/// Outbound projection: account references and the acting user stay inside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    pub id: EntryId,
    pub kind: EntryKind,
    pub amount: Amount,
    pub description: String,
    pub status: EntryStatus,
    pub occurred_at: DateTime<Utc>,
}

impl From<&LedgerEntry> for EntrySummary {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind,
            amount: entry.amount,
            description: entry.description.clone(),
            status: entry.status,
            occurred_at: entry.occurred_at,
        }
    }
}
