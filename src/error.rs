use thiserror::Error;

/// Service-level error taxonomy.
///
/// Validation, authorization and business-rule failures are reported
/// synchronously to the caller and never retried. Infrastructure faults
/// abort the current unit of work and surface through the `Store` variant.
#[derive(Error, Debug)]
pub enum BankError {
    #[error("account not found")]
    AccountNotFound,
    #[error("card not found")]
    CardNotFound,
    #[error("credit not found")]
    CreditNotFound,
    #[error("transaction not found")]
    EntryNotFound,
    #[error("access denied")]
    AccessDenied,
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("cannot transfer to the same account")]
    SameAccount,
    #[error("card is inactive")]
    CardInactive,
    #[error("credit amount must be positive")]
    InvalidCreditAmount,
    #[error("credit term must be between 3 and 60 months")]
    InvalidCreditTerm,
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, BankError>;

/// Faults raised by a store port outside a unit of work.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Outcome of committing a unit of work.
///
/// `InsufficientBalance` and `InstallmentNotPending` are the commit-time
/// guards: they fire when the state observed at commit no longer admits a
/// staged mutation, and the whole unit is discarded.
#[derive(Error, Debug)]
pub enum TxError {
    #[error("balance of account {0} cannot cover the staged debit")]
    InsufficientBalance(uuid::Uuid),
    #[error("account {0} does not exist")]
    AccountMissing(uuid::Uuid),
    #[error("installment {0} is no longer pending")]
    InstallmentNotPending(uuid::Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TxError> for BankError {
    fn from(err: TxError) -> Self {
        match err {
            TxError::InsufficientBalance(_) => BankError::InsufficientFunds,
            TxError::AccountMissing(_) => BankError::AccountNotFound,
            TxError::InstallmentNotPending(id) => BankError::Store(StoreError::Unavailable(
                format!("installment {id} was settled concurrently"),
            )),
            TxError::Store(err) => BankError::Store(err),
        }
    }
}

#[derive(Error, Debug)]
#[error("reference rate unavailable: {0}")]
pub struct RateError(pub String);

#[derive(Error, Debug)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);
