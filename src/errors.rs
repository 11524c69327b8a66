use near_sdk::FunctionError;

use crate::bank::BankError;

/// Rejections of a requested HTLC operation. Returning one of these from a
/// contract method aborts the receipt, so no partial state is ever committed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, FunctionError)]
pub enum HtlcError {
    #[error("HTLC already exists: {0}")]
    AlreadyExists(String),
    #[error("unknown HTLC: {0}")]
    UnknownHtlc(String),
    #[error("HTLC not open: {0}")]
    NotOpen(String),
    #[error("HTLC not expired: {0}")]
    NotExpired(String),
    #[error("invalid secret: {0}")]
    InvalidSecret(String),
    #[error("invalid hash lock: {0}")]
    InvalidHashLock(String),
    #[error("invalid secret length: {0} bytes")]
    InvalidSecretLength(usize),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("receiver on other chain exceeds {max} bytes: {len}")]
    InvalidReceiverOnOtherChain { len: usize, max: usize },
    #[error("time lock {time_lock} outside [{min}, {max}]")]
    InvalidTimeLock { time_lock: u64, min: u64, max: u64 },
    #[error("expiration height {expiration_height} must be above current height {current_height}")]
    InvalidExpirationHeight {
        expiration_height: u64,
        current_height: u64,
    },
    #[error("invalid HTLC record: {0}")]
    InvalidRecord(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("HTLC state was exported at height {exported_at}, the contract is halted")]
    Halted { exported_at: u64 },
    #[error("insufficient storage deposit for {account}: needs {required}, holds {available}")]
    InsufficientStorageDeposit {
        account: String,
        required: u128,
        available: u128,
    },
    #[error(transparent)]
    Bank(#[from] BankError),
}
