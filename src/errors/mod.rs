//! Error taxonomy for the bundle pipeline
//!
//! Every stage returns `BundlerResult`; only the binary converts to `anyhow`.
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Why the relay refused a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// No leader connected to the relay within its look-ahead window
    NoLeader,
    Generic,
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionKind::NoLeader => write!(f, "no connected leader"),
            RejectionKind::Generic => write!(f, "rejected"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BundlerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pool resolution failed for market {market}: {reason}")]
    PoolResolution { market: String, reason: String },

    #[error("Transaction chunk {chunk_index} is {size} bytes (limit {limit})")]
    OversizeTransaction {
        chunk_index: usize,
        size: usize,
        limit: usize,
    },

    #[error("Ledger rejected {action}: {reason}")]
    LedgerSubmit { action: String, reason: String },

    #[error("Relay rejected bundle ({kind}): {message}")]
    RelayRejected { kind: RejectionKind, message: String },

    #[error("No relay result for bundle {bundle_id} after {seconds}s; check the ledger before resubmitting")]
    RelayTimeout { bundle_id: String, seconds: u64 },

    #[error("Lookup table {0} not found on ledger")]
    MissingLookupTable(Pubkey),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Relay transport error: {0}")]
    RelayTransport(String),

    #[error("Message compile error: {0}")]
    Compile(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Simulation blocked submission: {0}")]
    Simulation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BundlerError {
    /// Conditions that must halt the current operation outright
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            BundlerError::RelayRejected {
                kind: RejectionKind::NoLeader,
                ..
            } | BundlerError::RelayTimeout { .. }
        )
    }

    /// An operator may rebuild and resubmit (never done automatically).
    /// A bundle whose fate is unknown is not retryable until the ledger
    /// has been checked.
    pub fn is_operator_retryable(&self) -> bool {
        matches!(
            self,
            BundlerError::RelayRejected {
                kind: RejectionKind::NoLeader,
                ..
            } | BundlerError::RelayTransport(_)
        )
    }

    /// The relay may or may not have taken the bundle
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, BundlerError::RelayTimeout { .. })
    }

    pub fn pool_resolution(market: &Pubkey, reason: impl Into<String>) -> Self {
        BundlerError::PoolResolution {
            market: market.to_string(),
            reason: reason.into(),
        }
    }

    pub fn ledger_submit(action: impl Into<String>, reason: impl ToString) -> Self {
        BundlerError::LedgerSubmit {
            action: action.into(),
            reason: reason.to_string(),
        }
    }
}

pub type BundlerResult<T> = Result<T, BundlerError>;
