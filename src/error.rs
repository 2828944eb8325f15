use alloy::{
    primitives::{Address, B256, U256},
    transports::{RpcError, TransportError},
};
use std::fmt;

/// Coarse failure classes used by the top-level handler to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Connectivity,
    Decode,
    Precondition,
    Signing,
    Submission,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Alloy Transport Error: {0}")]
    TransportError(TransportError),
    #[error("Block {0} not found on source chain")]
    BlockNotFound(u64),
    #[error("Block {0} returned without full transaction bodies")]
    MissingTransactionBodies(u64),

    #[error("Transaction {hash} is missing field `{field}` required for its type")]
    MissingField { hash: B256, field: &'static str },

    #[error("No private key available for sender {0}")]
    MissingPrivateKey(Address),
    #[error("Unsupported transaction type: {0}")]
    UnsupportedTransactionType(u8),
    #[error("Transaction type {ty} is not enabled in the signing domain of chain {chain_id}")]
    TypeNotEnabled { ty: u8, chain_id: u64 },
    #[error("Override underflow: balance {balance} of {sender} is below {deduction}")]
    OverrideUnderflow {
        sender: Address,
        balance: U256,
        deduction: U256,
    },
    #[error("Gas estimate {estimate} plus margin {margin} overflows u64")]
    GasOverflow { estimate: u64, margin: u64 },
    #[error("Transaction {0} not found on source chain")]
    TransactionNotFound(B256),
    #[error("Transaction {0} is still pending on source chain")]
    PendingTransaction(B256),
    #[error("No receipt for {hash} after {attempts} attempts")]
    ConfirmationTimeout { hash: B256, attempts: u32 },

    #[error("Invalid private key material: {0}")]
    InvalidKey(String),
    #[error("Signing failed: {0}")]
    Signing(#[from] alloy::signers::Error),
    #[error("Chain id mismatch: domain expects {expected}, transaction carries {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },
    #[error("Signature recovery failed: {0}")]
    Recovery(String),

    #[error("Target chain rejected transaction {hash}: {source}")]
    Submission {
        hash: B256,
        #[source]
        source: TransportError,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            // The node answered but its payload did not deserialize
            Error::TransportError(RpcError::DeserError { .. }) => ErrorKind::Decode,
            Error::TransportError(_) | Error::BlockNotFound(_) | Error::MissingTransactionBodies(_) => {
                ErrorKind::Connectivity
            }
            Error::MissingField { .. } => ErrorKind::Decode,
            Error::MissingPrivateKey(_)
            | Error::UnsupportedTransactionType(_)
            | Error::TypeNotEnabled { .. }
            | Error::OverrideUnderflow { .. }
            | Error::GasOverflow { .. }
            | Error::TransactionNotFound(_)
            | Error::PendingTransaction(_) => ErrorKind::Precondition,
            Error::InvalidKey(_)
            | Error::Signing(_)
            | Error::ChainIdMismatch { .. }
            | Error::Recovery(_) => ErrorKind::Signing,
            Error::Submission { .. } | Error::ConfirmationTimeout { .. } => ErrorKind::Submission,
        }
    }

    /// True only for transport-level failures (connection refused, timeouts, HTTP errors).
    /// JSON-RPC error responses from a reachable node are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransportError(RpcError::Transport(_)))
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::TransportError(err)
    }
}
