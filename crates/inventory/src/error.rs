use thiserror::Error;

use printshop_core::{DomainError, RecordId};

/// Every way a ledger command can be rejected.
///
/// All variants are recoverable: a rejected command leaves the ledger untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("print code '{0}' is already registered")]
    DuplicateCode(String),

    #[error("batch '{0}' is already defined")]
    DuplicateBatch(String),

    #[error("print '{0}' not found")]
    PrintNotFound(String),

    #[error("batch '{0}' not found")]
    BatchNotFound(String),

    #[error("inventory record {0} not found")]
    RecordNotFound(RecordId),

    #[error("no in-process stock for print '{0}'")]
    NoInProcessStock(String),

    #[error("requested {requested} of '{code}' but only {available} available")]
    InsufficientQuantity {
        code: String,
        requested: u64,
        available: u64,
    },

    #[error("{candidates} in-process lots match print '{code}'")]
    AmbiguousMatch { code: String, candidates: usize },

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("batch entry {index} ('{code}') rejected: {source}")]
    BatchEntryFailed {
        index: usize,
        code: String,
        #[source]
        source: Box<LedgerError>,
    },
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    /// The failure that actually rejected the command.
    ///
    /// For batch failures this is the offending entry's error.
    pub fn root(&self) -> &LedgerError {
        match self {
            LedgerError::BatchEntryFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stable machine-readable identifier (used in API error bodies).
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::DuplicateCode(_) => "duplicate_code",
            LedgerError::DuplicateBatch(_) => "duplicate_batch",
            LedgerError::PrintNotFound(_) => "print_not_found",
            LedgerError::BatchNotFound(_) => "batch_not_found",
            LedgerError::RecordNotFound(_) => "record_not_found",
            LedgerError::NoInProcessStock(_) => "no_in_process_stock",
            LedgerError::InsufficientQuantity { .. } => "insufficient_quantity",
            LedgerError::AmbiguousMatch { .. } => "ambiguous_match",
            LedgerError::InvalidQuantity(_) => "invalid_quantity",
            LedgerError::Validation(_) => "validation_error",
            LedgerError::BatchEntryFailed { source, .. } => source.kind(),
        }
    }
}

impl From<LedgerError> for DomainError {
    fn from(err: LedgerError) -> Self {
        let msg = err.to_string();
        match err.root() {
            LedgerError::DuplicateCode(_) | LedgerError::DuplicateBatch(_) => DomainError::Conflict(msg),
            LedgerError::PrintNotFound(_)
            | LedgerError::BatchNotFound(_)
            | LedgerError::RecordNotFound(_) => DomainError::NotFound(msg),
            LedgerError::NoInProcessStock(_)
            | LedgerError::InsufficientQuantity { .. }
            | LedgerError::AmbiguousMatch { .. } => DomainError::InvariantViolation(msg),
            _ => DomainError::Validation(msg),
        }
    }
}
