//! Typed errors raised by the core engine.

use rust_decimal::Decimal;

use crate::finance::{Category, TransactionKind};

/// Violations of the transaction invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Amounts are magnitudes; direction lives in the transaction type.
    #[error("transaction {id}: amount {amount} is negative")]
    NegativeAmount { id: String, amount: Decimal },
    #[error("category '{category}' cannot be used for {kind} transactions")]
    CategoryKindMismatch {
        category: Category,
        kind: TransactionKind,
    },
    #[error("unknown transaction type '{0}' (expected ingreso or gasto)")]
    UnknownKind(String),
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
}

/// Rejected canonicalization rule sets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizerError {
    #[error("canonical phrase '{canonical}' normalizes to '{normalized}'")]
    NotIdempotent { canonical: String, normalized: String },
    #[error("rule for '{0}' has no keywords")]
    EmptyRule(String),
}

/// Failures of a secondary classifier. The orchestrator never lets these
/// escape; they are logged and downgraded to the fallback suggestion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier not configured: {0}")]
    NotConfigured(String),
    #[error("classifier transport error: {0}")]
    Transport(String),
    #[error("classifier returned {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("classifier answered with unknown category '{0}'")]
    UnknownCategory(String),
}
