//! granja-core: categorization and aggregation engine for the farm ledger

pub mod aggregate;
pub mod categorizer;
pub mod error;
pub mod finance;
pub mod normalize;
pub mod orchestrator;
pub mod report;

pub use aggregate::{
    annual_rollup, monthly_rollup, rollup, running_balances, sort_by_date, totals, BalanceRow,
    Bucket, Period, Rollup, Totals,
};
pub use categorizer::{categorize_by_rules, categorize_with};
pub use error::{ClassifierError, LedgerError, NormalizerError};
pub use finance::{Category, ExpenseCategory, IncomeCategory, Transaction, TransactionKind};
pub use normalize::{normalize_description, CanonicalRule, Normalizer, NO_DESCRIPTION};
pub use orchestrator::{
    categorize_transaction, CategorySuggestion, HybridCategorizer, SecondaryClassifier,
    StubClassifier, SuggestionSource, AI_CONFIDENCE, ERROR_CONFIDENCE, RULES_CONFIDENCE,
};
pub use report::{
    category_breakdown, CategoryTotal, ChartPoint, DateRange, DescriptionGroup, GroupKey, Report,
    ReportAssembler, ReportKind, DEFAULT_TOP_N,
};
