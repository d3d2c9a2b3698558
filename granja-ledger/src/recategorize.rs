//! Suggestion pass over a loaded ledger: ask the hybrid categorizer about
//! rows the rules leave generic, then optionally accept the answers.

use granja_core::{CategorySuggestion, HybridCategorizer, SecondaryClassifier, SuggestionSource, Transaction};
use serde::Serialize;
use tracing::info;

/// A suggestion for one ledger row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSuggestion {
    pub id: String,
    pub suggestion: CategorySuggestion,
}

pub struct Recategorizer;

impl Recategorizer {
    /// Suggestions for unpinned rows whose category is the generic one.
    /// Requests are made one at a time, in ledger order.
    pub async fn suggest_generic<C: SecondaryClassifier>(
        categorizer: &HybridCategorizer<C>,
        txns: &[Transaction],
    ) -> Vec<RowSuggestion> {
        let mut out = Vec::new();
        for txn in txns
            .iter()
            .filter(|t| !t.is_category_pinned() && t.category().is_fallback())
        {
            let suggestion = categorizer
                .categorize(txn.description().unwrap_or(""), txn.kind())
                .await;
            out.push(RowSuggestion {
                id: txn.id().to_string(),
                suggestion,
            });
        }
        out
    }

    /// Pin every classifier suggestion that names a specific category.
    /// Generic answers and degraded results are left alone. Returns how many
    /// rows were pinned.
    pub fn accept(txns: &mut [Transaction], suggestions: &[RowSuggestion]) -> usize {
        let mut accepted = 0;
        for s in suggestions {
            if s.suggestion.source != SuggestionSource::Ai || s.suggestion.category.is_fallback() {
                continue;
            }
            let Some(txn) = txns.iter_mut().find(|t| t.id() == s.id) else {
                continue;
            };
            if txn.pin_category(s.suggestion.category).is_ok() {
                accepted += 1;
            }
        }
        info!(suggested = suggestions.len(), accepted, "accepted classifier suggestions");
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use granja_core::{
        Category, ClassifierError, ExpenseCategory, TransactionKind, AI_CONFIDENCE,
    };
    use rust_decimal::Decimal;

    fn expense(id: &str, desc: &str) -> Transaction {
        Transaction::new(id, None, TransactionKind::Expense, Some(desc.to_string()), Decimal::ONE)
            .unwrap()
    }

    struct Fixed(Category);

    #[async_trait::async_trait]
    impl SecondaryClassifier for Fixed {
        async fn classify(
            &self,
            _description: &str,
            _kind: TransactionKind,
        ) -> Result<Category, ClassifierError> {
            Ok(self.0)
        }
    }

    fn ledger() -> Vec<Transaction> {
        let mut pinned = expense("p", "cosas");
        pinned
            .pin_category(Category::Expense(ExpenseCategory::OtherExpense))
            .unwrap();
        vec![expense("a", "gasolina"), expense("b", "pago varios"), pinned]
    }

    #[tokio::test]
    async fn test_suggest_generic_skips_matched_and_pinned() {
        let txns = ledger();
        let c = HybridCategorizer::new(Fixed(Category::Expense(ExpenseCategory::Services)));
        let out = Recategorizer::suggest_generic(&c, &txns).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "b");
        assert_eq!(out[0].suggestion.source, SuggestionSource::Ai);
        assert_eq!(out[0].suggestion.confidence, AI_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_accept_pins_specific_answers() {
        let mut txns = ledger();
        let c = HybridCategorizer::new(Fixed(Category::Expense(ExpenseCategory::Services)));
        let out = Recategorizer::suggest_generic(&c, &txns).await;
        assert_eq!(Recategorizer::accept(&mut txns, &out), 1);
        assert!(txns[1].is_category_pinned());
        assert_eq!(txns[1].category(), Category::Expense(ExpenseCategory::Services));
    }

    #[tokio::test]
    async fn test_accept_ignores_generic_answers() {
        let mut txns = ledger();
        let c = HybridCategorizer::default();
        let out = Recategorizer::suggest_generic(&c, &txns).await;
        assert_eq!(out.len(), 1);
        assert_eq!(Recategorizer::accept(&mut txns, &out), 0);
        assert!(!txns[1].is_category_pinned());
    }
}
