//! Hybrid categorization: keyword rules first, a secondary classifier only
//! when the rules fall through to the generic category.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::categorizer::categorize_with;
use crate::normalize::Normalizer;
use crate::error::ClassifierError;
use crate::finance::{Category, TransactionKind};

pub const RULES_CONFIDENCE: f64 = 0.95;
pub const AI_CONFIDENCE: f64 = 0.75;
pub const ERROR_CONFIDENCE: f64 = 0.5;

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SuggestionSource {
    #[serde(rename = "rules")]
    Rules,
    #[serde(rename = "ai")]
    Ai,
}

/// A category proposal shown to the user before saving. Never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CategorySuggestion {
    pub category: Category,
    pub confidence: f64,
    pub source: SuggestionSource,
}

/// Classifier consulted when the rules only produce the generic category.
#[async_trait]
pub trait SecondaryClassifier: Send + Sync {
    async fn classify(
        &self,
        description: &str,
        kind: TransactionKind,
    ) -> Result<Category, ClassifierError>;
}

/// Always answers with the generic category for the kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubClassifier;

#[async_trait]
impl SecondaryClassifier for StubClassifier {
    async fn classify(
        &self,
        _description: &str,
        kind: TransactionKind,
    ) -> Result<Category, ClassifierError> {
        Ok(Category::fallback(kind))
    }
}

pub struct HybridCategorizer<C> {
    secondary: C,
    normalizer: Normalizer,
}

impl Default for HybridCategorizer<StubClassifier> {
    fn default() -> Self {
        Self::new(StubClassifier)
    }
}

impl<C: SecondaryClassifier> HybridCategorizer<C> {
    pub fn new(secondary: C) -> Self {
        Self {
            secondary,
            normalizer: Normalizer::default(),
        }
    }

    /// Canonical keys from `normalizer` are consulted by the rule step.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Suggest a category. Never fails: classifier errors degrade to the
    /// generic category at the lowest confidence.
    pub async fn categorize(&self, description: &str, kind: TransactionKind) -> CategorySuggestion {
        if let Some(category) = categorize_with(description, kind, &self.normalizer)
            && !category.is_fallback()
        {
            return CategorySuggestion {
                category,
                confidence: RULES_CONFIDENCE,
                source: SuggestionSource::Rules,
            };
        }

        match self.secondary.classify(description, kind).await {
            Ok(category) if category.kind() == kind => {
                debug!(%category, %kind, "secondary classifier answered");
                CategorySuggestion {
                    category,
                    confidence: AI_CONFIDENCE,
                    source: SuggestionSource::Ai,
                }
            }
            Ok(category) => {
                warn!(%category, %kind, "secondary classifier answered with a category of the wrong kind");
                degraded(kind)
            }
            Err(err) => {
                warn!(error = %err, %kind, "secondary classifier failed; using generic category");
                degraded(kind)
            }
        }
    }
}

fn degraded(kind: TransactionKind) -> CategorySuggestion {
    CategorySuggestion {
        category: Category::fallback(kind),
        confidence: ERROR_CONFIDENCE,
        source: SuggestionSource::Rules,
    }
}

/// Hybrid categorization with the stub secondary classifier.
pub async fn categorize_transaction(description: &str, kind: TransactionKind) -> CategorySuggestion {
    HybridCategorizer::default().categorize(description, kind).await
}
