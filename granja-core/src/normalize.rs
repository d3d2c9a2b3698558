//! Description normalization: folds free-text descriptions onto stable
//! grouping keys.
//!
//! Folding is lowercase + trim. Canonicalization rules then collapse known
//! variants ("pago pedro", "semana de pedro", ...) onto one phrase. Rules
//! are tried in order and the first match wins.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::NormalizerError;

/// Key used for empty or missing descriptions.
pub const NO_DESCRIPTION: &str = "sin descripción";

/// Rewrites a description to `canonical` when every keyword group has at
/// least one keyword present in the folded text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalRule {
    pub canonical: String,
    pub keywords: Vec<Vec<String>>,
}

impl CanonicalRule {
    pub fn new(canonical: &str, keywords: &[&[&str]]) -> Self {
        Self {
            canonical: canonical.to_string(),
            keywords: keywords
                .iter()
                .map(|group| group.iter().map(|k| k.to_string()).collect())
                .collect(),
        }
    }

    fn matches(&self, folded: &str) -> bool {
        self.keywords
            .iter()
            .all(|group| group.iter().any(|k| folded.contains(k.as_str())))
    }

    fn folded(&self) -> Self {
        Self {
            canonical: fold(&self.canonical),
            keywords: self
                .keywords
                .iter()
                .map(|group| group.iter().map(|k| fold(k)).filter(|k| !k.is_empty()).collect())
                .collect(),
        }
    }
}

const PAYMENT_TERMS: &[&str] = &["pago", "semana", "quincena", "jornal"];

fn builtin_rules() -> Vec<CanonicalRule> {
    vec![
        CanonicalRule::new("pago semanal pedro", &[&["pedro"], PAYMENT_TERMS]),
        CanonicalRule::new("pago semanal maria", &[&["maria", "maría"], PAYMENT_TERMS]),
        CanonicalRule::new(
            "consulta veterinario",
            &[&["veterinari"], &["visita", "consulta", "servicio"]],
        ),
        CanonicalRule::new("venta de huevos", &[&["huevo"], &["venta", "vend"]]),
    ]
}

static DEFAULT: LazyLock<Normalizer> = LazyLock::new(|| Normalizer {
    rules: builtin_rules(),
});

/// Normalize with the built-in rule set.
pub fn normalize_description(description: &str) -> String {
    DEFAULT.normalize(description)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    rules: Vec<CanonicalRule>,
}

impl Default for Normalizer {
    fn default() -> Self {
        DEFAULT.clone()
    }
}

impl Normalizer {
    /// The shared built-in rule set.
    pub fn builtin() -> &'static Normalizer {
        &DEFAULT
    }

    /// Built-in rules followed by `extra`. Fails if any canonical phrase
    /// would not map to itself, which would break idempotence.
    pub fn with_rules(extra: Vec<CanonicalRule>) -> Result<Self, NormalizerError> {
        let mut rules = builtin_rules();
        for rule in extra {
            let rule = rule.folded();
            if rule.keywords.is_empty() || rule.keywords.iter().any(|g| g.is_empty()) {
                return Err(NormalizerError::EmptyRule(rule.canonical));
            }
            rules.push(rule);
        }
        let normalizer = Self { rules };

        let fixed_points = normalizer
            .rules
            .iter()
            .map(|r| r.canonical.as_str())
            .chain(std::iter::once(NO_DESCRIPTION));
        for canonical in fixed_points {
            let normalized = normalizer.normalize(canonical);
            if normalized != canonical {
                return Err(NormalizerError::NotIdempotent {
                    canonical: canonical.to_string(),
                    normalized,
                });
            }
        }
        Ok(normalizer)
    }

    pub fn rules(&self) -> &[CanonicalRule] {
        &self.rules
    }

    pub fn normalize(&self, description: &str) -> String {
        let folded = fold(description);
        if folded.is_empty() {
            return NO_DESCRIPTION.to_string();
        }
        self.rules
            .iter()
            .find(|r| r.matches(&folded))
            .map(|r| r.canonical.clone())
            .unwrap_or(folded)
    }
}

pub(crate) fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}
