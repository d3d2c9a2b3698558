//! Deterministic keyword rules mapping a description to a category.
//!
//! Matching is substring-based on the folded description, so the order
//! of the tables below is the priority: a description hitting two groups
//! lands in whichever group comes first. The canonical key is only
//! consulted when the folded text falls through to the generic category.

use crate::finance::{Category, ExpenseCategory, IncomeCategory, TransactionKind};
use crate::normalize::{fold, Normalizer};

const SALE_KEYWORDS: &[&str] = &["venta", "vend"];

const PRODUCT_RULES: &[(&[&str], IncomeCategory)] = &[
    (&["huevo", "cubeta"], IncomeCategory::EggSale),
    (&["leche", "queso", "cuajada"], IncomeCategory::MilkSale),
    (
        &["ganado", "vaca", "novill", "ternero", "ternera", "toro", "becerro", "reses"],
        IncomeCategory::CattleSale,
    ),
    (&["cerdo", "marrano", "lechón", "lechon", "puerco"], IncomeCategory::PigSale),
    (&["pollo", "gallina", "pato", "pavo"], IncomeCategory::PoultrySale),
    (
        &["cosecha", "maíz", "maiz", "café", "cafe", "plátano", "platano", "yuca", "frijol", "fruta"],
        IncomeCategory::CropSale,
    ),
];

const EXPENSE_RULES: &[(&[&str], ExpenseCategory)] = &[
    (
        &["gasolina", "diesel", "diésel", "acpm", "combustible", "aceite"],
        ExpenseCategory::Fuel,
    ),
    (
        &["jornal", "salario", "sueldo", "mano de obra", "trabajador", "peón", "peon", "semanal"],
        ExpenseCategory::Labor,
    ),
    (
        &["deuda", "préstamo", "prestamo", "banco", "cuota", "crédito", "credito", "interés", "interes"],
        ExpenseCategory::Debt,
    ),
    (
        &[
            "abono", "fertilizante", "semilla", "concentrado", "alimento", "vacuna", "medicamento",
            "herbicida", "insecticida", "fumiga", "sal mineral", "purina",
        ],
        ExpenseCategory::Supplies,
    ),
    (
        &[
            "herramienta", "machete", "pala", "tractor", "repuesto", "maquinaria", "equipo",
            "alambre", "guadaña", "motosierra", "bomba",
        ],
        ExpenseCategory::Tools,
    ),
    (
        &["transporte", "flete", "acarreo", "pasaje", "camión", "camion", "peaje"],
        ExpenseCategory::Transport,
    ),
    (
        &[
            "luz", "agua", "energía", "energia", "internet", "teléfono", "telefono", "celular",
            "servicio", "veterinari",
        ],
        ExpenseCategory::Services,
    ),
];

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

/// Categorize a description by the fixed rule tables.
///
/// Returns `None` only when the description is empty; otherwise a category
/// of the given kind, falling back to the generic one when nothing matches.
pub fn categorize_by_rules(description: &str, kind: TransactionKind) -> Option<Category> {
    categorize_with(description, kind, Normalizer::builtin())
}

/// Like [`categorize_by_rules`], with `normalizer` supplying the canonical
/// key tried after the folded text.
pub fn categorize_with(
    description: &str,
    kind: TransactionKind,
    normalizer: &Normalizer,
) -> Option<Category> {
    let folded = fold(description);
    if folded.is_empty() {
        return None;
    }
    let category = match_tables(&folded, kind);
    if !category.is_fallback() {
        return Some(category);
    }
    let canonical = normalizer.normalize(description);
    if canonical == folded {
        return Some(category);
    }
    Some(match_tables(&canonical, kind))
}

fn match_tables(desc: &str, kind: TransactionKind) -> Category {
    match kind {
        TransactionKind::Income => {
            if !contains_any(desc, SALE_KEYWORDS) {
                Category::fallback(kind)
            } else {
                let product = PRODUCT_RULES
                    .iter()
                    .find(|(keywords, _)| contains_any(desc, keywords))
                    .map(|(_, c)| *c)
                    .unwrap_or(IncomeCategory::OtherProductSale);
                Category::Income(product)
            }
        }
        TransactionKind::Expense => EXPENSE_RULES
            .iter()
            .find(|(keywords, _)| contains_any(desc, keywords))
            .map(|(_, c)| Category::Expense(*c))
            .unwrap_or_else(|| Category::fallback(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(desc: &str) -> Option<Category> {
        categorize_by_rules(desc, TransactionKind::Expense)
    }

    fn income(desc: &str) -> Option<Category> {
        categorize_by_rules(desc, TransactionKind::Income)
    }

    #[test]
    fn test_empty_description_is_none() {
        assert_eq!(expense(""), None);
        assert_eq!(income("   "), None);
    }

    #[test]
    fn test_fuel_beats_tools() {
        // "tractor" is a tool keyword, but fuel is tested first.
        assert_eq!(
            expense("compra de gasolina para el tractor"),
            Some(Category::Expense(ExpenseCategory::Fuel))
        );
        assert_eq!(
            expense("repuesto del tractor"),
            Some(Category::Expense(ExpenseCategory::Tools))
        );
    }

    #[test]
    fn test_priority_independent_of_keyword_position() {
        let a = expense("flete y gasolina");
        let b = expense("gasolina y flete");
        assert_eq!(a, b);
        assert_eq!(a, Some(Category::Expense(ExpenseCategory::Fuel)));
    }

    #[test]
    fn test_expense_fallback() {
        assert_eq!(
            expense("pago varios"),
            Some(Category::Expense(ExpenseCategory::OtherExpense))
        );
    }

    #[test]
    fn test_expense_groups() {
        let cases = [
            ("Jornal de la semana", ExpenseCategory::Labor),
            ("cuota del banco agrario", ExpenseCategory::Debt),
            ("bultos de concentrado", ExpenseCategory::Supplies),
            ("machete nuevo", ExpenseCategory::Tools),
            ("Flete a la plaza", ExpenseCategory::Transport),
            ("recibo de la luz", ExpenseCategory::Services),
            ("visita del veterinario", ExpenseCategory::Services),
        ];
        for (desc, expected) in cases {
            assert_eq!(expense(desc), Some(Category::Expense(expected)), "{desc}");
        }
    }

    #[test]
    fn test_canonicalized_payment_is_labor() {
        assert_eq!(
            expense("Pago Pedro"),
            Some(Category::Expense(ExpenseCategory::Labor))
        );
    }

    #[test]
    fn test_canonical_key_cannot_hide_earlier_group() {
        // Canonicalizes to the weekly payment phrase, but the text itself
        // names fuel, which is tested before labor.
        assert_eq!(
            expense("pago a pedro por la gasolina"),
            Some(Category::Expense(ExpenseCategory::Fuel))
        );
        assert_eq!(
            income("venta de servicio veterinario"),
            Some(Category::Income(IncomeCategory::OtherProductSale))
        );
    }

    #[test]
    fn test_configured_rules_feed_categorization() {
        let n = Normalizer::with_rules(vec![crate::normalize::CanonicalRule::new(
            "pago de jornal",
            &[&["don luis"]],
        )])
        .unwrap();
        assert_eq!(
            expense("lo de don luis"),
            Some(Category::Expense(ExpenseCategory::OtherExpense))
        );
        assert_eq!(
            categorize_with("lo de don luis", TransactionKind::Expense, &n),
            Some(Category::Expense(ExpenseCategory::Labor))
        );
    }

    #[test]
    fn test_income_product_sales() {
        assert_eq!(
            income("Venta de 10 cubetas de huevos"),
            Some(Category::Income(IncomeCategory::EggSale))
        );
        assert_eq!(
            income("vendimos leche a la cooperativa"),
            Some(Category::Income(IncomeCategory::MilkSale))
        );
        assert_eq!(
            income("venta novillo"),
            Some(Category::Income(IncomeCategory::CattleSale))
        );
        assert_eq!(
            income("venta de lechones"),
            Some(Category::Income(IncomeCategory::PigSale))
        );
    }

    #[test]
    fn test_income_sale_without_known_product() {
        assert_eq!(
            income("venta de leña"),
            Some(Category::Income(IncomeCategory::OtherProductSale))
        );
    }

    #[test]
    fn test_income_without_sale_keyword_is_generic() {
        assert_eq!(
            income("leche para la casa"),
            Some(Category::Income(IncomeCategory::OtherIncome))
        );
        assert_eq!(
            income("subsidio del gobierno"),
            Some(Category::Income(IncomeCategory::OtherIncome))
        );
    }

    #[test]
    fn test_result_kind_matches_request() {
        for desc in ["gasolina", "venta huevos", "nada", "pago pedro"] {
            for kind in [TransactionKind::Income, TransactionKind::Expense] {
                assert_eq!(categorize_by_rules(desc, kind).unwrap().kind(), kind);
            }
        }
    }
}
