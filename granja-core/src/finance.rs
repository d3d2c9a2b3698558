//! Ledger record types: transactions, their direction, and the closed
//! category enumeration.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::categorizer::categorize_by_rules;
use crate::error::LedgerError;

/// Direction of a transaction. Amounts are always non-negative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    #[serde(rename = "ingreso")]
    Income,
    #[serde(rename = "gasto")]
    Expense,
}

impl TransactionKind {
    pub fn code(&self) -> &'static str {
        match self {
            TransactionKind::Income => "ingreso",
            TransactionKind::Expense => "gasto",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ingreso" | "income" => Ok(TransactionKind::Income),
            "gasto" | "expense" => Ok(TransactionKind::Expense),
            other => Err(LedgerError::UnknownKind(other.to_string())),
        }
    }
}

/// Expense categories, in the order the rule table tests them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExpenseCategory {
    #[serde(rename = "combustible")]
    Fuel,
    #[serde(rename = "mano_de_obra")]
    Labor,
    #[serde(rename = "deudas")]
    Debt,
    #[serde(rename = "insumos")]
    Supplies,
    #[serde(rename = "herramientas")]
    Tools,
    #[serde(rename = "transporte")]
    Transport,
    #[serde(rename = "servicios")]
    Services,
    #[serde(rename = "otros_gastos")]
    OtherExpense,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 8] = [
        ExpenseCategory::Fuel,
        ExpenseCategory::Labor,
        ExpenseCategory::Debt,
        ExpenseCategory::Supplies,
        ExpenseCategory::Tools,
        ExpenseCategory::Transport,
        ExpenseCategory::Services,
        ExpenseCategory::OtherExpense,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ExpenseCategory::Fuel => "combustible",
            ExpenseCategory::Labor => "mano_de_obra",
            ExpenseCategory::Debt => "deudas",
            ExpenseCategory::Supplies => "insumos",
            ExpenseCategory::Tools => "herramientas",
            ExpenseCategory::Transport => "transporte",
            ExpenseCategory::Services => "servicios",
            ExpenseCategory::OtherExpense => "otros_gastos",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpenseCategory::Fuel => "Combustible",
            ExpenseCategory::Labor => "Mano de obra",
            ExpenseCategory::Debt => "Deudas y préstamos",
            ExpenseCategory::Supplies => "Insumos agrícolas",
            ExpenseCategory::Tools => "Herramientas y equipo",
            ExpenseCategory::Transport => "Transporte",
            ExpenseCategory::Services => "Servicios",
            ExpenseCategory::OtherExpense => "Otros gastos",
        }
    }
}

/// Income categories. Product sales come first, generic income last.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IncomeCategory {
    #[serde(rename = "venta_huevos")]
    EggSale,
    #[serde(rename = "venta_leche")]
    MilkSale,
    #[serde(rename = "venta_ganado")]
    CattleSale,
    #[serde(rename = "venta_cerdos")]
    PigSale,
    #[serde(rename = "venta_aves")]
    PoultrySale,
    #[serde(rename = "venta_cosecha")]
    CropSale,
    #[serde(rename = "venta_otros_productos")]
    OtherProductSale,
    #[serde(rename = "otros_ingresos")]
    OtherIncome,
}

impl IncomeCategory {
    pub const ALL: [IncomeCategory; 8] = [
        IncomeCategory::EggSale,
        IncomeCategory::MilkSale,
        IncomeCategory::CattleSale,
        IncomeCategory::PigSale,
        IncomeCategory::PoultrySale,
        IncomeCategory::CropSale,
        IncomeCategory::OtherProductSale,
        IncomeCategory::OtherIncome,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            IncomeCategory::EggSale => "venta_huevos",
            IncomeCategory::MilkSale => "venta_leche",
            IncomeCategory::CattleSale => "venta_ganado",
            IncomeCategory::PigSale => "venta_cerdos",
            IncomeCategory::PoultrySale => "venta_aves",
            IncomeCategory::CropSale => "venta_cosecha",
            IncomeCategory::OtherProductSale => "venta_otros_productos",
            IncomeCategory::OtherIncome => "otros_ingresos",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IncomeCategory::EggSale => "Venta de huevos",
            IncomeCategory::MilkSale => "Venta de leche",
            IncomeCategory::CattleSale => "Venta de ganado",
            IncomeCategory::PigSale => "Venta de cerdos",
            IncomeCategory::PoultrySale => "Venta de aves",
            IncomeCategory::CropSale => "Venta de cosecha",
            IncomeCategory::OtherProductSale => "Venta de otros productos",
            IncomeCategory::OtherIncome => "Otros ingresos",
        }
    }
}

/// A category is always tied to one transaction kind. Serialized as its
/// wire code; the two code sets are disjoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum Category {
    Income(IncomeCategory),
    Expense(ExpenseCategory),
}

impl Category {
    /// Generic per-kind category used when no rule matches.
    pub fn fallback(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Income => Category::Income(IncomeCategory::OtherIncome),
            TransactionKind::Expense => Category::Expense(ExpenseCategory::OtherExpense),
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == Category::fallback(self.kind())
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            Category::Income(_) => TransactionKind::Income,
            Category::Expense(_) => TransactionKind::Expense,
        }
    }

    /// Every category valid for `kind`, fallback last.
    pub fn all(kind: TransactionKind) -> Vec<Category> {
        match kind {
            TransactionKind::Income => IncomeCategory::ALL.iter().copied().map(Category::Income).collect(),
            TransactionKind::Expense => ExpenseCategory::ALL.iter().copied().map(Category::Expense).collect(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Category::Income(c) => c.code(),
            Category::Expense(c) => c.code(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Income(c) => c.label(),
            Category::Expense(c) => c.label(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        Category::all(TransactionKind::Income)
            .into_iter()
            .chain(Category::all(TransactionKind::Expense))
            .find(|c| c.code() == code)
            .ok_or(LedgerError::UnknownCategory(code))
    }
}

/// A dated income or expense record.
///
/// `date` is `None` when the source carried a date that could not be
/// parsed; such records still count toward totals but not toward
/// date-bucketed views.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Transaction {
    id: String,
    date: Option<NaiveDate>,
    #[serde(rename = "type")]
    kind: TransactionKind,
    description: Option<String>,
    amount: Decimal,
    category: Category,
    category_pinned: bool,
}

impl Transaction {
    /// Create a transaction, deriving its category from the description.
    pub fn new(
        id: impl Into<String>,
        date: Option<NaiveDate>,
        kind: TransactionKind,
        description: Option<String>,
        amount: Decimal,
    ) -> Result<Self, LedgerError> {
        let id = id.into();
        if amount < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount { id, amount });
        }
        let category = derive_category(description.as_deref(), kind);
        Ok(Self {
            id,
            date,
            kind,
            description,
            amount,
            category,
            category_pinned: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn is_category_pinned(&self) -> bool {
        self.category_pinned
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    /// Income adds, expense subtracts.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }

    /// Replace the description and, unless the category is pinned,
    /// recompute the category from the new text.
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        if !self.category_pinned {
            self.category = derive_category(self.description.as_deref(), self.kind);
        }
    }

    /// Manual override. The category must belong to this transaction's kind.
    pub fn pin_category(&mut self, category: Category) -> Result<(), LedgerError> {
        if category.kind() != self.kind {
            return Err(LedgerError::CategoryKindMismatch {
                category,
                kind: self.kind,
            });
        }
        self.category = category;
        self.category_pinned = true;
        Ok(())
    }

    /// Drop a manual override and return to the rule-derived category.
    pub fn unpin_category(&mut self) {
        self.category_pinned = false;
        self.category = derive_category(self.description.as_deref(), self.kind);
    }
}

fn derive_category(description: Option<&str>, kind: TransactionKind) -> Category {
    description
        .and_then(|d| categorize_by_rules(d, kind))
        .unwrap_or_else(|| Category::fallback(kind))
}
