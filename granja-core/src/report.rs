//! Report assembly: date/type filtering, per-description grouping, and
//! chart-ready series.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::{running_balances, totals, BalanceRow, Totals};
use crate::finance::{Category, Transaction, TransactionKind};
use crate::normalize::{Normalizer, NO_DESCRIPTION};

pub const DEFAULT_TOP_N: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    All,
    Incomes,
    Expenses,
    ByDescription,
}

impl ReportKind {
    fn admits(&self, txn: &Transaction) -> bool {
        match self {
            ReportKind::Incomes => txn.is_income(),
            ReportKind::Expenses => txn.is_expense(),
            ReportKind::All | ReportKind::ByDescription => true,
        }
    }
}

/// Inclusive date range. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Undated transactions only pass an unbounded range.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        let Some(date) = date else {
            return self.is_unbounded();
        };
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

/// How descriptions are turned into group keys.
///
/// Reports group by the raw description while the chart detail view groups
/// by the normalized one, so the two can show different totals for the
/// same data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    #[default]
    Raw,
    Normalized,
}

impl GroupKey {
    pub fn key_for(&self, txn: &Transaction, normalizer: &Normalizer) -> String {
        match self {
            GroupKey::Raw => match txn.description() {
                Some(d) if !d.trim().is_empty() => d.to_string(),
                _ => NO_DESCRIPTION.to_string(),
            },
            GroupKey::Normalized => normalizer.normalize(txn.description().unwrap_or("")),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DescriptionGroup {
    pub key: String,
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChartPoint {
    pub label: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: Category,
    pub label: &'static str,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Report<'a> {
    pub kind: ReportKind,
    pub range: DateRange,
    pub rows: Vec<BalanceRow<'a>>,
    pub totals: Totals,
    pub groups: Vec<DescriptionGroup>,
    pub series: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportAssembler {
    top_n: usize,
    group_key: GroupKey,
    normalizer: Normalizer,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            group_key: GroupKey::Raw,
            normalizer: Normalizer::default(),
        }
    }
}

impl ReportAssembler {
    /// Assembler for the chart detail view, which groups by normalized
    /// description.
    pub fn chart_detail() -> Self {
        Self {
            group_key: GroupKey::Normalized,
            ..Self::default()
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_group_key(mut self, group_key: GroupKey) -> Self {
        self.group_key = group_key;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn group_key(&self) -> GroupKey {
        self.group_key
    }

    pub fn filter<'a>(
        &self,
        txns: &'a [Transaction],
        range: &DateRange,
        kind: ReportKind,
    ) -> Vec<&'a Transaction> {
        txns.iter()
            .filter(|t| range.contains(t.date()) && kind.admits(t))
            .collect()
    }

    /// Group by description key, preserving first-seen order.
    pub fn group<'a>(&self, txns: impl IntoIterator<Item = &'a Transaction>) -> Vec<DescriptionGroup> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut sums: Vec<(String, Totals)> = Vec::new();
        for t in txns {
            let key = self.group_key.key_for(t, &self.normalizer);
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                sums.push((key, Totals::default()));
                sums.len() - 1
            });
            sums[slot].1.add(t);
        }
        sums.into_iter()
            .map(|(key, t)| DescriptionGroup {
                key,
                income: t.income,
                expense: t.expense,
                net: t.balance,
            })
            .collect()
    }

    pub fn assemble<'a>(
        &self,
        txns: &'a [Transaction],
        range: &DateRange,
        kind: ReportKind,
    ) -> Report<'a> {
        let filtered = self.filter(txns, range, kind);
        let totals = totals(filtered.iter().copied());
        let grouped = self.group(filtered.iter().copied());

        let series = match kind {
            ReportKind::All => [("Ingresos", totals.income), ("Gastos", totals.expense)]
                .into_iter()
                .filter(|(_, v)| !v.is_zero())
                .map(|(label, value)| ChartPoint {
                    label: label.to_string(),
                    value,
                })
                .collect(),
            ReportKind::Incomes => self.top_series(&grouped, |g| g.income, |g| g.income),
            ReportKind::Expenses => self.top_series(&grouped, |g| g.expense, |g| g.expense),
            ReportKind::ByDescription => self.top_series(&grouped, |g| g.net.abs(), |g| g.net),
        };

        let groups = if kind == ReportKind::ByDescription {
            grouped
        } else {
            Vec::new()
        };

        Report {
            kind,
            range: *range,
            rows: running_balances(filtered),
            totals,
            groups,
            series,
        }
    }

    /// Sort descending by `magnitude` (stable, so ties keep first-seen
    /// order) and keep the first `top_n`.
    fn top_series(
        &self,
        groups: &[DescriptionGroup],
        magnitude: impl Fn(&DescriptionGroup) -> Decimal,
        value: impl Fn(&DescriptionGroup) -> Decimal,
    ) -> Vec<ChartPoint> {
        let mut ranked: Vec<&DescriptionGroup> = groups.iter().collect();
        ranked.sort_by(|a, b| magnitude(b).cmp(&magnitude(a)));
        ranked
            .into_iter()
            .take(self.top_n)
            .map(|g| ChartPoint {
                label: g.key.clone(),
                value: value(g),
            })
            .collect()
    }
}

/// Per-category sums for one kind, largest first.
pub fn category_breakdown<'a>(
    txns: impl IntoIterator<Item = &'a Transaction>,
    kind: TransactionKind,
) -> Vec<CategoryTotal> {
    let mut out: Vec<CategoryTotal> = Category::all(kind)
        .into_iter()
        .map(|category| CategoryTotal {
            category,
            label: category.label(),
            total: Decimal::ZERO,
            count: 0,
        })
        .collect();
    for t in txns.into_iter().filter(|t| t.kind() == kind) {
        if let Some(entry) = out.iter_mut().find(|c| c.category == t.category()) {
            entry.total += t.amount();
            entry.count += 1;
        }
    }
    out.retain(|c| c.count > 0);
    out.sort_by(|a, b| b.total.cmp(&a.total));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::ExpenseCategory;

    fn day(m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, m, d)
    }

    fn txn(id: &str, date: Option<NaiveDate>, kind: TransactionKind, desc: &str, amount: i64) -> Transaction {
        Transaction::new(id, date, kind, Some(desc.to_string()), Decimal::from(amount)).unwrap()
    }

    fn sample() -> Vec<Transaction> {
        vec![
            txn("1", day(1, 5), TransactionKind::Income, "Venta huevos", 120),
            txn("2", day(1, 9), TransactionKind::Expense, "Gasolina", 40),
            txn("3", day(2, 1), TransactionKind::Expense, "Pago Pedro", 60),
            txn("4", day(2, 8), TransactionKind::Expense, "semana pedro", 60),
            txn("5", day(3, 2), TransactionKind::Income, "Venta huevos", 80),
            txn("6", None, TransactionKind::Expense, "Gasolina", 15),
        ]
    }

    #[test]
    fn test_date_range_bounds() {
        let r = DateRange::new(day(1, 9), day(2, 8));
        assert!(r.contains(day(1, 9)));
        assert!(r.contains(day(2, 8)));
        assert!(!r.contains(day(1, 8)));
        assert!(!r.contains(day(2, 9)));
        assert!(!r.contains(None));

        let open_end = DateRange::new(day(2, 1), None);
        assert!(open_end.contains(day(12, 31)));
        assert!(!open_end.contains(day(1, 31)));

        assert!(DateRange::default().contains(None));
    }

    #[test]
    fn test_filter_by_range_and_kind() {
        let txns = sample();
        let a = ReportAssembler::default();
        let range = DateRange::new(day(1, 1), day(2, 28));
        let ids: Vec<&str> = a
            .filter(&txns, &range, ReportKind::Expenses)
            .iter()
            .map(|t| t.id())
            .collect();
        assert_eq!(ids, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_all_series_has_two_points() {
        let txns = sample();
        let r = ReportAssembler::default().assemble(&txns, &DateRange::default(), ReportKind::All);
        assert_eq!(r.series.len(), 2);
        assert_eq!(r.series[0].label, "Ingresos");
        assert_eq!(r.series[0].value, Decimal::from(200));
        assert_eq!(r.series[1].value, Decimal::from(175));
        assert!(r.groups.is_empty());
        assert_eq!(r.rows.last().unwrap().running_balance, r.totals.balance);
    }

    #[test]
    fn test_all_series_omits_zero() {
        let txns = sample();
        let range = DateRange::new(day(2, 1), day(2, 28));
        let r = ReportAssembler::default().assemble(&txns, &range, ReportKind::All);
        assert_eq!(r.series.len(), 1);
        assert_eq!(r.series[0].label, "Gastos");
    }

    #[test]
    fn test_top_n_truncation() {
        let txns: Vec<Transaction> = (1..=10)
            .map(|i| {
                txn(
                    &i.to_string(),
                    day(4, i),
                    TransactionKind::Expense,
                    &format!("gasto {i}"),
                    i as i64 * 10,
                )
            })
            .collect();
        let r = ReportAssembler::default().assemble(&txns, &DateRange::default(), ReportKind::Expenses);
        assert_eq!(r.series.len(), 8);
        assert_eq!(r.series[0].label, "gasto 10");
        assert_eq!(r.series[0].value, Decimal::from(100));
        for w in r.series.windows(2) {
            assert!(w[0].value >= w[1].value);
        }
        assert_eq!(r.series[7].value, Decimal::from(30));
    }

    #[test]
    fn test_raw_and_normalized_grouping_differ() {
        let txns = sample();
        let raw = ReportAssembler::default().assemble(&txns, &DateRange::default(), ReportKind::ByDescription);
        let detail = ReportAssembler::chart_detail().assemble(&txns, &DateRange::default(), ReportKind::ByDescription);

        let raw_keys: Vec<&str> = raw.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(raw_keys, vec!["Venta huevos", "Gasolina", "Pago Pedro", "semana pedro"]);

        let detail_keys: Vec<&str> = detail.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(detail_keys, vec!["venta de huevos", "gasolina", "pago semanal pedro"]);
        let pedro = &detail.groups[2];
        assert_eq!(pedro.expense, Decimal::from(120));
        assert_eq!(pedro.net, Decimal::from(-120));
    }

    #[test]
    fn test_by_description_series_sorted_by_magnitude() {
        let txns = sample();
        let r = ReportAssembler::chart_detail().assemble(&txns, &DateRange::default(), ReportKind::ByDescription);
        let labels: Vec<&str> = r.series.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["venta de huevos", "pago semanal pedro", "gasolina"]);
        assert_eq!(r.series[1].value, Decimal::from(-120));
    }

    #[test]
    fn test_configured_normalizer_drives_grouping() {
        use crate::normalize::CanonicalRule;

        let txns = vec![
            txn("1", day(5, 1), TransactionKind::Expense, "Alquiler del lote", 300),
            txn("2", day(6, 1), TransactionKind::Expense, "arriendo potrero", 300),
        ];
        let normalizer = Normalizer::with_rules(vec![CanonicalRule::new(
            "arriendo potrero",
            &[&["arriendo", "alquiler"], &["potrero", "lote"]],
        )])
        .unwrap();
        let r = ReportAssembler::chart_detail()
            .with_normalizer(normalizer)
            .assemble(&txns, &DateRange::default(), ReportKind::ByDescription);
        assert_eq!(r.groups.len(), 1);
        assert_eq!(r.groups[0].expense, Decimal::from(600));
    }

    #[test]
    fn test_empty_report() {
        let r = ReportAssembler::default().assemble(&[], &DateRange::default(), ReportKind::Incomes);
        assert!(r.rows.is_empty());
        assert!(r.series.is_empty());
        assert_eq!(r.totals, Totals::default());
    }

    #[test]
    fn test_category_breakdown() {
        let txns = sample();
        let b = category_breakdown(&txns, TransactionKind::Expense);
        assert_eq!(b[0].category, Category::Expense(ExpenseCategory::Labor));
        assert_eq!(b[0].total, Decimal::from(120));
        assert_eq!(b[1].category, Category::Expense(ExpenseCategory::Fuel));
        assert_eq!(b[1].count, 2);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_category_breakdown_over_report_rows() {
        let txns = sample();
        let range = DateRange::new(day(2, 1), day(2, 28));
        let report = ReportAssembler::default().assemble(&txns, &range, ReportKind::Expenses);
        let b = category_breakdown(report.rows.iter().map(|r| r.transaction), TransactionKind::Expense);
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].category, Category::Expense(ExpenseCategory::Labor));
        assert_eq!(b[0].count, 2);
        assert_eq!(b[0].total, Decimal::from(120));
    }

    #[test]
    fn test_group_net_is_income_minus_expense() {
        let mut txns = sample();
        txns.push(txn("7", day(3, 3), TransactionKind::Expense, "Venta huevos", 30));
        let groups = ReportAssembler::default().group(&txns);
        let eggs = &groups[0];
        assert_eq!(eggs.key, "Venta huevos");
        assert_eq!(eggs.income, Decimal::from(200));
        assert_eq!(eggs.expense, Decimal::from(30));
        assert_eq!(eggs.net, Decimal::from(170));
    }
}
