//! Totals, running balances and calendar rollups over a transaction
//! snapshot. Everything here is a pure function of its input.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::finance::{Transaction, TransactionKind};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

impl Totals {
    pub(crate) fn add(&mut self, txn: &Transaction) {
        match txn.kind() {
            TransactionKind::Income => self.income += txn.amount(),
            TransactionKind::Expense => self.expense += txn.amount(),
        }
        self.balance = self.income - self.expense;
    }
}

/// Income, expense and balance over every transaction, dated or not.
pub fn totals<'a>(txns: impl IntoIterator<Item = &'a Transaction>) -> Totals {
    let mut out = Totals::default();
    for t in txns {
        out.add(t);
    }
    out
}

/// A transaction paired with the cumulative balance up to and including it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BalanceRow<'a> {
    pub transaction: &'a Transaction,
    pub running_balance: Decimal,
}

/// Order by date ascending. The sort is stable so same-day entries keep
/// their input order; undated entries go last, also in input order.
pub fn sort_by_date<'a>(txns: impl IntoIterator<Item = &'a Transaction>) -> Vec<&'a Transaction> {
    let mut ordered: Vec<&Transaction> = txns.into_iter().collect();
    ordered.sort_by_key(|t| (t.date().is_none(), t.date()));
    ordered
}

pub fn running_balances<'a>(txns: impl IntoIterator<Item = &'a Transaction>) -> Vec<BalanceRow<'a>> {
    let mut balance = Decimal::ZERO;
    sort_by_date(txns)
        .into_iter()
        .map(|t| {
            balance += t.signed_amount();
            BalanceRow {
                transaction: t,
                running_balance: balance,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Monthly,
    Annual,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Bucket {
    pub year: i32,
    /// 1-based month; `None` for annual buckets.
    pub month: Option<u32>,
    pub label: String,
    #[serde(flatten)]
    pub totals: Totals,
}

impl Bucket {
    fn new(year: i32, month: Option<u32>) -> Self {
        let label = match month {
            Some(m) => format!("{year:04}-{m:02}"),
            None => format!("{year:04}"),
        };
        Self {
            year,
            month,
            label,
            totals: Totals::default(),
        }
    }
}

/// Contiguous calendar buckets plus the number of undated transactions
/// that could not be placed in any bucket.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct Rollup {
    pub buckets: Vec<Bucket>,
    pub skipped: usize,
}

pub fn monthly_rollup<'a>(txns: impl IntoIterator<Item = &'a Transaction>) -> Rollup {
    rollup(txns, Period::Monthly)
}

pub fn annual_rollup<'a>(txns: impl IntoIterator<Item = &'a Transaction>) -> Rollup {
    rollup(txns, Period::Annual)
}

/// One bucket per period from the earliest to the latest date, inclusive,
/// including empty periods in between.
pub fn rollup<'a>(txns: impl IntoIterator<Item = &'a Transaction>, period: Period) -> Rollup {
    let mut skipped = 0;
    let mut dated: Vec<(NaiveDate, &Transaction)> = Vec::new();
    for t in txns {
        match t.date() {
            Some(d) => dated.push((d, t)),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, ?period, "undated transactions left out of rollup");
    }

    let (Some(first), Some(last)) = (
        dated.iter().map(|(d, _)| *d).min(),
        dated.iter().map(|(d, _)| *d).max(),
    ) else {
        return Rollup {
            buckets: Vec::new(),
            skipped,
        };
    };

    let slot = |d: NaiveDate| -> i64 {
        match period {
            Period::Monthly => i64::from(d.year()) * 12 + i64::from(d.month0()),
            Period::Annual => i64::from(d.year()),
        }
    };
    let start = slot(first);
    let end = slot(last);

    let mut buckets: Vec<Bucket> = (start..=end)
        .map(|s| match period {
            Period::Monthly => {
                let year = s.div_euclid(12) as i32;
                let month = s.rem_euclid(12) as u32 + 1;
                Bucket::new(year, Some(month))
            }
            Period::Annual => Bucket::new(s as i32, None),
        })
        .collect();

    for (d, t) in dated {
        let idx = (slot(d) - start) as usize;
        buckets[idx].totals.add(t);
    }

    Rollup { buckets, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(id: &str, date: Option<(i32, u32, u32)>, kind: TransactionKind, amount: i64) -> Transaction {
        Transaction::new(
            id,
            date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            kind,
            None,
            Decimal::from(amount),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_input() {
        let none: Vec<Transaction> = Vec::new();
        assert_eq!(totals(&none), Totals::default());
        assert!(running_balances(&none).is_empty());
        assert_eq!(monthly_rollup(&none), Rollup::default());
        assert_eq!(annual_rollup(&none), Rollup::default());
    }

    #[test]
    fn test_running_balance_scenario() {
        let txns = vec![
            txn("a", Some((2025, 1, 1)), TransactionKind::Income, 100),
            txn("b", Some((2025, 1, 2)), TransactionKind::Expense, 30),
        ];
        let rows = running_balances(&txns);
        let balances: Vec<Decimal> = rows.iter().map(|r| r.running_balance).collect();
        assert_eq!(balances, vec![Decimal::from(100), Decimal::from(70)]);
        assert_eq!(totals(&txns).balance, Decimal::from(70));
    }

    #[test]
    fn test_running_balance_sorts_by_date() {
        let txns = vec![
            txn("late", Some((2025, 2, 1)), TransactionKind::Expense, 30),
            txn("early", Some((2025, 1, 1)), TransactionKind::Income, 100),
        ];
        let rows = running_balances(&txns);
        assert_eq!(rows[0].transaction.id(), "early");
        assert_eq!(rows[1].running_balance, Decimal::from(70));
    }

    #[test]
    fn test_same_date_keeps_input_order() {
        let txns = vec![
            txn("x", Some((2025, 5, 5)), TransactionKind::Expense, 10),
            txn("y", Some((2025, 5, 5)), TransactionKind::Income, 50),
            txn("z", Some((2025, 5, 5)), TransactionKind::Expense, 5),
        ];
        let rows = running_balances(&txns);
        let ids: Vec<&str> = rows.iter().map(|r| r.transaction.id()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
        let balances: Vec<Decimal> = rows.iter().map(|r| r.running_balance).collect();
        assert_eq!(
            balances,
            vec![Decimal::from(-10), Decimal::from(40), Decimal::from(35)]
        );
    }

    #[test]
    fn test_totals_match_last_running_balance_with_undated() {
        let txns = vec![
            txn("u", None, TransactionKind::Income, 7),
            txn("a", Some((2024, 12, 31)), TransactionKind::Income, 200),
            txn("b", Some((2024, 6, 1)), TransactionKind::Expense, 45),
        ];
        let t = totals(&txns);
        assert_eq!(t.income - t.expense, t.balance);
        let rows = running_balances(&txns);
        assert_eq!(rows.last().unwrap().transaction.id(), "u");
        assert_eq!(rows.last().unwrap().running_balance, t.balance);
    }

    #[test]
    fn test_monthly_rollup_fills_gaps() {
        let txns = vec![
            txn("jan", Some((2025, 1, 15)), TransactionKind::Income, 100),
            txn("mar", Some((2025, 3, 3)), TransactionKind::Expense, 40),
        ];
        let r = monthly_rollup(&txns);
        let labels: Vec<&str> = r.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2025-01", "2025-02", "2025-03"]);
        assert_eq!(r.buckets[1].totals.income, Decimal::ZERO);
        assert_eq!(r.buckets[1].totals.expense, Decimal::ZERO);
        assert_eq!(r.buckets[2].totals.expense, Decimal::from(40));
        assert_eq!(r.skipped, 0);
    }

    #[test]
    fn test_monthly_rollup_crosses_year_boundary() {
        let txns = vec![
            txn("a", Some((2024, 11, 30)), TransactionKind::Income, 1),
            txn("b", Some((2025, 2, 1)), TransactionKind::Income, 1),
        ];
        let r = monthly_rollup(&txns);
        let labels: Vec<&str> = r.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);
    }

    #[test]
    fn test_rollup_skips_and_counts_undated() {
        let txns = vec![
            txn("a", Some((2025, 4, 1)), TransactionKind::Income, 10),
            txn("bad", None, TransactionKind::Expense, 99),
        ];
        let r = monthly_rollup(&txns);
        assert_eq!(r.buckets.len(), 1);
        assert_eq!(r.buckets[0].totals.expense, Decimal::ZERO);
        assert_eq!(r.skipped, 1);
        // Totals still see the undated expense.
        assert_eq!(totals(&txns).expense, Decimal::from(99));
    }

    #[test]
    fn test_annual_rollup() {
        let txns = vec![
            txn("a", Some((2022, 3, 1)), TransactionKind::Income, 10),
            txn("b", Some((2024, 8, 1)), TransactionKind::Expense, 4),
        ];
        let r = annual_rollup(&txns);
        let labels: Vec<&str> = r.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2022", "2023", "2024"]);
        assert_eq!(r.buckets[0].totals.balance, Decimal::from(10));
        assert_eq!(r.buckets[1].totals.balance, Decimal::ZERO);
        assert_eq!(r.buckets[2].totals.balance, Decimal::from(-4));
        assert!(r.buckets.iter().all(|b| b.month.is_none()));
    }
}
