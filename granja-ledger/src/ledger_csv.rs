//! Read and write ledger CSV exports.
//!
//! Columns: id,date,type,description,amount,category,pinned
//! `category` and `pinned` are optional. A stored category is only kept
//! when the row is pinned; otherwise it is derived again from the
//! description, the same way it is at write time.

use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use granja_core::{Category, Transaction, TransactionKind};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

#[derive(Debug, Deserialize)]
struct LedgerRow {
    id: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    description: Option<String>,
    amount: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    pinned: Option<String>,
}

#[derive(Debug, Serialize)]
struct LedgerRowOut<'a> {
    id: &'a str,
    date: String,
    #[serde(rename = "type")]
    kind: &'static str,
    description: &'a str,
    amount: String,
    category: &'static str,
    pinned: bool,
}

/// Parse a ledger date. Unparseable or empty input yields `None`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Amount patterns seen in hand-kept farm ledgers: plain decimals,
/// dot-grouped thousands (`1.200.000`, `45.000`), comma-grouped thousands
/// (`1,200,000`), and comma decimals (`1.234,50`).
pub struct AmountParser {
    plain: Regex,
    dot_grouped: Regex,
    comma_grouped: Regex,
    comma_decimal: Regex,
}

impl AmountParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            plain: Regex::new(r"^-?\d+(\.\d+)?$")?,
            dot_grouped: Regex::new(r"^-?[1-9]\d{0,2}(\.\d{3})+$")?,
            comma_grouped: Regex::new(r"^-?\d{1,3}(,\d{3})+(\.\d+)?$")?,
            comma_decimal: Regex::new(r"^-?\d{1,3}(\.\d{3})*,\d+$")?,
        })
    }

    pub fn parse(&self, raw: &str) -> Result<Decimal> {
        let cleaned: String = raw
            .trim()
            .trim_start_matches('$')
            .trim_end_matches("COP")
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '$')
            .collect();

        // Dot grouping is tested first: "45.000" is forty-five thousand.
        let canonical = if self.dot_grouped.is_match(&cleaned) {
            cleaned.replace('.', "")
        } else if self.plain.is_match(&cleaned) {
            cleaned
        } else if self.comma_grouped.is_match(&cleaned) {
            cleaned.replace(',', "")
        } else if self.comma_decimal.is_match(&cleaned) {
            cleaned.replace('.', "").replace(',', ".")
        } else {
            bail!("invalid amount '{}'", raw.trim());
        };

        canonical
            .parse::<Decimal>()
            .with_context(|| format!("invalid amount '{}'", raw.trim()))
    }
}

/// One-off amount parse. Prefer [`AmountParser`] when parsing many rows.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    AmountParser::new()?.parse(raw)
}

fn is_truthy(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "si" | "sí" | "x"
    )
}

/// An unpinned row whose stored category differed from the one the rules
/// derive today. `from` is the stored code as written in the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryChange {
    pub id: String,
    pub from: String,
    pub to: Category,
}

/// A parsed ledger plus the categories that were re-derived on load.
#[derive(Debug, Default)]
pub struct LedgerLoad {
    pub transactions: Vec<Transaction>,
    pub rederived: Vec<CategoryChange>,
}

/// Parse a ledger CSV file.
pub fn parse_ledger_csv(path: impl AsRef<Path>) -> Result<Vec<Transaction>> {
    Ok(load_ledger_csv(path)?.transactions)
}

pub fn parse_ledger_reader<R: io::Read>(reader: R) -> Result<Vec<Transaction>> {
    Ok(load_ledger_reader(reader)?.transactions)
}

pub fn load_ledger_csv(path: impl AsRef<Path>) -> Result<LedgerLoad> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;
    load_ledger_reader(file).with_context(|| format!("parsing {}", path.as_ref().display()))
}

pub fn load_ledger_reader<R: io::Read>(reader: R) -> Result<LedgerLoad> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let amounts = AmountParser::new()?;

    let mut load = LedgerLoad::default();
    for (i, result) in rdr.deserialize::<LedgerRow>().enumerate() {
        let line = i + 2;
        let row = result.with_context(|| format!("line {line}: malformed row"))?;
        let (txn, change) =
            row_to_transaction(row, &amounts).with_context(|| format!("line {line}"))?;
        load.transactions.push(txn);
        load.rederived.extend(change);
    }
    Ok(load)
}

fn row_to_transaction(
    row: LedgerRow,
    amounts: &AmountParser,
) -> Result<(Transaction, Option<CategoryChange>)> {
    let kind: TransactionKind = row.kind.parse()?;
    let amount = amounts.parse(&row.amount)?;

    let raw_date = row.date.unwrap_or_default();
    let date = parse_date(&raw_date);
    if date.is_none() {
        debug!(id = %row.id, raw = %raw_date, "unparseable date kept as undated");
    }

    let description = row.description.filter(|d| !d.trim().is_empty());
    let mut txn = Transaction::new(row.id, date, kind, description, amount)?;

    let pinned = row.pinned.as_deref().is_some_and(is_truthy);
    let mut change = None;
    match (row.category.filter(|c| !c.trim().is_empty()), pinned) {
        (Some(code), true) => {
            let category: Category = code.parse()?;
            txn.pin_category(category)?;
        }
        (Some(code), false) => {
            if code != txn.category().code() {
                debug!(id = %txn.id(), stored = %code, derived = %txn.category(), "stored category replaced by rules");
                change = Some(CategoryChange {
                    id: txn.id().to_string(),
                    from: code,
                    to: txn.category(),
                });
            }
        }
        (None, true) => bail!("row {} is pinned but has no category", txn.id()),
        (None, false) => {}
    }
    Ok((txn, change))
}

/// Amount as written to the ledger. Exactly three decimals would read back
/// as dot-grouped thousands, so those are padded to four.
fn amount_text(amount: Decimal) -> String {
    let mut amount = amount.normalize();
    if amount.scale() == 3 {
        amount.rescale(4);
    }
    amount.to_string()
}

pub fn write_ledger<W: io::Write>(writer: W, txns: &[Transaction]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for t in txns {
        wtr.serialize(LedgerRowOut {
            id: t.id(),
            date: t.date().map(|d| d.to_string()).unwrap_or_default(),
            kind: t.kind().code(),
            description: t.description().unwrap_or(""),
            amount: amount_text(t.amount()),
            category: t.category().code(),
            pinned: t.is_category_pinned(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_ledger_csv(path: impl AsRef<Path>, txns: &[Transaction]) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_ledger(file, txns).with_context(|| format!("writing {}", path.as_ref().display()))
}
