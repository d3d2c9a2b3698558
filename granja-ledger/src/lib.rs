//! granja-ledger: ledger CSV I/O and batch recategorization

pub mod ledger_csv;
pub mod recategorize;

pub use ledger_csv::{
    load_ledger_csv, load_ledger_reader, parse_amount, parse_date, parse_ledger_csv,
    parse_ledger_reader, write_ledger, write_ledger_csv, AmountParser, CategoryChange, LedgerLoad,
};
pub use recategorize::{Recategorizer, RowSuggestion};
