use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use granja_core::{
    category_breakdown, rollup, running_balances, totals, DateRange, GroupKey, HybridCategorizer,
    Period, ReportKind, TransactionKind,
};
use granja_ledger::{load_ledger_csv, parse_date, parse_ledger_csv, write_ledger_csv, Recategorizer};
use serde::Serialize;
use std::path::{Path, PathBuf};

mod config;
mod llm;
mod logging;
mod state;

use llm::ConfiguredClassifier;

#[derive(Parser, Debug)]
#[command(
    name = "granja",
    version,
    about = "Farm ledger: categorize, balance and report income and expenses"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the grouping key for a description
    Normalize { text: String },

    /// Suggest a category for a description (rules, then the configured classifier)
    Categorize {
        /// Transaction type: gasto or ingreso
        #[arg(long = "type")]
        kind: TransactionKind,

        text: String,

        #[arg(long)]
        json: bool,
    },

    /// Totals and running balance for a ledger CSV
    Balance {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Monthly or annual buckets for a ledger CSV
    Rollup {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long, value_enum, default_value_t = PeriodArg::Monthly)]
        period: PeriodArg,

        #[arg(long)]
        json: bool,
    },

    /// Filtered report with chart series
    Report {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long, value_enum, default_value_t = KindArg::All)]
        kind: KindArg,

        /// Start date (inclusive). Requires --to.
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// End date (inclusive). Requires --from.
        #[arg(long, requires = "from")]
        to: Option<String>,

        /// Group descriptions by normalized key instead of raw text
        #[arg(long)]
        normalized: bool,

        #[arg(long)]
        json: bool,
    },

    /// Re-derive categories and optionally ask the classifier about generic rows
    Recategorize {
        #[arg(long)]
        csv: PathBuf,

        /// Write the resulting ledger here
        #[arg(long)]
        out: Option<PathBuf>,

        /// Ask the configured classifier about rows left on the generic category
        #[arg(long)]
        suggest: bool,

        /// Pin classifier suggestions (implies --suggest)
        #[arg(long)]
        accept: bool,
    },

    /// Manage ~/.granja/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PeriodArg {
    Monthly,
    Annual,
}

impl From<PeriodArg> for Period {
    fn from(p: PeriodArg) -> Self {
        match p {
            PeriodArg::Monthly => Period::Monthly,
            PeriodArg::Annual => Period::Annual,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    All,
    Incomes,
    Expenses,
    ByDescription,
}

impl From<KindArg> for ReportKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::All => ReportKind::All,
            KindArg::Incomes => ReportKind::Incomes,
            KindArg::Expenses => ReportKind::Expenses,
            KindArg::ByDescription => ReportKind::ByDescription,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Normalize { text } => {
            let cfg = config::load_config()?;
            println!("{}", cfg.normalizer()?.normalize(&text));
        }

        Command::Categorize { kind, text, json } => {
            let cfg = config::load_config()?;
            let categorizer = hybrid_categorizer(&cfg)?;
            let s = categorizer.categorize(&text, kind).await;
            if json {
                print_json(&s)?;
            } else {
                println!(
                    "{} ({}) confidence={:.2} source={}",
                    s.category.code(),
                    s.category.label(),
                    s.confidence,
                    source_label(&s.source)
                );
            }
        }

        Command::Balance { csv, json } => balance(&csv, json)?,

        Command::Rollup { csv, period, json } => {
            let txns = read_ledger(&csv)?;
            let r = rollup(&txns, period.into());
            if json {
                print_json(&r)?;
            } else {
                println!("{:<8} {:>14} {:>14} {:>14}", "period", "income", "expense", "balance");
                for b in &r.buckets {
                    println!(
                        "{:<8} {:>14} {:>14} {:>14}",
                        b.label, b.totals.income, b.totals.expense, b.totals.balance
                    );
                }
                if r.skipped > 0 {
                    println!("\n{} undated transaction(s) not bucketed", r.skipped);
                }
            }
        }

        Command::Report {
            csv,
            kind,
            from,
            to,
            normalized,
            json,
        } => {
            let range = date_range(from.as_deref(), to.as_deref())?;
            let group_key = if normalized {
                GroupKey::Normalized
            } else {
                GroupKey::Raw
            };
            let cfg = config::load_config()?;
            let assembler = cfg.assembler(group_key)?;
            let txns = read_ledger(&csv)?;
            let report = assembler.assemble(&txns, &range, kind.into());
            if json {
                print_json(&report)?;
            } else {
                print_report(&report, &txns);
            }
        }

        Command::Recategorize {
            csv,
            out,
            suggest,
            accept,
        } => recategorize(&csv, out.as_deref(), suggest || accept, accept).await?,

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

fn read_ledger(path: &Path) -> Result<Vec<granja_core::Transaction>> {
    if !path.exists() {
        bail!("CSV not found: {} (pass --csv <path>)", path.display());
    }
    parse_ledger_csv(path)
}

fn hybrid_categorizer(cfg: &config::Config) -> Result<HybridCategorizer<ConfiguredClassifier>> {
    Ok(
        HybridCategorizer::new(ConfiguredClassifier::from_config(&cfg.classifier)?)
            .with_normalizer(cfg.normalizer()?),
    )
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn source_label(source: &granja_core::SuggestionSource) -> &'static str {
    match source {
        granja_core::SuggestionSource::Rules => "rules",
        granja_core::SuggestionSource::Ai => "ai",
    }
}

fn date_range(from: Option<&str>, to: Option<&str>) -> Result<DateRange> {
    fn parse(flag: &str, raw: &str) -> Result<NaiveDate> {
        parse_date(raw).with_context(|| format!("--{flag}: invalid date '{raw}'"))
    }
    match (from, to) {
        (None, None) => Ok(DateRange::default()),
        (Some(f), Some(t)) => {
            let (start, end) = (parse("from", f)?, parse("to", t)?);
            if start > end {
                bail!("--from {start} is after --to {end}");
            }
            Ok(DateRange::new(Some(start), Some(end)))
        }
        _ => bail!("--from and --to must be given together"),
    }
}

#[derive(Serialize)]
struct BalanceOut<'a> {
    totals: granja_core::Totals,
    rows: Vec<granja_core::BalanceRow<'a>>,
}

fn balance(csv: &Path, json: bool) -> Result<()> {
    let txns = read_ledger(csv)?;
    let out = BalanceOut {
        totals: totals(&txns),
        rows: running_balances(&txns),
    };
    if json {
        return print_json(&out);
    }

    println!("Parsed {} transactions from {}\n", txns.len(), csv.display());
    for r in &out.rows {
        let t = r.transaction;
        println!(
            "{:<10} {:<7} {:>12} {:>14}  {} [{}]",
            t.date().map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            t.kind().code(),
            t.signed_amount(),
            r.running_balance,
            t.description().unwrap_or(""),
            t.category().code()
        );
    }
    println!(
        "\nIngresos: {}  Gastos: {}  Balance: {}",
        out.totals.income, out.totals.expense, out.totals.balance
    );
    Ok(())
}

fn print_report(report: &granja_core::Report<'_>, all: &[granja_core::Transaction]) {
    let range = match (report.range.start, report.range.end) {
        (Some(s), Some(e)) => format!("{s} .. {e}"),
        _ => "all dates".to_string(),
    };
    println!("# Report ({:?}, {})\n", report.kind, range);
    println!(
        "Transactions: {}  Ingresos: {}  Gastos: {}  Balance: {}\n",
        report.rows.len(),
        report.totals.income,
        report.totals.expense,
        report.totals.balance
    );

    if !report.groups.is_empty() {
        println!("## By description\n");
        for g in &report.groups {
            println!("- {} | in={} out={} net={}", g.key, g.income, g.expense, g.net);
        }
        println!();
    }

    println!("## Chart\n");
    for p in &report.series {
        println!("- {}: {}", p.label, p.value);
    }

    for (kind, title) in [
        (TransactionKind::Income, "Ingresos por categoría"),
        (TransactionKind::Expense, "Gastos por categoría"),
    ] {
        let breakdown = category_breakdown(report.rows.iter().map(|r| r.transaction), kind);
        if breakdown.is_empty() {
            continue;
        }
        println!("\n## {title}\n");
        for c in breakdown {
            println!("- {} ({}): {}", c.label, c.count, c.total);
        }
    }

    let undated = all.iter().filter(|t| t.date().is_none()).count();
    if undated > 0 && !report.range.is_unbounded() {
        println!("\n{undated} undated transaction(s) outside any date range");
    }
}

async fn recategorize(csv: &Path, out: Option<&Path>, suggest: bool, accept: bool) -> Result<()> {
    if !csv.exists() {
        bail!("CSV not found: {} (pass --csv <path>)", csv.display());
    }
    let mut load = load_ledger_csv(csv)?;
    println!(
        "Parsed {} transactions from {}",
        load.transactions.len(),
        csv.display()
    );

    if load.rederived.is_empty() {
        println!("Stored categories match the rules");
    } else {
        println!("Re-derived {} categories:", load.rederived.len());
        for c in &load.rederived {
            println!("- {}: {} -> {}", c.id, c.from, c.to);
        }
    }

    if suggest {
        let cfg = config::load_config()?;
        let categorizer = hybrid_categorizer(&cfg)?;
        let suggestions = Recategorizer::suggest_generic(&categorizer, &load.transactions).await;
        println!("\nSuggestions for {} generic rows:", suggestions.len());
        for s in &suggestions {
            println!(
                "- {}: {} confidence={:.2} source={}",
                s.id,
                s.suggestion.category,
                s.suggestion.confidence,
                source_label(&s.suggestion.source)
            );
        }
        if accept {
            let n = Recategorizer::accept(&mut load.transactions, &suggestions);
            println!("Pinned {n} suggested categories");
        }
    }

    if let Some(out) = out {
        write_ledger_csv(out, &load.transactions)?;
        println!("\nWrote {}", out.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_both_or_neither() {
        assert!(date_range(None, None).unwrap().is_unbounded());
        assert!(date_range(Some("2025-01-01"), None).is_err());
        assert!(date_range(None, Some("2025-01-01")).is_err());

        let r = date_range(Some("01/01/2025"), Some("2025-03-31")).unwrap();
        assert_eq!(r.start, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(r.end, NaiveDate::from_ymd_opt(2025, 3, 31));
    }

    #[test]
    fn test_date_range_rejects_bad_input() {
        assert!(date_range(Some("ayer"), Some("2025-01-01")).is_err());
        assert!(date_range(Some("2025-02-01"), Some("2025-01-01")).is_err());
    }

    #[test]
    fn test_cli_parses_report_flags() {
        let cli = Cli::try_parse_from([
            "granja", "report", "--csv", "l.csv", "--kind", "by-description", "--normalized",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Report {
                kind: KindArg::ByDescription,
                normalized: true,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["granja", "report", "--csv", "l.csv", "--from", "2025-01-01"]).is_err());
    }

    #[test]
    fn test_cli_parses_transaction_type() {
        let cli = Cli::try_parse_from(["granja", "categorize", "--type", "gasto", "gasolina"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Categorize {
                kind: TransactionKind::Expense,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["granja", "categorize", "--type", "regalo", "x"]).is_err());
    }
}
