#![warn(clippy::unwrap_used)]
#![doc = include_str!("../README.md")]

mod classify;
mod config;
mod error;
mod layout;
mod parser;
mod period;
mod render;
mod similarity;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, Context};
use color_eyre::Result;
use config::{RunConfig, Settings, DEFAULT_SETTINGS_PATH};
use csv::StringRecord;
use error::InputError;
use layout::{LayoutOptions, Statement};
use parser::RecordIteratorExt;
use period::period_index;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

/// Condenses a CSV ledger into a multi-period XLSX statement
#[derive(Debug, Parser)]
struct Args {
    /// Settings file
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,
    /// Logs every skipped line, dropped transaction and new group
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Builds the statement (default)
    Run {
        /// CSV ledger, overriding the settings
        #[arg(long)]
        input: Option<PathBuf>,
        /// XLSX destination file, overriding the settings
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Writes a settings file with default values
    Init {
        /// Overwrites an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Appends the period following the last configured one
    AddPeriod,
    /// Lists the configured periods
    Periods,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

/// Reads every transaction of the ledger, checking the configured columns against its first
/// data line
fn read_transactions(config: &RunConfig) -> Result<Vec<Transaction>, error::Error> {
    if !config.input.is_file() {
        return Err(InputError::Missing(config.input.clone()).into());
    }
    let read_error = |source| InputError::Read {
        path: config.input.clone(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&config.input)
        .map_err(read_error)?;
    let records: Vec<csv::Result<StringRecord>> = reader
        .records()
        .skip(usize::from(config.has_header))
        .collect();

    match records.first() {
        Some(Ok(representative)) => parser::check_columns(&config.columns, representative)?,
        Some(Err(_)) => {}
        None => tracing::warn!("No data lines in {}", config.input.display()),
    }

    let transactions = records
        .into_iter()
        .transactions(&config.columns, &config.date_format)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(transactions)
}

/// Lays out the statement for the configured periods
fn build_statement(config: &RunConfig) -> Result<Statement, error::Error> {
    let transactions = read_transactions(config)?;
    let buckets = classify::classify(&transactions, config);
    tracing::info!(
        "Read {} transactions, {} fall within the {} configured periods",
        transactions.len(),
        transactions
            .iter()
            .filter(|transaction| period_index(transaction.date, &config.periods).is_some())
            .count(),
        config.periods.len()
    );
    Ok(layout::lay_out(
        &config.periods,
        &buckets,
        LayoutOptions {
            positive_debits: config.positive_debits,
            sort_by_description: config.sort_by_description,
        },
    ))
}

fn run(config: &RunConfig) -> Result<(), error::Error> {
    tracing::info!(
        "Condensing {} into {}",
        config.input.display(),
        config.output.display()
    );
    let statement = build_statement(config)?;
    let bytes = render::to_xlsx(&statement)?;
    render::persist(&bytes, &config.output)?;
    tracing::info!(
        "Wrote {} statement blocks ({} rows) to {}",
        statement.blocks.len(),
        statement.end_row() - 1,
        config.output.display()
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let Args {
        config,
        verbose,
        command,
    } = Args::parse();
    init_tracing(verbose);

    match command.unwrap_or(Command::Run {
        input: None,
        output: None,
    }) {
        Command::Run { input, output } => {
            let mut settings = Settings::load(&config)?;
            if let Some(input) = input {
                settings.input = input;
            }
            if let Some(output) = output {
                settings.output = output;
            }
            let run_config = settings
                .resolve()
                .with_context(|| format!("Invalid settings in {config:?}"))?;
            run(&run_config).with_context(|| "Could not create the statement")?;
        }
        Command::Init { force } => {
            if config.exists() && !force {
                bail!("Settings file {config:?} already exists, use --force to overwrite it");
            }
            Settings::default().save(&config)?;
            tracing::info!("Wrote default settings to {}", config.display());
        }
        Command::AddPeriod => {
            let mut settings = Settings::load(&config)?;
            let period = settings.add_next_period();
            settings.save(&config)?;
            println!("Added {}", period.label());
        }
        Command::Periods => {
            let settings = Settings::load(&config)?;
            for (i, [start, end]) in settings.periods.iter().enumerate() {
                println!("{i}: {start} - {end}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::classify::{Entry, Group};
    use crate::error::{ConfigError, Error, ParseError};
    use crate::layout::{CellValue, BALANCE_COLUMN};

    fn settings(directory: &Path, input: &str) -> Settings {
        let input_path = directory.join("input.csv");
        fs::write(&input_path, input).expect("write input");
        Settings {
            input: input_path,
            output: directory.join("output.xlsx"),
            periods: vec![["2024-01-01".to_owned(), "2024-01-31".to_owned()]],
            columns: config::ColumnLetters {
                post: "A".to_owned(),
                description: "B".to_owned(),
                debit: "C".to_owned(),
                credit: "D".to_owned(),
            },
            ..Settings::default()
        }
    }

    const LEDGER: &str = "Date,Desc,Debit,Credit\n\
                          2024-01-05,Coffee Shop A,4.50,0\n\
                          2024-01-06,Coffee Shop A #2,4.75,0\n";

    #[test]
    fn should_condense_a_ledger() {
        let directory = tempfile::tempdir().expect("tempdir");
        let config = settings(directory.path(), LEDGER).resolve().expect("config");

        let transactions = read_transactions(&config).expect("transactions");
        let buckets = classify::classify(&transactions, &config);
        assert_eq!(
            vec![&Group::Aggregate(Entry {
                date: NaiveDate::from_ymd_opt(2024, 1, 5).expect("date"),
                description: "Coffee Shop A".to_owned(),
                debit: dec!(9.25),
                credit: dec!(0),
            })],
            buckets[0].debit.ordered(false)
        );
        assert!(buckets[0].credit.is_empty());
    }

    #[test]
    fn should_write_the_statement() {
        let directory = tempfile::tempdir().expect("tempdir");
        let config = settings(directory.path(), LEDGER).resolve().expect("config");

        run(&config).expect("run");
        let first = fs::read(&config.output).expect("output");
        run(&config).expect("run");
        let second = fs::read(&config.output).expect("output");

        assert_eq!(b"PK", &first[..2]);
        assert!(first == second);
    }

    #[test]
    fn should_emit_empty_blocks_for_a_ledger_without_data() {
        let directory = tempfile::tempdir().expect("tempdir");
        let config = settings(directory.path(), "Date,Desc,Debit,Credit\n")
            .resolve()
            .expect("config");

        let statement = build_statement(&config).expect("statement");
        assert_eq!(1, statement.blocks.len());
        assert_eq!(0, statement.blocks[0].line_count);
        assert_eq!(
            Some(&CellValue::Formula("=SUM(B2:B4)".to_owned())),
            statement.cell(5, BALANCE_COLUMN)
        );
    }

    #[test]
    fn should_read_the_first_line_when_there_is_no_header() {
        let directory = tempfile::tempdir().expect("tempdir");
        let mut settings = settings(directory.path(), "2024-01-05,Coffee,1,0\n");
        settings.has_header = false;
        let config = settings.resolve().expect("config");

        assert_eq!(1, read_transactions(&config).expect("transactions").len());
    }

    #[test]
    fn should_report_a_missing_input() {
        let directory = tempfile::tempdir().expect("tempdir");
        let mut config = settings(directory.path(), LEDGER).resolve().expect("config");
        config.input = directory.path().join("nope.csv");

        assert!(matches!(
            run(&config),
            Err(Error::Input(InputError::Missing(_)))
        ));
        assert!(!config.output.exists());
    }

    #[test]
    fn should_report_columns_missing_from_the_first_data_line() {
        let directory = tempfile::tempdir().expect("tempdir");
        let mut settings = settings(directory.path(), LEDGER);
        settings.columns.credit = "H".to_owned();
        let config = settings.resolve().expect("config");

        assert!(matches!(
            run(&config),
            Err(Error::Config(ConfigError::MissingColumn { letter })) if letter == "H"
        ));
    }

    #[test]
    fn should_abort_on_a_date_mismatch_without_writing() {
        let directory = tempfile::tempdir().expect("tempdir");
        let mut settings = settings(directory.path(), LEDGER);
        settings.date_format = "%d %m %Y".to_owned();
        let config = settings.resolve().expect("config");

        assert!(matches!(
            run(&config),
            Err(Error::Parse(ParseError::DateFormatMismatch { line: 2, .. }))
        ));
        assert!(!config.output.exists());
    }
}
