use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use regex::Regex;
use rust_decimal::Decimal;

use crate::config::Columns;
use crate::error::{ConfigError, ParseError};
use crate::Transaction;

/// Iterator which turns CSV records from a ledger export into transactions
///
/// Each record is expected to hold, at the configured columns:
///
/// 1. A posted date, matching the configured date pattern once any of `- / : ;` have been
///    replaced with spaces (so `"%Y %m %d"` matches `"2024-01-05"`)
/// 2. A free-text description
/// 3. A debit amount
/// 4. A credit amount
///
/// Records with fewer than 2 fields are blank or noise lines and are skipped. Amounts which
/// cannot be parsed count as zero. A date which cannot be parsed is fatal: the error is
/// returned and iteration stops.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct TransactionParser<'a, I> {
    iter: I,
    columns: &'a Columns,
    date_format: &'a str,
    fatal_error_seen: bool,
}

impl<'a, I> TransactionParser<'a, I> {
    fn new(iter: I, columns: &'a Columns, date_format: &'a str) -> Self {
        Self {
            iter,
            columns,
            date_format,
            fatal_error_seen: false,
        }
    }

    fn parse_record(&self, record: &StringRecord) -> Result<Transaction, ParseError> {
        let field = |index: usize| record.get(index).unwrap_or_default();

        let date = parse_date(field(self.columns.post.index), self.date_format).ok_or_else(|| {
            ParseError::DateFormatMismatch {
                value: field(self.columns.post.index).to_owned(),
                format: self.date_format.to_owned(),
                line: line_of(record),
            }
        })?;
        let description = field(self.columns.description.index).to_owned();
        let debit = parse_amount(field(self.columns.debit.index));
        let credit = parse_amount(field(self.columns.credit.index));

        Ok(Transaction {
            date,
            description,
            debit,
            credit,
        })
    }
}

impl<I: Iterator<Item = csv::Result<StringRecord>>> Iterator for TransactionParser<'_, I> {
    type Item = Result<Transaction, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fatal_error_seen {
            return None;
        }
        for record in self.iter.by_ref() {
            let record = match record {
                Ok(record) => record,
                Err(source) => {
                    self.fatal_error_seen = true;
                    let line = source.position().map_or(0, |position| position.line());
                    return Some(Err(ParseError::Record { line, source }));
                }
            };
            if record.len() < 2 {
                tracing::debug!("Skipping line {}: {record:?}", line_of(&record));
                continue;
            }
            let transaction = self.parse_record(&record);
            if transaction.is_err() {
                self.fatal_error_seen = true;
            }
            return Some(transaction);
        }
        None
    }
}

pub trait RecordIteratorExt {
    fn transactions<'a>(self, columns: &'a Columns, date_format: &'a str)
        -> TransactionParser<'a, Self>
    where
        Self: Sized;
}

impl<I: Iterator<Item = csv::Result<StringRecord>>> RecordIteratorExt for I {
    fn transactions<'a>(
        self,
        columns: &'a Columns,
        date_format: &'a str,
    ) -> TransactionParser<'a, I> {
        TransactionParser::new(self, columns, date_format)
    }
}

/// Checks once, against a representative record, that every configured column exists
pub fn check_columns(columns: &Columns, record: &StringRecord) -> Result<(), ConfigError> {
    match columns.iter().find(|column| column.index >= record.len()) {
        Some(column) => Err(ConfigError::MissingColumn {
            letter: column.letter.clone(),
        }),
        None => Ok(()),
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |position| position.line())
}

fn parse_date(s: &str, format: &str) -> Option<NaiveDate> {
    static SEPARATORS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[-/:;]").expect("regex"));

    let normalized = SEPARATORS.replace_all(s, " ");
    NaiveDate::parse_from_str(&normalized, format)
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, format).map(|dt| dt.date()))
        .ok()
}

/// Unsigned amount, zero when the field is not a number
fn parse_amount(s: &str) -> Decimal {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map(|amount| amount.abs())
        .unwrap_or(Decimal::ZERO)
}
