use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use color_eyre::eyre::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::period::Period;

/// Default settings file, looked up in the working directory
pub const DEFAULT_SETTINGS_PATH: &str = "condenser.toml";

/// User-editable settings, as stored in the settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// CSV ledger to read
    pub input: PathBuf,
    /// XLSX statement to write
    pub output: PathBuf,
    /// Whether the first line of the input is a header to skip
    pub has_header: bool,
    /// `[start, end]` pairs, formatted as `YYYY-MM-DD`
    pub periods: Vec<[String; 2]>,
    /// `chrono` pattern for posted dates, after `- / : ;` have been replaced with spaces
    pub date_format: String,
    /// Comma-separated keywords which keep matching transactions as separate line items
    pub exclusions: String,
    /// Whether debits add to the account balance
    pub positive_debits: bool,
    /// Sort statement lines by description instead of first appearance
    pub sort_by_description: bool,
    pub columns: ColumnLetters,
}

/// Spreadsheet-style column letters (`A` being the first column) of the input fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLetters {
    pub post: String,
    pub description: String,
    pub debit: String,
    pub credit: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("./input.csv"),
            output: PathBuf::from("./output.xlsx"),
            has_header: true,
            periods: Vec::new(),
            date_format: "%Y %m %d".to_owned(),
            exclusions: String::new(),
            positive_debits: false,
            sort_by_description: false,
            columns: ColumnLetters::default(),
        }
    }
}

impl Default for ColumnLetters {
    fn default() -> Self {
        Self {
            post: "B".to_owned(),
            description: "D".to_owned(),
            debit: "F".to_owned(),
            credit: "G".to_owned(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to the defaults if the file does not exist
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Could not read settings file {path:?}"))?;
        toml::from_str(&text).with_context(|| format!("Could not parse settings file {path:?}"))
    }

    pub fn save(&self, path: &Path) -> color_eyre::Result<()> {
        let text = toml::to_string_pretty(self).with_context(|| "Could not serialize settings")?;
        fs::write(path, text).with_context(|| format!("Could not write settings file {path:?}"))
    }

    /// Appends the period following the last configured one, or January of the current year
    /// if there is none
    pub fn add_next_period(&mut self) -> Period {
        let next = self
            .periods
            .last()
            .and_then(|[start, end]| Period::parse(start, end).ok())
            .and_then(|last| last.next_month());
        let period = match next {
            Some(period) => period,
            None => current_year_default(),
        };
        self.periods.push(period.bounds());
        period
    }

    /// Validates the settings into the configuration consumed by a run
    pub fn resolve(&self) -> Result<RunConfig, ConfigError> {
        let columns = Columns {
            post: Column::from_letter(&self.columns.post)?,
            description: Column::from_letter(&self.columns.description)?,
            debit: Column::from_letter(&self.columns.debit)?,
            credit: Column::from_letter(&self.columns.credit)?,
        };
        let periods = self
            .periods
            .iter()
            .map(|[start, end]| Period::parse(start, end))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RunConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            columns,
            has_header: self.has_header,
            periods,
            date_format: self.date_format.clone(),
            exclusions: parse_exclusions(&self.exclusions),
            positive_debits: self.positive_debits,
            sort_by_description: self.sort_by_description,
        })
    }
}

fn current_year_default() -> Period {
    let today = Local::now().date_naive();
    Period::default_for_year(today.year()).unwrap_or(Period {
        start: today,
        end: today,
    })
}

fn parse_exclusions(exclusions: &str) -> Vec<String> {
    exclusions
        .to_lowercase()
        .split(',')
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Validated settings, threaded through a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub columns: Columns,
    pub has_header: bool,
    pub periods: Vec<Period>,
    pub date_format: String,
    /// Lower-cased, never blank
    pub exclusions: Vec<String>,
    pub positive_debits: bool,
    pub sort_by_description: bool,
}

impl RunConfig {
    /// Whether a lower-cased description must be kept as separate line items
    pub fn is_excluded(&self, description: &str) -> bool {
        self.exclusions
            .iter()
            .any(|word| description.contains(word.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
    pub post: Column,
    pub description: Column,
    pub debit: Column,
    pub credit: Column,
}

impl Columns {
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        [&self.post, &self.description, &self.debit, &self.credit].into_iter()
    }
}

/// A 0-based input field position, along with the letter it was configured as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub letter: String,
    pub index: usize,
}

impl Column {
    /// Converts a spreadsheet column name: `A` is 0, `Z` is 25, `AA` is 26
    pub fn from_letter(letter: &str) -> Result<Self, ConfigError> {
        let trimmed = letter.trim();
        let bad_column = || ConfigError::BadColumn {
            letter: letter.to_owned(),
        };
        if trimmed.is_empty() {
            return Err(bad_column());
        }
        let mut number: usize = 0;
        for c in trimmed.chars() {
            let c = c.to_ascii_uppercase();
            if !c.is_ascii_uppercase() {
                return Err(bad_column());
            }
            let digit = (c as usize) - ('A' as usize) + 1;
            number = number
                .checked_mul(26)
                .and_then(|n| n.checked_add(digit))
                .ok_or_else(bad_column)?;
        }
        Ok(Self {
            letter: trimmed.to_ascii_uppercase(),
            index: number - 1,
        })
    }
}
