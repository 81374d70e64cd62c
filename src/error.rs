use std::path::PathBuf;

use thiserror::Error;

/// Any failure which aborts a statement run
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{letter} could not be interpreted as a real column")]
    BadColumn { letter: String },
    #[error("Could not find the {letter} column")]
    MissingColumn { letter: String },
    #[error("{0} could not be interpreted as a real date")]
    InvalidDate(String),
    #[error("Start date {start} is after end date {end}")]
    PeriodOutOfOrder { start: String, end: String },
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Cannot find the input file {0:?}")]
    Missing(PathBuf),
    #[error("Could not read input file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("The posted date '{value}' on line {line} does not match the date format '{format}'")]
    DateFormatMismatch {
        value: String,
        format: String,
        line: u64,
    },
    #[error("Could not read line {line}")]
    Record {
        line: u64,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Could not build the output workbook")]
    Render(#[from] rust_xlsxwriter::XlsxError),
    #[error("Output file {path:?} could not be written, it may be open elsewhere")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
