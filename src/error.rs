use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file type: {} (expected a .csv file)", path.display())]
    UnsupportedFileType { path: PathBuf },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data row {row}: found {found} fields, header has {expected}")]
    FieldCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("missing required column(s): {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("data row {row}: cannot parse {column} value {value:?} as a date")]
    DateParse {
        column: &'static str,
        row: usize,
        value: String,
    },

    #[error("data row {row}: cannot parse score {value:?} as a number")]
    ScoreParse { row: usize, value: String },
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("cannot access schedule file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schedule file {} is not valid: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("class {0:?} already exists")]
    DuplicateName(String),

    #[error("class name cannot be empty")]
    EmptyName,

    #[error("unknown class {0:?}")]
    UnknownClass(String),

    #[error("class {class:?} has {len} interval(s), no interval #{index}")]
    IntervalIndex {
        class: String,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("there is no data to compute")]
    NoData,

    #[error("data row {row}: found {found} fields, header has {expected}")]
    FieldCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("missing required column(s): {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("unknown class {0:?}")]
    UnknownClass(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("delimiter must be a single ASCII character, got {0:?}")]
    Delimiter(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
