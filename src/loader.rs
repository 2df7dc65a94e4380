use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::datetime::TimestampFormat;
use crate::error::{ConfigError, LoadError};
use crate::model::{
    ActivityRecord, COMPLETED_AT, Dataset, EXPECTED_COLUMNS, RawActivityRecord, STARTED_AT,
    missing_columns,
};

/// Turns an activity export into a canonical `Dataset`. Any bad cell aborts the
/// whole load; nothing is skipped.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    timestamps: TimestampFormat,
    delimiter: u8,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self {
            timestamps: TimestampFormat::default(),
            delimiter: b',',
        }
    }
}

impl DatasetLoader {
    pub fn new(timestamps: TimestampFormat, delimiter: u8) -> Self {
        Self {
            timestamps,
            delimiter,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.timestamp_format(), config.delimiter_byte()?))
    }

    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<Dataset, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = self.load(file)?;
        info!(path = %path.display(), rows = dataset.len(), "loaded activity export");
        Ok(dataset)
    }

    pub fn load<R: Read>(&self, source: R) -> Result<Dataset, LoadError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(source);
        let headers = rename_duplicates(rdr.headers()?);
        let mut rows = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let mut row = result?;
            if row.len() > headers.len() {
                return Err(LoadError::FieldCount {
                    row: i + 1,
                    expected: headers.len(),
                    found: row.len(),
                });
            }
            while row.len() < headers.len() {
                row.push_field("");
            }
            rows.push(row);
        }
        debug!(columns = headers.len(), rows = rows.len(), "read raw table");

        let missing = missing_columns(headers.iter());
        if !missing.is_empty() {
            return Err(LoadError::MissingColumns { missing });
        }

        let mut raw = Vec::with_capacity(rows.len());
        for row in &rows {
            let record: RawActivityRecord = row.deserialize(Some(&headers))?;
            raw.push(record);
        }

        // Column by column, so the first failing column wins like a vectorized parse.
        let started = self.parse_timestamps(STARTED_AT, raw.iter().map(|r| &r.started_at))?;
        let completed =
            self.parse_timestamps(COMPLETED_AT, raw.iter().map(|r| &r.completed_at))?;
        let scores = raw
            .iter()
            .enumerate()
            .map(|(i, r)| {
                parse_score(&r.score).ok_or_else(|| LoadError::ScoreParse {
                    row: i + 1,
                    value: r.score.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let order = canonical_order(&headers);
        let columns = order.iter().map(|&i| headers[i].to_string()).collect();
        let extra_indexes = &order[EXPECTED_COLUMNS.len()..];

        let records = raw
            .into_iter()
            .zip(rows.iter())
            .zip(started.into_iter().zip(completed))
            .zip(scores)
            .map(|(((r, row), (started_at, completed_at)), score)| ActivityRecord {
                last_name: r.last_name,
                first_name: r.first_name,
                status: r.status,
                started_at,
                completed_at,
                score,
                extra: extra_cells(row, extra_indexes),
            })
            .collect();

        Ok(Dataset::new(columns, records))
    }

    fn parse_timestamps<'a>(
        &self,
        column: &'static str,
        values: impl Iterator<Item = &'a String>,
    ) -> Result<Vec<chrono::NaiveDateTime>, LoadError> {
        values
            .enumerate()
            .map(|(i, value)| {
                self.timestamps
                    .parse(value)
                    .ok_or_else(|| LoadError::DateParse {
                        column,
                        row: i + 1,
                        value: value.clone(),
                    })
            })
            .collect()
    }
}

/// `"15,50"` becomes `Some(Some(15.5))`, an empty cell `Some(None)`; any other text is `None`.
pub fn parse_score(text: &str) -> Option<Option<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Some(None);
    }
    let value: f64 = text.replace(',', ".").parse().ok()?;
    Some(if value.is_nan() { None } else { Some(value) })
}

/// Positions of the header columns after moving each required column to its
/// fixed slot; every other column keeps its relative order behind them.
pub fn canonical_order(headers: &StringRecord) -> Vec<usize> {
    let mut order: Vec<usize> = (0..headers.len()).collect();
    for (target, name) in EXPECTED_COLUMNS.iter().enumerate() {
        if let Some(pos) = order.iter().position(|&i| &headers[i] == *name) {
            let index = order.remove(pos);
            order.insert(target.min(order.len()), index);
        }
    }
    order
}

/// Later copies of a repeated header get a `.1`, `.2`, ... suffix, so the
/// first copy keeps the name and the value the required columns resolve to.
pub fn rename_duplicates(headers: &StringRecord) -> StringRecord {
    let mut seen: HashSet<String> = HashSet::new();
    let mut renamed = StringRecord::new();
    for name in headers.iter() {
        let mut unique = name.to_string();
        let mut n = 1;
        while seen.contains(&unique) {
            unique = format!("{name}.{n}");
            n += 1;
        }
        if unique != name {
            warn!(column = name, renamed = %unique, "duplicate column header");
        }
        seen.insert(unique.clone());
        renamed.push_field(&unique);
    }
    renamed
}

fn extra_cells(row: &StringRecord, indexes: &[usize]) -> Vec<String> {
    indexes
        .iter()
        .map(|&i| row.get(i).unwrap_or_default().to_string())
        .collect()
}
