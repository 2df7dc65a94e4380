use std::fmt;

use chrono::NaiveDateTime;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::datetime::parse_interval_bound;

pub const LAST_NAME: &str = "Nom de famille";
pub const FIRST_NAME: &str = "Prénom";
pub const STATUS: &str = "Statut";
pub const STARTED_AT: &str = "Commencé";
pub const COMPLETED_AT: &str = "Terminé";
pub const SCORE: &str = "Note/20,00";

/// Columns every activity export must carry, in canonical order.
pub const EXPECTED_COLUMNS: [&str; 6] = [
    LAST_NAME,
    FIRST_NAME,
    STATUS,
    STARTED_AT,
    COMPLETED_AT,
    SCORE,
];

pub const TIMESTAMP_DISPLAY: &str = "%Y-%m-%d %H:%M:%S";

/// One CSV row as text, before any coercion.
#[derive(Debug, Deserialize)]
pub struct RawActivityRecord {
    #[serde(rename = "Nom de famille")]
    pub last_name: String,
    #[serde(rename = "Prénom")]
    pub first_name: String,
    #[serde(rename = "Statut")]
    pub status: String,
    #[serde(rename = "Commencé")]
    pub started_at: String,
    #[serde(rename = "Terminé")]
    pub completed_at: String,
    #[serde(rename = "Note/20,00")]
    pub score: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub last_name: String,
    pub first_name: String,
    pub status: String,
    pub started_at: NaiveDateTime,
    pub completed_at: NaiveDateTime,
    pub score: Option<f64>,
    /// Cells of the non-canonical columns, aligned with `Dataset::columns()[6..]`.
    pub extra: Vec<String>,
}

impl ActivityRecord {
    pub fn student(&self) -> StudentId {
        StudentId::new(&self.last_name, &self.first_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StudentId {
    pub last_name: String,
    pub first_name: String,
}

impl StudentId {
    pub fn new(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
        }
    }

    /// "Last First", the key used by student selections.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.last_name, self.first_name)
    }
}

/// Activity table in canonical column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<ActivityRecord>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<ActivityRecord>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Required columns absent from this table, sorted.
    pub fn missing_columns(&self) -> Vec<String> {
        missing_columns(self.columns.iter().map(String::as_str))
    }

    /// Text cells of one row, aligned with `columns()`.
    pub fn row_cells(&self, index: usize) -> Option<Vec<String>> {
        let record = self.records.get(index)?;
        let mut cells = vec![
            record.last_name.clone(),
            record.first_name.clone(),
            record.status.clone(),
            record.started_at.format(TIMESTAMP_DISPLAY).to_string(),
            record.completed_at.format(TIMESTAMP_DISPLAY).to_string(),
            record.score.map(|s| s.to_string()).unwrap_or_default(),
        ];
        cells.extend(record.extra.iter().cloned());
        Some(cells)
    }
}

pub fn missing_columns<'a>(present: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let present: Vec<&str> = present.into_iter().collect();
    let mut missing: Vec<String> = EXPECTED_COLUMNS
        .iter()
        .filter(|c| !present.contains(c))
        .map(|c| c.to_string())
        .collect();
    missing.sort();
    missing
}

/// A start/end pair kept as raw text; parsing happens only when it is used.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Interval {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalValidity {
    pub start: bool,
    pub end: bool,
}

impl IntervalValidity {
    pub fn is_valid(&self) -> bool {
        self.start && self.end
    }
}

impl Interval {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn validity(&self) -> IntervalValidity {
        IntervalValidity {
            start: parse_interval_bound(&self.start).is_some(),
            end: parse_interval_bound(&self.end).is_some(),
        }
    }

    /// Both endpoints parsed, or `None` when either one is not a datetime.
    pub fn bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((
            parse_interval_bound(&self.start)?,
            parse_interval_bound(&self.end)?,
        ))
    }
}

impl From<(String, String)> for Interval {
    fn from((start, end): (String, String)) -> Self {
        Self { start, end }
    }
}

impl From<Interval> for (String, String) {
    fn from(interval: Interval) -> Self {
        (interval.start, interval.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassSchedule {
    pub name: String,
    pub intervals: Vec<Interval>,
}

/// Named schedules in insertion order. Serialized as a JSON object whose
/// key order is preserved on both read and write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleCollection {
    classes: Vec<ClassSchedule>,
}

impl ScheduleCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// True for `{}` and for the placeholder `{"": []}`; neither is written to disk.
    pub fn is_effectively_empty(&self) -> bool {
        match self.classes.as_slice() {
            [] => true,
            [only] => only.name.is_empty() && only.intervals.is_empty(),
            _ => false,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&[Interval]> {
        self.classes
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.intervals.as_slice())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Vec<Interval>> {
        self.classes
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.intervals)
    }

    /// Inserts or replaces; a replaced class keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, intervals: Vec<Interval>) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(existing) => *existing = intervals,
            None => self.classes.push(ClassSchedule { name, intervals }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<Interval>> {
        let index = self.classes.iter().position(|c| c.name == name)?;
        Some(self.classes.remove(index).intervals)
    }
}

impl Serialize for ScheduleCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.classes.len()))?;
        for class in &self.classes {
            map.serialize_entry(&class.name, &class.intervals)?;
        }
        map.end()
    }
}

struct ScheduleCollectionVisitor;

impl<'de> Visitor<'de> for ScheduleCollectionVisitor {
    type Value = ScheduleCollection;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object mapping class names to [start, end] pairs")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut collection = ScheduleCollection::new();
        while let Some((name, intervals)) = access.next_entry::<String, Vec<Interval>>()? {
            collection.insert(name, intervals);
        }
        Ok(collection)
    }
}

impl<'de> Deserialize<'de> for ScheduleCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ScheduleCollectionVisitor)
    }
}

/// Per-student summary over the matched rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub student: String,
    /// `None` when nothing matched or the best score is not positive.
    pub max_score: Option<f64>,
    pub scores: Vec<Option<f64>>,
}

impl ResultRow {
    pub fn formatted_max(&self) -> String {
        self.max_score
            .map(|m| format!("{:.2}", m))
            .unwrap_or_default()
    }

    pub fn formatted_scores(&self) -> Vec<String> {
        self.scores
            .iter()
            .map(|s| match s {
                Some(v) => format!("{:.2}", v),
                None => "-".to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_keeps_json_key_order() {
        let json = r#"{"Zeta": [["2024-01-01 08:00", "2024-01-01 10:00"]], "Alpha": []}"#;
        let collection: ScheduleCollection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.names(), vec!["Zeta", "Alpha"]);
        assert_eq!(
            collection.get("Zeta").unwrap(),
            &[Interval::new("2024-01-01 08:00", "2024-01-01 10:00")]
        );

        let written = serde_json::to_string(&collection).unwrap();
        assert_eq!(
            written,
            r#"{"Zeta":[["2024-01-01 08:00","2024-01-01 10:00"]],"Alpha":[]}"#
        );
    }

    #[test]
    fn duplicate_keys_keep_first_position_and_last_value() {
        let json = r#"{"A": [], "B": [], "A": [["x", "y"]]}"#;
        let collection: ScheduleCollection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.names(), vec!["A", "B"]);
        assert_eq!(collection.get("A").unwrap(), &[Interval::new("x", "y")]);
    }

    #[test]
    fn placeholder_and_empty_are_effectively_empty() {
        let mut collection = ScheduleCollection::new();
        assert!(collection.is_effectively_empty());
        collection.insert("", vec![]);
        assert!(collection.is_effectively_empty());
        collection.insert("", vec![Interval::new("a", "b")]);
        assert!(!collection.is_effectively_empty());
    }

    #[test]
    fn interval_reports_invalid_endpoints() {
        let interval = Interval::new("2024-03-01 08:00", "not a date");
        let validity = interval.validity();
        assert!(validity.start);
        assert!(!validity.end);
        assert!(!validity.is_valid());
        assert!(interval.bounds().is_none());
    }

    #[test]
    fn result_row_formats_two_decimals() {
        let row = ResultRow {
            student: "Durand Alice".to_string(),
            max_score: Some(18.0),
            scores: vec![Some(12.5), Some(0.0), None, Some(18.0)],
        };
        assert_eq!(row.formatted_max(), "18.00");
        assert_eq!(row.formatted_scores(), vec!["12.50", "0.00", "-", "18.00"]);
    }

    #[test]
    fn missing_columns_are_sorted() {
        let missing = missing_columns(["Prénom", "Statut", "Terminé"]);
        assert_eq!(missing, vec!["Commencé", "Nom de famille", "Note/20,00"]);
    }
}
