use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::error::ComputeError;
use crate::model::{ActivityRecord, Dataset, Interval, ResultRow};
use crate::students::group_by_student;

/// Per-student summaries over completed activity that falls inside the class windows.
#[derive(Debug, Clone)]
pub struct ResultEngine {
    completed_status: String,
}

impl Default for ResultEngine {
    fn default() -> Self {
        Self::new("Terminée")
    }
}

impl ResultEngine {
    pub fn new(completed_status: impl Into<String>) -> Self {
        Self {
            completed_status: completed_status.into(),
        }
    }

    pub fn compute(
        &self,
        dataset: Option<&Dataset>,
        selected: &BTreeSet<String>,
        intervals: &[Interval],
    ) -> Result<Vec<ResultRow>, ComputeError> {
        let dataset = usable_dataset(dataset)?;
        Ok(self.compute_checked(dataset, selected, intervals))
    }

    /// Same as `compute` for a dataset already passed through `usable_dataset`.
    pub fn compute_checked(
        &self,
        dataset: &Dataset,
        selected: &BTreeSet<String>,
        intervals: &[Interval],
    ) -> Vec<ResultRow> {
        let windows: Vec<(NaiveDateTime, NaiveDateTime)> = intervals
            .iter()
            .filter_map(|interval| {
                let bounds = interval.bounds();
                if bounds.is_none() {
                    warn!(start = %interval.start, end = %interval.end, "skipping unparseable interval");
                }
                bounds
            })
            .collect();

        let mut results = Vec::new();
        for (student, rows) in group_by_student(dataset) {
            let full_name = student.full_name();
            if !selected.contains(&full_name) {
                continue;
            }
            let completed: Vec<&ActivityRecord> = rows
                .into_iter()
                .filter(|r| r.status == self.completed_status)
                .collect();
            let matched = match_windows(&completed, &windows);
            debug!(student = %full_name, matched = matched.len(), "matched activity");
            results.push(summarize(full_name, &matched));
        }
        results
    }
}

pub fn usable_dataset(dataset: Option<&Dataset>) -> Result<&Dataset, ComputeError> {
    let dataset = dataset.ok_or(ComputeError::NoData)?;
    let missing = dataset.missing_columns();
    if !missing.is_empty() {
        return Err(ComputeError::MissingColumns { missing });
    }
    Ok(dataset)
}

/// Union over windows, concatenated window by window. A row inside two windows
/// appears twice.
fn match_windows<'a>(
    rows: &[&'a ActivityRecord],
    windows: &[(NaiveDateTime, NaiveDateTime)],
) -> Vec<&'a ActivityRecord> {
    windows
        .iter()
        .flat_map(|(start, end)| {
            rows.iter()
                .copied()
                .filter(move |r| r.started_at >= *start && r.completed_at <= *end)
        })
        .collect()
}

fn summarize(student: String, matched: &[&ActivityRecord]) -> ResultRow {
    let scores: Vec<Option<f64>> = matched.iter().map(|r| r.score).collect();
    let max = scores.iter().flatten().copied().reduce(f64::max);
    ResultRow {
        student,
        max_score: max.filter(|m| *m > 0.0),
        scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn record(last: &str, status: &str, day: u32, hour: u32, score: Option<f64>) -> ActivityRecord {
        ActivityRecord {
            last_name: last.to_string(),
            first_name: "Alex".to_string(),
            status: status.to_string(),
            started_at: at(day, hour),
            completed_at: at(day, hour + 1),
            score,
            extra: vec![],
        }
    }

    fn dataset(records: Vec<ActivityRecord>) -> Dataset {
        let columns = crate::model::EXPECTED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        Dataset::new(columns, records)
    }

    fn selected(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn march(day: u32) -> Interval {
        Interval::new(format!("2024-03-{day:02} 00:00"), format!("2024-03-{day:02} 23:59"))
    }

    #[test]
    fn no_dataset_is_an_error() {
        let err = ResultEngine::default()
            .compute(None, &selected(&[]), &[])
            .unwrap_err();
        assert!(matches!(err, ComputeError::NoData));
    }

    #[test]
    fn columns_are_revalidated() {
        let data = Dataset::new(vec!["Statut".to_string()], vec![]);
        let err = ResultEngine::default()
            .compute(Some(&data), &selected(&[]), &[])
            .unwrap_err();
        match err {
            ComputeError::MissingColumns { missing } => assert_eq!(missing.len(), 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn complete_dataset_passes_the_checks() {
        let data = dataset(vec![record("Durand", "Terminée", 12, 10, Some(12.0))]);
        let checked = usable_dataset(Some(&data)).unwrap();
        let names = selected(&["Durand Alex"]);
        let rows = ResultEngine::default().compute_checked(checked, &names, &[march(12)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].max_score, Some(12.0));
    }

    #[test]
    fn unselected_students_are_left_out_entirely() {
        let data = dataset(vec![
            record("Durand", "Terminée", 12, 10, Some(14.0)),
            record("Martin", "Terminée", 12, 10, Some(16.0)),
        ]);
        let rows = ResultEngine::default()
            .compute(Some(&data), &selected(&["Durand Alex"]), &[march(12)])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student, "Durand Alex");
        assert_eq!(rows[0].max_score, Some(14.0));
    }

    #[test]
    fn max_and_scores_follow_row_order() {
        let data = dataset(vec![
            record("Durand", "Terminée", 12, 8, Some(12.5)),
            record("Durand", "Terminée", 12, 10, Some(0.0)),
            record("Durand", "En cours", 12, 11, Some(20.0)),
            record("Durand", "Terminée", 12, 14, Some(18.0)),
            record("Durand", "Terminée", 20, 14, Some(19.0)),
        ]);
        let rows = ResultEngine::default()
            .compute(Some(&data), &selected(&["Durand Alex"]), &[march(12)])
            .unwrap();
        assert_eq!(rows[0].formatted_max(), "18.00");
        assert_eq!(rows[0].formatted_scores(), vec!["12.50", "0.00", "18.00"]);
    }

    #[test]
    fn zero_or_empty_matches_have_no_max() {
        let data = dataset(vec![
            record("Durand", "Terminée", 12, 8, Some(0.0)),
            record("Durand", "Terminée", 12, 10, Some(0.0)),
            record("Martin", "Terminée", 20, 10, Some(15.0)),
        ]);
        let rows = ResultEngine::default()
            .compute(
                Some(&data),
                &selected(&["Durand Alex", "Martin Alex"]),
                &[march(12)],
            )
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].max_score, None);
        assert_eq!(rows[0].formatted_max(), "");
        assert_eq!(rows[0].formatted_scores(), vec!["0.00", "0.00"]);
        assert_eq!(rows[1].student, "Martin Alex");
        assert_eq!(rows[1].max_score, None);
        assert!(rows[1].scores.is_empty());
    }

    #[test]
    fn bad_interval_is_skipped_not_fatal() {
        let data = dataset(vec![
            record("Durand", "Terminée", 12, 8, Some(11.0)),
            record("Durand", "Terminée", 13, 8, Some(13.0)),
        ]);
        let intervals = [Interval::new("garbage", "2024-03-31 00:00"), march(13)];
        let rows = ResultEngine::default()
            .compute(Some(&data), &selected(&["Durand Alex"]), &intervals)
            .unwrap();
        assert_eq!(rows[0].scores, vec![Some(13.0)]);
    }

    #[test]
    fn overlapping_intervals_repeat_rows() {
        let data = dataset(vec![
            record("Durand", "Terminée", 12, 8, Some(11.0)),
            record("Durand", "Terminée", 13, 8, Some(13.0)),
        ]);
        let whole_month = Interval::new("2024-03-01", "2024-04-01");
        let rows = ResultEngine::default()
            .compute(
                Some(&data),
                &selected(&["Durand Alex"]),
                &[march(13), whole_month],
            )
            .unwrap();
        assert_eq!(
            rows[0].scores,
            vec![Some(13.0), Some(11.0), Some(13.0)]
        );
        assert_eq!(rows[0].max_score, Some(13.0));
    }

    #[test]
    fn window_bounds_are_inclusive_and_need_both_ends_inside() {
        let data = dataset(vec![
            record("Durand", "Terminée", 12, 8, Some(11.0)),
            record("Durand", "Terminée", 12, 22, Some(13.0)),
        ]);
        let exact = Interval::new("2024-03-12 08:00", "2024-03-12 09:00");
        let rows = ResultEngine::default()
            .compute(
                Some(&data),
                &selected(&["Durand Alex"]),
                &[exact, Interval::new("2024-03-12 22:00", "2024-03-12 22:30")],
            )
            .unwrap();
        assert_eq!(rows[0].scores, vec![Some(11.0)]);
    }

    #[test]
    fn absent_scores_are_ignored_by_max() {
        let data = dataset(vec![
            record("Durand", "Terminée", 12, 8, None),
            record("Durand", "Terminée", 12, 10, Some(9.5)),
        ]);
        let rows = ResultEngine::default()
            .compute(Some(&data), &selected(&["Durand Alex"]), &[march(12)])
            .unwrap();
        assert_eq!(rows[0].max_score, Some(9.5));
        assert_eq!(rows[0].formatted_scores(), vec!["-", "9.50"]);
    }

    #[test]
    fn same_inputs_same_output() {
        let data = dataset(vec![
            record("Martin", "Terminée", 12, 8, Some(11.0)),
            record("Durand", "Terminée", 12, 10, Some(9.5)),
        ]);
        let engine = ResultEngine::default();
        let names = selected(&["Durand Alex", "Martin Alex"]);
        let first = engine.compute(Some(&data), &names, &[march(12)]).unwrap();
        let second = engine.compute(Some(&data), &names, &[march(12)]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].student, "Durand Alex");
    }
}
