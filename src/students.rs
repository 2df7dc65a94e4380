use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ActivityRecord, Dataset, StudentId};

/// Rows grouped by (last name, first name), keys in lexicographic order and
/// rows in file order within each group.
pub fn group_by_student(dataset: &Dataset) -> BTreeMap<StudentId, Vec<&ActivityRecord>> {
    let mut groups: BTreeMap<StudentId, Vec<&ActivityRecord>> = BTreeMap::new();
    for record in dataset.records() {
        groups.entry(record.student()).or_default().push(record);
    }
    groups
}

/// Distinct students, ordered by last name then first name (byte order).
pub fn distinct_students(dataset: &Dataset) -> Vec<StudentId> {
    dataset
        .records()
        .iter()
        .map(ActivityRecord::student)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Checkable student filter. Built fresh from each loaded dataset with every
/// student checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentSelection {
    entries: Vec<(StudentId, bool)>,
}

impl StudentSelection {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            entries: distinct_students(dataset)
                .into_iter()
                .map(|s| (s, true))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(StudentId, bool)] {
        &self.entries
    }

    pub fn is_selected(&self, full_name: &str) -> bool {
        self.entries
            .iter()
            .any(|(s, checked)| *checked && s.full_name() == full_name)
    }

    /// Returns false when no student carries that name.
    pub fn set(&mut self, full_name: &str, checked: bool) -> bool {
        let mut found = false;
        for (student, state) in self.entries.iter_mut() {
            if student.full_name() == full_name {
                *state = checked;
                found = true;
            }
        }
        found
    }

    pub fn toggle(&mut self, full_name: &str) -> Option<bool> {
        let next = !self.is_selected(full_name);
        self.set(full_name, next).then_some(next)
    }

    pub fn select_all(&mut self, checked: bool) {
        for (_, state) in self.entries.iter_mut() {
            *state = checked;
        }
    }

    /// Checks exactly `names`; returns the names that matched no student.
    pub fn select_only<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        self.select_all(false);
        names
            .into_iter()
            .filter(|name| !self.set(name, true))
            .map(str::to_string)
            .collect()
    }

    pub fn selected_names(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|(_, checked)| *checked)
            .map(|(s, _)| s.full_name())
            .collect()
    }
}
