use std::path::Path;

use tracing::info;

use crate::config::AppConfig;
use crate::error::{ComputeError, LoadError, ScheduleError, SessionError};
use crate::loader::DatasetLoader;
use crate::model::{Dataset, Interval, ResultRow, StudentId};
use crate::results::{ResultEngine, usable_dataset};
use crate::schedule::ScheduleStore;
use crate::students::StudentSelection;

/// Everything one user works on: the loaded export, the student filter and
/// the schedule store. Failed operations leave all of it untouched.
#[derive(Debug)]
pub struct Session {
    loader: DatasetLoader,
    engine: ResultEngine,
    dataset: Option<Dataset>,
    selection: StudentSelection,
    schedules: ScheduleStore,
}

impl Session {
    pub fn open(config: &AppConfig) -> Result<Self, SessionError> {
        Ok(Self {
            loader: DatasetLoader::from_config(config)?,
            engine: ResultEngine::new(config.completed_status.clone()),
            dataset: None,
            selection: StudentSelection::default(),
            schedules: ScheduleStore::open(&config.schedule_path)?,
        })
    }

    /// Loads a `.csv` export and, only on success, replaces the dataset and
    /// resets the student filter to everyone.
    pub fn open_and_load<P: AsRef<Path>>(&mut self, path: P) -> Result<&Dataset, LoadError> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(LoadError::UnsupportedFileType {
                path: path.to_path_buf(),
            });
        }

        let dataset = self.loader.load_path(path)?;
        self.selection = StudentSelection::from_dataset(&dataset);
        info!(students = self.selection.len(), "student filter reset");
        Ok(self.dataset.insert(dataset))
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn students(&self) -> Vec<StudentId> {
        self.selection
            .entries()
            .iter()
            .map(|(s, _)| s.clone())
            .collect()
    }

    pub fn selection(&self) -> &StudentSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut StudentSelection {
        &mut self.selection
    }

    pub fn schedules_mut(&mut self) -> &mut ScheduleStore {
        &mut self.schedules
    }

    pub fn get_schedule_names(&self) -> Vec<String> {
        self.schedules.list_class_names()
    }

    pub fn get_intervals(&self, name: &str) -> Result<Vec<Interval>, ScheduleError> {
        self.schedules
            .intervals(name)
            .map(<[Interval]>::to_vec)
            .ok_or_else(|| ScheduleError::UnknownClass(name.to_string()))
    }

    /// Replaces the intervals of `name` and writes the whole collection.
    pub fn save_schedule(
        &mut self,
        name: &str,
        intervals: Vec<Interval>,
    ) -> Result<(), ScheduleError> {
        self.schedules.set_intervals(name, intervals);
        self.schedules.save()
    }

    /// Results for the checked students over the windows of class `name`.
    /// Data problems are reported before an unknown class name.
    pub fn compute_results(&self, name: &str) -> Result<Vec<ResultRow>, ComputeError> {
        let dataset = usable_dataset(self.dataset.as_ref())?;
        let intervals = self
            .schedules
            .intervals(name)
            .ok_or_else(|| ComputeError::UnknownClass(name.to_string()))?;
        let selected = self.selection.selected_names();
        let rows = self.engine.compute_checked(dataset, &selected, intervals);
        info!(rows = rows.len(), intervals = intervals.len(), "computed results");
        Ok(rows)
    }
}
