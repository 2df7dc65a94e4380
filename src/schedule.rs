use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info};

use crate::error::ScheduleError;
use crate::model::{Interval, ScheduleCollection};

pub use crate::datetime::is_valid_datetime;

/// Named class schedules backed by one JSON document. A missing document is
/// an empty collection, and an empty collection is never written.
#[derive(Debug, Clone)]
pub struct ScheduleStore {
    path: PathBuf,
    collection: ScheduleCollection,
}

impl ScheduleStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ScheduleError> {
        let path = path.as_ref().to_path_buf();
        let collection = load(&path)?;
        Ok(Self { path, collection })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &ScheduleCollection {
        &self.collection
    }

    pub fn list_class_names(&self) -> Vec<String> {
        self.collection.names()
    }

    pub fn intervals(&self, name: &str) -> Option<&[Interval]> {
        self.collection.get(name)
    }

    /// Adds an empty schedule in memory; call `save` to persist it.
    pub fn add_class(&mut self, name: &str) -> Result<&ScheduleCollection, ScheduleError> {
        if name.is_empty() {
            return Err(ScheduleError::EmptyName);
        }
        if self.collection.contains(name) {
            return Err(ScheduleError::DuplicateName(name.to_string()));
        }
        self.collection.insert(name, Vec::new());
        Ok(&self.collection)
    }

    /// Removes and persists. Unknown names are ignored.
    pub fn remove_class(&mut self, name: &str) -> Result<&ScheduleCollection, ScheduleError> {
        if self.collection.remove(name).is_some() {
            self.save()?;
        }
        Ok(&self.collection)
    }

    /// Replaces (or creates) the schedule of `name`. Interval text is not checked.
    pub fn set_intervals(&mut self, name: &str, intervals: Vec<Interval>) {
        self.collection.insert(name, intervals);
    }

    pub fn add_interval(&mut self, name: &str, interval: Interval) -> Result<(), ScheduleError> {
        self.class_mut(name)?.push(interval);
        Ok(())
    }

    pub fn remove_interval(&mut self, name: &str, index: usize) -> Result<Interval, ScheduleError> {
        let intervals = self.class_mut(name)?;
        check_index(name, index, intervals.len())?;
        Ok(intervals.remove(index))
    }

    pub fn edit_interval(
        &mut self,
        name: &str,
        index: usize,
        interval: Interval,
    ) -> Result<(), ScheduleError> {
        let intervals = self.class_mut(name)?;
        check_index(name, index, intervals.len())?;
        intervals[index] = interval;
        Ok(())
    }

    pub fn save(&self) -> Result<(), ScheduleError> {
        save(&self.path, &self.collection)
    }

    fn class_mut(&mut self, name: &str) -> Result<&mut Vec<Interval>, ScheduleError> {
        self.collection
            .get_mut(name)
            .ok_or_else(|| ScheduleError::UnknownClass(name.to_string()))
    }
}

fn check_index(name: &str, index: usize, len: usize) -> Result<(), ScheduleError> {
    if index < len {
        Ok(())
    } else {
        Err(ScheduleError::IntervalIndex {
            class: name.to_string(),
            index,
            len,
        })
    }
}

pub fn load(path: &Path) -> Result<ScheduleCollection, ScheduleError> {
    if !path.exists() {
        debug!(path = %path.display(), "no schedule file, starting empty");
        return Ok(ScheduleCollection::new());
    }
    let text = fs::read_to_string(path).map_err(|source| ScheduleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ScheduleError::Persistence {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes through a sibling temp file and a rename, so a crash never leaves a
/// half-written document. An effectively empty collection deletes the file.
pub fn save(path: &Path, collection: &ScheduleCollection) -> Result<(), ScheduleError> {
    let io_err = |source: std::io::Error| ScheduleError::Io {
        path: path.to_path_buf(),
        source,
    };

    if collection.is_effectively_empty() {
        if path.exists() {
            fs::remove_file(path).map_err(io_err)?;
            info!(path = %path.display(), "schedule empty, removed file");
        }
        return Ok(());
    }

    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    collection
        .serialize(&mut ser)
        .map_err(|source| ScheduleError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, &buf).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    info!(path = %path.display(), classes = collection.len(), "saved schedules");
    Ok(())
}
