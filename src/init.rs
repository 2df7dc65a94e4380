use std::path::PathBuf;

use anyhow::Result;
use csv::WriterBuilder;

use crate::model::EXPECTED_COLUMNS;

/// Creates an empty activity export carrying only the required header.
pub fn init_csv(filename: &str, delimiter: u8) -> Result<PathBuf> {
    let csv_filename = if filename.to_lowercase().ends_with(".csv") {
        filename.to_string()
    } else {
        format!("{}.csv", filename)
    };

    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(&csv_filename)?;
    wtr.write_record(EXPECTED_COLUMNS)?;
    wtr.flush()?;
    Ok(PathBuf::from(csv_filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DatasetLoader;
    use tempfile::tempdir;

    #[test]
    fn template_loads_as_an_empty_dataset() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("quiz");
        let path = init_csv(base.to_str().unwrap(), b',').unwrap();
        assert_eq!(path.extension().unwrap(), "csv");

        let dataset = DatasetLoader::default().load_path(&path).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.columns().len(), EXPECTED_COLUMNS.len());
    }
}
