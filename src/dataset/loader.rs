// src/dataset/loader.rs
//! Split loading
//!
//! Each split lives in `<data_root>/<dataset>/<split>/` as
//! `features.csv` (tab-separated, one header row), `y_<split>.txt` and
//! `subject_<split>.txt` (one integer per line).

use std::path::Path;
use ndarray::Array2;
use tracing::info;

use crate::config::constants::dataset::{FEATURES_FILE, FEATURES_HEADER_ROWS};
use super::{DatasetError, SplitData};

/// Reader for the per-split files
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    delimiter: u8,
    header_rows: usize,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            header_rows: FEATURES_HEADER_ROWS,
        }
    }
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn load_split(&self, dir: &Path, dataset: &str, split: &str) -> Result<SplitData, DatasetError> {
        let features = self.read_matrix(&dir.join(FEATURES_FILE), dataset)?;
        let labels = self.read_codes(&dir.join(format!("y_{}.txt", split)), dataset)?;
        let subjects = self.read_codes(&dir.join(format!("subject_{}.txt", split)), dataset)?;

        info!(
            dataset,
            split,
            rows = features.nrows(),
            columns = features.ncols(),
            "loaded split"
        );

        SplitData::new(features, labels, subjects).map_err(|message| DatasetError::Shape {
            dataset: dataset.to_string(),
            split: split.to_string(),
            message,
        })
    }

    /// Numeric matrix, all rows the same width
    pub fn read_matrix(&self, path: &Path, dataset: &str) -> Result<Array2<f64>, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| io_error(dataset, path, e))?;

        let mut data = Vec::new();
        let mut n_cols = None;
        let mut n_rows = 0;

        let mut non_empty = 0;

        for (record_num, result) in reader.records().enumerate() {
            let record = result.map_err(|e| parse_error(dataset, path, record_num + 1, e.to_string()))?;
            if is_blank(&record) {
                continue;
            }
            non_empty += 1;
            if non_empty <= self.header_rows {
                continue;
            }
            let line = record.position().map_or(record_num + 1, |p| p.line() as usize);

            let width = record.len();
            match n_cols {
                None => n_cols = Some(width),
                Some(expected) if expected != width => {
                    return Err(parse_error(
                        dataset,
                        path,
                        line,
                        format!("expected {} fields, found {}", expected, width),
                    ));
                }
                Some(_) => {}
            }

            for field in record.iter() {
                let value = field
                    .parse::<f64>()
                    .map_err(|e| parse_error(dataset, path, line, format!("'{}': {}", field, e)))?;
                data.push(value);
            }
            n_rows += 1;
        }

        Array2::from_shape_vec((n_rows, n_cols.unwrap_or(0)), data)
            .map_err(|e| parse_error(dataset, path, 0, e.to_string()))
    }

    /// One non-negative integer code per line; `3` and `3.0` are both accepted
    pub fn read_codes(&self, path: &Path, dataset: &str) -> Result<Vec<u32>, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| io_error(dataset, path, e))?;

        let mut codes = Vec::new();
        for (record_num, result) in reader.records().enumerate() {
            let record = result.map_err(|e| parse_error(dataset, path, record_num + 1, e.to_string()))?;
            if is_blank(&record) {
                continue;
            }
            let line = record.position().map_or(record_num + 1, |p| p.line() as usize);
            let field = record.get(0).unwrap_or("");
            codes.push(parse_code(field).ok_or_else(|| {
                parse_error(dataset, path, line, format!("'{}' is not an integer code", field))
            })?);
        }

        Ok(codes)
    }
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.is_empty())
}

fn parse_code(field: &str) -> Option<u32> {
    if let Ok(code) = field.parse::<u32>() {
        return Some(code);
    }
    let value = field.parse::<f64>().ok()?;
    if value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

fn io_error(dataset: &str, path: &Path, err: csv::Error) -> DatasetError {
    DatasetError::Io {
        dataset: Some(dataset.to_string()),
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn parse_error(dataset: &str, path: &Path, line: usize, message: String) -> DatasetError {
    DatasetError::Parse {
        dataset: dataset.to_string(),
        path: path.display().to_string(),
        line,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_split() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "features.csv", "a-mean()\ta-std()\n1.0\t2.5e-1\n\n3.0\t4.0\n");
        write(dir.path(), "y_train.txt", "1\n2.0\n");
        write(dir.path(), "subject_train.txt", "7\n7\n");

        let split = DatasetLoader::new().load_split(dir.path(), "synthetic", "train").unwrap();

        assert_eq!(split.features.dim(), (2, 2));
        assert_eq!(split.features[[0, 1]], 0.25);
        assert_eq!(split.labels, vec![1, 2]);
        assert_eq!(split.subjects, vec![7, 7]);
    }

    #[test]
    fn test_ragged_matrix_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "features.csv", "h1\th2\n1\t2\n3\n");

        let err = DatasetLoader::new()
            .read_matrix(&dir.path().join("features.csv"), "synthetic")
            .unwrap_err();
        assert!(matches!(err, DatasetError::Parse { .. }));
    }

    #[test]
    fn test_label_count_mismatch() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "features.csv", "h\n1\n2\n");
        write(dir.path(), "y_test.txt", "1\n");
        write(dir.path(), "subject_test.txt", "1\n1\n");

        let err = DatasetLoader::new().load_split(dir.path(), "synthetic", "test").unwrap_err();
        assert!(matches!(err, DatasetError::Shape { .. }));
        assert_eq!(err.dataset_name(), Some("synthetic"));
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code("4"), Some(4));
        assert_eq!(parse_code("4.0"), Some(4));
        assert_eq!(parse_code("4.5"), None);
        assert_eq!(parse_code("-1"), None);
    }
}
