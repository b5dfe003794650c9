//! Label and fold-assignment loading

use crate::{Error, Result};
use ndarray::Array2;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct LabelRecord {
    #[allow(dead_code)]
    id: String,
    attribute_ids: String,
}

/// Parse one space-separated attribute list into a multi-hot row
fn parse_attributes(s: &str, num_classes: usize) -> Result<Vec<f32>> {
    let mut row = vec![0.0; num_classes];
    for token in s.split_whitespace() {
        let idx: usize = token
            .parse()
            .map_err(|_| Error::DataError(format!("bad attribute id '{token}'")))?;
        if idx >= num_classes {
            return Err(Error::DataError(format!(
                "attribute id {idx} out of range for {num_classes} classes"
            )));
        }
        row[idx] = 1.0;
    }
    Ok(row)
}

/// Load the training labels CSV (`id,attribute_ids`) into a multi-hot
/// target matrix, one row per sample in file order
pub fn load_labels(path: &Path, num_classes: usize) -> Result<Array2<f32>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::DataError(format!("failed to read labels {}: {e}", path.display())))?;

    let mut values = Vec::new();
    let mut rows = 0;
    for record in reader.deserialize::<LabelRecord>() {
        let record = record
            .map_err(|e| Error::DataError(format!("labels {}: {e}", path.display())))?;
        values.extend(parse_attributes(&record.attribute_ids, num_classes)?);
        rows += 1;
    }

    Array2::from_shape_vec((rows, num_classes), values)
        .map_err(|e| Error::DataError(format!("labels {}: {e}", path.display())))
}

/// Load the fold assignment, one fold index per training sample
pub fn load_folds(path: &Path) -> Result<Vec<u32>> {
    let file = File::open(path)
        .map_err(|e| Error::DataError(format!("failed to read folds {}: {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::Serialization(format!("folds {} are malformed: {e}", path.display())))
}
