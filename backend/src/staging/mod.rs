//! Intermediate cleaned CSV between the transform and load stages.
//!
//! Columns: `date,product,category,quantity,price,revenue`, with a header.
//! Dates are written as `YYYY-MM-DD` and decimals without rounding, so a
//! write/read round trip is lossless.

use std::fs::File;
use std::path::Path;

use crate::error::{StagingError, StagingResult};
use crate::models::{CleanedDataset, SalesRecord};

/// Write a cleaned dataset to `path`, creating parent directories.
pub fn write_cleaned_csv<P: AsRef<Path>>(dataset: &CleanedDataset, path: P) -> StagingResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    write_cleaned(dataset, file)
}

/// Write a cleaned dataset to any writer.
pub fn write_cleaned<W: std::io::Write>(dataset: &CleanedDataset, writer: W) -> StagingResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    if dataset.is_empty() {
        writer.write_record(["date", "product", "category", "quantity", "price", "revenue"])?;
    }
    for record in dataset {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a cleaned dataset written by [`write_cleaned_csv`].
pub fn read_cleaned_csv<P: AsRef<Path>>(path: P) -> StagingResult<CleanedDataset> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StagingError::NotFound(path.to_path_buf()));
    }
    read_cleaned(File::open(path)?)
}

/// Read a cleaned dataset from any reader.
pub fn read_cleaned<R: std::io::Read>(reader: R) -> StagingResult<CleanedDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let records = reader
        .deserialize::<SalesRecord>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CleanedDataset::new(records))
}
