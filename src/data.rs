//! Customer record loading and export using Polars

use std::fs::File;
use std::io::Write;
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::error::{Result, SegmentError};

/// Customer age in years.
pub const AGE: &str = "Age";
/// Annual income in thousands of dollars.
pub const ANNUAL_INCOME: &str = "Annual Income (k$)";
/// Spending score on a 1-100 scale.
pub const SPENDING_SCORE: &str = "Spending Score (1-100)";

/// Numeric features fed to clustering and projection, in model order.
pub const FEATURE_COLUMNS: [&str; 3] = [AGE, ANNUAL_INCOME, SPENDING_SCORE];

/// Column added by rule-based segmentation.
pub const RULE_SEGMENT_COLUMN: &str = "Rule_Segment";
/// Column added by clustering-based segmentation.
pub const ML_SEGMENT_COLUMN: &str = "ML_Segment";
/// First projected coordinate.
pub const PC1_COLUMN: &str = "PC1";
/// Second projected coordinate.
pub const PC2_COLUMN: &str = "PC2";

/// Ordered customer records sharing one schema.
///
/// The frame is never mutated in place: adding a column yields a new set, so
/// the unscaled copy loaded from disk stays available for rule evaluation and
/// output. Row order is preserved by every operation.
#[derive(Clone, Debug)]
pub struct RecordSet {
    frame: DataFrame,
}

impl RecordSet {
    /// Load records from a comma-separated file with a header row.
    ///
    /// Column types are inferred from every row, so a decimal or a text marker
    /// late in a numeric column widens the column instead of failing the read.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        info!(
            path = %path.display(),
            rows = frame.height(),
            columns = frame.width(),
            "loaded customer records"
        );
        Ok(Self { frame })
    }

    pub fn from_frame(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    /// Read a column as floats. Null cells and cells that do not parse as a
    /// number come back as `None`.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let series = self.require(name)?;
        let values = series.cast(&DataType::Float64)?;
        Ok(values.f64()?.into_iter().collect())
    }

    /// Read a column as text, whatever its stored type.
    pub fn text_column(&self, name: &str) -> Result<Vec<Option<String>>> {
        let series = self.require(name)?;
        let values = series.cast(&DataType::String)?;
        Ok(values
            .str()?
            .into_iter()
            .map(|value| value.map(str::to_string))
            .collect())
    }

    /// Return a copy of this set with `column` appended, or replacing an
    /// existing column of the same name.
    pub fn with_column(&self, column: Series) -> Result<Self> {
        let mut frame = self.frame.clone();
        frame.with_column(column)?;
        Ok(Self { frame })
    }

    /// Serialize as comma-separated text with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut frame = self.frame.clone();
        CsvWriter::new(writer)
            .include_header(true)
            .finish(&mut frame)?;
        Ok(())
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        self.write_csv(file)?;
        info!(path = %path.display(), rows = self.len(), "wrote segmented records");
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|err| {
            SegmentError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })
    }

    fn require(&self, name: &str) -> Result<&Series> {
        if !self.has_column(name) {
            return Err(SegmentError::missing_column(name));
        }
        Ok(self.frame.column(name)?)
    }
}

impl From<DataFrame> for RecordSet {
    fn from(frame: DataFrame) -> Self {
        Self::from_frame(frame)
    }
}
