use crate::error::LoaderError;
use crate::source::TRIP_COLUMNS;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tripgraph_core::model::TripRecord;

const STAGED_EXTENSION: &str = "csv";
const STAGED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// The directory shared with the database server, from which `LOAD CSV`
/// resolves `file:///` URLs.
#[derive(Debug, Clone)]
pub struct StagingArea {
    import_dir: PathBuf,
}

/// A CSV file written into the import directory, ready for `LOAD CSV`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub rows: usize,
}

impl StagedFile {
    pub fn import_url(&self) -> String {
        format!("file:///{}", self.file_name)
    }
}

#[derive(Serialize)]
struct StagedRow {
    pickup: String,
    dropoff: String,
    pickup_location: i64,
    dropoff_location: i64,
    distance: f64,
    fare: f64,
}

impl From<&TripRecord> for StagedRow {
    fn from(trip: &TripRecord) -> Self {
        Self {
            pickup: format_timestamp(&trip.pickup_at),
            dropoff: format_timestamp(&trip.dropoff_at),
            pickup_location: trip.pickup_location,
            dropoff_location: trip.dropoff_location,
            distance: trip.distance,
            fare: trip.fare,
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS`, with a fractional part only when one is present.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(STAGED_TIMESTAMP_FORMAT).to_string()
}

impl StagingArea {
    pub fn new(import_dir: impl Into<PathBuf>) -> Self {
        Self {
            import_dir: import_dir.into(),
        }
    }

    /// `<stem>.csv` for an input named `<stem>.<ext>`.
    pub fn staged_file_name(input: &Path) -> Result<String, LoaderError> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LoaderError::staging(input, "input path has no usable file name"))?;
        Ok(format!("{}.{}", stem, STAGED_EXTENSION))
    }

    pub fn staged_path(&self, input: &Path) -> Result<PathBuf, LoaderError> {
        Ok(self.import_dir.join(Self::staged_file_name(input)?))
    }

    /// Writes the trips as CSV next to their final name, then renames into
    /// place. A failed write leaves no file behind at the staged path.
    pub fn stage(&self, input: &Path, trips: &[TripRecord]) -> Result<StagedFile, LoaderError> {
        let file_name = Self::staged_file_name(input)?;
        let path = self.import_dir.join(&file_name);
        let partial = self.import_dir.join(format!("{}.tmp", file_name));

        if let Err(e) = write_rows(&partial, trips) {
            let _ = fs::remove_file(&partial);
            return Err(LoaderError::staging(&path, e));
        }
        fs::rename(&partial, &path).map_err(|e| {
            let _ = fs::remove_file(&partial);
            LoaderError::staging(&path, e)
        })?;

        info!(path = %path.display(), rows = trips.len(), "Staged trips for import");
        Ok(StagedFile {
            path,
            file_name,
            rows: trips.len(),
        })
    }
}

fn write_rows(path: &Path, trips: &[TripRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(TRIP_COLUMNS)?;
    for trip in trips {
        writer.serialize(StagedRow::from(trip))?;
    }
    writer.flush()?;
    Ok(())
}
