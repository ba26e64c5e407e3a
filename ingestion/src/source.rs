//! Reads trip records out of a Parquet file.
//!
//! The whole file is loaded into memory. Only the six trip columns are
//! projected, and every value is converted up front, so a single bad row
//! fails the read before anything is written downstream.

use crate::error::LoaderError;
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, info};
use tripgraph_core::model::TripRecord;

pub const PICKUP_DATETIME: &str = "tpep_pickup_datetime";
pub const DROPOFF_DATETIME: &str = "tpep_dropoff_datetime";
pub const PICKUP_LOCATION: &str = "PULocationID";
pub const DROPOFF_LOCATION: &str = "DOLocationID";
pub const TRIP_DISTANCE: &str = "trip_distance";
pub const FARE_AMOUNT: &str = "fare_amount";

/// Projected columns, in the order they are staged.
pub const TRIP_COLUMNS: [&str; 6] = [
    PICKUP_DATETIME,
    DROPOFF_DATETIME,
    PICKUP_LOCATION,
    DROPOFF_LOCATION,
    TRIP_DISTANCE,
    FARE_AMOUNT,
];

/// External timestamp format, used both for parsing string columns and for staging.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Timestamp,
    Identifier,
    Measure,
}

fn column_kind(column: &str) -> ColumnKind {
    match column {
        PICKUP_DATETIME | DROPOFF_DATETIME => ColumnKind::Timestamp,
        PICKUP_LOCATION | DROPOFF_LOCATION => ColumnKind::Identifier,
        _ => ColumnKind::Measure,
    }
}

fn check_type(column: &str, data_type: &DataType) -> Result<(), LoaderError> {
    let accepted = match column_kind(column) {
        ColumnKind::Timestamp => matches!(
            data_type,
            DataType::Timestamp(_, _) | DataType::Utf8 | DataType::LargeUtf8
        ),
        ColumnKind::Identifier => data_type.is_integer(),
        ColumnKind::Measure => data_type.is_numeric(),
    };
    if accepted {
        Ok(())
    } else {
        Err(LoaderError::Schema {
            column: column.to_string(),
            reason: format!("unsupported type {}", data_type),
        })
    }
}

pub fn read_trips(path: &Path) -> Result<Vec<TripRecord>, LoaderError> {
    let file = File::open(path).map_err(|e| LoaderError::Read {
        path: path.to_path_buf(),
        missing: e.kind() == io::ErrorKind::NotFound,
        reason: e.to_string(),
    })?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| LoaderError::read(path, e))?;

    let schema = builder.schema().clone();
    let mut roots = Vec::with_capacity(TRIP_COLUMNS.len());
    for column in TRIP_COLUMNS {
        let index = schema.index_of(column).map_err(|_| LoaderError::Schema {
            column: column.to_string(),
            reason: "column is missing".to_string(),
        })?;
        check_type(column, schema.field(index).data_type())?;
        roots.push(index);
    }
    let mask = ProjectionMask::roots(builder.parquet_schema(), roots);
    let reader = builder
        .with_projection(mask)
        .build()
        .map_err(|e| LoaderError::read(path, e))?;

    let mut trips = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| LoaderError::read(path, e))?;
        debug!(rows = batch.num_rows(), "decoding record batch");
        decode_batch(&batch, &mut trips)?;
    }

    info!(path = %path.display(), rows = trips.len(), "Read trip records");
    Ok(trips)
}

fn decode_batch(batch: &RecordBatch, trips: &mut Vec<TripRecord>) -> Result<(), LoaderError> {
    let offset = trips.len();
    let pickups = timestamps(batch, PICKUP_DATETIME, offset)?;
    let dropoffs = timestamps(batch, DROPOFF_DATETIME, offset)?;
    let pickup_locations = identifiers(batch, PICKUP_LOCATION, offset)?;
    let dropoff_locations = identifiers(batch, DROPOFF_LOCATION, offset)?;
    let distances = measures(batch, TRIP_DISTANCE, offset)?;
    let fares = measures(batch, FARE_AMOUNT, offset)?;

    trips.reserve(batch.num_rows());
    for i in 0..batch.num_rows() {
        trips.push(TripRecord {
            pickup_at: pickups[i],
            dropoff_at: dropoffs[i],
            pickup_location: pickup_locations[i],
            dropoff_location: dropoff_locations[i],
            distance: distances[i],
            fare: fares[i],
        });
    }
    Ok(())
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef, LoaderError> {
    batch.column_by_name(name).ok_or_else(|| LoaderError::Schema {
        column: name.to_string(),
        reason: "column is missing".to_string(),
    })
}

fn cast_to(array: &ArrayRef, name: &str, to: &DataType) -> Result<ArrayRef, LoaderError> {
    cast(array, to).map_err(|e| LoaderError::Schema {
        column: name.to_string(),
        reason: e.to_string(),
    })
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, name: &str) -> Result<&'a T, LoaderError> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| LoaderError::Schema {
        column: name.to_string(),
        reason: format!("unexpected array type {}", array.data_type()),
    })
}

fn invalid(name: &str, row: usize, value: impl Into<String>) -> LoaderError {
    LoaderError::Parse {
        column: name.to_string(),
        row,
        value: value.into(),
    }
}

fn timestamps(
    batch: &RecordBatch,
    name: &str,
    offset: usize,
) -> Result<Vec<NaiveDateTime>, LoaderError> {
    let array = column(batch, name)?;
    match array.data_type() {
        DataType::Timestamp(unit, _) => {
            let unit = *unit;
            let raw = cast_to(array, name, &DataType::Int64)?;
            let raw = downcast::<Int64Array>(&raw, name)?;
            raw.iter()
                .enumerate()
                .map(|(i, value)| {
                    let value = value.ok_or_else(|| invalid(name, offset + i, "null"))?;
                    epoch_to_datetime(value, unit)
                        .ok_or_else(|| invalid(name, offset + i, value.to_string()))
                })
                .collect()
        }
        _ => {
            let text = cast_to(array, name, &DataType::Utf8)?;
            let text = downcast::<StringArray>(&text, name)?;
            text.iter()
                .enumerate()
                .map(|(i, value)| {
                    let value = value.ok_or_else(|| invalid(name, offset + i, "null"))?;
                    parse_timestamp(value).ok_or_else(|| invalid(name, offset + i, value))
                })
                .collect()
        }
    }
}

fn epoch_to_datetime(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let utc = match unit {
        TimeUnit::Second => DateTime::from_timestamp(value, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(value),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(value)),
    };
    utc.map(|dt| dt.naive_utc())
}

fn identifiers(batch: &RecordBatch, name: &str, offset: usize) -> Result<Vec<i64>, LoaderError> {
    let array = cast_to(column(batch, name)?, name, &DataType::Int64)?;
    downcast::<Int64Array>(&array, name)?
        .iter()
        .enumerate()
        .map(|(i, value)| value.ok_or_else(|| invalid(name, offset + i, "null")))
        .collect()
}

fn measures(batch: &RecordBatch, name: &str, offset: usize) -> Result<Vec<f64>, LoaderError> {
    let array = cast_to(column(batch, name)?, name, &DataType::Float64)?;
    downcast::<Float64Array>(&array, name)?
        .iter()
        .enumerate()
        .map(|(i, value)| value.ok_or_else(|| invalid(name, offset + i, "null")))
        .collect()
}
