#![allow(dead_code)]

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ingestion::graph::GraphSink;
use ingestion::source::{
    parse_timestamp, DROPOFF_DATETIME, DROPOFF_LOCATION, FARE_AMOUNT, PICKUP_DATETIME,
    PICKUP_LOCATION, TRIP_DISTANCE,
};
use ingestion::statements::{ImportStatement, ImportStep};
use ingestion::GraphError;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tripgraph_core::model::TripRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location(pub i64);

/// A `TRIP` relationship as the graph stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct TripEdge {
    pub from: Location,
    pub to: Location,
    pub distance: f64,
    pub fare: f64,
    pub pickup_dt: NaiveDateTime,
    pub dropoff_dt: NaiveDateTime,
}

impl From<&TripRecord> for TripEdge {
    fn from(trip: &TripRecord) -> Self {
        Self {
            from: Location(trip.pickup_location),
            to: Location(trip.dropoff_location),
            distance: trip.distance,
            fare: trip.fare,
            pickup_dt: trip.pickup_at,
            dropoff_dt: trip.dropoff_at,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TripRow {
    pub pickup: &'static str,
    pub dropoff: &'static str,
    pub pickup_location: i64,
    pub dropoff_location: i64,
    pub distance: f64,
    pub fare: f64,
}

pub fn trip(
    pickup: &'static str,
    dropoff: &'static str,
    pickup_location: i64,
    dropoff_location: i64,
    distance: f64,
    fare: f64,
) -> TripRow {
    TripRow {
        pickup,
        dropoff,
        pickup_location,
        dropoff_location,
        distance,
        fare,
    }
}

pub fn sample_trip() -> TripRow {
    trip("2022-03-01 08:00:00", "2022-03-01 08:20:00", 10, 20, 3.5, 12.0)
}

pub fn write_trips(path: &Path, rows: &[TripRow]) {
    write_trips_excluding(path, rows, &[]);
}

/// Writes a TLC-shaped file with string timestamps and an extra column that
/// the loader should ignore. Columns named in `excluded` are left out.
pub fn write_trips_excluding(path: &Path, rows: &[TripRow], excluded: &[&str]) {
    write_columns(path, tlc_columns(rows), excluded);
}

/// Like `write_trips`, but `fare_amount` is nullable and null in `null_row`.
pub fn write_trips_with_null_fare(path: &Path, rows: &[TripRow], null_row: usize) {
    let fares: Float64Array = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (i != null_row).then_some(r.fare))
        .collect();
    let columns = tlc_columns(rows)
        .into_iter()
        .map(|(field, array)| {
            if field.name() == FARE_AMOUNT {
                (
                    Field::new(FARE_AMOUNT, DataType::Float64, true),
                    Arc::new(fares.clone()) as ArrayRef,
                )
            } else {
                (field, array)
            }
        })
        .collect();
    write_columns(path, columns, &[]);
}

/// TLC-shaped columns with string timestamps and an extra column that the
/// loader should ignore.
fn tlc_columns(rows: &[TripRow]) -> Vec<(Field, ArrayRef)> {
    let columns: Vec<(Field, ArrayRef)> = vec![
        (
            Field::new("VendorID", DataType::Int64, false),
            Arc::new(Int64Array::from(vec![1_i64; rows.len()])),
        ),
        (
            Field::new(PICKUP_DATETIME, DataType::Utf8, false),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.pickup).collect::<Vec<_>>(),
            )),
        ),
        (
            Field::new(DROPOFF_DATETIME, DataType::Utf8, false),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.dropoff).collect::<Vec<_>>(),
            )),
        ),
    ];
    with_trip_fields(columns, rows)
}

/// Same trips, with the timestamps stored as native microsecond timestamps.
pub fn write_trips_with_timestamp_columns(path: &Path, rows: &[TripRow]) {
    let micros = |value: &str| {
        parse_timestamp(value)
            .expect("fixture timestamp")
            .and_utc()
            .timestamp_micros()
    };
    let timestamp = DataType::Timestamp(TimeUnit::Microsecond, None);
    let columns: Vec<(Field, ArrayRef)> = vec![
        (
            Field::new(PICKUP_DATETIME, timestamp.clone(), false),
            Arc::new(TimestampMicrosecondArray::from(
                rows.iter().map(|r| micros(r.pickup)).collect::<Vec<_>>(),
            )),
        ),
        (
            Field::new(DROPOFF_DATETIME, timestamp, false),
            Arc::new(TimestampMicrosecondArray::from(
                rows.iter().map(|r| micros(r.dropoff)).collect::<Vec<_>>(),
            )),
        ),
    ];
    write_columns(path, with_trip_fields(columns, rows), &[]);
}

fn with_trip_fields(
    mut columns: Vec<(Field, ArrayRef)>,
    rows: &[TripRow],
) -> Vec<(Field, ArrayRef)> {
    columns.push((
        Field::new(PICKUP_LOCATION, DataType::Int64, false),
        Arc::new(Int64Array::from(
            rows.iter().map(|r| r.pickup_location).collect::<Vec<_>>(),
        )),
    ));
    columns.push((
        Field::new(DROPOFF_LOCATION, DataType::Int64, false),
        Arc::new(Int64Array::from(
            rows.iter().map(|r| r.dropoff_location).collect::<Vec<_>>(),
        )),
    ));
    columns.push((
        Field::new(TRIP_DISTANCE, DataType::Float64, false),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.distance).collect::<Vec<_>>(),
        )),
    ));
    columns.push((
        Field::new(FARE_AMOUNT, DataType::Float64, false),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.fare).collect::<Vec<_>>(),
        )),
    ));
    columns
}

fn write_columns(path: &Path, columns: Vec<(Field, ArrayRef)>, excluded: &[&str]) {
    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = columns
        .into_iter()
        .filter(|(field, _)| !excluded.contains(&field.name().as_str()))
        .unzip();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();

    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[derive(Debug, Default)]
pub struct GraphState {
    pub locations: Vec<Location>,
    pub trips: Vec<TripEdge>,
    pub executed: Vec<ImportStep>,
    pub closed: usize,
}

/// Applies import statements to an in-memory graph with the same MERGE
/// semantics as the Cypher, reading the staged CSV from the import directory.
#[derive(Clone)]
pub struct InMemoryGraph {
    import_dir: PathBuf,
    fail_on: Option<ImportStep>,
    state: Arc<Mutex<GraphState>>,
}

impl InMemoryGraph {
    pub fn new(import_dir: impl Into<PathBuf>) -> Self {
        Self {
            import_dir: import_dir.into(),
            fail_on: None,
            state: Arc::new(Mutex::new(GraphState::default())),
        }
    }

    pub fn failing_on(mut self, step: ImportStep) -> Self {
        self.fail_on = Some(step);
        self
    }

    pub fn locations(&self) -> Vec<Location> {
        let mut locations = self.state.lock().unwrap().locations.clone();
        locations.sort();
        locations
    }

    pub fn trips(&self) -> Vec<TripEdge> {
        self.state.lock().unwrap().trips.clone()
    }

    pub fn executed(&self) -> Vec<ImportStep> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }
}

fn field<'a>(row: &'a csv::StringRecord, headers: &csv::StringRecord, name: &str) -> &'a str {
    let index = headers
        .iter()
        .position(|h| h == name)
        .expect("staged header");
    &row[index]
}

// Mirrors `datetime(replace(value, ' ', 'T'))`.
fn cypher_datetime(value: &str) -> Result<NaiveDateTime, GraphError> {
    value
        .replace(' ', "T")
        .parse::<NaiveDateTime>()
        .map_err(|e| GraphError::Rejected(format!("datetime({}): {}", value, e)))
}

#[async_trait]
impl GraphSink for InMemoryGraph {
    async fn run(&self, statement: &ImportStatement) -> Result<(), GraphError> {
        if self.fail_on == Some(statement.step) {
            return Err(GraphError::Rejected(format!("{} rejected", statement.step)));
        }

        let path = self.import_dir.join(&statement.file_name);
        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            GraphError::Rejected(format!("cannot load {}: {}", path.display(), e))
        })?;
        let headers = reader.headers().unwrap().clone();
        let mut state = self.state.lock().unwrap();

        for row in reader.records() {
            let row = row.map_err(|e| GraphError::Rejected(e.to_string()))?;
            let pickup = Location(field(&row, &headers, PICKUP_LOCATION).parse().unwrap());
            let dropoff = Location(field(&row, &headers, DROPOFF_LOCATION).parse().unwrap());
            match statement.step {
                ImportStep::PickupLocations => {
                    if !state.locations.contains(&pickup) {
                        state.locations.push(pickup);
                    }
                }
                ImportStep::DropoffLocations => {
                    if !state.locations.contains(&dropoff) {
                        state.locations.push(dropoff);
                    }
                }
                ImportStep::Trips => {
                    if !state.locations.contains(&pickup) || !state.locations.contains(&dropoff) {
                        continue;
                    }
                    let edge = TripEdge {
                        from: pickup,
                        to: dropoff,
                        distance: field(&row, &headers, TRIP_DISTANCE).parse().unwrap(),
                        fare: field(&row, &headers, FARE_AMOUNT).parse().unwrap(),
                        pickup_dt: cypher_datetime(field(&row, &headers, PICKUP_DATETIME))?,
                        dropoff_dt: cypher_datetime(field(&row, &headers, DROPOFF_DATETIME))?,
                    };
                    if !state.trips.contains(&edge) {
                        state.trips.push(edge);
                    }
                }
            }
        }
        state.executed.push(statement.step);
        Ok(())
    }

    async fn close(self) -> Result<(), GraphError> {
        self.state.lock().unwrap().closed += 1;
        Ok(())
    }
}
