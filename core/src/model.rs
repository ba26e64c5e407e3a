use chrono::NaiveDateTime;

/// One taxi trip, reduced to the fields loaded into the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub pickup_at: NaiveDateTime,
    pub dropoff_at: NaiveDateTime,
    pub pickup_location: i64,
    pub dropoff_location: i64,
    pub distance: f64,
    pub fare: f64,
}
