//! The three `LOAD CSV` statements that move a staged file into the graph.

use crate::source::{
    DROPOFF_DATETIME, DROPOFF_LOCATION, FARE_AMOUNT, PICKUP_DATETIME, PICKUP_LOCATION,
    TRIP_DISTANCE,
};
use crate::staging::StagedFile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStep {
    PickupLocations,
    DropoffLocations,
    Trips,
}

impl ImportStep {
    /// Execution order. Trips must come last so both endpoints already exist.
    pub const ALL: [ImportStep; 3] = [
        ImportStep::PickupLocations,
        ImportStep::DropoffLocations,
        ImportStep::Trips,
    ];
}

impl std::fmt::Display for ImportStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImportStep::PickupLocations => "pickup_locations",
            ImportStep::DropoffLocations => "dropoff_locations",
            ImportStep::Trips => "trips",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub step: ImportStep,
    /// File name inside the server's import directory.
    pub file_name: String,
    pub source_url: String,
    pub cypher: String,
}

pub fn import_plan(staged: &StagedFile) -> Vec<ImportStatement> {
    let source_url = staged.import_url();
    ImportStep::ALL
        .iter()
        .map(|&step| ImportStatement {
            step,
            file_name: staged.file_name.clone(),
            source_url: source_url.clone(),
            cypher: cypher_for(step, &source_url),
        })
        .collect()
}

fn cypher_for(step: ImportStep, source_url: &str) -> String {
    let load = format!(
        "LOAD CSV WITH HEADERS FROM '{}' AS row",
        source_url.replace('\'', "\\'")
    );
    match step {
        ImportStep::PickupLocations => format!(
            "{load}\nMERGE (:Location {{name: toInteger(row.{PICKUP_LOCATION})}})"
        ),
        ImportStep::DropoffLocations => format!(
            "{load}\nMERGE (:Location {{name: toInteger(row.{DROPOFF_LOCATION})}})"
        ),
        ImportStep::Trips => format!(
            "{load}\n\
             MATCH (pickup:Location {{name: toInteger(row.{PICKUP_LOCATION})}}), \
             (dropoff:Location {{name: toInteger(row.{DROPOFF_LOCATION})}})\n\
             MERGE (pickup)-[:TRIP {{\
             distance: toFloat(row.{TRIP_DISTANCE}), \
             fare: toFloat(row.{FARE_AMOUNT}), \
             pickup_dt: datetime(replace(row.{PICKUP_DATETIME}, ' ', 'T')), \
             dropoff_dt: datetime(replace(row.{DROPOFF_DATETIME}, ' ', 'T'))\
             }}]->(dropoff)"
        ),
    }
}
