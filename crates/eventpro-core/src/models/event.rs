use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event as the backend lists it.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub lugar: String,
    pub cupos: i64,
    pub categoria_id: i64,
    #[serde(default)]
    pub categoria_nombre: Option<String>,
    #[serde(default)]
    pub cupos_disponibles: Option<i64>,
    #[serde(default)]
    pub total_inscripciones: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub location: String,
    pub capacity: i64,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub seats_available: i64,
    pub registrations: i64,
}

impl From<EventRecord> for Event {
    fn from(record: EventRecord) -> Self {
        let registrations = record.total_inscripciones.unwrap_or(0);
        // Detail responses sometimes omit the derived counters
        let seats_available = record
            .cupos_disponibles
            .unwrap_or_else(|| (record.cupos - registrations).max(0));
        Self {
            id: record.id,
            name: record.nombre,
            description: record.descripcion.filter(|d| !d.trim().is_empty()),
            starts_on: record.fecha_inicio,
            ends_on: record.fecha_fin,
            location: record.lugar,
            capacity: record.cupos,
            category_id: record.categoria_id,
            category_name: record.categoria_nombre,
            seats_available,
            registrations,
        }
    }
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.seats_available <= 0
    }

    /// Fraction of seats taken, 0.0 to 1.0.
    pub fn occupancy(&self) -> f64 {
        if self.capacity <= 0 {
            return 0.0;
        }
        (self.registrations as f64 / self.capacity as f64).min(1.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Event name is required")]
    MissingName,

    #[error("Event location is required")]
    MissingLocation,

    #[error("End date must be after the start date")]
    EndsBeforeStart,

    #[error("Capacity must be greater than 0")]
    NoCapacity,
}

/// Event fields sent when creating or updating an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDraft {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "fecha_inicio")]
    pub starts_on: NaiveDate,
    #[serde(rename = "fecha_fin")]
    pub ends_on: NaiveDate,
    #[serde(rename = "lugar")]
    pub location: String,
    #[serde(rename = "cupos")]
    pub capacity: i64,
    #[serde(rename = "categoria_id")]
    pub category_id: i64,
}

impl EventDraft {
    /// Check the rules the backend enforces, before sending.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::MissingName);
        }
        if self.location.trim().is_empty() {
            return Err(DraftError::MissingLocation);
        }
        if self.ends_on <= self.starts_on {
            return Err(DraftError::EndsBeforeStart);
        }
        if self.capacity <= 0 {
            return Err(DraftError::NoCapacity);
        }
        Ok(())
    }
}
