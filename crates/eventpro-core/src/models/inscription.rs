use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Active inscription as `/users/me/inscriptions` sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct InscriptionRecord {
    pub id: i64,
    pub evento_id: i64,
    pub fecha_inscripcion: NaiveDate,
    pub evento_nombre: String,
    pub evento_fecha_inicio: NaiveDate,
    pub evento_fecha_fin: NaiveDate,
    #[serde(default)]
    pub evento_lugar: Option<String>,
    #[serde(default)]
    pub categoria_nombre: Option<String>,
}

/// A registration of the current user for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Inscription {
    pub id: i64,
    pub event_id: i64,
    pub event_name: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub location: Option<String>,
    pub category_name: Option<String>,
    pub registered_on: NaiveDate,
}

impl From<InscriptionRecord> for Inscription {
    fn from(record: InscriptionRecord) -> Self {
        Self {
            id: record.id,
            event_id: record.evento_id,
            event_name: record.evento_nombre,
            starts_on: record.evento_fecha_inicio,
            ends_on: record.evento_fecha_fin,
            location: record.evento_lugar,
            category_name: record.categoria_nombre,
            registered_on: record.fecha_inscripcion,
        }
    }
}

impl Inscription {
    /// Whether the event has not finished by `today`.
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.ends_on >= today
    }
}
