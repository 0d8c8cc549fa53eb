//! Dashboard statistics.
//!
//! The backend sends `total_events`, `active_inscriptions`, `average_rating`
//! and a `popular_event` object. That English-keyed shape is the only one
//! accepted here; older Spanish-keyed payloads (`total_eventos`, ...) are not
//! read.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardStatsRecord {
    #[serde(default)]
    pub total_events: i64,
    #[serde(default)]
    pub active_inscriptions: i64,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub popular_event: Option<PopularEventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopularEventRecord {
    pub id: Option<i64>,
    pub title: Option<String>,
    #[serde(default)]
    pub total_inscripciones: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PopularEvent {
    pub id: i64,
    pub title: String,
    pub registrations: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardStats {
    pub total_events: i64,
    pub active_inscriptions: i64,
    /// Average inscriptions per event.
    pub average_rating: f64,
    pub popular_event: Option<PopularEvent>,
}

impl From<DashboardStatsRecord> for DashboardStats {
    fn from(record: DashboardStatsRecord) -> Self {
        // With no events the backend still sends an object with a null id
        let popular_event = record.popular_event.and_then(|p| {
            Some(PopularEvent {
                id: p.id?,
                title: p.title.unwrap_or_default(),
                registrations: p.total_inscripciones,
            })
        });
        Self {
            total_events: record.total_events,
            active_inscriptions: record.active_inscriptions,
            average_rating: record.average_rating,
            popular_event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_adapter() {
        let json = r#"{"total_events": 15, "active_inscriptions": 127, "average_rating": 8.47, "popular_event": {"id": 1, "title": "Conferencia Tech 2024", "total_inscripciones": 45}}"#;
        let stats = DashboardStats::from(
            serde_json::from_str::<DashboardStatsRecord>(json).expect("stats should parse"),
        );
        assert_eq!(stats.total_events, 15);
        assert_eq!(stats.active_inscriptions, 127);
        assert_eq!(
            stats.popular_event,
            Some(PopularEvent {
                id: 1,
                title: "Conferencia Tech 2024".into(),
                registrations: 45
            })
        );
    }

    #[test]
    fn test_empty_database_has_no_popular_event() {
        let json = r#"{"total_events": 0, "active_inscriptions": 0, "average_rating": 0, "popular_event": {"id": null, "title": "Sin datos", "total_inscripciones": 0}}"#;
        let stats = DashboardStats::from(
            serde_json::from_str::<DashboardStatsRecord>(json).expect("stats should parse"),
        );
        assert_eq!(stats.popular_event, None);
    }

    #[test]
    fn test_spanish_keys_are_not_read() {
        let json = r#"{"total_eventos": 25}"#;
        let stats = DashboardStats::from(
            serde_json::from_str::<DashboardStatsRecord>(json).expect("unknown keys are ignored"),
        );
        assert_eq!(stats.total_events, 0);
    }
}
