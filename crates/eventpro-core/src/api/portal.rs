//! Typed portal endpoints.
//!
//! Each call goes through `RequestPipeline::request` and converts the wire
//! record into its internal model at this boundary.

use serde_json::json;
use tracing::debug;

use crate::models::{
    Category, CategoryDraft, CategoryRecord, DashboardStats, DashboardStatsRecord, Event, EventDraft,
    EventRecord, Inscription, InscriptionRecord, User, UserRecord,
};

use super::{ApiError, RequestDescriptor, RequestPipeline};

pub const EVENTS: &str = "/events/";
pub const CATEGORIES: &str = "/categories/";
pub const PROFILE: &str = "/users/me";
pub const MY_INSCRIPTIONS: &str = "/users/me/inscriptions";
pub const DASHBOARD_STATS: &str = "/dashboard/stats";

fn event_path(event_id: i64) -> String {
    format!("/events/{}", event_id)
}

fn category_path(category_id: i64) -> String {
    format!("/categories/{}", category_id)
}

impl RequestPipeline {
    /// List events, optionally only those in one category.
    pub async fn fetch_events(&self, category_id: Option<i64>) -> Result<Vec<Event>, ApiError> {
        let path = match category_id {
            Some(id) => format!("{}?categoria_id={}", EVENTS, id),
            None => EVENTS.to_string(),
        };
        let records: Vec<EventRecord> = self.request_json(RequestDescriptor::get(path)).await?;
        debug!(count = records.len(), "Fetched events");
        Ok(records.into_iter().map(Event::from).collect())
    }

    pub async fn fetch_event(&self, event_id: i64) -> Result<Event, ApiError> {
        let record: EventRecord = self.request_json(RequestDescriptor::get(event_path(event_id))).await?;
        Ok(record.into())
    }

    /// Create an event (admin). The draft is validated before sending.
    pub async fn create_event(&self, draft: &EventDraft) -> Result<Event, ApiError> {
        draft.validate().map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let body = serde_json::to_value(draft).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let record: EventRecord = self.request_json(RequestDescriptor::post(EVENTS).json(body)).await?;
        Ok(record.into())
    }

    pub async fn update_event(&self, event_id: i64, draft: &EventDraft) -> Result<Event, ApiError> {
        draft.validate().map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let body = serde_json::to_value(draft).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let record: EventRecord = self
            .request_json(RequestDescriptor::put(event_path(event_id)).json(body))
            .await?;
        Ok(record.into())
    }

    pub async fn delete_event(&self, event_id: i64) -> Result<(), ApiError> {
        self.request(RequestDescriptor::delete(event_path(event_id))).await?;
        Ok(())
    }

    /// Register the logged-in user for an event.
    pub async fn register_for_event(&self, event_id: i64) -> Result<(), ApiError> {
        self.request(RequestDescriptor::post(format!("/events/{}/register", event_id)).json(json!({})))
            .await?;
        Ok(())
    }

    pub async fn unregister_from_event(&self, event_id: i64) -> Result<(), ApiError> {
        self.request(RequestDescriptor::delete(format!("/events/{}/unregister", event_id)))
            .await?;
        Ok(())
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        let records: Vec<CategoryRecord> = self.request_json(RequestDescriptor::get(CATEGORIES)).await?;
        Ok(records.into_iter().map(Category::from).collect())
    }

    pub async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, ApiError> {
        if draft.name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("Category name is required".into()));
        }
        let body = serde_json::to_value(draft).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let record: CategoryRecord = self
            .request_json(RequestDescriptor::post(CATEGORIES).json(body))
            .await?;
        Ok(record.into())
    }

    pub async fn delete_category(&self, category_id: i64) -> Result<(), ApiError> {
        self.request(RequestDescriptor::delete(category_path(category_id))).await?;
        Ok(())
    }

    pub async fn fetch_profile(&self) -> Result<User, ApiError> {
        let record: UserRecord = self.request_json(RequestDescriptor::get(PROFILE)).await?;
        Ok(record.into())
    }

    pub async fn fetch_my_inscriptions(&self) -> Result<Vec<Inscription>, ApiError> {
        let records: Vec<InscriptionRecord> = self.request_json(RequestDescriptor::get(MY_INSCRIPTIONS)).await?;
        Ok(records.into_iter().map(Inscription::from).collect())
    }

    pub async fn fetch_dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        let record: DashboardStatsRecord = self.request_json(RequestDescriptor::get(DASHBOARD_STATS)).await?;
        Ok(record.into())
    }
}
