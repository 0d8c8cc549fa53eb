//! Data models for EventPro entities.
//!
//! Each wire record (`*Record`) mirrors one backend schema and converts into
//! exactly one internal model through `From`. Call sites only see the
//! internal models.
//!
//! - `User`, `Role`: account identity
//! - `Event`, `EventDraft`: events and the create/update payload
//! - `Category`, `CategoryDraft`: event categories
//! - `Inscription`: the current user's registrations
//! - `DashboardStats`: admin dashboard counters

pub mod category;
pub mod dashboard;
pub mod event;
pub mod inscription;
pub mod user;

pub use category::{Category, CategoryDraft, CategoryRecord};
pub use dashboard::{DashboardStats, DashboardStatsRecord, PopularEvent};
pub use event::{DraftError, Event, EventDraft, EventRecord};
pub use inscription::{Inscription, InscriptionRecord};
pub use user::{Role, User, UserRecord};
