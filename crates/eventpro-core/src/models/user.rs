use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Role {
    Admin,
    Client,
}

impl Role {
    /// Parse the backend role text. Both the Spanish enum values the server
    /// stores and the English names are accepted.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "admin" | "administrator" | "administrador" => Some(Role::Admin),
            "client" | "cliente" | "user" => Some(Role::Client),
            _ => None,
        }
    }

    /// Value sent to the backend when registering an account.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Role::Admin => "Administrador",
            Role::Client => "Cliente",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Client => write!(f, "Client"),
        }
    }
}

/// User record as the auth endpoints send it.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        let role = Role::from_wire(&record.role).unwrap_or_else(|| {
            warn!(role = %record.role, user_id = record.id, "Unknown role, treating as client");
            Role::Client
        });
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            role,
        }
    }
}
