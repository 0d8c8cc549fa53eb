//! Canned responses for offline development.
//!
//! The table is keyed by exact `(method, path)`. The pipeline consults it only
//! when mock mode is enabled; a miss falls through to the network.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde_json::{json, Value};

use super::request::{Method, ResponseData, ResponseEnvelope};

#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub data: ResponseData,
}

impl MockResponse {
    /// A 200 response carrying a JSON payload.
    pub fn json(value: Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            status: 200,
            headers,
            data: ResponseData::Json(value),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        Self {
            status: 200,
            headers,
            data: ResponseData::Text(text.into()),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            data: ResponseData::Empty,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn to_envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope::new(self.status, self.headers.clone(), self.data.clone())
    }
}

#[derive(Debug, Default)]
pub struct MockTable {
    entries: RwLock<HashMap<(Method, String), MockResponse>>,
}

impl MockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the canned response for `method path`.
    pub fn register(&self, method: Method, path: impl Into<String>, response: MockResponse) {
        self.entries.write().insert((method, path.into()), response);
    }

    pub fn unregister(&self, method: Method, path: &str) -> Option<MockResponse> {
        self.entries.write().remove(&(method, path.to_string()))
    }

    pub fn lookup(&self, method: Method, path: &str) -> Option<MockResponse> {
        self.entries.read().get(&(method, path.to_string())).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Demo data for running the portal without a backend.
    ///
    /// Payloads follow the backend wire schema so the typed endpoints parse
    /// them exactly as they would live responses.
    pub fn demo() -> Self {
        let table = Self::new();

        let demo_user = json!({
            "id": 2,
            "name": "Cliente Demo",
            "email": "cliente@eventpro.com",
            "role": "Cliente"
        });

        table.register(
            Method::Post,
            "/auth/login",
            MockResponse::json(json!({
                "access_token": "mock_token_demo",
                "token_type": "bearer",
                "user": demo_user.clone()
            })),
        );
        table.register(
            Method::Post,
            "/auth/refresh",
            MockResponse::json(json!({
                "access_token": "mock_token_demo_refreshed",
                "token_type": "bearer"
            })),
        );
        table.register(
            Method::Get,
            "/auth/verify",
            MockResponse::json(json!({"message": "Token válido", "status": "valid"})),
        );
        table.register(Method::Get, "/users/me", MockResponse::json(demo_user));
        table.register(
            Method::Get,
            "/dashboard/stats",
            MockResponse::json(json!({
                "total_events": 15,
                "active_inscriptions": 127,
                "average_rating": 8.5,
                "popular_event": {
                    "id": 1,
                    "title": "Conferencia Tech 2024",
                    "total_inscripciones": 45
                }
            })),
        );
        table.register(
            Method::Get,
            "/events/",
            MockResponse::json(json!([
                {
                    "id": 1,
                    "nombre": "Conferencia de Tecnología 2025",
                    "descripcion": "Las últimas tendencias en desarrollo web y mobile",
                    "fecha_inicio": "2025-07-15",
                    "fecha_fin": "2025-07-16",
                    "lugar": "Centro de Convenciones",
                    "cupos": 100,
                    "categoria_id": 1,
                    "categoria_nombre": "Tecnología",
                    "cupos_disponibles": 55,
                    "total_inscripciones": 45
                },
                {
                    "id": 2,
                    "nombre": "Workshop de React Avanzado",
                    "descripcion": "Aprende hooks avanzados, Context API y optimización",
                    "fecha_inicio": "2025-07-20",
                    "fecha_fin": "2025-07-21",
                    "lugar": "Aula Virtual",
                    "cupos": 30,
                    "categoria_id": 2,
                    "categoria_nombre": "Programación",
                    "cupos_disponibles": 0,
                    "total_inscripciones": 30
                }
            ])),
        );
        table.register(
            Method::Get,
            "/categories/",
            MockResponse::json(json!([
                {"id": 1, "nombre": "Tecnología", "descripcion": "Conferencias y charlas técnicas"},
                {"id": 2, "nombre": "Programación", "descripcion": "Talleres prácticos"}
            ])),
        );
        table.register(
            Method::Get,
            "/users/me/inscriptions",
            MockResponse::json(json!([
                {
                    "id": 1,
                    "evento_id": 1,
                    "fecha_inscripcion": "2025-06-15",
                    "evento_nombre": "Conferencia de Tecnología 2025",
                    "evento_fecha_inicio": "2025-07-15",
                    "evento_fecha_fin": "2025-07-16",
                    "evento_lugar": "Centro de Convenciones",
                    "categoria_nombre": "Tecnología"
                }
            ])),
        );

        table
    }
}
