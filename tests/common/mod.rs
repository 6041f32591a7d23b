#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use formsmith::adapters::health_handler::HealthHandler;
use formsmith::adapters::metrics_handler::MetricsCollector;
use formsmith::application::FormService;
use formsmith::config::Settings;
use formsmith::persistence::DataStore;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// Router backed by a throwaway SQLite database
pub struct TestApp {
    pub router: Router,
    pub store: DataStore,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(Settings::default()).await
    }

    pub async fn with_settings(mut settings: Settings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        settings.database.url = format!("sqlite://{}", dir.path().join("formsmith.db").display());

        let store = DataStore::new(&settings.database).await.unwrap();
        store.migrate().await.unwrap();

        let service = Arc::new(FormService::new(
            store.forms(),
            store.submissions(),
            settings.pagination.clone(),
        ));
        let health = Arc::new(HealthHandler::new(store.clone()));
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let router = formsmith::create_app(service, health, metrics, &settings);

        Self {
            router,
            store,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    pub async fn json(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.json("GET", uri, None).await
    }

    pub async fn text(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, bytes) = self.send(request).await;
        (status, String::from_utf8(bytes).unwrap())
    }

    /// Create the contact form used across tests and return its id
    pub async fn create_contact_form(&self) -> String {
        let (status, body) = self
            .json("POST", "/api/forms", Some(contact_form()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

pub fn contact_form() -> Value {
    json!({
        "title": "Contact",
        "description": "Get in touch",
        "fields": [
            { "id": "name", "type": "text", "label": "Name", "required": true,
              "settings": { "minLength": 2 } },
            { "id": "email", "type": "email", "label": "Email", "required": true },
            { "id": "message", "type": "textarea", "label": "Message",
              "settings": { "maxLength": 200 } },
            { "id": "plan", "type": "radio", "label": "Plan", "options": ["Free", "Pro"] }
        ]
    })
}
