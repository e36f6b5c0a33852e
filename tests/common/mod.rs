//! Shared fixtures for the HTTP tests: an app wired with in-memory stores and
//! a recording notifier instead of Telegram.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sapphire_led::{
    config::{AppState, Settings},
    db::MemorySessionStore,
    services::{
        catalog_service::CatalogService,
        notifier::{LeadNotifier, NotifyError},
    },
};
use serde_json::Value;
use tower::ServiceExt;

#[derive(Default)]
pub struct RecordingNotifier {
    pub configured: bool,
    pub sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn configured() -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            ..Default::default()
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl LeadNotifier for RecordingNotifier {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send(&self, html: &str) -> Result<(), NotifyError> {
        if !self.configured {
            return Err(NotifyError::NotConfigured);
        }
        self.sent.lock().unwrap().push(html.to_string());
        Ok(())
    }
}

pub fn app_with(settings: Settings, notifier: Arc<RecordingNotifier>) -> Router {
    let state = AppState::from_parts(
        settings,
        None,
        CatalogService::embedded().expect("embedded catalog"),
        notifier,
        Arc::new(MemorySessionStore::new()),
    );
    sapphire_led::app(state)
}

pub fn app(notifier: Arc<RecordingNotifier>) -> Router {
    app_with(Settings::default(), notifier)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("parse JSON")
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value, client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_form(uri: &str, body: &str, client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}
