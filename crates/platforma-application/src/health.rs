//! Application and per-service health tracking.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Lifecycle state of a single service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceStatus {
    #[serde(rename = "NOT_STARTED")]
    NotStarted,
    #[serde(rename = "STARTED")]
    Started,
    #[serde(rename = "ERROR")]
    Error,
}

/// Health information for a single service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ServiceHealth {
    fn not_started() -> Self {
        Self {
            status: ServiceStatus::NotStarted,
            started_at: None,
            stopped_at: None,
            error: None,
            data: None,
        }
    }
}

/// Overall application health and service states.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub started_at: Option<DateTime<Utc>>,
    pub services: HashMap<String, ServiceHealth>,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("{}"),
        }
    }
}

/// Thread-safe registry of application health.
///
/// Lifecycle transitions come from the supervisor's service tasks while the
/// probe path writes payload data, so every access goes through one lock.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    inner: RwLock<Health>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the named service, resetting any previous state to
    /// `NOT_STARTED`.
    pub fn register_service(&self, name: &str) {
        self.inner
            .write()
            .services
            .insert(name.to_string(), ServiceHealth::not_started());
    }

    /// Mark the service as started and stamp its start time.
    pub fn start_service(&self, name: &str) {
        if let Some(service) = self.inner.write().services.get_mut(name) {
            service.status = ServiceStatus::Started;
            service.started_at = Some(Utc::now());
        }
    }

    /// Mark the service as failed and record the error.
    pub fn fail_service(&self, name: &str, error: &str) {
        if let Some(service) = self.inner.write().services.get_mut(name) {
            service.status = ServiceStatus::Error;
            service.stopped_at = Some(Utc::now());
            service.error = Some(error.to_string());
        }
    }

    /// Store an opaque health payload for the service.
    pub fn set_service_data(&self, name: &str, data: serde_json::Value) {
        if let Some(service) = self.inner.write().services.get_mut(name) {
            service.data = Some(data);
        }
    }

    /// Stamp the application start time.
    pub fn start_application(&self) {
        self.inner.write().started_at = Some(Utc::now());
    }

    /// A point-in-time copy of the registry.
    pub fn snapshot(&self) -> Health {
        self.inner.read().clone()
    }
}
