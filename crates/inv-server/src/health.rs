//! Health Check System
//!
//! Reports on the item registry and on whether photo storage accepts writes.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use inv_api::extractors::DynInventoryService;
use inv_attachments::Storage;
use serde::Serialize;
use tracing::warn;

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Individual component health
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Overall health report
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Health checker service
pub struct HealthChecker {
    start_time: Instant,
    inventory: Arc<DynInventoryService>,
}

impl HealthChecker {
    pub fn new(inventory: Arc<DynInventoryService>) -> Self {
        Self {
            start_time: Instant::now(),
            inventory,
        }
    }

    pub async fn check(&self) -> HealthReport {
        let components = vec![self.check_registry().await, self.check_storage().await];

        let status = if components
            .iter()
            .all(|c| c.status == HealthStatus::Healthy)
        {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    async fn check_registry(&self) -> ComponentHealth {
        let start = Instant::now();
        let items = self.inventory.registry().len().await;

        ComponentHealth {
            name: "registry".to_string(),
            status: HealthStatus::Healthy,
            message: None,
            response_time_ms: start.elapsed().as_millis() as u64,
            details: Some(serde_json::json!({ "items": items })),
        }
    }

    async fn check_storage(&self) -> ComponentHealth {
        let start = Instant::now();
        let storage = self.inventory.photos().storage();

        let (status, message) = match storage.probe().await {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => {
                warn!(error = %e, backend = storage.name(), "Photo storage is not writable");
                (HealthStatus::Unhealthy, Some(e.to_string()))
            }
        };

        ComponentHealth {
            name: "storage".to_string(),
            status,
            message,
            response_time_ms: start.elapsed().as_millis() as u64,
            details: Some(serde_json::json!({
                "backend": storage.name(),
                "writable": status == HealthStatus::Healthy,
            })),
        }
    }
}

/// Simple liveness check
pub async fn liveness() -> &'static str {
    "OK"
}

/// Full health check
pub async fn health(State(checker): State<Arc<HealthChecker>>) -> (StatusCode, Json<HealthReport>) {
    let report = checker.check().await;
    let status = report.http_status();
    (status, Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use inv_attachments::{LocalStorage, MemoryStorage};
    use inv_registry::{InventoryConfig, InventoryService, NewItem, Registry};

    fn checker_with(storage: Arc<dyn Storage>) -> (HealthChecker, Arc<DynInventoryService>) {
        let inventory: Arc<DynInventoryService> = Arc::new(InventoryService::new(
            Arc::new(Registry::new()),
            storage,
            InventoryConfig::default(),
        ));
        (HealthChecker::new(inventory.clone()), inventory)
    }

    #[tokio::test]
    async fn test_health_check() {
        let (checker, inventory) = checker_with(Arc::new(MemoryStorage::new()));
        inventory
            .register(NewItem::new("Drill"), None)
            .await
            .unwrap();

        let report = checker.check().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.http_status(), StatusCode::OK);
        assert_eq!(report.components[0].details.as_ref().unwrap()["items"], 1);
        assert_eq!(
            report.components[1].details.as_ref().unwrap()["backend"],
            "memory"
        );
    }

    #[tokio::test]
    async fn test_missing_storage_root_is_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("never-created");
        let (checker, _) = checker_with(Arc::new(LocalStorage::new(&gone)));

        let report = checker.check().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            report.components[1].details.as_ref().unwrap()["writable"],
            false
        );
    }
}
