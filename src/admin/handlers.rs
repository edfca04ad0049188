use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::admin::AppState;
use crate::environment::EnvironmentId;
use crate::health::{HealthSnapshot, HealthSummary};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub tracked: usize,
    pub health: HealthSummary,
}

#[derive(Serialize)]
pub struct EnvironmentStatus {
    pub id: EnvironmentId,
    #[serde(flatten)]
    pub snapshot: HealthSnapshot,
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("environment '{0}' is not tracked")]
    NotFound(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match self {
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        tracked: state.health.len(),
        health: state.health.summary(),
    })
}

pub async fn list_environments(State(state): State<AppState>) -> Json<Vec<EnvironmentStatus>> {
    Json(
        state
            .health
            .snapshots()
            .into_iter()
            .map(|(id, snapshot)| EnvironmentStatus { id, snapshot })
            .collect(),
    )
}

pub async fn get_environment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EnvironmentStatus>, AdminError> {
    let id = EnvironmentId::from(id);
    match state.health.snapshot(&id) {
        Some(snapshot) => Ok(Json(EnvironmentStatus { id, snapshot })),
        None => Err(AdminError::NotFound(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::setup_admin_router;
    use crate::config::MonitorConfig;
    use crate::health::{EnvironmentHealthState, HealthError};
    use arc_swap::ArcSwap;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state() -> AppState {
        let mut config = MonitorConfig::default();
        config.admin.enabled = true;
        config.admin.api_key = "admin-key".to_string();

        let health = Arc::new(EnvironmentHealthState::default());
        let healthy = EnvironmentId::from("aws/us-east-1");
        let crashed = EnvironmentId::from("aws/eu-west-1");
        health.track(&healthy);
        health.track(&crashed);
        let cycle = health.begin_cycle(&healthy).unwrap();
        health.apply(&healthy, HealthSnapshot::healthy(), cycle);
        let cycle = health.begin_cycle(&crashed).unwrap();
        health.apply(&crashed, HealthSnapshot::crashed(HealthError::new("bad request"), true), cycle);

        AppState {
            health,
            config: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    fn get(uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {}", key));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requires_api_key() {
        let app = setup_admin_router(state());
        let response = app.clone().oneshot(get("/admin/status", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(get("/admin/status", Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_counts() {
        let app = setup_admin_router(state());
        let response = app.oneshot(get("/admin/status", Some("admin-key"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["tracked"], 2);
        assert_eq!(body["health"]["healthy"], 1);
        assert_eq!(body["health"]["crashed"], 1);
    }

    #[tokio::test]
    async fn test_list_and_get_environment() {
        let app = setup_admin_router(state());
        let response = app
            .clone()
            .oneshot(get("/admin/environments", Some("admin-key")))
            .await
            .unwrap();
        let body = json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["id"], "aws/eu-west-1");
        assert_eq!(body[0]["health"], "crashed");
        assert_eq!(body[0]["errors"][0]["message"], "bad request");

        let response = app
            .clone()
            .oneshot(get("/admin/environments/aws/us-east-1", Some("admin-key")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["health"], "healthy");
        assert_eq!(body["resolvable"], true);

        let response = app
            .oneshot(get("/admin/environments/gcp/nowhere", Some("admin-key")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
