//! HTTP handlers for the container endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::error::ApiError;
use crate::container::{
    ContainerList, ContainerLogs, ContainerStats, CreateRequest, CreatedContainer, ResourceRecord,
};
use crate::manager::ContainerManager;
use crate::runtime::{LogOptions, RemoveOptions, Tail};

/// Display name reported by the root endpoint.
pub const API_NAME: &str = "Guarded Docker API";

const DEFAULT_STOP_TIMEOUT: u32 = 10;
const DEFAULT_LOG_TAIL: u64 = 100;

/// Shared state of all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub manager: Arc<ContainerManager>,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Reply of lifecycle endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    pub container_id: String,
}

impl MessageResponse {
    fn new(message: &str, container_id: String) -> Self {
        Self {
            message: message.to_string(),
            container_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub docker: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_true")]
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct TimeoutQuery {
    #[serde(default = "default_timeout")]
    pub timeout: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub v: bool,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_true")]
    pub stdout: bool,
    #[serde(default = "default_true")]
    pub stderr: bool,
    /// Lines from the end, 0 for all.
    #[serde(default = "default_tail")]
    pub tail: u64,
    pub since: Option<i64>,
    pub until: Option<i64>,
}

impl From<LogsQuery> for LogOptions {
    fn from(query: LogsQuery) -> Self {
        Self {
            stdout: query.stdout,
            stderr: query.stderr,
            tail: match query.tail {
                0 => Tail::All,
                n => Tail::Lines(n),
            },
            since: query.since,
            until: query.until,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u32 {
    DEFAULT_STOP_TIMEOUT
}

fn default_tail() -> u64 {
    DEFAULT_LOG_TAIL
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ApiError::InvalidRequest(e.body_text()))
}

pub async fn root(State(state): State<AppState>) -> Json<ApiInfo> {
    Json(ApiInfo {
        name: API_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.manager.instance_id().to_string(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let connected = state.manager.ping().await;
    Json(HealthStatus {
        status: if connected { "healthy" } else { "unhealthy" }.to_string(),
        docker: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}

pub async fn list_containers(
    State(state): State<AppState>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<ContainerList> {
    let params = query(params)?;
    Ok(Json(state.manager.list(params.all).await?))
}

/// Parses the body twice: once as a raw map for the dangerous-option scan and
/// once into the typed request.
pub async fn create_container(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<CreatedContainer> {
    let raw = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            return Err(ApiError::InvalidRequest(
                "request body must be a JSON object".to_string(),
            ));
        }
        Err(e) => return Err(ApiError::InvalidRequest(e.to_string())),
    };
    let request =
        CreateRequest::from_payload(&raw).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    debug!(image = %request.image, "Create request parsed");

    Ok(Json(state.manager.create(&request, Some(&raw)).await?))
}

pub async fn inspect_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ResourceRecord> {
    Ok(Json(state.manager.inspect(&id).await?))
}

pub async fn start_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MessageResponse> {
    state.manager.start(&id).await?;
    Ok(Json(MessageResponse::new("Container started", id)))
}

pub async fn stop_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<TimeoutQuery>, QueryRejection>,
) -> ApiResult<MessageResponse> {
    let params = query(params)?;
    state.manager.stop(&id, params.timeout).await?;
    Ok(Json(MessageResponse::new("Container stopped", id)))
}

pub async fn restart_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<TimeoutQuery>, QueryRejection>,
) -> ApiResult<MessageResponse> {
    let params = query(params)?;
    state.manager.restart(&id, params.timeout).await?;
    Ok(Json(MessageResponse::new("Container restarted", id)))
}

pub async fn remove_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<RemoveQuery>, QueryRejection>,
) -> ApiResult<MessageResponse> {
    let params = query(params)?;
    let options = RemoveOptions {
        force: params.force,
        volumes: params.v,
    };
    state.manager.remove(&id, options).await?;
    Ok(Json(MessageResponse::new("Container removed", id)))
}

pub async fn container_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<LogsQuery>, QueryRejection>,
) -> ApiResult<ContainerLogs> {
    let options = LogOptions::from(query(params)?);
    Ok(Json(state.manager.logs(&id, &options).await?))
}

pub async fn container_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ContainerStats> {
    Ok(Json(state.manager.stats(&id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_query_tail_zero_means_all() {
        let query = LogsQuery {
            stdout: true,
            stderr: false,
            tail: 0,
            since: Some(10),
            until: None,
        };
        let options = LogOptions::from(query);
        assert_eq!(options.tail, Tail::All);
        assert!(!options.stderr);
        assert_eq!(options.since, Some(10));
    }

    #[test]
    fn test_logs_query_defaults() {
        let query: LogsQuery = serde_json::from_str("{}").unwrap();
        let options = LogOptions::from(query);
        assert!(options.stdout && options.stderr);
        assert_eq!(options.tail, Tail::Lines(DEFAULT_LOG_TAIL));
    }

    #[test]
    fn test_timeout_default() {
        let query: TimeoutQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.timeout, DEFAULT_STOP_TIMEOUT);
    }
}
