// HTTP task API
//
// POST /generate-subtitles  {"video_path": ...} -> 202 {"task_id": ...}
// GET  /task/{task_id}                          -> status, result and timings

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{Result, SubgenError};
use crate::task::{Orchestrator, Stage, StageTimings, Task, TaskStatus};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub video_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub task_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srt_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<StageTimings>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            status: task.status,
            srt_path: task.srt_path,
            error: task.error,
            stage: task.stage,
            timing: (!task.timings.is_empty()).then_some(task.timings),
        }
    }
}

/// Error body `{"detail": ...}` with a status chosen by error kind
pub struct ApiError(SubgenError);

impl From<SubgenError> for ApiError {
    fn from(err: SubgenError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SubgenError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            SubgenError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/generate-subtitles", post(generate_subtitles))
        .route("/task/:task_id", get(task_status))
        .with_state(orchestrator)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Subtitle Generator API" }))
}

async fn generate_subtitles(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<GenerateRequest>,
) -> std::result::Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    let task_id = orchestrator.submit(&request.video_path)?;
    Ok((StatusCode::ACCEPTED, Json(GenerateResponse { task_id })))
}

async fn task_status(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(task_id): Path<String>,
) -> std::result::Result<Json<TaskResponse>, ApiError> {
    let id = Uuid::parse_str(&task_id).map_err(|_| SubgenError::NotFound(task_id.clone()))?;
    let task = orchestrator.get_status(&id)?;
    Ok(Json(task.into()))
}

/// Serve the API until ctrl-c
pub async fn serve(config: &ServerConfig, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let addr = format!("{}:{}", config.addr, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening at {}", addr);

    axum::serve(listener, router(orchestrator.clone()))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Shutting down with {} tasks still running", orchestrator.in_flight());

    Ok(())
}
