//! HTTP surface. Every response, success or failure, uses the
//! `{success, data?, message?}` envelope.

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    middleware,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::error::{AppError, expose_internal_errors};
use crate::state::AppState;
use crate::uploads::MAX_UPLOAD_BYTES;

mod auth;
mod company;
mod coordinator;
mod student;


#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

pub fn created<T>(data: T, message: &str) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(data, message))))
}

/// Build the full application router (separated from `serve` for testing).
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", auth::routes())
        .nest("/api/student", student::routes(state.clone()))
        .nest("/api/company", company::routes(state.clone()))
        .nest("/api/coordinator", coordinator::routes(state.clone()))
        .nest_service("/uploads", uploads)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), expose_internal_errors))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(str::parse::<HeaderValue>) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(e)) => {
            warn!(error = %e, "invalid PLACEMENT_CORS_ORIGIN, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

async fn health() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Server is running"))
}

async fn not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure(
            "API route not found. Ensure you are using the /api/... prefix.",
        )),
    )
}
