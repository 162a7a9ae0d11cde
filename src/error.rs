use axum::{
    Json,
    extract::{
        Request, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::{
    auth::TokenError, eligibility::EligibilityError, routes::ApiResponse, state::AppState,
};

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Full text of an internal error, carried on the 500 response for
/// `expose_internal_errors`.
#[derive(Debug, Clone)]
struct InternalDetail(String);

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate application/offer/registration. Reported as 400, not 409.
    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let AppError::Internal(e) = &self {
            error!(error = ?e, "request failed");
            let mut response =
                (status, Json(ApiResponse::<()>::failure(INTERNAL_MESSAGE))).into_response();
            response
                .extensions_mut()
                .insert(InternalDetail(self.to_string()));
            return response;
        }

        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}

/// Middleware: in debug deployments, replace the generic 500 message with
/// the error text.
pub async fn expose_internal_errors(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if !state.config.debug {
        return response;
    }

    let detail = response
        .extensions()
        .get::<InternalDetail>()
        .map(|InternalDetail(detail)| detail.clone());
    match detail {
        Some(detail) => (response.status(), Json(ApiResponse::<()>::failure(detail))).into_response(),
        None => response,
    }
}

impl From<EligibilityError> for AppError {
    fn from(e: EligibilityError) -> Self {
        match e {
            EligibilityError::DuplicateApplication => AppError::Conflict(e.to_string()),
            _ => AppError::Validation(e.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidToken => AppError::Unauthorized(e.to_string()),
            TokenError::Signing(_) => AppError::Internal(e.into()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Validation(format!("Malformed upload: {}", e.body_text()))
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(e: MultipartRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(e: PathRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}
