use axum::{Extension, Json, Router, extract::State, middleware, routing::get};

use super::{ApiResponse, ApiResult};
use crate::auth::{Claims, guard::require_staff};
use crate::db::{ApplicationOverview, CompanySummary, PlacedStudent, StudentPlacement, UnplacedStudent};
use crate::error::AppError;
use crate::reports::{DepartmentStats, Scope, StatsSnapshot};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/statistics", get(statistics))
        .route("/students", get(students))
        .route("/companies", get(companies))
        .route("/applications", get(applications))
        .route("/placed-students", get(placed_students))
        .route("/unplaced-students", get(unplaced_students))
        .route("/department-stats", get(department_stats))
        .route_layer(middleware::from_fn_with_state(state, require_staff))
}

fn scope_of(claims: &Claims) -> Result<Scope, AppError> {
    Scope::for_viewer(claims.role, claims.dept.as_deref())
}

async fn statistics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatsSnapshot> {
    let scope = scope_of(&claims)?;
    let stats = state.with_db(move |db| Ok(db.statistics(&scope)?)).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

async fn students(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<StudentPlacement>> {
    let scope = scope_of(&claims)?;
    let rows = state
        .with_db(move |db| Ok(db.students_overview(&scope)?))
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}

async fn companies(State(state): State<AppState>) -> ApiResult<Vec<CompanySummary>> {
    let rows = state.with_db(|db| Ok(db.companies_overview()?)).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

async fn applications(State(state): State<AppState>) -> ApiResult<Vec<ApplicationOverview>> {
    let rows = state.with_db(|db| Ok(db.applications_overview()?)).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

async fn placed_students(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<PlacedStudent>> {
    let scope = scope_of(&claims)?;
    let rows = state
        .with_db(move |db| Ok(db.placed_students(&scope)?))
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}

async fn unplaced_students(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<UnplacedStudent>> {
    let scope = scope_of(&claims)?;
    let rows = state
        .with_db(move |db| Ok(db.unplaced_students(&scope)?))
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}

async fn department_stats(State(state): State<AppState>) -> ApiResult<Vec<DepartmentStats>> {
    let rows = state.with_db(|db| Ok(db.department_breakdown()?)).await?;
    Ok(Json(ApiResponse::ok(rows)))
}
