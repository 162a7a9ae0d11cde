use axum::{
    Extension, Json, Router,
    extract::{
        Multipart, Path, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
    middleware,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::auth::check_cgpa;
use super::{ApiResponse, ApiResult, Created, created};
use crate::auth::{Claims, guard::require_student};
use crate::db::{NotificationSummary, StudentApplicationView, StudentInterviewView, StudentOfferView};
use crate::eligibility::{EligibilityError, check_application, eligible_companies};
use crate::error::AppError;
use crate::models::{Company, OfferStatus, Student, StudentProfile};
use crate::state::AppState;
use crate::uploads::{self, UploadKind};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/resume", post(upload_resume))
        .route("/profile/certificate", post(upload_certificate))
        .route("/companies", get(companies))
        .route("/eligible-companies", get(eligible))
        .route("/apply", post(apply))
        .route("/applications", get(applications))
        .route("/interviews", get(interviews))
        .route("/offers", get(offers))
        .route("/offer/:id/respond", put(respond_to_offer))
        .route("/notifications/summary", get(notifications))
        .route_layer(middleware::from_fn_with_state(state, require_student))
}

fn student_not_found() -> AppError {
    AppError::not_found("Student not found")
}

// --- Profile ---

async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Student> {
    let student = state
        .with_db(move |db| db.get_student(claims.id)?.ok_or_else(student_not_found))
        .await?;
    Ok(Json(ApiResponse::ok(student)))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<StudentProfile>, JsonRejection>,
) -> ApiResult<()> {
    let Json(profile) = body?;
    if let Some(cgpa) = profile.cgpa {
        check_cgpa(cgpa)?;
    }
    if profile.backlogs.is_some_and(|b| b < 0) {
        return Err(AppError::validation("Backlogs cannot be negative"));
    }

    state
        .with_db(move |db| {
            if !db.update_student_profile(claims.id, &profile)? {
                return Err(student_not_found());
            }
            db.log_action(&claims.email, "Updated professional academic profile", Some("Student"));
            Ok(())
        })
        .await?;

    Ok(Json(ApiResponse::message("Profile updated successfully")))
}

async fn upload_resume(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let url = save_upload(&state, claims, multipart?, UploadKind::Resume).await?;
    Ok(Json(ApiResponse::with_message(
        json!({ "resumeLink": url }),
        "Resume uploaded successfully",
    )))
}

async fn upload_certificate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let url = save_upload(&state, claims, multipart?, UploadKind::Certificate).await?;
    Ok(Json(ApiResponse::with_message(
        json!({ "path": url }),
        "Certificate uploaded successfully",
    )))
}

/// Write the file, then point the student record at it. The file is removed
/// again if the record update does not go through.
async fn save_upload(
    state: &AppState,
    claims: Claims,
    mut multipart: Multipart,
    kind: UploadKind,
) -> Result<String, AppError> {
    let (ext, bytes) = uploads::read_upload(&mut multipart, kind).await?;
    let stored = uploads::store(&state.config.upload_dir, kind, ext, &bytes).await?;

    let url = stored.url.clone();
    let recorded = state
        .with_db(move |db| {
            let updated = match kind {
                UploadKind::Resume => db.set_resume_link(claims.id, &url)?,
                UploadKind::Certificate => db.append_certificate(claims.id, &url)?,
            };
            if !updated {
                return Err(student_not_found());
            }
            let action = match kind {
                UploadKind::Resume => "Uploaded resume PDF",
                UploadKind::Certificate => "Uploaded achievement certificate",
            };
            db.log_action(&claims.email, action, Some("Student"));
            Ok(())
        })
        .await;

    if let Err(e) = recorded {
        uploads::discard(&stored).await;
        return Err(e);
    }

    info!(url = %stored.url, "upload recorded");
    Ok(stored.url)
}

// --- Companies and applications ---

async fn companies(State(state): State<AppState>) -> ApiResult<Vec<Company>> {
    let companies = state.with_db(|db| Ok(db.list_companies()?)).await?;
    Ok(Json(ApiResponse::ok(companies)))
}

async fn eligible(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<Company>> {
    let mode = state.config.dept_match;
    let companies = state
        .with_db(move |db| {
            let student = db.get_student(claims.id)?.ok_or_else(student_not_found)?;
            let companies = db.list_companies()?;
            Ok(eligible_companies(&student, &companies, mode))
        })
        .await?;
    Ok(Json(ApiResponse::ok(companies)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplyRequest {
    company_id: Option<i64>,
}

async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<ApplyRequest>, JsonRejection>,
) -> Created<Value> {
    let Json(req) = body?;
    let company_id = req
        .company_id
        .ok_or_else(|| AppError::validation("Company ID is required"))?;

    let application_id = state
        .with_db(move |db| {
            let student = db.get_student(claims.id)?.ok_or_else(student_not_found)?;
            let company = db
                .get_company(company_id)?
                .ok_or_else(|| AppError::not_found("Company not found"))?;

            let already_applied = db.has_applied(student.id, company.id)?;
            check_application(&student, &company, already_applied)?;

            let id = db
                .insert_application(student.id, company.id)?
                .ok_or(EligibilityError::DuplicateApplication)?;
            db.log_action(
                &claims.email,
                &format!("Applied for job at company ID: {company_id}"),
                Some("Application"),
            );
            Ok(id)
        })
        .await?;

    info!(application_id, company_id, "application submitted");
    created(
        json!({ "applicationId": application_id }),
        "Application submitted successfully",
    )
}

async fn applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<StudentApplicationView>> {
    let rows = state
        .with_db(move |db| Ok(db.student_applications(claims.id)?))
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}

async fn interviews(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<StudentInterviewView>> {
    let rows = state
        .with_db(move |db| Ok(db.student_interviews(claims.id)?))
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}

// --- Offers ---

async fn offers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<StudentOfferView>> {
    let rows = state
        .with_db(move |db| Ok(db.student_offers(claims.id)?))
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusUpdate {
    pub status: Option<String>,
}

async fn respond_to_offer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<()> {
    let Path(offer_id) = id?;
    let Json(req) = body?;

    let status = match req.status.as_deref().map(str::parse::<OfferStatus>) {
        Some(Ok(s @ (OfferStatus::Accepted | OfferStatus::Rejected))) => s,
        _ => return Err(AppError::validation("Invalid status")),
    };

    state
        .with_db(move |db| {
            if !db.respond_to_offer(offer_id, claims.id, status)? {
                return Err(AppError::not_found("Offer not found"));
            }
            db.log_action(
                &claims.email,
                &format!("{status} job offer ID: {offer_id}"),
                Some("Offer"),
            );
            Ok(())
        })
        .await?;

    info!(offer_id, %status, "offer answered");
    Ok(Json(ApiResponse::message(format!(
        "Offer {}!",
        status.as_str().to_lowercase()
    ))))
}

async fn notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<NotificationSummary> {
    let summary = state
        .with_db(move |db| Ok(db.student_notifications(claims.id)?))
        .await?;
    Ok(Json(ApiResponse::ok(summary)))
}
