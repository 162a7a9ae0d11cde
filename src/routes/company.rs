use axum::{
    Extension, Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    middleware,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::auth::check_cgpa;
use super::student::StatusUpdate;
use super::{ApiResponse, ApiResult, Created, created};
use crate::auth::{Claims, guard::require_company};
use crate::db::{
    ApplicantFilter, ApplicantView, CompanyInterviewView, CompanyOfferView, NewInterview,
    NewOffer, NotificationSummary, OfferOutcome,
};
use crate::error::AppError;
use crate::models::{ApplicationStatus, Company, CompanyProfile, InterviewResult};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/applications", get(applications))
        .route("/application/:id/status", put(set_application_status))
        .route("/interview", post(schedule_interview))
        .route("/interviews", get(interviews))
        .route("/interview/:id/result", put(set_interview_result))
        .route("/offer", post(send_offer))
        .route("/offers", get(offers))
        .route("/notifications/summary", get(notifications))
        .route_layer(middleware::from_fn_with_state(state, require_company))
}

// --- Profile ---

async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Company> {
    let company = state
        .with_db(move |db| {
            db.get_company(claims.id)?
                .ok_or_else(|| AppError::not_found("Company not found"))
        })
        .await?;
    Ok(Json(ApiResponse::ok(company)))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<CompanyProfile>, JsonRejection>,
) -> ApiResult<()> {
    let Json(profile) = body?;
    if let Some(cgpa) = profile.required_cgpa {
        check_cgpa(cgpa)?;
    }
    if profile.package.is_some_and(|p| p < 0.0) {
        return Err(AppError::validation("Package must not be negative"));
    }
    if profile.positions.is_some_and(|p| p < 0) {
        return Err(AppError::validation("Positions must not be negative"));
    }

    state
        .with_db(move |db| {
            if !db.update_company_profile(claims.id, &profile)? {
                return Err(AppError::not_found("Company not found"));
            }
            db.log_action(
                &claims.email,
                "Updated corporate profile and job details",
                Some("Company"),
            );
            Ok(())
        })
        .await?;

    Ok(Json(ApiResponse::message("Profile updated successfully")))
}

// --- Applicants ---

async fn applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    filter: Result<Query<ApplicantFilter>, QueryRejection>,
) -> ApiResult<Vec<ApplicantView>> {
    let Query(filter) = filter?;
    let rows = state
        .with_db(move |db| Ok(db.list_applicants(claims.id, &filter)?))
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}

async fn set_application_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<()> {
    let Path(application_id) = id?;
    let Json(req) = body?;

    let status = match req.status.as_deref().map(str::parse::<ApplicationStatus>) {
        Some(Ok(s)) if s.is_company_settable() => s,
        _ => return Err(AppError::validation("Invalid status")),
    };

    state
        .with_db(move |db| {
            if !db.set_application_status(application_id, claims.id, status)? {
                return Err(AppError::not_found("Application not found"));
            }
            db.log_action(
                &claims.email,
                &format!("Updated application ID: {application_id} status to {status}"),
                Some("Application"),
            );
            Ok(())
        })
        .await?;

    info!(application_id, %status, "application status changed");
    Ok(Json(ApiResponse::message("Application status updated")))
}

// --- Interviews ---

async fn schedule_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<NewInterview>, JsonRejection>,
) -> Created<Value> {
    let Json(interview) = body?;
    if interview.round_no.is_some_and(|r| r < 1) {
        return Err(AppError::validation("Round number must be at least 1"));
    }

    let interview_id = state
        .with_db(move |db| {
            let id = db
                .create_interview(claims.id, &interview)?
                .ok_or_else(|| AppError::not_found("Application not found"))?;
            db.log_action(
                &claims.email,
                &format!("Scheduled interview for application ID: {}", interview.app_id),
                Some("Interview"),
            );
            Ok(id)
        })
        .await?;

    info!(interview_id, "interview scheduled");
    created(
        json!({ "interviewId": interview_id }),
        "Interview scheduled successfully",
    )
}

async fn interviews(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<CompanyInterviewView>> {
    let rows = state
        .with_db(move |db| Ok(db.company_interviews(claims.id)?))
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}

#[derive(Debug, Deserialize)]
struct ResultUpdate {
    result: Option<String>,
    remarks: Option<String>,
}

async fn set_interview_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ResultUpdate>, JsonRejection>,
) -> ApiResult<()> {
    let Path(interview_id) = id?;
    let Json(req) = body?;

    let result = match req.result.as_deref().map(str::parse::<InterviewResult>) {
        Some(Ok(r @ (InterviewResult::Pass | InterviewResult::Fail))) => r,
        _ => return Err(AppError::validation("Invalid result")),
    };

    state
        .with_db(move |db| {
            if !db.set_interview_result(interview_id, claims.id, result, req.remarks.as_deref())? {
                return Err(AppError::not_found("Interview not found"));
            }
            db.log_action(
                &claims.email,
                &format!("Updated interview result for ID: {interview_id} to {result}"),
                Some("Interview"),
            );
            Ok(())
        })
        .await?;

    Ok(Json(ApiResponse::message("Interview result updated")))
}

// --- Offers ---

async fn send_offer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<NewOffer>, JsonRejection>,
) -> Created<Value> {
    let Json(offer) = body?;
    if offer.salary.is_some_and(|s| s < 0.0) {
        return Err(AppError::validation("Salary must not be negative"));
    }

    let offer_id = state
        .with_db(move |db| match db.create_offer(claims.id, &offer)? {
            OfferOutcome::Created(id) => {
                db.log_action(
                    &claims.email,
                    &format!("Issued job offer to student ID: {}", offer.stud_id),
                    Some("Offer"),
                );
                Ok(id)
            }
            OfferOutcome::NoApplication => Err(AppError::not_found(
                "This student has not applied to your company",
            )),
            OfferOutcome::Duplicate => Err(AppError::conflict("Offer already sent to this student")),
        })
        .await?;

    info!(offer_id, "offer sent");
    created(json!({ "offerId": offer_id }), "Offer sent successfully")
}

async fn offers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<CompanyOfferView>> {
    let rows = state
        .with_db(move |db| Ok(db.company_offers(claims.id)?))
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}

async fn notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<NotificationSummary> {
    let summary = state
        .with_db(move |db| Ok(db.company_notifications(claims.id)?))
        .await?;
    Ok(Json(ApiResponse::ok(summary)))
}
