use std::sync::LazyLock;

use axum::{Json, Router, extract::State, extract::rejection::JsonRejection, routing::post};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::{ApiResponse, ApiResult, Created, created};
use crate::auth::password::hash_password;
use crate::db::{NewCompany, NewStudent};
use crate::eligibility::validate_usn;
use crate::error::AppError;
use crate::models::Role;
use crate::state::AppState;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register/student", post(register_student))
        .route("/register/company", post(register_company))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    role: Role,
    id: i64,
    name: String,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    dept: Option<String>,
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(req) = body?;
    let (email, password) = match (non_empty(req.email), non_empty(req.password)) {
        (Some(email), Some(password)) => (email, password),
        _ => return Err(AppError::validation("Email and password required")),
    };

    let account = state
        .with_db(move |db| Ok(db.find_account(&email, &password)?))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let token = state.tokens.issue(&account)?;
    info!(email = %account.email, role = %account.role, "login");

    Ok(Json(ApiResponse::ok(LoginResponse {
        token,
        role: account.role,
        id: account.id,
        name: account.name,
        email: account.email,
        dept: account.dept,
    })))
}

#[derive(Debug, Deserialize)]
struct StudentRegistration {
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
    dept: Option<String>,
    usn: Option<String>,
}

async fn register_student(
    State(state): State<AppState>,
    body: Result<Json<StudentRegistration>, JsonRejection>,
) -> Created<Value> {
    let Json(req) = body?;
    let (email, password, name, dept, usn) = match (
        non_empty(req.email),
        non_empty(req.password),
        non_empty(req.name),
        non_empty(req.dept),
        non_empty(req.usn),
    ) {
        (Some(e), Some(p), Some(n), Some(d), Some(u)) => (e, p, n, d, u),
        _ => return Err(AppError::validation("All fields including USN are required")),
    };

    check_email(&email)?;
    validate_usn(&usn, &dept)?;
    let usn = usn.trim().to_uppercase();

    let id = state
        .with_db(move |db| {
            let hash = hash_password(&password)?;
            let student = NewStudent {
                email: &email,
                name: &name,
                dept: &dept,
                usn: &usn,
            };
            let id = db
                .register_student(&student, &hash)?
                .ok_or_else(|| AppError::conflict("Email or USN already registered"))?;
            db.log_action(&email, "Registered student account", Some("Student"));
            Ok(id)
        })
        .await?;

    info!(id, "student registered");
    created(json!({ "id": id }), "Student registered successfully")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanyRegistration {
    email: Option<String>,
    password: Option<String>,
    #[serde(alias = "name")]
    comp_name: Option<String>,
    role: Option<String>,
    #[serde(rename = "packageLPA", alias = "package")]
    package_lpa: Option<f64>,
    #[serde(alias = "requiredCGPA")]
    required_cgpa: Option<f64>,
    preferred_dept: Option<String>,
}

async fn register_company(
    State(state): State<AppState>,
    body: Result<Json<CompanyRegistration>, JsonRejection>,
) -> Created<Value> {
    let Json(req) = body?;
    let (email, password, name, role, package) = match (
        non_empty(req.email),
        non_empty(req.password),
        non_empty(req.comp_name),
        non_empty(req.role),
        req.package_lpa,
    ) {
        (Some(e), Some(p), Some(n), Some(r), Some(pkg)) => (e, p, n, r, pkg),
        _ => return Err(AppError::validation("All fields required")),
    };

    check_email(&email)?;
    if package < 0.0 {
        return Err(AppError::validation("Package must not be negative"));
    }
    if let Some(cgpa) = req.required_cgpa {
        check_cgpa(cgpa)?;
    }

    let preferred_dept = non_empty(req.preferred_dept);
    let required_cgpa = req.required_cgpa;
    let id = state
        .with_db(move |db| {
            let hash = hash_password(&password)?;
            let company = NewCompany {
                email: &email,
                name: &name,
                role: &role,
                package,
                required_cgpa,
                preferred_dept: preferred_dept.as_deref(),
            };
            let id = db
                .register_company(&company, &hash)?
                .ok_or_else(|| AppError::conflict("Email already registered"))?;
            db.log_action(&email, "Registered company account", Some("Company"));
            Ok(id)
        })
        .await?;

    info!(id, "company registered");
    created(json!({ "id": id }), "Company registered successfully")
}

// --- Input helpers ---

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_email(email: &str) -> Result<(), AppError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(AppError::validation("Invalid email address"))
    }
}

pub(super) fn check_cgpa(cgpa: f64) -> Result<(), AppError> {
    if (0.0..=10.0).contains(&cgpa) {
        Ok(())
    } else {
        Err(AppError::validation("CGPA must be between 0 and 10"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(check_email("a@x.com").is_ok());
        assert!(check_email("first.last@college.edu.in").is_ok());
        assert!(check_email("no-at-sign.com").is_err());
        assert!(check_email("a@x").is_err());
        assert!(check_email("a b@x.com").is_err());
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty(Some("  x ".to_string())).as_deref(), Some("x"));
        assert_eq!(non_empty(Some("   ".to_string())), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_cgpa_range() {
        assert!(check_cgpa(0.0).is_ok());
        assert!(check_cgpa(10.0).is_ok());
        assert!(check_cgpa(10.1).is_err());
        assert!(check_cgpa(-1.0).is_err());
    }
}
