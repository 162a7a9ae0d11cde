use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::token::{Claims, TokenService};
use crate::error::AppError;
use crate::models::Role;
use crate::state::AppState;

pub const STUDENT_ONLY: &[Role] = &[Role::Student];
pub const COMPANY_ONLY: &[Role] = &[Role::Company];

/// Every role allowed on the reporting routes. The legacy lowercase
/// `coordinator` is listed alongside the staff `Coordinator`.
pub const STAFF_ROLES: &[Role] = &[
    Role::LegacyCoordinator,
    Role::Admin,
    Role::Coordinator,
    Role::Hod,
    Role::Tpo,
];

/// Pull the bearer token out of `Authorization` and verify it.
pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> Result<Claims, AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_whitespace().nth(1))
        .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

    Ok(tokens.verify(token)?)
}

pub fn authorize(claims: &Claims, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        debug!(role = %claims.role, email = %claims.email, "role not allowed on route");
        Err(AppError::Forbidden("Unauthorized access".to_string()))
    }
}

// --- Middleware ---

async fn guard(
    state: AppState,
    allowed: &[Role],
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authenticate(req.headers(), &state.tokens)?;
    authorize(&claims, allowed)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub async fn require_student(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard(state, STUDENT_ONLY, req, next).await
}

pub async fn require_company(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard(state, COMPANY_ONLY, req, next).await
}

pub async fn require_staff(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard(state, STAFF_ROLES, req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;
    use axum::http::HeaderValue;
    use chrono::Duration;

    fn tokens() -> TokenService {
        TokenService::new("secret", Duration::hours(1))
    }

    fn claims_for(role: Role) -> Claims {
        let tokens = tokens();
        let token = tokens
            .issue(&Account {
                id: 1,
                email: "x@y.com".to_string(),
                name: "X".to_string(),
                role,
                dept: None,
            })
            .unwrap();
        tokens.verify(&token).unwrap()
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let err = authenticate(&HeaderMap::new(), &tokens()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "No token provided"));
    }

    #[test]
    fn test_header_without_token_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        let err = authenticate(&headers, &tokens()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "No token provided"));
    }

    #[test]
    fn test_bad_token_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        let err = authenticate(&headers, &tokens()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid token"));
    }

    #[test]
    fn test_valid_bearer_token() {
        let tokens = tokens();
        let token = tokens
            .issue(&Account {
                id: 7,
                email: "a@x.com".to_string(),
                name: "Asha".to_string(),
                role: Role::Student,
                dept: None,
            })
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        let claims = authenticate(&headers, &tokens).unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.role, Role::Student);
    }

    #[test]
    fn test_authorize_company_route() {
        assert!(authorize(&claims_for(Role::Company), COMPANY_ONLY).is_ok());
        let err = authorize(&claims_for(Role::Student), COMPANY_ONLY).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == "Unauthorized access"));
    }

    #[test]
    fn test_staff_roles_are_distinct_strings() {
        for role in [Role::LegacyCoordinator, Role::Coordinator, Role::Hod, Role::Tpo, Role::Admin] {
            assert!(authorize(&claims_for(role), STAFF_ROLES).is_ok());
        }
        assert!(authorize(&claims_for(Role::Student), STAFF_ROLES).is_err());
        assert!(authorize(&claims_for(Role::Company), STAFF_ROLES).is_err());
    }
}
