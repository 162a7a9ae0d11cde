//! Placement reporting: who sees which slice of the data, and the shapes
//! the aggregate queries produce.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Role;

/// Staff dept value that means "every department".
pub const ALL_DEPARTMENTS: &str = "ALL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Global,
    Department(String),
}

impl Scope {
    /// HODs always see their own department; a Coordinator does too unless
    /// assigned to `ALL`. TPO, Admin and legacy coordinators see everything.
    pub fn for_viewer(role: Role, dept: Option<&str>) -> Result<Self, AppError> {
        let restricted = match role {
            Role::Hod => true,
            Role::Coordinator => dept != Some(ALL_DEPARTMENTS),
            _ => false,
        };

        if !restricted {
            return Ok(Scope::Global);
        }

        match dept.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => Ok(Scope::Department(d.to_string())),
            None => Err(AppError::Forbidden(
                "No department assigned to this account".to_string(),
            )),
        }
    }

    /// Department filter as a nullable SQL parameter.
    pub fn dept(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::Department(d) => Some(d),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_students: i64,
    /// Always global.
    pub total_companies: i64,
    pub total_applications: i64,
    pub placed_students: i64,
    pub unplaced_students: i64,
    pub avg_package: f64,
    /// Always global, even for department-scoped viewers.
    pub highest_package: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStats {
    pub dept: String,
    pub total_students: i64,
    pub placed_students: i64,
    pub placement_percentage: Option<f64>,
    pub avg_package: Option<f64>,
}

impl DepartmentStats {
    pub fn new(dept: &str, total: i64, placed: i64, avg_package: Option<f64>) -> Self {
        Self {
            dept: dept.to_string(),
            total_students: total,
            placed_students: placed,
            placement_percentage: placement_percentage(placed, total),
            avg_package: avg_package.map(round2),
        }
    }
}

/// `placed / total * 100` to two decimals; `None` for an empty department.
pub fn placement_percentage(placed: i64, total: i64) -> Option<f64> {
    if total <= 0 {
        return None;
    }
    Some(round2(placed as f64 / total as f64 * 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_rules() {
        assert_eq!(
            Scope::for_viewer(Role::Hod, Some("ISE")).unwrap(),
            Scope::Department("ISE".to_string())
        );
        assert_eq!(
            Scope::for_viewer(Role::Coordinator, Some("CSE")).unwrap(),
            Scope::Department("CSE".to_string())
        );
        assert_eq!(Scope::for_viewer(Role::Coordinator, Some("ALL")).unwrap(), Scope::Global);
        assert_eq!(Scope::for_viewer(Role::Tpo, Some("ISE")).unwrap(), Scope::Global);
        assert_eq!(Scope::for_viewer(Role::Admin, None).unwrap(), Scope::Global);
        assert_eq!(Scope::for_viewer(Role::LegacyCoordinator, None).unwrap(), Scope::Global);
    }

    #[test]
    fn test_restricted_role_without_department_is_forbidden() {
        assert!(matches!(
            Scope::for_viewer(Role::Hod, None),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            Scope::for_viewer(Role::Coordinator, Some("  ")),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_placement_percentage() {
        assert_eq!(placement_percentage(0, 0), None);
        assert_eq!(placement_percentage(1, 3), Some(33.33));
        assert_eq!(placement_percentage(2, 3), Some(66.67));
        assert_eq!(placement_percentage(4, 4), Some(100.0));
    }

    #[test]
    fn test_department_stats_rounding() {
        let stats = DepartmentStats::new("ISE", 3, 1, Some(12.345_6));
        assert_eq!(stats.placement_percentage, Some(33.33));
        assert_eq!(stats.avg_package, Some(12.35));

        let empty = DepartmentStats::new("BT", 0, 0, None);
        assert_eq!(empty.placement_percentage, None);
        assert_eq!(empty.avg_package, None);
    }
}
