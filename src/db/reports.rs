use anyhow::{Context, Result};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::Database;
use crate::eligibility::DEPARTMENTS;
use crate::models::ApplicationStatus;
use crate::reports::{DepartmentStats, Scope, StatsSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPlacement {
    pub id: i64,
    pub usn: String,
    pub name: String,
    pub dept: String,
    pub cgpa: Option<f64>,
    pub email: String,
    pub phone: Option<String>,
    pub profile_complete: bool,
    pub placed: bool,
    pub company_name: Option<String>,
    pub package: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: i64,
    pub name: String,
    pub role: Option<String>,
    pub package: Option<f64>,
    pub total_applications: i64,
    pub shortlisted: i64,
    pub selected: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationOverview {
    pub id: i64,
    pub student_name: String,
    pub dept: String,
    pub cgpa: Option<f64>,
    pub company_name: String,
    pub role: Option<String>,
    pub package: Option<f64>,
    pub status: ApplicationStatus,
    pub applied_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedStudent {
    pub name: String,
    pub dept: String,
    pub cgpa: Option<f64>,
    pub company_name: String,
    pub role: Option<String>,
    pub salary: Option<f64>,
    pub join_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnplacedStudent {
    pub name: String,
    pub dept: String,
    pub cgpa: Option<f64>,
    pub email: String,
    pub phone: Option<String>,
    pub application_count: i64,
}

// Every query below takes the scope's department as ?1; NULL means global.

impl Database {
    pub fn statistics(&self, scope: &Scope) -> Result<StatsSnapshot> {
        let dept = scope.dept();

        let total_students: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM students WHERE (?1 IS NULL OR dept = ?1)",
            [dept],
            |row| row.get(0),
        )?;

        let total_companies: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))?;

        let total_applications: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM applications a
             JOIN students s ON a.student_id = s.id
             WHERE (?1 IS NULL OR s.dept = ?1)",
            [dept],
            |row| row.get(0),
        )?;

        let placed_students: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT o.student_id) FROM offers o
             JOIN students s ON o.student_id = s.id
             WHERE o.acceptance_status = 'Accepted' AND (?1 IS NULL OR s.dept = ?1)",
            [dept],
            |row| row.get(0),
        )?;

        // averages every offer, not only accepted ones
        let avg_package: Option<f64> = self.conn.query_row(
            "SELECT AVG(o.salary) FROM offers o
             JOIN students s ON o.student_id = s.id
             WHERE (?1 IS NULL OR s.dept = ?1)",
            [dept],
            |row| row.get(0),
        )?;

        let highest_package: Option<f64> =
            self.conn
                .query_row("SELECT MAX(salary) FROM offers", [], |row| row.get(0))?;

        Ok(StatsSnapshot {
            total_students,
            total_companies,
            total_applications,
            placed_students,
            unplaced_students: total_students - placed_students,
            avg_package: avg_package.unwrap_or(0.0),
            highest_package: highest_package.unwrap_or(0.0),
        })
    }

    /// One row per known department (plus any other department found in the
    /// data), ordered by department name.
    pub fn department_breakdown(&self) -> Result<Vec<DepartmentStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.dept,
                    COUNT(DISTINCT s.id),
                    COUNT(DISTINCT o.student_id),
                    AVG(o.salary)
             FROM students s
             LEFT JOIN offers o ON s.id = o.student_id AND o.acceptance_status = 'Accepted'
             GROUP BY s.dept",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<f64>>(3)?,
            ))
        })?;
        let counted = rows
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to compute department statistics")?;

        let mut stats: Vec<DepartmentStats> = DEPARTMENTS
            .iter()
            .map(|(name, _)| {
                counted
                    .iter()
                    .find(|(dept, ..)| dept == name)
                    .map(|(dept, total, placed, avg)| DepartmentStats::new(dept, *total, *placed, *avg))
                    .unwrap_or_else(|| DepartmentStats::new(name, 0, 0, None))
            })
            .collect();

        for (dept, total, placed, avg) in &counted {
            if !DEPARTMENTS.iter().any(|(name, _)| name == dept) {
                stats.push(DepartmentStats::new(dept, *total, *placed, *avg));
            }
        }

        stats.sort_by(|a, b| a.dept.cmp(&b.dept));
        Ok(stats)
    }

    pub fn students_overview(&self, scope: &Scope) -> Result<Vec<StudentPlacement>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.usn, s.name, s.dept, s.cgpa, s.email, s.phone, s.profile_complete,
                    o.id IS NOT NULL, c.name, o.salary
             FROM students s
             LEFT JOIN offers o ON s.id = o.student_id AND o.acceptance_status = 'Accepted'
             LEFT JOIN companies c ON o.company_id = c.id
             WHERE (?1 IS NULL OR s.dept = ?1)
             ORDER BY s.id",
        )?;
        let rows = stmt.query_map([scope.dept()], |row| {
            Ok(StudentPlacement {
                id: row.get(0)?,
                usn: row.get(1)?,
                name: row.get(2)?,
                dept: row.get(3)?,
                cgpa: row.get(4)?,
                email: row.get(5)?,
                phone: row.get(6)?,
                profile_complete: row.get(7)?,
                placed: row.get(8)?,
                company_name: row.get(9)?,
                package: row.get(10)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list students")
    }

    pub fn companies_overview(&self) -> Result<Vec<CompanySummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, c.role, c.package,
                    COUNT(a.id),
                    COALESCE(SUM(CASE WHEN a.status = ?1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN a.status = ?2 THEN 1 ELSE 0 END), 0)
             FROM companies c
             LEFT JOIN applications a ON c.id = a.company_id
             GROUP BY c.id, c.name, c.role, c.package
             ORDER BY c.id",
        )?;
        let rows = stmt.query_map(
            params![ApplicationStatus::Shortlisted, ApplicationStatus::Selected],
            |row| {
                Ok(CompanySummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    role: row.get(2)?,
                    package: row.get(3)?,
                    total_applications: row.get(4)?,
                    shortlisted: row.get(5)?,
                    selected: row.get(6)?,
                })
            },
        )?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to summarize companies")
    }

    pub fn applications_overview(&self) -> Result<Vec<ApplicationOverview>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, s.name, s.dept, s.cgpa, c.name, c.role, c.package, a.status, a.applied_at
             FROM applications a
             JOIN students s ON a.student_id = s.id
             JOIN companies c ON a.company_id = c.id
             ORDER BY a.applied_at DESC, a.id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ApplicationOverview {
                id: row.get(0)?,
                student_name: row.get(1)?,
                dept: row.get(2)?,
                cgpa: row.get(3)?,
                company_name: row.get(4)?,
                role: row.get(5)?,
                package: row.get(6)?,
                status: row.get(7)?,
                applied_at: row.get(8)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list applications")
    }

    pub fn placed_students(&self, scope: &Scope) -> Result<Vec<PlacedStudent>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.name, s.dept, s.cgpa, c.name, c.role, o.salary, o.join_date
             FROM students s
             JOIN offers o ON s.id = o.student_id
             JOIN companies c ON o.company_id = c.id
             WHERE o.acceptance_status = 'Accepted' AND (?1 IS NULL OR s.dept = ?1)
             ORDER BY o.offered_at DESC, o.id DESC",
        )?;
        let rows = stmt.query_map([scope.dept()], |row| {
            Ok(PlacedStudent {
                name: row.get(0)?,
                dept: row.get(1)?,
                cgpa: row.get(2)?,
                company_name: row.get(3)?,
                role: row.get(4)?,
                salary: row.get(5)?,
                join_date: row.get(6)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list placed students")
    }

    pub fn unplaced_students(&self, scope: &Scope) -> Result<Vec<UnplacedStudent>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.name, s.dept, s.cgpa, s.email, s.phone, COUNT(a.id)
             FROM students s
             LEFT JOIN applications a ON s.id = a.student_id
             WHERE s.id NOT IN (SELECT student_id FROM offers WHERE acceptance_status = 'Accepted')
               AND (?1 IS NULL OR s.dept = ?1)
             GROUP BY s.id, s.name, s.dept, s.cgpa, s.email, s.phone
             ORDER BY s.name",
        )?;
        let rows = stmt.query_map([scope.dept()], |row| {
            Ok(UnplacedStudent {
                name: row.get(0)?,
                dept: row.get(1)?,
                cgpa: row.get(2)?,
                email: row.get(3)?,
                phone: row.get(4)?,
                application_count: row.get(5)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list unplaced students")
    }
}
