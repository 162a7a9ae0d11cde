use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};

use super::{Database, optional};
use crate::models::{ApplicationStatus, Company, CompanyProfile};

const COMPANY_COLUMNS: &str = "id, email, name, industry, role, package, required_cgpa,
    preferred_dept, job_description, job_location, required_skills, positions, created_at";

/// Query-string filters a company can apply to its applicant list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantFilter {
    #[serde(alias = "minCGPA")]
    pub min_cgpa: Option<f64>,
    #[serde(alias = "maxCGPA")]
    pub max_cgpa: Option<f64>,
    pub dept: Option<String>,
    #[serde(default)]
    pub no_backlogs: bool,
    /// Comma-separated; every skill must appear in the student's skills text.
    pub skills: Option<String>,
}

impl ApplicantFilter {
    fn skill_list(&self) -> Vec<String> {
        self.skills
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantView {
    pub application_id: i64,
    pub status: ApplicationStatus,
    pub applied_at: String,
    pub student_id: i64,
    pub name: String,
    pub dept: String,
    pub cgpa: Option<f64>,
    pub semester: Option<i64>,
    pub backlogs: Option<i64>,
    pub phone: Option<String>,
    pub email: String,
    pub skills: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub projects: Option<String>,
    pub achievements: Option<String>,
    pub resume_link: Option<String>,
    pub certificates: Option<String>,
}

impl Database {
    pub fn get_company(&self, id: i64) -> Result<Option<Company>> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1");
        optional(self.conn.query_row(&sql, [id], Self::row_to_company))
            .context("Failed to load company")
    }

    /// All companies, highest package first, then by id.
    pub fn list_companies(&self) -> Result<Vec<Company>> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies ORDER BY package DESC, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_company)?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list companies")
    }

    pub fn update_company_profile(&self, id: i64, profile: &CompanyProfile) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE companies SET
                name = COALESCE(?1, name), industry = ?2, role = ?3, package = ?4,
                required_cgpa = ?5, preferred_dept = ?6, job_description = ?7,
                job_location = ?8, required_skills = ?9, positions = ?10
             WHERE id = ?11",
            params![
                profile.name,
                profile.industry,
                profile.role,
                profile.package,
                profile.required_cgpa,
                profile.preferred_dept,
                profile.job_description,
                profile.job_location,
                profile.required_skills,
                profile.positions,
                id
            ],
        )?;
        Ok(updated > 0)
    }

    pub fn list_applicants(&self, company_id: i64, filter: &ApplicantFilter) -> Result<Vec<ApplicantView>> {
        let mut sql = String::from(
            "SELECT a.id, a.status, a.applied_at, s.id, s.name, s.dept, s.cgpa, s.semester,
                    s.backlogs, s.phone, s.email, s.skills, s.linkedin, s.github, s.projects,
                    s.achievements, s.resume_link, s.certificates
             FROM applications a
             JOIN students s ON a.student_id = s.id
             WHERE a.company_id = ?1",
        );

        let mut values: Vec<Value> = vec![Value::Integer(company_id)];

        if let Some(min) = filter.min_cgpa {
            values.push(Value::Real(min));
            sql.push_str(&format!(" AND s.cgpa >= ?{}", values.len()));
        }

        if let Some(max) = filter.max_cgpa {
            values.push(Value::Real(max));
            sql.push_str(&format!(" AND s.cgpa <= ?{}", values.len()));
        }

        if let Some(dept) = filter.dept.as_deref().filter(|d| !d.is_empty()) {
            values.push(Value::Text(dept.to_string()));
            sql.push_str(&format!(" AND s.dept = ?{}", values.len()));
        }

        if filter.no_backlogs {
            sql.push_str(" AND (s.backlogs IS NULL OR s.backlogs = 0)");
        }

        for skill in filter.skill_list() {
            values.push(Value::Text(skill));
            sql.push_str(&format!(" AND s.skills LIKE '%' || ?{} || '%'", values.len()));
        }

        sql.push_str(" ORDER BY a.applied_at DESC, a.id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok(ApplicantView {
                application_id: row.get(0)?,
                status: row.get(1)?,
                applied_at: row.get(2)?,
                student_id: row.get(3)?,
                name: row.get(4)?,
                dept: row.get(5)?,
                cgpa: row.get(6)?,
                semester: row.get(7)?,
                backlogs: row.get(8)?,
                phone: row.get(9)?,
                email: row.get(10)?,
                skills: row.get(11)?,
                linkedin: row.get(12)?,
                github: row.get(13)?,
                projects: row.get(14)?,
                achievements: row.get(15)?,
                resume_link: row.get(16)?,
                certificates: row.get(17)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list applicants")
    }

    fn row_to_company(row: &rusqlite::Row) -> rusqlite::Result<Company> {
        Ok(Company {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            industry: row.get(3)?,
            role: row.get(4)?,
            package: row.get(5)?,
            required_cgpa: row.get(6)?,
            preferred_dept: row.get(7)?,
            job_description: row.get(8)?,
            job_location: row.get(9)?,
            required_skills: row.get(10)?,
            positions: row.get(11)?,
            created_at: row.get(12)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewCompany, NewStudent};
    use crate::models::StudentProfile;

    fn company(db: &Database, email: &str, package: f64) -> i64 {
        db.register_company(
            &NewCompany {
                email,
                name: email,
                role: "SDE",
                package,
                required_cgpa: None,
                preferred_dept: None,
            },
            "hash",
        )
        .unwrap()
        .unwrap()
    }

    fn student(db: &Database, email: &str, usn: &str, dept: &str, profile: StudentProfile) -> i64 {
        let id = db
            .register_student(&NewStudent { email, name: email, dept, usn }, "hash")
            .unwrap()
            .unwrap();
        db.update_student_profile(id, &profile).unwrap();
        id
    }

    #[test]
    fn test_list_companies_by_package() {
        let db = Database::in_memory().unwrap();
        company(&db, "low@c.com", 4.0);
        company(&db, "high@c.com", 20.0);
        company(&db, "mid@c.com", 9.0);

        let names: Vec<String> = db.list_companies().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["high@c.com", "mid@c.com", "low@c.com"]);
    }

    #[test]
    fn test_update_profile_keeps_name_when_omitted() {
        let db = Database::in_memory().unwrap();
        let id = company(&db, "hr@acme.com", 10.0);
        let profile = CompanyProfile {
            required_cgpa: Some(7.5),
            preferred_dept: Some("CSE,ISE".to_string()),
            package: Some(11.0),
            ..Default::default()
        };
        assert!(db.update_company_profile(id, &profile).unwrap());

        let company = db.get_company(id).unwrap().unwrap();
        assert_eq!(company.name, "hr@acme.com");
        assert_eq!(company.required_cgpa, Some(7.5));
        assert_eq!(company.preferred_dept.as_deref(), Some("CSE,ISE"));
    }

    #[test]
    fn test_applicant_filters() {
        let db = Database::in_memory().unwrap();
        let comp = company(&db, "hr@acme.com", 10.0);

        let strong = student(
            &db,
            "s1@x.com",
            "1SI23IS001",
            "ISE",
            StudentProfile {
                cgpa: Some(9.1),
                backlogs: Some(0),
                skills: Some("Rust, SQL, Docker".to_string()),
                ..Default::default()
            },
        );
        let weak = student(
            &db,
            "s2@x.com",
            "1SI23CS002",
            "CSE",
            StudentProfile {
                cgpa: Some(6.2),
                backlogs: Some(2),
                skills: Some("Java".to_string()),
                ..Default::default()
            },
        );
        db.insert_application(strong, comp).unwrap().unwrap();
        db.insert_application(weak, comp).unwrap().unwrap();

        let all = db.list_applicants(comp, &ApplicantFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let filter = ApplicantFilter {
            min_cgpa: Some(7.0),
            ..Default::default()
        };
        let found = db.list_applicants(comp, &filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].student_id, strong);

        let filter = ApplicantFilter {
            no_backlogs: true,
            skills: Some("Rust, Docker".to_string()),
            ..Default::default()
        };
        assert_eq!(db.list_applicants(comp, &filter).unwrap().len(), 1);

        let filter = ApplicantFilter {
            dept: Some("CSE".to_string()),
            max_cgpa: Some(7.0),
            ..Default::default()
        };
        let found = db.list_applicants(comp, &filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].student_id, weak);
    }
}
