use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, ffi, params};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

mod accounts;
mod companies;
mod reports;
mod students;
mod workflow;

pub use accounts::{NewCompany, NewStudent};
pub use companies::{ApplicantFilter, ApplicantView};
pub use reports::{
    ApplicationOverview, CompanySummary, PlacedStudent, StudentPlacement, UnplacedStudent,
};
pub use workflow::{
    CompanyInterviewView, CompanyOfferView, NewInterview, NewOffer, NotificationSummary,
    OfferOutcome, StudentApplicationView, StudentInterviewView, StudentOfferView,
};

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                name TEXT NOT NULL,
                dept TEXT NOT NULL,
                usn TEXT NOT NULL UNIQUE,
                cgpa REAL,
                semester INTEGER,
                marks_10th REAL,
                marks_12th REAL,
                diploma_marks REAL,
                backlogs INTEGER DEFAULT 0,
                history_of_backlogs INTEGER,
                phone TEXT,
                address TEXT,
                skills TEXT,
                linkedin TEXT,
                github TEXT,
                projects TEXT,
                achievements TEXT,
                resume_link TEXT,
                certificates TEXT,
                profile_complete INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                name TEXT NOT NULL,
                industry TEXT,
                role TEXT,
                package REAL,
                required_cgpa REAL,
                preferred_dept TEXT,
                job_description TEXT,
                job_location TEXT,
                required_skills TEXT,
                positions INTEGER,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS staff (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                name TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('Admin', 'Coordinator', 'HOD', 'TPO')),
                dept TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS coordinators (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL REFERENCES students(id),
                company_id INTEGER NOT NULL REFERENCES companies(id),
                status TEXT NOT NULL DEFAULT 'Applied' CHECK (status IN ('Applied', 'Shortlisted', 'Rejected', 'Selected')),
                applied_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (student_id, company_id)
            );

            CREATE TABLE IF NOT EXISTS interviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                application_id INTEGER NOT NULL REFERENCES applications(id),
                interview_date TEXT,
                interview_time TEXT,
                round_no INTEGER,
                mode TEXT,
                kind TEXT,
                venue TEXT,
                meeting_link TEXT,
                result TEXT NOT NULL DEFAULT 'Pending' CHECK (result IN ('Pending', 'Pass', 'Fail')),
                remarks TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS offers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL REFERENCES students(id),
                company_id INTEGER NOT NULL REFERENCES companies(id),
                salary REAL,
                join_date TEXT,
                bond_duration TEXT,
                acceptance_status TEXT NOT NULL DEFAULT 'Pending' CHECK (acceptance_status IN ('Pending', 'Accepted', 'Rejected')),
                offered_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (student_id, company_id)
            );

            CREATE TABLE IF NOT EXISTS audit_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_email TEXT NOT NULL,
                action TEXT NOT NULL,
                table_name TEXT,
                logged_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_students_dept ON students(dept);
            CREATE INDEX IF NOT EXISTS idx_applications_company ON applications(company_id);
            CREATE INDEX IF NOT EXISTS idx_interviews_application ON interviews(application_id);
            CREATE INDEX IF NOT EXISTS idx_offers_status ON offers(acceptance_status);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='students'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!(
                "Database not initialized. Run 'placement init' first."
            ));
        }
        Ok(())
    }

    // --- Audit trail ---

    /// Append an audit entry. Failures are logged and never reach the caller.
    pub fn log_action(&self, email: &str, action: &str, table_name: Option<&str>) {
        let result = self.conn.execute(
            "INSERT INTO audit_logs (user_email, action, table_name) VALUES (?1, ?2, ?3)",
            params![email, action, table_name],
        );
        if let Err(e) = result {
            warn!(error = %e, email, action, "audit logging failed");
        }
    }

    #[cfg(test)]
    pub(crate) fn audit_count(&self) -> i64 {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_logs", [], |row| row.get(0))
            .unwrap()
    }
}

/// UNIQUE failures only; FK, CHECK and NOT NULL failures are real errors.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn optional<T>(result: rusqlite::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let db = Database::in_memory().unwrap();
        db.init().unwrap();
        db.ensure_initialized().unwrap();
    }

    #[test]
    fn test_uninitialized_database_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("nested/placement.db")).unwrap();
        let err = db.ensure_initialized().unwrap_err();
        assert!(err.to_string().contains("placement init"));
    }

    #[test]
    fn test_log_action_appends() {
        let db = Database::in_memory().unwrap();
        db.log_action("a@x.com", "Applied for job", Some("applications"));
        db.log_action("a@x.com", "Updated profile", None);
        assert_eq!(db.audit_count(), 2);
    }

    #[test]
    fn test_only_unique_failures_count_as_duplicates() {
        let db = Database::in_memory().unwrap();
        let insert_staff = |email: &str, role: &str| {
            db.conn.execute(
                "INSERT INTO staff (email, password, name, role) VALUES (?1, 'x', 'n', ?2)",
                params![email, role],
            )
        };

        insert_staff("t@c.edu", "TPO").unwrap();
        assert!(is_unique_violation(&insert_staff("t@c.edu", "TPO").unwrap_err()));
        assert!(!is_unique_violation(&insert_staff("b@c.edu", "Boss").unwrap_err()));
    }

    #[test]
    fn test_application_to_missing_company_is_an_error() {
        let db = Database::in_memory().unwrap();
        // foreign key failure, not "already applied"
        assert!(db.insert_application(1, 999).is_err());
    }

    #[test]
    fn test_log_action_swallows_failures() {
        let db = Database::in_memory().unwrap();
        db.conn.execute_batch("DROP TABLE audit_logs").unwrap();
        // must not panic or propagate
        db.log_action("a@x.com", "Updated profile", Some("students"));
    }
}
