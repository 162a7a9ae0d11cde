use anyhow::{Context, Result};
use rusqlite::params;

use super::{Database, is_unique_violation, optional};
use crate::auth::password::verify_password;
use crate::models::{Account, Role, Staff};

pub struct NewStudent<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub dept: &'a str,
    pub usn: &'a str,
}

pub struct NewCompany<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub role: &'a str,
    pub package: f64,
    pub required_cgpa: Option<f64>,
    pub preferred_dept: Option<&'a str>,
}

struct Credential {
    id: i64,
    email: String,
    name: String,
    password: String,
    role: Role,
    dept: Option<String>,
}

impl Database {
    // --- Login ---

    /// Resolve credentials against students, companies, staff and legacy
    /// coordinators, in that order. The first table whose row matches both
    /// email and password wins.
    pub fn find_account(&self, email: &str, password: &str) -> Result<Option<Account>> {
        let lookups = [
            "SELECT id, email, name, password, 'student', NULL FROM students WHERE email = ?1",
            "SELECT id, email, name, password, 'company', NULL FROM companies WHERE email = ?1",
            "SELECT id, email, name, password, role, dept FROM staff WHERE email = ?1",
            "SELECT id, email, name, password, 'coordinator', NULL FROM coordinators WHERE email = ?1",
        ];

        for sql in lookups {
            let found = optional(self.conn.query_row(sql, [email], |row| {
                Ok(Credential {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    password: row.get(3)?,
                    role: row.get(4)?,
                    dept: row.get(5)?,
                })
            }))
            .context("Failed to look up credentials")?;

            if let Some(cred) = found {
                if verify_password(password, &cred.password) {
                    return Ok(Some(Account {
                        id: cred.id,
                        email: cred.email,
                        name: cred.name,
                        role: cred.role,
                        dept: cred.dept,
                    }));
                }
            }
        }

        Ok(None)
    }

    // --- Registration ---

    /// Returns `None` when the email or USN is already registered.
    pub fn register_student(&self, student: &NewStudent, password_hash: &str) -> Result<Option<i64>> {
        let existing: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM students WHERE email = ?1 OR usn = ?2",
            params![student.email, student.usn],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(None);
        }

        let result = self.conn.execute(
            "INSERT INTO students (email, password, name, dept, usn, profile_complete)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![student.email, password_hash, student.name, student.dept, student.usn],
        );
        self.inserted_id(result)
    }

    /// Returns `None` when the email is already registered.
    pub fn register_company(&self, company: &NewCompany, password_hash: &str) -> Result<Option<i64>> {
        let result = self.conn.execute(
            "INSERT INTO companies (email, password, name, role, package, required_cgpa, preferred_dept)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                company.email,
                password_hash,
                company.name,
                company.role,
                company.package,
                company.required_cgpa,
                company.preferred_dept
            ],
        );
        self.inserted_id(result)
    }

    // --- Staff ---

    /// Staff roles go to the staff table; the lowercase `coordinator` role
    /// goes to the legacy coordinators table. Returns `None` on duplicate email.
    pub fn add_staff(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: Role,
        dept: Option<&str>,
    ) -> Result<Option<i64>> {
        let result = match role {
            Role::LegacyCoordinator => self.conn.execute(
                "INSERT INTO coordinators (email, password, name) VALUES (?1, ?2, ?3)",
                params![email, password_hash, name],
            ),
            r if r.is_staff() => self.conn.execute(
                "INSERT INTO staff (email, password, name, role, dept) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![email, password_hash, name, role, dept],
            ),
            other => {
                return Err(anyhow::anyhow!("'{}' is not a staff role", other));
            }
        };
        self.inserted_id(result)
    }

    pub fn list_staff(&self) -> Result<Vec<Staff>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, name, role, dept, created_at FROM staff ORDER BY role, name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Staff {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                role: row.get(3)?,
                dept: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list staff")
    }

    fn inserted_id(&self, result: rusqlite::Result<usize>) -> Result<Option<i64>> {
        match result {
            Ok(_) => Ok(Some(self.conn.last_insert_rowid())),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;

    fn student<'a>(email: &'a str, usn: &'a str) -> NewStudent<'a> {
        NewStudent {
            email,
            name: "Asha",
            dept: "ISE",
            usn,
        }
    }

    #[test]
    fn test_register_and_login_student() {
        let db = Database::in_memory().unwrap();
        let id = db
            .register_student(&student("a@x.com", "1SI23IS001"), &hash_password("p").unwrap())
            .unwrap()
            .unwrap();

        let account = db.find_account("a@x.com", "p").unwrap().unwrap();
        assert_eq!(account.id, id);
        assert_eq!(account.role, Role::Student);
        assert_eq!(account.name, "Asha");

        assert!(db.find_account("a@x.com", "wrong").unwrap().is_none());
        assert!(db.find_account("nobody@x.com", "p").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_or_usn_rejected() {
        let db = Database::in_memory().unwrap();
        let hash = hash_password("p").unwrap();
        assert!(db.register_student(&student("a@x.com", "1SI23IS001"), &hash).unwrap().is_some());
        assert!(db.register_student(&student("a@x.com", "1SI23IS002"), &hash).unwrap().is_none());
        assert!(db.register_student(&student("b@x.com", "1SI23IS001"), &hash).unwrap().is_none());
    }

    #[test]
    fn test_company_duplicate_email() {
        let db = Database::in_memory().unwrap();
        let company = NewCompany {
            email: "hr@acme.com",
            name: "Acme",
            role: "SDE",
            package: 12.0,
            required_cgpa: Some(7.0),
            preferred_dept: None,
        };
        assert!(db.register_company(&company, &hash_password("p").unwrap()).unwrap().is_some());
        assert!(db.register_company(&company, &hash_password("p").unwrap()).unwrap().is_none());

        let account = db.find_account("hr@acme.com", "p").unwrap().unwrap();
        assert_eq!(account.role, Role::Company);
    }

    #[test]
    fn test_staff_and_legacy_coordinator_login() {
        let db = Database::in_memory().unwrap();
        db.add_staff("hod@c.edu", &hash_password("h").unwrap(), "Dr. Rao", Role::Hod, Some("ISE"))
            .unwrap()
            .unwrap();
        db.add_staff("old@c.edu", &hash_password("c").unwrap(), "Old", Role::LegacyCoordinator, None)
            .unwrap()
            .unwrap();

        let hod = db.find_account("hod@c.edu", "h").unwrap().unwrap();
        assert_eq!(hod.role, Role::Hod);
        assert_eq!(hod.dept.as_deref(), Some("ISE"));

        let legacy = db.find_account("old@c.edu", "c").unwrap().unwrap();
        assert_eq!(legacy.role, Role::LegacyCoordinator);

        assert!(db.add_staff("s@c.edu", "x", "S", Role::Student, None).is_err());
        assert_eq!(db.list_staff().unwrap().len(), 1);
    }

    #[test]
    fn test_login_falls_through_on_password_mismatch() {
        let db = Database::in_memory().unwrap();
        db.register_student(&student("same@x.com", "1SI23IS001"), &hash_password("student-pw").unwrap())
            .unwrap();
        db.add_staff("same@x.com", &hash_password("staff-pw").unwrap(), "Tpo", Role::Tpo, Some("ALL"))
            .unwrap();

        let account = db.find_account("same@x.com", "staff-pw").unwrap().unwrap();
        assert_eq!(account.role, Role::Tpo);
    }
}
