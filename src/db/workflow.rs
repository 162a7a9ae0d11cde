use anyhow::{Context, Result};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::{Database, is_unique_violation, optional};
use crate::models::{Application, ApplicationStatus, InterviewResult, OfferStatus};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInterview {
    pub app_id: i64,
    pub int_date: Option<String>,
    pub int_time: Option<String>,
    pub round_no: Option<i64>,
    pub int_mode: Option<String>,
    pub int_type: Option<String>,
    pub venue: Option<String>,
    pub meeting_link: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOffer {
    pub stud_id: i64,
    pub salary: Option<f64>,
    pub join_date: Option<String>,
    pub bond_duration: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Created(i64),
    /// The student never applied to this company.
    NoApplication,
    Duplicate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSummary {
    pub applications: i64,
    pub interviews: i64,
    pub offers: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentApplicationView {
    pub id: i64,
    pub status: ApplicationStatus,
    pub applied_at: String,
    pub company_name: String,
    pub role: Option<String>,
    pub package: Option<f64>,
    pub job_location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInterviewView {
    pub id: i64,
    pub interview_date: Option<String>,
    pub interview_time: Option<String>,
    pub round_no: Option<i64>,
    pub mode: Option<String>,
    pub kind: Option<String>,
    pub venue: Option<String>,
    pub meeting_link: Option<String>,
    pub result: InterviewResult,
    pub remarks: Option<String>,
    pub company_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInterviewView {
    pub id: i64,
    pub application_id: i64,
    pub interview_date: Option<String>,
    pub interview_time: Option<String>,
    pub round_no: Option<i64>,
    pub mode: Option<String>,
    pub kind: Option<String>,
    pub venue: Option<String>,
    pub meeting_link: Option<String>,
    pub result: InterviewResult,
    pub remarks: Option<String>,
    pub student_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub dept: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOfferView {
    pub id: i64,
    pub salary: Option<f64>,
    pub join_date: Option<String>,
    pub bond_duration: Option<String>,
    pub acceptance_status: OfferStatus,
    pub offered_at: String,
    pub company_name: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyOfferView {
    pub id: i64,
    pub salary: Option<f64>,
    pub join_date: Option<String>,
    pub bond_duration: Option<String>,
    pub acceptance_status: OfferStatus,
    pub offered_at: String,
    pub student_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub dept: String,
    pub cgpa: Option<f64>,
}

impl Database {
    // --- Applications ---

    pub fn has_applied(&self, student_id: i64, company_id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM applications WHERE student_id = ?1 AND company_id = ?2",
            params![student_id, company_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Returns `None` if the pair already has an application.
    pub fn insert_application(&self, student_id: i64, company_id: i64) -> Result<Option<i64>> {
        let result = self.conn.execute(
            "INSERT INTO applications (student_id, company_id, status) VALUES (?1, ?2, ?3)",
            params![student_id, company_id, ApplicationStatus::Applied],
        );
        match result {
            Ok(_) => Ok(Some(self.conn.last_insert_rowid())),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_application(&self, id: i64) -> Result<Option<Application>> {
        optional(self.conn.query_row(
            "SELECT id, student_id, company_id, status, applied_at FROM applications WHERE id = ?1",
            [id],
            |row| {
                Ok(Application {
                    id: row.get(0)?,
                    student_id: row.get(1)?,
                    company_id: row.get(2)?,
                    status: row.get(3)?,
                    applied_at: row.get(4)?,
                })
            },
        ))
    }

    /// Only touches the application if `company_id` owns it.
    pub fn set_application_status(
        &self,
        application_id: i64,
        company_id: i64,
        status: ApplicationStatus,
    ) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE applications SET status = ?1 WHERE id = ?2 AND company_id = ?3",
            params![status, application_id, company_id],
        )?;
        Ok(updated > 0)
    }

    pub fn student_applications(&self, student_id: i64) -> Result<Vec<StudentApplicationView>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.status, a.applied_at, c.name, c.role, c.package, c.job_location
             FROM applications a
             JOIN companies c ON a.company_id = c.id
             WHERE a.student_id = ?1
             ORDER BY a.applied_at DESC, a.id DESC",
        )?;
        let rows = stmt.query_map([student_id], |row| {
            Ok(StudentApplicationView {
                id: row.get(0)?,
                status: row.get(1)?,
                applied_at: row.get(2)?,
                company_name: row.get(3)?,
                role: row.get(4)?,
                package: row.get(5)?,
                job_location: row.get(6)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list student applications")
    }

    // --- Interviews ---

    /// Schedules a `Pending` interview. Returns `None` if the application
    /// does not belong to `company_id`.
    pub fn create_interview(&self, company_id: i64, interview: &NewInterview) -> Result<Option<i64>> {
        let inserted = self.conn.execute(
            "INSERT INTO interviews (application_id, interview_date, interview_time, round_no,
                                     mode, kind, venue, meeting_link, result, remarks)
             SELECT a.id, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
             FROM applications a
             WHERE a.id = ?10 AND a.company_id = ?11",
            params![
                interview.int_date,
                interview.int_time,
                interview.round_no,
                interview.int_mode,
                interview.int_type,
                interview.venue,
                interview.meeting_link,
                InterviewResult::Pending,
                interview.remarks,
                interview.app_id,
                company_id
            ],
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    pub fn set_interview_result(
        &self,
        interview_id: i64,
        company_id: i64,
        result: InterviewResult,
        remarks: Option<&str>,
    ) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE interviews SET result = ?1, remarks = ?2, updated_at = datetime('now')
             WHERE id = ?3
               AND application_id IN (SELECT id FROM applications WHERE company_id = ?4)",
            params![result, remarks, interview_id, company_id],
        )?;
        Ok(updated > 0)
    }

    pub fn student_interviews(&self, student_id: i64) -> Result<Vec<StudentInterviewView>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.id, i.interview_date, i.interview_time, i.round_no, i.mode, i.kind,
                    i.venue, i.meeting_link, i.result, i.remarks, c.name
             FROM interviews i
             JOIN applications a ON i.application_id = a.id
             JOIN companies c ON a.company_id = c.id
             WHERE a.student_id = ?1
             ORDER BY i.interview_date DESC, i.id DESC",
        )?;
        let rows = stmt.query_map([student_id], |row| {
            Ok(StudentInterviewView {
                id: row.get(0)?,
                interview_date: row.get(1)?,
                interview_time: row.get(2)?,
                round_no: row.get(3)?,
                mode: row.get(4)?,
                kind: row.get(5)?,
                venue: row.get(6)?,
                meeting_link: row.get(7)?,
                result: row.get(8)?,
                remarks: row.get(9)?,
                company_name: row.get(10)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list student interviews")
    }

    pub fn company_interviews(&self, company_id: i64) -> Result<Vec<CompanyInterviewView>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.id, a.id, i.interview_date, i.interview_time, i.round_no, i.mode, i.kind,
                    i.venue, i.meeting_link, i.result, i.remarks, s.name, s.email, s.phone, s.dept
             FROM interviews i
             JOIN applications a ON i.application_id = a.id
             JOIN students s ON a.student_id = s.id
             WHERE a.company_id = ?1
             ORDER BY i.interview_date DESC, i.id DESC",
        )?;
        let rows = stmt.query_map([company_id], |row| {
            Ok(CompanyInterviewView {
                id: row.get(0)?,
                application_id: row.get(1)?,
                interview_date: row.get(2)?,
                interview_time: row.get(3)?,
                round_no: row.get(4)?,
                mode: row.get(5)?,
                kind: row.get(6)?,
                venue: row.get(7)?,
                meeting_link: row.get(8)?,
                result: row.get(9)?,
                remarks: row.get(10)?,
                student_name: row.get(11)?,
                email: row.get(12)?,
                phone: row.get(13)?,
                dept: row.get(14)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list company interviews")
    }

    // --- Offers ---

    /// Insert a `Pending` offer and mark the matching application `Selected`
    /// as one unit: either both land or neither does.
    pub fn create_offer(&mut self, company_id: i64, offer: &NewOffer) -> Result<OfferOutcome> {
        let tx = self.conn.transaction()?;

        let applied: i64 = tx.query_row(
            "SELECT COUNT(*) FROM applications WHERE student_id = ?1 AND company_id = ?2",
            params![offer.stud_id, company_id],
            |row| row.get(0),
        )?;
        if applied == 0 {
            return Ok(OfferOutcome::NoApplication);
        }

        let inserted = tx.execute(
            "INSERT INTO offers (student_id, company_id, salary, join_date, bond_duration, acceptance_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                offer.stud_id,
                company_id,
                offer.salary,
                offer.join_date,
                offer.bond_duration,
                OfferStatus::Pending
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Ok(OfferOutcome::Duplicate),
            Err(e) => return Err(e.into()),
        }
        let offer_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE applications SET status = ?1 WHERE student_id = ?2 AND company_id = ?3",
            params![ApplicationStatus::Selected, offer.stud_id, company_id],
        )?;

        tx.commit().context("Failed to commit offer")?;
        Ok(OfferOutcome::Created(offer_id))
    }

    /// Only the student the offer was made to can answer it.
    pub fn respond_to_offer(&self, offer_id: i64, student_id: i64, status: OfferStatus) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE offers SET acceptance_status = ?1 WHERE id = ?2 AND student_id = ?3",
            params![status, offer_id, student_id],
        )?;
        Ok(updated > 0)
    }

    pub fn student_offers(&self, student_id: i64) -> Result<Vec<StudentOfferView>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.id, o.salary, o.join_date, o.bond_duration, o.acceptance_status,
                    o.offered_at, c.name, c.role
             FROM offers o
             JOIN companies c ON o.company_id = c.id
             WHERE o.student_id = ?1
             ORDER BY o.offered_at DESC, o.id DESC",
        )?;
        let rows = stmt.query_map([student_id], |row| {
            Ok(StudentOfferView {
                id: row.get(0)?,
                salary: row.get(1)?,
                join_date: row.get(2)?,
                bond_duration: row.get(3)?,
                acceptance_status: row.get(4)?,
                offered_at: row.get(5)?,
                company_name: row.get(6)?,
                role: row.get(7)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list student offers")
    }

    pub fn company_offers(&self, company_id: i64) -> Result<Vec<CompanyOfferView>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.id, o.salary, o.join_date, o.bond_duration, o.acceptance_status,
                    o.offered_at, s.name, s.email, s.phone, s.dept, s.cgpa
             FROM offers o
             JOIN students s ON o.student_id = s.id
             WHERE o.company_id = ?1
             ORDER BY o.offered_at DESC, o.id DESC",
        )?;
        let rows = stmt.query_map([company_id], |row| {
            Ok(CompanyOfferView {
                id: row.get(0)?,
                salary: row.get(1)?,
                join_date: row.get(2)?,
                bond_duration: row.get(3)?,
                acceptance_status: row.get(4)?,
                offered_at: row.get(5)?,
                student_name: row.get(6)?,
                email: row.get(7)?,
                phone: row.get(8)?,
                dept: row.get(9)?,
                cgpa: row.get(10)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list company offers")
    }

    // --- Notification badges ---

    pub fn student_notifications(&self, student_id: i64) -> Result<NotificationSummary> {
        self.notification_counts("student_id", student_id)
    }

    pub fn company_notifications(&self, company_id: i64) -> Result<NotificationSummary> {
        self.notification_counts("company_id", company_id)
    }

    // `owner` is one of two fixed column names, never user input
    fn notification_counts(&self, owner: &str, id: i64) -> Result<NotificationSummary> {
        let count = |sql: String| -> Result<i64> {
            Ok(self.conn.query_row(&sql, [id], |row| row.get(0))?)
        };

        Ok(NotificationSummary {
            applications: count(format!(
                "SELECT COUNT(*) FROM applications WHERE {owner} = ?1"
            ))?,
            interviews: count(format!(
                "SELECT COUNT(*) FROM interviews i
                 JOIN applications a ON i.application_id = a.id
                 WHERE a.{owner} = ?1"
            ))?,
            offers: count(format!("SELECT COUNT(*) FROM offers WHERE {owner} = ?1"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewCompany, NewStudent};

    struct Fixture {
        db: Database,
        student: i64,
        company: i64,
        other_company: i64,
    }

    fn add_company(db: &Database, email: &str) -> i64 {
        db.register_company(
            &NewCompany {
                email,
                name: email,
                role: "SDE",
                package: 10.0,
                required_cgpa: None,
                preferred_dept: None,
            },
            "hash",
        )
        .unwrap()
        .unwrap()
    }

    fn fixture() -> Fixture {
        let db = Database::in_memory().unwrap();
        let student = db
            .register_student(
                &NewStudent {
                    email: "a@x.com",
                    name: "Asha",
                    dept: "ISE",
                    usn: "1SI23IS001",
                },
                "hash",
            )
            .unwrap()
            .unwrap();
        let company = add_company(&db, "hr@acme.com");
        let other_company = add_company(&db, "hr@globex.com");
        Fixture {
            db,
            student,
            company,
            other_company,
        }
    }

    #[test]
    fn test_application_unique_per_pair() {
        let f = fixture();
        assert!(!f.db.has_applied(f.student, f.company).unwrap());
        let id = f.db.insert_application(f.student, f.company).unwrap().unwrap();
        assert!(f.db.has_applied(f.student, f.company).unwrap());
        assert!(f.db.insert_application(f.student, f.company).unwrap().is_none());

        let app = f.db.get_application(id).unwrap().unwrap();
        assert_eq!(app.status, ApplicationStatus::Applied);
        assert_eq!(f.db.student_applications(f.student).unwrap().len(), 1);
    }

    #[test]
    fn test_only_owning_company_changes_status() {
        let f = fixture();
        let id = f.db.insert_application(f.student, f.company).unwrap().unwrap();

        assert!(!f
            .db
            .set_application_status(id, f.other_company, ApplicationStatus::Rejected)
            .unwrap());
        assert!(f
            .db
            .set_application_status(id, f.company, ApplicationStatus::Shortlisted)
            .unwrap());
        assert_eq!(
            f.db.get_application(id).unwrap().unwrap().status,
            ApplicationStatus::Shortlisted
        );
    }

    #[test]
    fn test_interview_requires_owned_application() {
        let f = fixture();
        let app_id = f.db.insert_application(f.student, f.company).unwrap().unwrap();
        let interview = NewInterview {
            app_id,
            round_no: Some(1),
            int_mode: Some("Online".to_string()),
            ..Default::default()
        };

        assert!(f.db.create_interview(f.other_company, &interview).unwrap().is_none());
        let id = f.db.create_interview(f.company, &interview).unwrap().unwrap();

        let listed = f.db.company_interviews(f.company).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].result, InterviewResult::Pending);

        assert!(!f
            .db
            .set_interview_result(id, f.other_company, InterviewResult::Pass, None)
            .unwrap());
        assert!(f
            .db
            .set_interview_result(id, f.company, InterviewResult::Pass, Some("Strong"))
            .unwrap());

        let seen = f.db.student_interviews(f.student).unwrap();
        assert_eq!(seen[0].result, InterviewResult::Pass);
        assert_eq!(seen[0].remarks.as_deref(), Some("Strong"));
    }

    #[test]
    fn test_offer_marks_application_selected() {
        let mut f = fixture();
        let app_id = f.db.insert_application(f.student, f.company).unwrap().unwrap();
        let offer = NewOffer {
            stud_id: f.student,
            salary: Some(12.0),
            join_date: Some("2027-07-01".to_string()),
            bond_duration: Some("1 year".to_string()),
        };

        let outcome = f.db.create_offer(f.company, &offer).unwrap();
        assert!(matches!(outcome, OfferOutcome::Created(_)));
        assert_eq!(
            f.db.get_application(app_id).unwrap().unwrap().status,
            ApplicationStatus::Selected
        );

        assert_eq!(f.db.create_offer(f.company, &offer).unwrap(), OfferOutcome::Duplicate);
        assert_eq!(
            f.db.create_offer(f.other_company, &offer).unwrap(),
            OfferOutcome::NoApplication
        );
        assert_eq!(f.db.company_offers(f.company).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_offer_leaves_status_untouched() {
        let mut f = fixture();
        let app_id = f.db.insert_application(f.student, f.company).unwrap().unwrap();
        let offer = NewOffer {
            stud_id: f.student,
            ..Default::default()
        };
        f.db.create_offer(f.company, &offer).unwrap();
        f.db
            .set_application_status(app_id, f.company, ApplicationStatus::Rejected)
            .unwrap();

        // the rolled-back transaction must not re-select the application
        assert_eq!(f.db.create_offer(f.company, &offer).unwrap(), OfferOutcome::Duplicate);
        assert_eq!(
            f.db.get_application(app_id).unwrap().unwrap().status,
            ApplicationStatus::Rejected
        );
    }

    #[test]
    fn test_only_recipient_responds_to_offer() {
        let mut f = fixture();
        f.db.insert_application(f.student, f.company).unwrap();
        let OfferOutcome::Created(offer_id) = f
            .db
            .create_offer(
                f.company,
                &NewOffer {
                    stud_id: f.student,
                    ..Default::default()
                },
            )
            .unwrap()
        else {
            panic!("offer not created");
        };

        assert!(!f.db.respond_to_offer(offer_id, f.student + 1, OfferStatus::Accepted).unwrap());
        assert!(f.db.respond_to_offer(offer_id, f.student, OfferStatus::Accepted).unwrap());
        assert_eq!(
            f.db.student_offers(f.student).unwrap()[0].acceptance_status,
            OfferStatus::Accepted
        );
    }

    #[test]
    fn test_notification_counts() {
        let mut f = fixture();
        let app_id = f.db.insert_application(f.student, f.company).unwrap().unwrap();
        f.db.insert_application(f.student, f.other_company).unwrap();
        f.db
            .create_interview(
                f.company,
                &NewInterview {
                    app_id,
                    ..Default::default()
                },
            )
            .unwrap();
        f.db
            .create_offer(
                f.company,
                &NewOffer {
                    stud_id: f.student,
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(
            f.db.student_notifications(f.student).unwrap(),
            NotificationSummary {
                applications: 2,
                interviews: 1,
                offers: 1
            }
        );
        assert_eq!(
            f.db.company_notifications(f.other_company).unwrap(),
            NotificationSummary {
                applications: 1,
                interviews: 0,
                offers: 0
            }
        );
    }
}
