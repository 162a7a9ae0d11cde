use anyhow::{Context, Result};
use rusqlite::params;

use super::{Database, optional};
use crate::models::{Student, StudentProfile};

const STUDENT_COLUMNS: &str = "id, email, name, dept, usn, cgpa, semester, marks_10th, marks_12th,
    diploma_marks, backlogs, history_of_backlogs, phone, address, skills, linkedin, github,
    projects, achievements, resume_link, certificates, profile_complete, created_at";

impl Database {
    pub fn get_student(&self, id: i64) -> Result<Option<Student>> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1");
        optional(self.conn.query_row(&sql, [id], Self::row_to_student))
            .context("Failed to load student")
    }

    /// Replace the profile fields and mark the profile complete.
    pub fn update_student_profile(&self, id: i64, profile: &StudentProfile) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE students SET
                cgpa = ?1, semester = ?2, marks_10th = ?3, marks_12th = ?4, diploma_marks = ?5,
                backlogs = ?6, history_of_backlogs = ?7, phone = ?8, address = ?9, skills = ?10,
                linkedin = ?11, github = ?12, projects = ?13, achievements = ?14,
                profile_complete = 1
             WHERE id = ?15",
            params![
                profile.cgpa,
                profile.semester,
                profile.marks_10th,
                profile.marks_12th,
                profile.diploma_marks,
                profile.backlogs,
                profile.history_of_backlogs,
                profile.phone,
                profile.address,
                profile.skills,
                profile.linkedin,
                profile.github,
                profile.projects,
                profile.achievements,
                id
            ],
        )?;
        Ok(updated > 0)
    }

    pub fn set_resume_link(&self, id: i64, link: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE students SET resume_link = ?1, profile_complete = 1 WHERE id = ?2",
            params![link, id],
        )?;
        Ok(updated > 0)
    }

    /// Certificates are kept as one `;`-separated list of paths.
    pub fn append_certificate(&self, id: i64, path: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE students SET
                certificates = CASE
                    WHEN certificates IS NULL OR certificates = '' THEN ?1
                    ELSE certificates || ';' || ?1
                END,
                profile_complete = 1
             WHERE id = ?2",
            params![path, id],
        )?;
        Ok(updated > 0)
    }

    pub(super) fn row_to_student(row: &rusqlite::Row) -> rusqlite::Result<Student> {
        Ok(Student {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            dept: row.get(3)?,
            usn: row.get(4)?,
            cgpa: row.get(5)?,
            semester: row.get(6)?,
            marks_10th: row.get(7)?,
            marks_12th: row.get(8)?,
            diploma_marks: row.get(9)?,
            backlogs: row.get(10)?,
            history_of_backlogs: row.get(11)?,
            phone: row.get(12)?,
            address: row.get(13)?,
            skills: row.get(14)?,
            linkedin: row.get(15)?,
            github: row.get(16)?,
            projects: row.get(17)?,
            achievements: row.get(18)?,
            resume_link: row.get(19)?,
            certificates: row.get(20)?,
            profile_complete: row.get(21)?,
            created_at: row.get(22)?,
        })
    }
}
