use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Status-like columns are stored as their display text and parsed back on read.
macro_rules! text_column {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownValue| FromSqlError::Other(Box::new(e)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownValue {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// --- Roles ---

/// Every role a bearer token can carry. Matching is exact and case-sensitive:
/// the legacy lowercase `coordinator` account is a different role from the
/// staff `Coordinator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "student")]
    Student,
    #[serde(rename = "company")]
    Company,
    #[serde(rename = "coordinator")]
    LegacyCoordinator,
    Admin,
    Coordinator,
    #[serde(rename = "HOD")]
    Hod,
    #[serde(rename = "TPO")]
    Tpo,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Company => "company",
            Role::LegacyCoordinator => "coordinator",
            Role::Admin => "Admin",
            Role::Coordinator => "Coordinator",
            Role::Hod => "HOD",
            Role::Tpo => "TPO",
        }
    }

    /// Roles that can be stored in the staff table.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Coordinator | Role::Hod | Role::Tpo)
    }
}

impl FromStr for Role {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "company" => Ok(Role::Company),
            "coordinator" => Ok(Role::LegacyCoordinator),
            "Admin" => Ok(Role::Admin),
            "Coordinator" => Ok(Role::Coordinator),
            "HOD" => Ok(Role::Hod),
            "TPO" => Ok(Role::Tpo),
            _ => Err(UnknownValue::new("role", s)),
        }
    }
}

text_column!(Role);

// --- Workflow statuses ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Rejected,
    Selected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::Shortlisted => "Shortlisted",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Selected => "Selected",
        }
    }

    /// Statuses a company may set by hand; `Selected` only comes from issuing an offer.
    pub fn is_company_settable(&self) -> bool {
        matches!(self, ApplicationStatus::Shortlisted | ApplicationStatus::Rejected)
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Applied" => Ok(ApplicationStatus::Applied),
            "Shortlisted" => Ok(ApplicationStatus::Shortlisted),
            "Rejected" => Ok(ApplicationStatus::Rejected),
            "Selected" => Ok(ApplicationStatus::Selected),
            _ => Err(UnknownValue::new("application status", s)),
        }
    }
}

text_column!(ApplicationStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewResult {
    Pending,
    Pass,
    Fail,
}

impl InterviewResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewResult::Pending => "Pending",
            InterviewResult::Pass => "Pass",
            InterviewResult::Fail => "Fail",
        }
    }
}

impl FromStr for InterviewResult {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(InterviewResult::Pending),
            "Pass" => Ok(InterviewResult::Pass),
            "Fail" => Ok(InterviewResult::Fail),
            _ => Err(UnknownValue::new("interview result", s)),
        }
    }
}

text_column!(InterviewResult);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "Pending",
            OfferStatus::Accepted => "Accepted",
            OfferStatus::Rejected => "Rejected",
        }
    }
}

impl FromStr for OfferStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OfferStatus::Pending),
            "Accepted" => Ok(OfferStatus::Accepted),
            "Rejected" => Ok(OfferStatus::Rejected),
            _ => Err(UnknownValue::new("offer status", s)),
        }
    }
}

text_column!(OfferStatus);

// --- Person records ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub dept: String,
    pub usn: String,
    pub cgpa: Option<f64>,
    pub semester: Option<i64>,
    pub marks_10th: Option<f64>,
    pub marks_12th: Option<f64>,
    pub diploma_marks: Option<f64>,
    pub backlogs: Option<i64>,
    pub history_of_backlogs: Option<i64>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub skills: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub projects: Option<String>,
    pub achievements: Option<String>,
    pub resume_link: Option<String>,
    pub certificates: Option<String>,
    pub profile_complete: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub industry: Option<String>,
    pub role: Option<String>,
    pub package: Option<f64>, // LPA
    pub required_cgpa: Option<f64>,
    pub preferred_dept: Option<String>, // free text, e.g. "CSE,ISE"
    pub job_description: Option<String>,
    pub job_location: Option<String>,
    pub required_skills: Option<String>,
    pub positions: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub dept: Option<String>, // department name or "ALL"
    pub created_at: String,
}

/// The identity a successful login resolves to, whichever table it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub dept: Option<String>,
}

// --- Workflow records ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub student_id: i64,
    pub company_id: i64,
    pub status: ApplicationStatus,
    pub applied_at: String,
}

// --- Profile edits ---

/// Editable student profile fields. Saving replaces every field, so omitted
/// fields are cleared. Legacy column names are accepted as aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    #[serde(alias = "CGPA")]
    pub cgpa: Option<f64>,
    #[serde(alias = "Semester")]
    pub semester: Option<i64>,
    #[serde(alias = "Marks_10th")]
    pub marks_10th: Option<f64>,
    #[serde(alias = "Marks_12th")]
    pub marks_12th: Option<f64>,
    #[serde(alias = "Diploma_Marks")]
    pub diploma_marks: Option<f64>,
    #[serde(alias = "Backlogs")]
    pub backlogs: Option<i64>,
    #[serde(alias = "History_of_Backlogs")]
    pub history_of_backlogs: Option<i64>,
    #[serde(alias = "Phone")]
    pub phone: Option<String>,
    #[serde(alias = "Address")]
    pub address: Option<String>,
    #[serde(alias = "Skills")]
    pub skills: Option<String>,
    #[serde(alias = "LinkedIn")]
    pub linkedin: Option<String>,
    #[serde(alias = "GitHub")]
    pub github: Option<String>,
    #[serde(alias = "Projects")]
    pub projects: Option<String>,
    #[serde(alias = "Achievements")]
    pub achievements: Option<String>,
}

/// Editable company profile and job posting fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    #[serde(alias = "Comp_Name")]
    pub name: Option<String>,
    #[serde(alias = "Industry")]
    pub industry: Option<String>,
    #[serde(alias = "Role")]
    pub role: Option<String>,
    #[serde(alias = "Package")]
    pub package: Option<f64>,
    #[serde(alias = "Required_CGPA")]
    pub required_cgpa: Option<f64>,
    #[serde(alias = "Preferred_Dept")]
    pub preferred_dept: Option<String>,
    #[serde(alias = "Job_Description")]
    pub job_description: Option<String>,
    #[serde(alias = "Job_Location")]
    pub job_location: Option<String>,
    #[serde(alias = "Required_Skills")]
    pub required_skills: Option<String>,
    #[serde(alias = "Positions")]
    pub positions: Option<i64>,
}
