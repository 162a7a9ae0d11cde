use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Company, Student};

/// Department names accepted at registration and the two-letter code each
/// one embeds in a USN.
pub const DEPARTMENTS: [(&str, &str); 10] = [
    ("CSE", "CS"),
    ("ISE", "IS"),
    ("AIML", "AI"),
    ("DS", "DS"),
    ("ECE", "EC"),
    ("EEE", "EE"),
    ("EIE", "EI"),
    ("ME", "ME"),
    ("CE", "CE"),
    ("BT", "BT"),
];

// Dept code sits at a fixed offset: <digit><region><2-digit-year><dept><serial>
const USN_DEPT_CODE: std::ops::Range<usize> = 5..7;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EligibilityError {
    #[error("Please complete your profile first")]
    ProfileIncomplete,

    #[error("Your CGPA {cgpa} does not meet the company requirement of {required}")]
    CgpaBelowThreshold { cgpa: f64, required: f64 },

    #[error("You have already applied to this company")]
    DuplicateApplication,

    /// Also covers a department with no known USN code.
    #[error("Invalid USN format for selected department")]
    InvalidUsnFormat,
}

/// How a student's department is matched against a company's preferred list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeptMatch {
    /// `preferred_dept` contains the department name anywhere, so "CE" also
    /// matches "ECE". Kept for parity with existing placement data.
    #[default]
    Substring,
    /// `preferred_dept` is a comma-separated list with an exact entry.
    Exact,
}

impl FromStr for DeptMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "substring" => Ok(DeptMatch::Substring),
            "exact" => Ok(DeptMatch::Exact),
            other => Err(format!("expected 'substring' or 'exact', got '{}'", other)),
        }
    }
}

pub fn dept_code(dept: &str) -> Option<&'static str> {
    DEPARTMENTS
        .iter()
        .find(|(name, _)| *name == dept)
        .map(|(_, code)| *code)
}

/// Registration-time check that the USN's embedded code matches the chosen department.
pub fn validate_usn(usn: &str, dept: &str) -> Result<(), EligibilityError> {
    let expected = dept_code(dept).ok_or(EligibilityError::InvalidUsnFormat)?;
    let normalized = usn.trim().to_uppercase();

    match normalized.get(USN_DEPT_CODE) {
        Some(code) if code == expected => Ok(()),
        _ => Err(EligibilityError::InvalidUsnFormat),
    }
}

pub fn prefers_dept(preferred: Option<&str>, dept: &str, mode: DeptMatch) -> bool {
    let preferred = match preferred.map(str::trim) {
        None | Some("") => return true,
        Some(p) => p,
    };

    match mode {
        DeptMatch::Substring => preferred.contains(dept),
        DeptMatch::Exact => preferred.split(',').any(|entry| entry.trim() == dept),
    }
}

/// Companies the student currently qualifies for, best package first.
///
/// Incomplete profiles and students with active backlogs get an empty list
/// rather than an error. Ties keep their input order.
pub fn eligible_companies(student: &Student, companies: &[Company], mode: DeptMatch) -> Vec<Company> {
    if !student.profile_complete || student.backlogs.unwrap_or(0) > 0 {
        return Vec::new();
    }

    let cgpa = student.cgpa.unwrap_or(0.0);

    let mut eligible: Vec<Company> = companies
        .iter()
        .filter(|c| c.required_cgpa.unwrap_or(0.0) <= cgpa)
        .filter(|c| prefers_dept(c.preferred_dept.as_deref(), &student.dept, mode))
        .cloned()
        .collect();

    // sort_by is stable
    eligible.sort_by(|a, b| {
        let a = a.package.unwrap_or(0.0);
        let b = b.package.unwrap_or(0.0);
        b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
    });

    eligible
}

/// Rules applied when a student submits an application.
pub fn check_application(
    student: &Student,
    company: &Company,
    already_applied: bool,
) -> Result<(), EligibilityError> {
    if !student.profile_complete {
        return Err(EligibilityError::ProfileIncomplete);
    }

    let cgpa = student.cgpa.unwrap_or(0.0);
    let required = company.required_cgpa.unwrap_or(0.0);
    if cgpa < required {
        return Err(EligibilityError::CgpaBelowThreshold { cgpa, required });
    }

    if already_applied {
        return Err(EligibilityError::DuplicateApplication);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(cgpa: f64, backlogs: i64, dept: &str) -> Student {
        Student {
            id: 1,
            email: "a@x.com".to_string(),
            name: "A".to_string(),
            dept: dept.to_string(),
            usn: "1SI23IS001".to_string(),
            cgpa: Some(cgpa),
            backlogs: Some(backlogs),
            profile_complete: true,
            ..Default::default()
        }
    }

    fn company(id: i64, package: f64, required: Option<f64>, preferred: Option<&str>) -> Company {
        Company {
            id,
            name: format!("Company {}", id),
            package: Some(package),
            required_cgpa: required,
            preferred_dept: preferred.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_usn_matches_department_code() {
        assert!(validate_usn("1SI23IS112", "ISE").is_ok());
        assert!(validate_usn(" 1si23is112 ", "ISE").is_ok());
        assert_eq!(
            validate_usn("1SI23CS112", "ISE"),
            Err(EligibilityError::InvalidUsnFormat)
        );
    }

    #[test]
    fn test_validate_usn_rejects_short_or_unknown() {
        assert_eq!(validate_usn("1SI23I", "ISE"), Err(EligibilityError::InvalidUsnFormat));
        assert_eq!(validate_usn("1SI23IS112", "XYZ"), Err(EligibilityError::InvalidUsnFormat));
    }

    #[test]
    fn test_incomplete_profile_is_never_eligible() {
        let mut s = student(9.5, 0, "ISE");
        s.profile_complete = false;
        let companies = vec![company(1, 10.0, None, None)];
        assert!(eligible_companies(&s, &companies, DeptMatch::Substring).is_empty());
    }

    #[test]
    fn test_backlogs_exclude_everything() {
        let s = student(9.5, 1, "ISE");
        let companies = vec![company(1, 10.0, None, None)];
        assert!(eligible_companies(&s, &companies, DeptMatch::Substring).is_empty());
    }

    #[test]
    fn test_cgpa_threshold_and_package_order() {
        let s = student(8.5, 0, "ISE");
        let companies = vec![
            company(1, 6.0, Some(7.0), None),
            company(2, 12.0, Some(8.5), None),
            company(3, 20.0, Some(9.0), None),
            company(4, 9.0, None, Some("")),
        ];

        let ids: Vec<i64> = eligible_companies(&s, &companies, DeptMatch::Substring)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![2, 4, 1]);
    }

    #[test]
    fn test_equal_packages_keep_input_order() {
        let s = student(8.0, 0, "CSE");
        let companies = vec![
            company(7, 10.0, None, None),
            company(3, 10.0, None, None),
            company(5, 10.0, None, None),
        ];
        let ids: Vec<i64> = eligible_companies(&s, &companies, DeptMatch::Substring)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn test_substring_dept_match_quirk() {
        // "CE" is contained in "ECE"
        assert!(prefers_dept(Some("ECE,ME"), "CE", DeptMatch::Substring));
        assert!(!prefers_dept(Some("ECE,ME"), "CE", DeptMatch::Exact));
        assert!(prefers_dept(Some("ECE, CE"), "CE", DeptMatch::Exact));
        assert!(prefers_dept(None, "CE", DeptMatch::Exact));
        assert!(prefers_dept(Some("  "), "CE", DeptMatch::Exact));
        assert!(!prefers_dept(Some("CSE"), "ISE", DeptMatch::Substring));
    }

    #[test]
    fn test_preferred_dept_filters_companies() {
        let s = student(9.0, 0, "ISE");
        let companies = vec![
            company(1, 10.0, None, Some("CSE,ISE")),
            company(2, 11.0, None, Some("MECH")),
        ];
        let eligible = eligible_companies(&s, &companies, DeptMatch::Exact);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, 1);
    }

    #[test]
    fn test_check_application_rules() {
        let s = student(7.0, 0, "ISE");
        let c = company(1, 10.0, Some(7.5), None);
        assert_eq!(
            check_application(&s, &c, false),
            Err(EligibilityError::CgpaBelowThreshold { cgpa: 7.0, required: 7.5 })
        );

        let c = company(2, 10.0, None, None);
        assert!(check_application(&s, &c, false).is_ok());
        assert_eq!(
            check_application(&s, &c, true),
            Err(EligibilityError::DuplicateApplication)
        );

        let mut incomplete = s.clone();
        incomplete.profile_complete = false;
        assert_eq!(
            check_application(&incomplete, &c, false),
            Err(EligibilityError::ProfileIncomplete)
        );
    }

    #[test]
    fn test_dept_match_parsing() {
        assert_eq!("EXACT".parse::<DeptMatch>().unwrap(), DeptMatch::Exact);
        assert_eq!("substring".parse::<DeptMatch>().unwrap(), DeptMatch::Substring);
        assert!("fuzzy".parse::<DeptMatch>().is_err());
    }
}
