use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        level::{GradeLevel, SchoolLevel},
        VoterId,
    },
    db::voter::{NewVoter, Voter},
};

pub const REFERENCE_NUMBER_LENGTH: RangeInclusive<usize> = 5..=50;
pub const STUDENT_NAME_LENGTH: RangeInclusive<usize> = 2..=100;

/// A student's login credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentCredentials {
    pub reference_number: String,
    pub student_name: String,
}

impl StudentCredentials {
    /// Names are compared ignoring surrounding whitespace and case.
    pub fn matches(&self, voter: &Voter) -> bool {
        !voter.is_admin
            && voter.student_name.trim().to_lowercase() == self.student_name.trim().to_lowercase()
    }
}

/// A student to add to the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRegistration {
    pub reference_number: String,
    pub student_name: String,
    #[serde(default)]
    pub school_level: Option<SchoolLevel>,
    #[serde(default)]
    pub grade_level: Option<GradeLevel>,
}

impl StudentRegistration {
    /// Validate and normalise into a voter record.
    pub fn into_voter(self) -> Result<NewVoter, String> {
        let reference_number = self.reference_number.trim();
        let student_name = self.student_name.trim();
        check_length("Reference number", reference_number, REFERENCE_NUMBER_LENGTH)?;
        check_length("Student name", student_name, STUDENT_NAME_LENGTH)?;
        Ok(NewVoter::student(
            reference_number,
            student_name,
            self.school_level,
            self.grade_level,
        ))
    }
}

fn check_length(field: &str, value: &str, allowed: RangeInclusive<usize>) -> Result<(), String> {
    let length = value.chars().count();
    if allowed.contains(&length) {
        Ok(())
    } else {
        Err(format!(
            "{field} must be between {} and {} characters, got {length}",
            allowed.start(),
            allowed.end()
        ))
    }
}

/// A change of a voter's level. Absent fields are cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelUpdate {
    #[serde(default)]
    pub school_level: Option<SchoolLevel>,
    #[serde(default)]
    pub grade_level: Option<GradeLevel>,
}

/// A roster entry as shown to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentView {
    pub id: VoterId,
    pub reference_number: String,
    pub student_name: String,
    pub is_admin: bool,
    pub has_voted: bool,
    /// How many candidates are on the ballot.
    pub votes_cast: usize,
    pub school_level: Option<SchoolLevel>,
    pub grade_level: Option<GradeLevel>,
}

impl From<Voter> for StudentView {
    fn from(voter: Voter) -> Self {
        Self {
            id: voter.id,
            votes_cast: voter.ballot.len(),
            reference_number: voter.voter.reference_number,
            student_name: voter.voter.student_name,
            is_admin: voter.voter.is_admin,
            has_voted: voter.voter.has_voted,
            school_level: voter.voter.school_level,
            grade_level: voter.voter.grade_level,
        }
    }
}


#[cfg(test)]
mod tests {
    use crate::model::db::voter::VoterCore;

    use super::*;

    #[test]
    fn registration_is_trimmed() {
        let voter = StudentRegistration::example("  2024-00100 ", " Jose Rizal ")
            .into_voter()
            .unwrap();
        assert_eq!(voter.reference_number, "2024-00100");
        assert_eq!(voter.student_name, "Jose Rizal");
        assert!(!voter.is_admin);
    }

    #[test]
    fn registration_lengths() {
        assert!(StudentRegistration::example("1234", "Jose Rizal")
            .into_voter()
            .is_err());
        assert!(StudentRegistration::example("12345", "J").into_voter().is_err());
        assert!(StudentRegistration::example("12345", "Jo").into_voter().is_ok());
        let long = "x".repeat(51);
        assert!(StudentRegistration::example(&long, "Jose Rizal")
            .into_voter()
            .is_err());
    }

    #[test]
    fn login_ignores_case_and_whitespace() {
        let voter = Voter::new(1, VoterCore::example());
        let mut credentials = StudentCredentials::example();
        assert!(credentials.matches(&voter));
        credentials.student_name = "  juan dela cruz ".to_string();
        assert!(credentials.matches(&voter));
        credentials.student_name = "Juan".to_string();
        assert!(!credentials.matches(&voter));
    }

    #[test]
    fn admins_cannot_log_in_as_students() {
        let admin = Voter::new(1, VoterCore::example_admin());
        let credentials = StudentCredentials {
            reference_number: admin.reference_number.clone(),
            student_name: admin.student_name.clone(),
        };
        assert!(!credentials.matches(&admin));
    }
}
