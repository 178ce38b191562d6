use std::ops::{Deref, DerefMut};

use argon2::Config as Argon2Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::common::{
    ballot::Ballot,
    level::{GradeLevel, SchoolLevel},
    VoterId,
};

/// Core voter data, as stored in the database.
///
/// Students and administrators share one collection, distinguished by
/// `is_admin`; only administrators carry a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// School-issued reference number, unique across all voters.
    pub reference_number: String,
    pub student_name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Candidates this voter has voted for.
    #[serde(default)]
    pub ballot: Ballot,
    /// Set once the voter declares they are done; freezes the ballot.
    #[serde(default)]
    pub has_voted: bool,
    #[serde(default)]
    pub school_level: Option<SchoolLevel>,
    #[serde(default)]
    pub grade_level: Option<GradeLevel>,
}

impl VoterCore {
    /// Create a student with an empty ballot.
    pub fn student(
        reference_number: impl Into<String>,
        student_name: impl Into<String>,
        school_level: Option<SchoolLevel>,
        grade_level: Option<GradeLevel>,
    ) -> Self {
        Self {
            reference_number: reference_number.into(),
            student_name: student_name.into(),
            is_admin: false,
            password_hash: None,
            ballot: Ballot::default(),
            has_voted: false,
            school_level,
            grade_level,
        }
    }

    /// Create an administrator, hashing the password.
    pub fn admin(reference_number: impl Into<String>, password: &str) -> Result<Self, argon2::Error> {
        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(password.as_bytes(), &salt, &Argon2Config::default())?;
        Ok(Self {
            reference_number: reference_number.into(),
            student_name: "admin".to_string(),
            is_admin: true,
            password_hash: Some(password_hash),
            ballot: Ballot::default(),
            has_voted: false,
            school_level: None,
            grade_level: None,
        })
    }

    /// Check whether the given password is correct.
    /// Voters without a password never match.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        self.password_hash
            .as_deref()
            .map(|hash| argon2::verify_encoded(hash, password.as_ref()).unwrap_or(false))
            .unwrap_or(false)
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: VoterId,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Voter {
    pub fn new(id: VoterId, voter: VoterCore) -> Self {
        Self { id, voter }
    }
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}
