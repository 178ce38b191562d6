use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        level::{GradeLevel, SchoolLevel},
        CandidateId, PartyListId, PositionId,
    },
    db::voter::VoterCore,
};

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    pub image_url: String,
    pub position_id: PositionId,
    pub party_list_id: PartyListId,
    /// Number of ballots that currently include this candidate.
    /// Only ever changed by the ledger, alongside the ballot itself.
    #[serde(default)]
    pub vote_count: u32,
    /// School levels whose students see this candidate.
    #[serde(default)]
    pub school_levels: Vec<SchoolLevel>,
    /// Grade levels whose students see this candidate.
    #[serde(default)]
    pub grade_levels: Vec<GradeLevel>,
}

impl CandidateCore {
    /// Should this candidate be listed for the given voter?
    ///
    /// A grade level takes precedence over a school level; voters with
    /// neither, and administrators, see everyone.
    pub fn visible_to(&self, voter: &VoterCore) -> bool {
        if voter.is_admin {
            return true;
        }
        match (voter.grade_level, voter.school_level) {
            (Some(grade), _) => self.grade_levels.contains(&grade),
            (None, Some(school)) => self.school_levels.contains(&school),
            (None, None) => true,
        }
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: CandidateId,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Candidate {
    pub fn new(id: CandidateId, candidate: CandidateCore) -> Self {
        Self { id, candidate }
    }
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example(name: &str, position_id: PositionId, party_list_id: PartyListId) -> Self {
            Self {
                name: name.to_string(),
                image_url: format!("/images/{}.png", name.to_lowercase()),
                position_id,
                party_list_id,
                vote_count: 0,
                school_levels: Vec::new(),
                grade_levels: Vec::new(),
            }
        }
    }
}
