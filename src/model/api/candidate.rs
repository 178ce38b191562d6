use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        level::{GradeLevel, SchoolLevel},
        CandidateId, PartyListId, PositionId,
    },
    db::candidate::{Candidate, NewCandidate},
};

/// A candidate to create. Vote counts always start at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    pub position_id: PositionId,
    pub party_list_id: PartyListId,
    #[serde(default)]
    pub school_levels: Vec<SchoolLevel>,
    #[serde(default)]
    pub grade_levels: Vec<GradeLevel>,
}

impl CandidateSpec {
    pub fn into_candidate(self) -> Result<NewCandidate, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Valid candidate name is required".to_string());
        }
        Ok(NewCandidate {
            name: name.to_string(),
            image_url: self.image_url,
            position_id: self.position_id,
            party_list_id: self.party_list_id,
            vote_count: 0,
            school_levels: self.school_levels,
            grade_levels: self.grade_levels,
        })
    }
}

/// Changes to a candidate. Vote counts belong to the ledger and are not
/// accepted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidatePatch {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub position_id: Option<PositionId>,
    pub party_list_id: Option<PartyListId>,
    pub school_levels: Option<Vec<SchoolLevel>>,
    pub grade_levels: Option<Vec<GradeLevel>>,
}

/// A candidate as shown to users. Students never see the vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateView {
    pub id: CandidateId,
    pub name: String,
    pub image_url: String,
    pub position_id: PositionId,
    pub party_list_id: PartyListId,
    pub school_levels: Vec<SchoolLevel>,
    pub grade_levels: Vec<GradeLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u32>,
}

impl CandidateView {
    pub fn new(candidate: Candidate, with_count: bool) -> Self {
        let Candidate { id, candidate } = candidate;
        Self {
            id,
            name: candidate.name,
            image_url: candidate.image_url,
            position_id: candidate.position_id,
            party_list_id: candidate.party_list_id,
            school_levels: candidate.school_levels,
            grade_levels: candidate.grade_levels,
            vote_count: with_count.then_some(candidate.vote_count),
        }
    }
}
