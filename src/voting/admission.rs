//! The rules deciding whether a vote may be recorded.

use serde::Serialize;
use thiserror::Error;

use crate::model::{
    common::{CandidateId, PositionId, VoterId},
    db::voter::Voter,
};

use super::election::Election;

/// Why a vote (or ballot submission) was refused.
///
/// None of these are failures of the system: each is an expected outcome that
/// the caller can recover from by choosing a different action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason")]
pub enum Denial {
    #[error("Candidate {0} not found")]
    CandidateNotFound(CandidateId),
    #[error("Position {0} not found")]
    PositionNotFound(PositionId),
    #[error("Admins cannot vote")]
    AdminCannotVote,
    /// The vote is already recorded; there is nothing to retry.
    #[error("You have already voted for this candidate")]
    DuplicateVote,
    #[error("Your ballot has already been submitted")]
    BallotSubmitted,
    /// The voter must deselect an existing choice for the position first.
    #[error("You can only vote for {cap} {} for this position", candidates_noun(.cap))]
    PositionCapExceeded { cap: u32 },
}

fn candidates_noun(cap: &u32) -> &'static str {
    if *cap == 1 {
        "candidate"
    } else {
        "candidates"
    }
}

/// The ledger mutation an admitted vote calls for: add `candidate_id` to the
/// voter's ballot and increment that candidate's vote count by one, as a
/// single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub position_id: PositionId,
    /// The position's cap, for reporting how many choices remain.
    pub cap: u32,
    /// Votes for this position on the ballot once the mutation is applied.
    pub votes_for_position: u32,
}

/// Decide whether `voter` may vote for `candidate_id`.
///
/// Rules are checked in order and the first failure decides the denial:
///
/// 1. the candidate exists and runs for an existing position;
/// 2. the voter is not an administrator;
/// 3. the candidate is not already on the voter's ballot;
/// 4. the voter has not submitted their ballot;
/// 5. the voter has fewer votes for that position than its cap.
pub fn can_vote(
    voter: &Voter,
    candidate_id: CandidateId,
    election: &Election,
) -> Result<Admission, Denial> {
    let candidate = election
        .candidate(candidate_id)
        .ok_or(Denial::CandidateNotFound(candidate_id))?;
    let position = election
        .position(candidate.position_id)
        .ok_or(Denial::PositionNotFound(candidate.position_id))?;

    if voter.is_admin {
        return Err(Denial::AdminCannotVote);
    }
    if voter.ballot.contains(&candidate_id) {
        return Err(Denial::DuplicateVote);
    }
    if voter.has_voted {
        return Err(Denial::BallotSubmitted);
    }

    let already = election.votes_for(&voter.ballot, position.id);
    if already >= position.max_votes {
        return Err(Denial::PositionCapExceeded {
            cap: position.max_votes,
        });
    }

    Ok(Admission {
        voter_id: voter.id,
        candidate_id,
        position_id: position.id,
        cap: position.max_votes,
        votes_for_position: already + 1,
    })
}

/// Decide whether `voter` may declare themselves done voting.
pub fn can_submit(voter: &Voter) -> Result<(), Denial> {
    if voter.is_admin {
        Err(Denial::AdminCannotVote)
    } else {
        Ok(())
    }
}
