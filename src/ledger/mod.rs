//! The vote ledger: each voter's ballot plus every candidate's vote count,
//! always changed together.
//!
//! A candidate's count equals the number of ballots that include them. Every
//! [`Ledger`] operation applies its ballot and count changes as one unit, or
//! not at all.

use serde::Serialize;

use crate::error::Result;
use crate::model::common::{CandidateId, PositionId, VoterId};
use crate::voting::Denial;

mod memory;
mod mongo;

pub use memory::MemoryLedger;
pub use mongo::MongoLedger;

/// The outcome of an operation the voting rules may refuse.
pub type Admitted<T> = std::result::Result<T, Denial>;

/// What an admitted vote changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
    pub candidate_id: CandidateId,
    pub position_id: PositionId,
    /// Votes for the position on the ballot, including this one.
    pub votes_for_position: u32,
    pub cap: u32,
    /// Whether every position on the ballot is now full.
    pub complete: bool,
}

/// What a reset released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetReceipt {
    pub voter_id: VoterId,
    /// Candidates whose counts were decremented.
    pub released: Vec<CandidateId>,
}

#[rocket::async_trait]
pub trait Ledger: Send + Sync {
    /// Record a vote by `voter_id` for `candidate_id` if the voting rules
    /// allow it.
    ///
    /// Fails with a not-found error if the voter does not exist.
    async fn cast_vote(
        &self,
        voter_id: VoterId,
        candidate_id: CandidateId,
    ) -> Result<Admitted<VoteReceipt>>;

    /// Empty the voter's ballot, undo every count it contributed and clear
    /// their submission. Resetting an empty ballot changes nothing.
    async fn reset_vote(&self, voter_id: VoterId) -> Result<ResetReceipt>;

    /// Mark the voter's ballot as submitted. Submitting again is harmless.
    async fn submit_ballot(&self, voter_id: VoterId) -> Result<Admitted<()>>;
}
