use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use log::{debug, info};
use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    common::{CandidateId, VoterId},
    db::voter::Voter,
};
use crate::voting::{can_submit, can_vote, is_complete, tally::actual_counts, Election};

use super::{Admitted, Ledger, ResetReceipt, VoteReceipt};

/// A ledger held in process memory, over a fixed election.
///
/// Each voter record sits behind its own async mutex, which serialises the
/// check-then-append for that voter. Counts are independent atomics, so votes
/// by different voters never wait on each other.
pub struct MemoryLedger {
    election: Election,
    counts: HashMap<CandidateId, AtomicU32>,
    voters: HashMap<VoterId, Arc<Mutex<Voter>>>,
}

impl MemoryLedger {
    /// Counts start from the voters' existing ballots.
    pub fn new(election: Election, voters: impl IntoIterator<Item = Voter>) -> Self {
        let voters: HashMap<_, _> = voters
            .into_iter()
            .map(|voter| (voter.id, voter))
            .collect();
        let actual = actual_counts(voters.values().map(|voter| &voter.ballot));
        let counts = election
            .candidates()
            .map(|candidate| {
                let count = actual.get(&candidate.id).copied().unwrap_or_default();
                (candidate.id, AtomicU32::new(count))
            })
            .collect();
        let voters = voters
            .into_iter()
            .map(|(id, voter)| (id, Arc::new(Mutex::new(voter))))
            .collect();
        Self {
            election,
            counts,
            voters,
        }
    }

    pub fn vote_count(&self, candidate_id: CandidateId) -> Option<u32> {
        self.counts
            .get(&candidate_id)
            .map(|count| count.load(Ordering::SeqCst))
    }

    /// A copy of the voter's current record.
    pub async fn voter(&self, voter_id: VoterId) -> Option<Voter> {
        let voter = self.voters.get(&voter_id)?;
        let voter = voter.lock().await;
        Some(voter.clone())
    }

    fn slot(&self, voter_id: VoterId) -> Result<&Arc<Mutex<Voter>>> {
        self.voters
            .get(&voter_id)
            .ok_or_else(|| Error::not_found(format!("Voter {voter_id}")))
    }
}

#[rocket::async_trait]
impl Ledger for MemoryLedger {
    async fn cast_vote(
        &self,
        voter_id: VoterId,
        candidate_id: CandidateId,
    ) -> Result<Admitted<VoteReceipt>> {
        let mut voter = self.slot(voter_id)?.lock().await;
        let admission = match can_vote(&voter, candidate_id, &self.election) {
            Ok(admission) => admission,
            Err(denial) => {
                debug!("Vote by {voter_id} for candidate {candidate_id} denied: {denial}");
                return Ok(Err(denial));
            }
        };
        voter.ballot.insert(candidate_id);
        if let Some(count) = self.counts.get(&candidate_id) {
            count.fetch_add(1, Ordering::SeqCst);
        }
        info!("Voter {voter_id} voted for candidate {candidate_id}");

        Ok(Ok(VoteReceipt {
            candidate_id,
            position_id: admission.position_id,
            votes_for_position: admission.votes_for_position,
            cap: admission.cap,
            complete: is_complete(&voter.ballot, &self.election),
        }))
    }

    async fn reset_vote(&self, voter_id: VoterId) -> Result<ResetReceipt> {
        let mut voter = self.slot(voter_id)?.lock().await;
        let released = voter.ballot.clear();
        for candidate_id in &released {
            if let Some(count) = self.counts.get(candidate_id) {
                // Never wraps below zero.
                let _ = count.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            }
        }
        voter.has_voted = false;
        info!(
            "Reset ballot of voter {voter_id}, releasing {} vote(s)",
            released.len()
        );
        Ok(ResetReceipt { voter_id, released })
    }

    async fn submit_ballot(&self, voter_id: VoterId) -> Result<Admitted<()>> {
        let mut voter = self.slot(voter_id)?.lock().await;
        if let Err(denial) = can_submit(&voter) {
            debug!("Submission by {voter_id} denied: {denial}");
            return Ok(Err(denial));
        }
        voter.has_voted = true;
        Ok(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use rocket::futures::future::join_all;

    use crate::model::db::{
        candidate::{Candidate, CandidateCore},
        position::{Position, PositionCore},
        voter::VoterCore,
    };
    use crate::voting::{tally::audit, Denial};

    use super::*;

    fn election() -> Election {
        Election::new(
            [
                Position::new(1, PositionCore::example("President", 1, 1)),
                Position::new(2, PositionCore::example("Senator", 2, 2)),
            ],
            (1..=5).map(|id| {
                let position = if id <= 2 { 1 } else { 2 };
                Candidate::new(id, CandidateCore::example(&format!("C{id}"), position, 1))
            }),
        )
    }

    fn students(n: u32) -> impl Iterator<Item = Voter> {
        (1..=n).map(|id| {
            Voter::new(
                id,
                VoterCore::student(format!("2024-{id:05}"), format!("Student {id}"), None, None),
            )
        })
    }

    /// Check every count against ballot membership.
    async fn assert_consistent(ledger: &MemoryLedger) {
        let mut ballots = Vec::new();
        for id in ledger.voters.keys() {
            ballots.push(ledger.voter(*id).await.unwrap().voter.ballot);
        }
        let stored = Election::new(
            ledger.election.positions().cloned(),
            ledger.election.candidates().map(|candidate| {
                let mut candidate = candidate.clone();
                candidate.vote_count = ledger.vote_count(candidate.id).unwrap();
                candidate
            }),
        );
        assert!(audit(&stored, &ballots).is_empty());
    }

    #[rocket::async_test]
    async fn concurrent_casts_by_one_voter_respect_cap() {
        // Denials are logged; show them when this fails.
        log4rs_test_utils::test_logging::init_logging_once_for(["schoolvote_backend"], None, None);

        let ledger = MemoryLedger::new(election(), students(1));

        let outcomes = join_all((3..=5).map(|id| ledger.cast_vote(1, id))).await;
        let admitted = outcomes.iter().filter(|o| matches!(o, Ok(Ok(_)))).count();
        let capped = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(Err(Denial::PositionCapExceeded { cap: 2 }))))
            .count();
        assert_eq!((admitted, capped), (2, 1));
        assert_eq!(ledger.voter(1).await.unwrap().ballot.len(), 2);
        assert_consistent(&ledger).await;
    }

    #[rocket::async_test]
    async fn concurrent_casts_by_many_voters_all_count() {
        let ledger = MemoryLedger::new(election(), students(50));

        let outcomes = join_all((1..=50).map(|voter| ledger.cast_vote(voter, 1))).await;
        assert!(outcomes.iter().all(|o| matches!(o, Ok(Ok(_)))));
        assert_eq!(ledger.vote_count(1), Some(50));
        assert_consistent(&ledger).await;
    }

    #[rocket::async_test]
    async fn reset_round_trip() {
        let ledger = MemoryLedger::new(election(), students(2));
        ledger.cast_vote(1, 1).await.unwrap().unwrap();
        ledger.cast_vote(1, 3).await.unwrap().unwrap();
        ledger.cast_vote(2, 3).await.unwrap().unwrap();
        assert_eq!(ledger.submit_ballot(1).await.unwrap(), Ok(()));

        let receipt = ledger.reset_vote(1).await.unwrap();
        assert_eq!(receipt.released, vec![1, 3]);
        assert_eq!(ledger.vote_count(1), Some(0));
        assert_eq!(ledger.vote_count(3), Some(1));
        let voter = ledger.voter(1).await.unwrap();
        assert!(voter.ballot.is_empty());
        assert!(!voter.has_voted);

        // Idempotent.
        assert!(ledger.reset_vote(1).await.unwrap().released.is_empty());
        assert_eq!(ledger.vote_count(3), Some(1));
        assert_consistent(&ledger).await;
    }

    #[rocket::async_test]
    async fn complete_after_last_position_is_filled() {
        let ledger = MemoryLedger::new(election(), students(1));
        assert!(!ledger.cast_vote(1, 2).await.unwrap().unwrap().complete);
        assert!(!ledger.cast_vote(1, 4).await.unwrap().unwrap().complete);
        assert!(ledger.cast_vote(1, 5).await.unwrap().unwrap().complete);
    }

    #[rocket::async_test]
    async fn submitted_ballot_refuses_new_votes() {
        let ledger = MemoryLedger::new(election(), students(1));
        ledger.submit_ballot(1).await.unwrap().unwrap();
        assert_eq!(
            ledger.cast_vote(1, 1).await.unwrap(),
            Err(Denial::BallotSubmitted)
        );
        assert_eq!(ledger.vote_count(1), Some(0));
    }

    #[rocket::async_test]
    async fn unknown_voter_is_not_found() {
        let ledger = MemoryLedger::new(election(), students(1));
        assert!(matches!(
            ledger.cast_vote(9, 1).await,
            Err(Error::Status(status, _)) if status == rocket::http::Status::NotFound
        ));
        assert!(ledger.reset_vote(9).await.is_err());
    }

    #[rocket::async_test]
    async fn existing_ballots_seed_counts() {
        let mut voter = students(1).next().unwrap();
        voter.ballot.insert(4);
        let ledger = MemoryLedger::new(election(), [voter]);
        assert_eq!(ledger.vote_count(4), Some(1));
        assert_eq!(ledger.vote_count(3), Some(0));
    }
}
