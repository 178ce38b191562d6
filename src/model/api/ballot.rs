use serde::Serialize;

use crate::model::{
    common::{category::PositionCategory, CandidateId, PositionId},
    db::voter::Voter,
};
use crate::voting::{is_complete, remaining, Election};

/// A voter's progress on one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionProgress {
    pub position_id: PositionId,
    pub name: String,
    pub category: PositionCategory,
    pub max_votes: u32,
    /// Candidates chosen for this position.
    pub chosen: Vec<CandidateId>,
    pub remaining: u32,
}

/// Everything a voter needs to see about their own ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BallotStatus {
    pub ballot: Vec<CandidateId>,
    pub has_voted: bool,
    pub complete: bool,
    /// In ballot order.
    pub positions: Vec<PositionProgress>,
}

impl BallotStatus {
    pub fn new(voter: &Voter, election: &Election) -> Self {
        let mut positions: Vec<_> = election.positions().collect();
        positions.sort_by_key(|position| (position.display_order, position.id));
        let positions = positions
            .into_iter()
            .map(|position| PositionProgress {
                position_id: position.id,
                name: position.name.clone(),
                category: position.category,
                max_votes: position.max_votes,
                chosen: voter
                    .ballot
                    .iter()
                    .copied()
                    .filter(|id| {
                        election
                            .candidate(*id)
                            .map_or(false, |candidate| candidate.position_id == position.id)
                    })
                    .collect(),
                remaining: remaining(&voter.ballot, position, election),
            })
            .collect();

        Self {
            ballot: voter.ballot.iter().copied().collect(),
            has_voted: voter.has_voted,
            complete: is_complete(&voter.ballot, election),
            positions,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::db::{
        candidate::{Candidate, CandidateCore},
        position::{Position, PositionCore},
        voter::VoterCore,
    };

    use super::*;

    #[test]
    fn progress_per_position() {
        let election = Election::new(
            [
                Position::new(1, PositionCore::example("Senator", 2, 2)),
                Position::new(2, PositionCore::example("President", 1, 1)),
            ],
            [
                Candidate::new(1, CandidateCore::example("A", 2, 1)),
                Candidate::new(3, CandidateCore::example("C", 1, 1)),
            ],
        );
        let mut voter = Voter::new(1, VoterCore::example());
        voter.ballot.insert(1);
        voter.ballot.insert(3);

        let status = BallotStatus::new(&voter, &election);
        assert!(!status.complete);
        assert_eq!(status.ballot, vec![1, 3]);
        assert_eq!(status.positions[0].name, "President");
        assert_eq!(status.positions[0].chosen, vec![1]);
        assert_eq!(status.positions[0].remaining, 0);
        assert_eq!(status.positions[1].chosen, vec![3]);
        assert_eq!(status.positions[1].remaining, 1);
    }
}
