use std::collections::BTreeMap;

use crate::model::{
    common::{ballot::Ballot, CandidateId, PositionId},
    db::{candidate::Candidate, position::Position},
};

/// A read-only snapshot of the election configuration: every position and
/// every candidate, indexed by ID.
#[derive(Debug, Clone, Default)]
pub struct Election {
    positions: BTreeMap<PositionId, Position>,
    candidates: BTreeMap<CandidateId, Candidate>,
}

impl Election {
    pub fn new(
        positions: impl IntoIterator<Item = Position>,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Self {
        Self {
            positions: positions.into_iter().map(|p| (p.id, p)).collect(),
            candidates: candidates.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.get(&id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.values()
    }

    /// How many entries on `ballot` are for candidates running for `position`.
    ///
    /// Entries naming candidates that no longer exist belong to no position.
    pub fn votes_for(&self, ballot: &Ballot, position: PositionId) -> u32 {
        let count = ballot
            .iter()
            .filter_map(|id| self.candidate(*id))
            .filter(|candidate| candidate.position_id == position)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}
