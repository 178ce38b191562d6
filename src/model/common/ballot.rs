use std::collections::BTreeSet;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use super::CandidateId;

/// The set of candidates a voter has voted for.
///
/// Membership is the source of truth for every candidate's vote count, so the
/// only ways to change a ballot are [`Ballot::insert`] and [`Ballot::clear`],
/// which the ledger pairs with the matching count updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ballot(BTreeSet<CandidateId>);

impl Ballot {
    /// Add a candidate. Returns false if they were already present.
    pub fn insert(&mut self, candidate: CandidateId) -> bool {
        self.0.insert(candidate)
    }

    /// Empty the ballot, returning every candidate that was on it.
    pub fn clear(&mut self) -> Vec<CandidateId> {
        std::mem::take(&mut self.0).into_iter().collect()
    }
}

impl Deref for Ballot {
    type Target = BTreeSet<CandidateId>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<CandidateId> for Ballot {
    fn from_iter<I: IntoIterator<Item = CandidateId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
