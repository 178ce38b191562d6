//! Aggregation of the ledger into results.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{
    common::{ballot::Ballot, category::PositionCategory, CandidateId, PartyListId, PositionId},
    db::party_list::PartyList,
};

use super::election::Election;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateStanding {
    pub candidate_id: CandidateId,
    pub name: String,
    pub party_list_id: PartyListId,
    pub vote_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionTally {
    pub position_id: PositionId,
    pub name: String,
    pub category: PositionCategory,
    pub max_votes: u32,
    /// Most votes first; ties broken by candidate ID.
    pub candidates: Vec<CandidateStanding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyTally {
    pub party_list_id: PartyListId,
    pub name: String,
    pub color: String,
    pub vote_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Turnout {
    /// Registered students; administrators are not voters.
    pub total_voters: u64,
    pub voted_count: u64,
    pub percentage: f64,
}

impl Turnout {
    pub fn new(total_voters: u64, voted_count: u64) -> Self {
        let percentage = if total_voters == 0 {
            0.0
        } else {
            voted_count as f64 * 100.0 / total_voters as f64
        };
        Self {
            total_voters,
            voted_count,
            percentage,
        }
    }
}

/// Full live results.
#[derive(Debug, Clone, Serialize)]
pub struct Tally {
    pub positions: Vec<PositionTally>,
    pub party_lists: Vec<PartyTally>,
    pub turnout: Turnout,
}

impl Tally {
    pub fn new(election: &Election, party_lists: &[PartyList], turnout: Turnout) -> Self {
        Self {
            positions: position_tallies(election),
            party_lists: party_tallies(election, party_lists),
            turnout,
        }
    }
}

/// Standings for every position, in ballot order.
pub fn position_tallies(election: &Election) -> Vec<PositionTally> {
    let mut positions: Vec<_> = election.positions().collect();
    positions.sort_by_key(|position| (position.display_order, position.id));

    positions
        .into_iter()
        .map(|position| {
            let mut candidates: Vec<CandidateStanding> = election
                .candidates()
                .filter(|candidate| candidate.position_id == position.id)
                .map(|candidate| CandidateStanding {
                    candidate_id: candidate.id,
                    name: candidate.name.clone(),
                    party_list_id: candidate.party_list_id,
                    vote_count: candidate.vote_count,
                })
                .collect();
            candidates.sort_by(|a, b| {
                b.vote_count
                    .cmp(&a.vote_count)
                    .then(a.candidate_id.cmp(&b.candidate_id))
            });
            PositionTally {
                position_id: position.id,
                name: position.name.clone(),
                category: position.category,
                max_votes: position.max_votes,
                candidates,
            }
        })
        .collect()
}

/// Sum of every party list's candidates' votes, in party list order.
pub fn party_tallies(election: &Election, party_lists: &[PartyList]) -> Vec<PartyTally> {
    let mut totals: HashMap<PartyListId, u64> = HashMap::new();
    for candidate in election.candidates() {
        *totals.entry(candidate.party_list_id).or_default() += u64::from(candidate.vote_count);
    }
    party_lists
        .iter()
        .map(|party| PartyTally {
            party_list_id: party.id,
            name: party.name.clone(),
            color: party.color.clone(),
            vote_count: totals.get(&party.id).copied().unwrap_or_default(),
        })
        .collect()
}

/// A candidate whose stored count disagrees with ballot membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub candidate_id: CandidateId,
    pub stored: u32,
    pub actual: u32,
}

/// Count how many ballots include each candidate.
pub fn actual_counts<'a>(
    ballots: impl IntoIterator<Item = &'a Ballot>,
) -> HashMap<CandidateId, u32> {
    let mut counts = HashMap::new();
    for candidate in ballots.into_iter().flat_map(|ballot| ballot.iter()) {
        *counts.entry(*candidate).or_insert(0) += 1;
    }
    counts
}

/// Compare every candidate's stored count with the ballots.
pub fn audit<'a>(
    election: &Election,
    ballots: impl IntoIterator<Item = &'a Ballot>,
) -> Vec<Discrepancy> {
    let actual = actual_counts(ballots);
    election
        .candidates()
        .filter_map(|candidate| {
            let actual = actual.get(&candidate.id).copied().unwrap_or_default();
            (candidate.vote_count != actual).then_some(Discrepancy {
                candidate_id: candidate.id,
                stored: candidate.vote_count,
                actual,
            })
        })
        .collect()
}
