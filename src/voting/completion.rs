use crate::model::{common::ballot::Ballot, db::position::Position};

use super::election::Election;

/// Has the voter filled every position up to its cap?
///
/// Vacuously true when there are no positions.
pub fn is_complete(ballot: &Ballot, election: &Election) -> bool {
    election
        .positions()
        .all(|position| remaining(ballot, position, election) == 0)
}

/// How many more candidates the voter may choose for `position`.
pub fn remaining(ballot: &Ballot, position: &Position, election: &Election) -> u32 {
    position
        .max_votes
        .saturating_sub(election.votes_for(ballot, position.id))
}
