use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::common::{category::PositionCategory, PositionId};

/// Core position data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCore {
    pub name: String,
    /// Ordering on the ballot, lowest first.
    pub display_order: u32,
    /// How many candidates a voter may choose for this position. At least 1,
    /// and fixed once the position exists.
    pub max_votes: u32,
    #[serde(default)]
    pub category: PositionCategory,
}

/// A position without an ID.
pub type NewPosition = PositionCore;

/// A position from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "_id")]
    pub id: PositionId,
    #[serde(flatten)]
    pub position: PositionCore,
}

impl Position {
    pub fn new(id: PositionId, position: PositionCore) -> Self {
        Self { id, position }
    }
}

impl Deref for Position {
    type Target = PositionCore;

    fn deref(&self) -> &Self::Target {
        &self.position
    }
}

impl DerefMut for Position {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.position
    }
}
