use serde::{Deserialize, Serialize};

use crate::model::{
    common::{category::PositionCategory, PositionId},
    db::position::{NewPosition, Position, PositionCore},
};

fn one() -> u32 {
    1
}

/// A position to create. Its display order is assigned on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSpec {
    pub name: String,
    #[serde(default = "one")]
    pub max_votes: u32,
    #[serde(default)]
    pub category: PositionCategory,
}

impl PositionSpec {
    pub fn into_position(self, display_order: u32) -> Result<NewPosition, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Position name is required".to_string());
        }
        if self.max_votes == 0 {
            return Err("A position must allow at least one vote".to_string());
        }
        Ok(NewPosition {
            name: name.to_string(),
            display_order,
            max_votes: self.max_votes,
            category: self.category,
        })
    }
}

/// Changes to a position. The cap is fixed at creation, so it is not
/// accepted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositionPatch {
    pub name: Option<String>,
    pub category: Option<PositionCategory>,
    pub display_order: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionView {
    pub id: PositionId,
    #[serde(flatten)]
    pub position: PositionCore,
}

impl From<Position> for PositionView {
    fn from(position: Position) -> Self {
        Self {
            id: position.id,
            position: position.position,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl PositionSpec {
        pub fn example(name: &str, max_votes: u32) -> Self {
            Self {
                name: name.to_string(),
                max_votes,
                category: PositionCategory::Executive,
            }
        }
    }
}
