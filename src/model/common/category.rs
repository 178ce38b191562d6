use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The group a position is listed under on the ballot.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PositionCategory {
    #[default]
    Executive,
    Legislative,
    Departmental,
}

impl From<PositionCategory> for Bson {
    fn from(category: PositionCategory) -> Self {
        to_bson(&category).expect("Serialisation is infallible")
    }
}
