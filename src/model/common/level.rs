use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The school division a student belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolLevel {
    Elementary,
    JuniorHigh,
    SeniorHigh,
}

impl From<SchoolLevel> for Bson {
    fn from(level: SchoolLevel) -> Self {
        to_bson(&level).expect("Serialisation is infallible")
    }
}

/// A student's grade, from 3 to 12 inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GradeLevel(u8);

impl GradeLevel {
    pub const LOWEST: u8 = 3;
    pub const HIGHEST: u8 = 12;

    pub fn new(grade: u8) -> Option<Self> {
        (Self::LOWEST..=Self::HIGHEST)
            .contains(&grade)
            .then_some(Self(grade))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<String> for GradeLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| format!("Invalid grade level: {value:?}"))
    }
}

impl From<GradeLevel> for String {
    fn from(grade: GradeLevel) -> Self {
        grade.to_string()
    }
}

impl Display for GradeLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<GradeLevel> for Bson {
    fn from(grade: GradeLevel) -> Self {
        Bson::String(grade.to_string())
    }
}
