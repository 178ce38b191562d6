use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::common::PartyListId;

pub const DEFAULT_PARTY_COLOR: &str = "#0088FE";

fn default_color() -> String {
    DEFAULT_PARTY_COLOR.to_string()
}

/// Core party list data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyListCore {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub platform_image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl PartyListCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: default_color(),
            logo_url: None,
            platform_image_url: None,
            images: Vec::new(),
        }
    }
}

/// A party list without an ID.
pub type NewPartyList = PartyListCore;

/// A party list from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyList {
    #[serde(rename = "_id")]
    pub id: PartyListId,
    #[serde(flatten)]
    pub party_list: PartyListCore,
}

impl PartyList {
    pub fn new(id: PartyListId, party_list: PartyListCore) -> Self {
        Self { id, party_list }
    }
}

impl Deref for PartyList {
    type Target = PartyListCore;

    fn deref(&self) -> &Self::Target {
        &self.party_list
    }
}

impl DerefMut for PartyList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.party_list
    }
}
