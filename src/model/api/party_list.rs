use serde::{Deserialize, Serialize};

use crate::model::{
    common::PartyListId,
    db::party_list::{NewPartyList, PartyList, PartyListCore},
};

/// Is `color` of the form `#RRGGBB`?
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyListSpec {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub platform_image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl PartyListSpec {
    pub fn into_party_list(self) -> Result<NewPartyList, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Party list name is required".to_string());
        }
        let mut party_list = NewPartyList::new(name);
        if let Some(color) = self.color {
            if !is_hex_color(&color) {
                return Err(format!("Invalid color {color:?}"));
            }
            party_list.color = color;
        }
        party_list.logo_url = self.logo_url;
        party_list.platform_image_url = self.platform_image_url;
        party_list.images = self.images;
        Ok(party_list)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartyListPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub logo_url: Option<String>,
    pub platform_image_url: Option<String>,
}

/// Image URLs to append to a party list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrls {
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyListView {
    pub id: PartyListId,
    #[serde(flatten)]
    pub party_list: PartyListCore,
}

impl From<PartyList> for PartyListView {
    fn from(party_list: PartyList) -> Self {
        Self {
            id: party_list.id,
            party_list: party_list.party_list,
        }
    }
}
