use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// A partial update of the system settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPatch {
    pub left_logo_url: Option<String>,
    pub right_logo_url: Option<String>,
    pub splash_logo_url: Option<String>,
    pub voting_logo_url: Option<String>,
}

impl SettingsPatch {
    /// The `$set` body for the given fields, or `None` if nothing changes.
    pub fn to_set(&self) -> Option<Document> {
        let mut set = Document::new();
        let fields = [
            ("left_logo_url", &self.left_logo_url),
            ("right_logo_url", &self.right_logo_url),
            ("splash_logo_url", &self.splash_logo_url),
            ("voting_logo_url", &self.voting_logo_url),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                set.insert(key, value.clone());
            }
        }
        (!set.is_empty()).then_some(set)
    }
}
