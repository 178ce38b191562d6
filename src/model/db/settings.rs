use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

/// The `_id` of the one and only settings document.
pub const SETTINGS_ID: &str = "system";

pub const DEFAULT_SPLASH_LOGO_URL: &str =
    "https://images.unsplash.com/photo-1580982773321-5c9f15ea8559?w=128&h=128&fit=crop";

/// Site-wide branding. There is exactly one of these, created at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    #[serde(default)]
    pub left_logo_url: String,
    #[serde(default)]
    pub right_logo_url: String,
    #[serde(default)]
    pub splash_logo_url: String,
    #[serde(default)]
    pub voting_logo_url: String,
}

impl SystemSettings {
    /// Filter matching the settings document.
    pub fn filter() -> Document {
        doc! { "_id": SETTINGS_ID }
    }
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            left_logo_url: String::new(),
            right_logo_url: String::new(),
            splash_logo_url: DEFAULT_SPLASH_LOGO_URL.to_string(),
            voting_logo_url: String::new(),
        }
    }
}
