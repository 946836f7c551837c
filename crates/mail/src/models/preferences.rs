//! Draft generation preferences, persisted in the config directory

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Preferences filename in the config directory
const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftTone {
    #[default]
    Professional,
    Casual,
    Friendly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// User preferences for generated drafts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPreferences {
    #[serde(default)]
    pub tone: DraftTone,
    #[serde(default)]
    pub length: DraftLength,
    /// Free-form context to consider when drafting
    #[serde(default)]
    pub context: String,
    /// Draft replies automatically when a message is opened
    #[serde(default = "default_true")]
    pub auto_draft: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DraftPreferences {
    fn default() -> Self {
        Self {
            tone: DraftTone::default(),
            length: DraftLength::default(),
            context: String::new(),
            auto_draft: true,
        }
    }
}

impl DraftPreferences {
    /// Load saved preferences, or defaults when none were saved
    pub fn load() -> Result<Self> {
        if config::config_exists(PREFERENCES_FILE) {
            config::load_json(PREFERENCES_FILE)
        } else {
            Ok(Self::default())
        }
    }

    /// Load preferences from a specific file, or defaults when it is absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            config::load_json_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist preferences to the config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(PREFERENCES_FILE, self)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        config::save_json_file(path, self)
    }
}
