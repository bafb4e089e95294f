//! Group documents consulted during authorization.

use serde::{Deserialize, Serialize};

use super::quiz::Difficulty;

/// Stored group document.
///
/// Older documents carry `createdByUid` instead of `adminUid`; both are
/// accepted when checking admin rights.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupDoc {
    #[serde(default)]
    pub admin_uid: Option<String>,

    #[serde(default)]
    pub created_by_uid: Option<String>,

    /// The year the group is currently reliving
    #[serde(default)]
    pub current_year: Option<i32>,

    #[serde(default)]
    pub settings: GroupSettings,
}

impl GroupDoc {
    /// Effective admin uid, preferring the explicit field.
    pub fn admin(&self) -> Option<&str> {
        self.admin_uid
            .as_deref()
            .or(self.created_by_uid.as_deref())
    }

    /// Effective quiz difficulty for the group.
    pub fn difficulty(&self) -> Difficulty {
        Difficulty::normalize(self.settings.quiz_difficulty.as_deref())
    }
}

/// Per-group settings blob.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupSettings {
    #[serde(default)]
    pub quiz_difficulty: Option<String>,
}
