//! Diffing an edited option list against the stored options of a poll.
//!
//! The editor sends back every option it showed, each flagged as kept, new or
//! deleted. [`plan_option_changes`] turns that list into the three batches the
//! store applies: text updates, inserts and deletes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One option as submitted by the poll editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPollOption {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub poll_id: Option<Uuid>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

impl EditPollOption {
    /// An already stored option that is kept by the edit, with usable text.
    /// New options are not survivors.
    pub fn survives(&self) -> bool {
        self.existing_id().is_some() && self.is_kept()
    }

    /// Not deleted and not blank, whether stored or new.
    pub fn is_kept(&self) -> bool {
        !self.is_deleted && !self.text.trim().is_empty()
    }

    pub fn existing_id(&self) -> Option<Uuid> {
        if self.is_new { None } else { self.id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionUpdate {
    pub id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionChanges {
    pub updates: Vec<OptionUpdate>,
    pub inserts: Vec<String>,
    pub deletes: Vec<Uuid>,
}

impl OptionChanges {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty() && self.deletes.is_empty()
    }
}

/// Blank surviving entries are skipped: a blank existing option keeps its
/// stored text and a blank new option is not inserted. An entry with no id is
/// treated as new whether or not it is flagged.
pub fn plan_option_changes(options: &[EditPollOption]) -> OptionChanges {
    let mut changes = OptionChanges::default();

    for option in options {
        if option.is_deleted {
            if let Some(id) = option.existing_id() {
                changes.deletes.push(id);
            }
            continue;
        }

        let text = option.text.trim();
        if text.is_empty() {
            continue;
        }

        match option.existing_id() {
            Some(id) => changes.updates.push(OptionUpdate {
                id,
                text: text.to_string(),
            }),
            None => changes.inserts.push(text.to_string()),
        }
    }

    changes
}
