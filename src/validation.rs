//! Field rules for poll input.
//!
//! The same limits are enforced by the poll forms on the client; these checks
//! are the authoritative copy.

use crate::actions::UpdatePollData;
use crate::error::PollError;
use crate::reconcile::OptionChanges;
use crate::service::CreatePollData;
use uuid::Uuid;

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 255;
pub const OPTION_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

fn invalid(message: &str) -> PollError {
    PollError::Validation(message.to_string())
}

fn too_many_options() -> PollError {
    PollError::Validation(format!("A poll can have at most {MAX_OPTIONS} options"))
}

fn check_fields(title: &str, description: &str, options: &[&str]) -> Result<(), PollError> {
    let title_chars = title.chars().count();
    if title_chars < TITLE_MIN_CHARS {
        return Err(PollError::Validation(format!(
            "Title must be at least {TITLE_MIN_CHARS} characters"
        )));
    }
    if title_chars > TITLE_MAX_CHARS {
        return Err(PollError::Validation(format!(
            "Title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    if description.chars().count() < DESCRIPTION_MIN_CHARS {
        return Err(PollError::Validation(format!(
            "Description must be at least {DESCRIPTION_MIN_CHARS} characters"
        )));
    }
    if options.iter().any(|o| o.chars().count() > OPTION_MAX_CHARS) {
        return Err(PollError::Validation(format!(
            "Options must be at most {OPTION_MAX_CHARS} characters"
        )));
    }
    if options.len() > MAX_OPTIONS {
        return Err(too_many_options());
    }
    Ok(())
}

/// Returns the cleaned poll: trimmed title and description, blank options dropped.
pub fn validate_new_poll(data: &CreatePollData) -> Result<CreatePollData, PollError> {
    let title = data.title.trim();
    let description = data.description.trim();

    if title.is_empty() || description.is_empty() || data.options.len() < MIN_OPTIONS {
        return Err(invalid(
            "Title, description, and at least 2 options are required",
        ));
    }

    let options: Vec<String> = data
        .options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    if options.len() < MIN_OPTIONS {
        return Err(invalid("You must have at least 2 valid options"));
    }

    let texts: Vec<&str> = options.iter().map(String::as_str).collect();
    check_fields(title, description, &texts)?;

    Ok(CreatePollData {
        title: title.to_string(),
        description: description.to_string(),
        options,
    })
}

/// The surviving-option count is checked before anything else so that an edit
/// leaving fewer than two options is always reported as such. Survivors are
/// counted after deletions and before additions.
pub fn validate_poll_update(data: &UpdatePollData) -> Result<(), PollError> {
    let surviving = data.options.iter().filter(|o| o.survives()).count();
    if surviving < MIN_OPTIONS {
        return Err(invalid("You must have at least 2 valid options"));
    }

    let title = data.title.trim();
    let description = data.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(invalid("Title and description are required"));
    }

    let kept: Vec<&str> = data
        .options
        .iter()
        .filter(|o| o.is_kept())
        .map(|o| o.text.trim())
        .collect();
    check_fields(title, description, &kept)
}

/// Checks planned option changes against the ids stored for the poll. Options
/// left out of the edit stay stored, so they count towards both limits.
pub fn validate_against_stored(changes: &OptionChanges, stored: &[Uuid]) -> Result<(), PollError> {
    let foreign = changes
        .updates
        .iter()
        .map(|u| &u.id)
        .chain(changes.deletes.iter())
        .any(|id| !stored.contains(id));
    if foreign {
        return Err(invalid("One or more options do not belong to this poll"));
    }

    let remaining = stored
        .iter()
        .filter(|id| !changes.deletes.contains(id))
        .count();
    if remaining < MIN_OPTIONS {
        return Err(invalid("You must have at least 2 valid options"));
    }
    if remaining + changes.inserts.len() > MAX_OPTIONS {
        return Err(too_many_options());
    }
    Ok(())
}
