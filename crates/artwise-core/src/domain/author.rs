//! Commit authors and their three-letter initials.

use serde::{Deserialize, Serialize};

/// Character substituted for anything that is not an ASCII letter.
pub const INITIAL_PLACEHOLDER: char = 'x';

const MAX_INITIALS: usize = 3;

/// Person who triggered a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
        }
    }

    /// Initials of this author, `None` when the name is blank.
    pub fn initials(&self) -> Option<String> {
        let initials = initials_of(&self.name);
        if initials.is_empty() {
            None
        } else {
            Some(initials)
        }
    }
}

/// Derive initials from a display name.
///
/// Every name part but the last contributes its first character, the last
/// part contributes its first two. Non-letters become [`INITIAL_PLACEHOLDER`].
/// The result is lower-cased and cut to three characters.
pub fn initials_of(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    let last = parts.len().saturating_sub(1);

    parts
        .iter()
        .enumerate()
        .flat_map(|(index, part)| {
            let take = if index == last { 2 } else { 1 };
            part.chars().take(take)
        })
        .map(only_a_to_z)
        .flat_map(char::to_lowercase)
        .take(MAX_INITIALS)
        .collect()
}

fn only_a_to_z(c: char) -> char {
    if c.is_ascii_alphabetic() {
        c
    } else {
        INITIAL_PLACEHOLDER
    }
}
