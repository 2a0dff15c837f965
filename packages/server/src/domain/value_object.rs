//! Value objects bound to a connection or carried in a chat message.

use std::fmt;

use crate::config::{DEFAULT_AUTHOR, DEFAULT_ROOM_NAME};

use super::error::ValidationError;

/// Name of a room; the registry key.
///
/// Blank names resolve to [`DEFAULT_ROOM_NAME`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomName(String);

impl RoomName {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            Self(DEFAULT_ROOM_NAME.to_string())
        } else if trimmed.len() == name.len() {
            Self(name)
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn from_optional(name: Option<&str>) -> Self {
        Self::new(name.unwrap_or_default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for RoomName {
    fn default() -> Self {
        Self(DEFAULT_ROOM_NAME.to_string())
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied display name of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    /// Blank names resolve to [`DEFAULT_AUTHOR`].
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            Self(DEFAULT_AUTHOR.to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn from_optional(name: Option<&str>) -> Self {
        Self::new(name.unwrap_or_default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DisplayName {
    fn default() -> Self {
        Self(DEFAULT_AUTHOR.to_string())
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitized chat text: trimmed, non-empty and at most `max_len` code points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatText(String);

impl ChatText {
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let actual = trimmed.chars().count();
        if actual > max_len {
            return Err(ValidationError::TextTooLong {
                max: max_len,
                actual,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
