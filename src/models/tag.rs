//! Player tags as issued by the upstream API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique player identifier, e.g. `#2PP`.
///
/// Tags usually start with `#`, so they must be percent-encoded before
/// being placed in a URL path.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerTag(String);

impl PlayerTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form, safe to use as a single path segment.
    pub fn encoded(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }
}

impl fmt::Display for PlayerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PlayerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerTag({})", self.0)
    }
}

impl From<String> for PlayerTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PlayerTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
