use serde::{Deserialize, Serialize};

/// An entry of the global seasons list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: String,
}

/// Envelope used by the upstream list endpoints.
///
/// `items` stays optional so that a missing list can be reported as a
/// malformed response instead of a generic decode failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemList<T> {
    pub items: Option<Vec<T>>,
}
