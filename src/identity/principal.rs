use serde::{Deserialize, Serialize};

/// The authenticated owner of a request. Every owner-scoped read or write is
/// filtered by `id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

impl Subject {
    pub fn new<S: Into<String>>(id: i64, name: S) -> Self {
        Self { id, name: name.into() }
    }
}
