use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a sequence record in the local catalog.
///
/// Wraps a database ID to provide type safety and prevent accidental
/// mixing with reference-database IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(i64);

impl CatalogId {
    /// Creates a new catalog ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying ID value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a whole-reference-database release (e.g. SILVA 13.2).
///
/// Wraps a database ID to provide type safety and prevent accidental
/// mixing with catalog IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceDbId(i64);

impl ReferenceDbId {
    /// Creates a new reference-database ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying ID value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ReferenceDbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
