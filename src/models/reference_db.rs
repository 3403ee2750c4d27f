use serde::{Deserialize, Serialize};

use super::ids::ReferenceDbId;

/// A whole-reference-database release known to the catalog store.
///
/// Multiple versions of the same named database may coexist; "latest" is the
/// row with the highest version value for a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDatabase {
    pub id: ReferenceDbId,
    pub name: String,
    pub version: String,
}

impl ReferenceDatabase {
    pub fn new(id: ReferenceDbId, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: version.into(),
        }
    }
}
