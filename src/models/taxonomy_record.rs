use serde::{Deserialize, Serialize};

use super::ids::ReferenceDbId;

/// Stored taxonomy for one accession in one reference database.
///
/// `name` is the deepest informative rank from the source header; `species`
/// is the same label when that rank was the terminal (species-level) rank,
/// and the empty string otherwise. Empty string, not absence, is the
/// unresolved representation throughout the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyRecord {
    pub accession_id: String,
    pub db_id: ReferenceDbId,
    pub name: String,
    pub full_header: String,
    pub species: String,
}

impl TaxonomyRecord {
    /// True when the record carries a species-level label.
    pub fn has_species(&self) -> bool {
        !self.species.is_empty()
    }
}
