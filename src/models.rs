mod ids;
mod reference_db;
mod taxonomy_record;

pub use ids::{CatalogId, ReferenceDbId};
pub use reference_db::ReferenceDatabase;
pub use taxonomy_record::TaxonomyRecord;
