pub mod db;
pub mod fasta;
pub mod ingest;
pub mod models;
pub mod queue;
pub mod taxonomy;
pub mod translator;

pub use db::Database;
pub use models::{CatalogId, ReferenceDatabase, ReferenceDbId, TaxonomyRecord};
pub use translator::{TranslateError, Translator};
