use std::collections::BTreeSet;

use rusqlite::{OptionalExtension, params};
use thiserror::Error;
use tracing::debug;

use crate::db::Database;
use crate::models::{CatalogId, ReferenceDatabase, ReferenceDbId, TaxonomyRecord};

/// Shortest fragment accepted by [`Translator::match_fragment`].
pub const MIN_FRAGMENT_LEN: usize = 100;

/// Errors surfaced by translator operations.
///
/// Not-found conditions are empty results, never errors; validation errors
/// are returned before any store access; store faults are caught at the
/// failing call and carried here as a readable message.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("sequence too short. must be at least 100bp: {0}")]
    FragmentTooShort(String),

    #[error("reference database {0} not found")]
    UnknownDatabase(String),

    #[error("malformed catalog id list in sequence index: {0}")]
    InvalidIndexEntry(String),

    #[error("database error {0}")]
    Store(#[from] rusqlite::Error),
}

/// How a query fragment is compared against stored reference sequences.
///
/// Selects one of the fixed query templates; query text is never assembled
/// from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The stored sequence equals the fragment.
    Exact,
    /// The stored sequence starts with the fragment (left-anchored).
    Prefix,
}

impl MatchMode {
    fn query(self) -> &'static str {
        match self {
            Self::Exact => {
                "SELECT accession_id, region FROM reference_sequences WHERE sequence = ?1"
            }
            Self::Prefix => {
                "SELECT accession_id, region FROM reference_sequences WHERE sequence LIKE ?1"
            }
        }
    }

    fn parameter(self, fragment: &str) -> String {
        match self {
            Self::Exact => fragment.to_string(),
            Self::Prefix => format!("{fragment}%"),
        }
    }
}

const LINKS_BY_ACCESSION: &str =
    "SELECT catalog_id FROM accession_links WHERE accession_id = ?1";
const LINKS_BY_ACCESSION_AND_DB: &str =
    "SELECT catalog_id FROM accession_links WHERE accession_id = ?1 AND db_id = ?2";
const FAST_INDEX_LOOKUP: &str =
    "SELECT catalog_ids FROM sequence_index WHERE sequence LIKE ?1 LIMIT 1";

/// Query-time engine resolving between fragments, reference-database
/// accessions, catalog IDs and species labels.
///
/// Owns the catalog store connection; one instance serves one logical
/// request stream. Cross-instance coordination is delegated entirely to the
/// store's transaction discipline.
pub struct Translator {
    db: Database,
}

impl Translator {
    /// Creates a new translator over the given catalog store.
    ///
    /// Takes ownership of the database instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use seqtrans::{Database, Translator};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let db = Database::in_memory()?;
    /// let translator = Translator::new(db);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Finds the accession IDs of all reference sequences matching a query
    /// fragment.
    ///
    /// In the default (non-exact) mode a reference row matches when its
    /// stored sequence starts with the fragment; in exact mode the stored
    /// sequence must equal it. Fragments shorter than 100 characters are
    /// rejected before the store is touched. When a primer region is given,
    /// rows recorded under a different region are excluded post-match.
    ///
    /// The result is a set: no match yields an empty vec and ordering
    /// carries no meaning.
    ///
    /// # Examples
    ///
    /// ```
    /// use seqtrans::{Database, Translator};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let translator = Translator::new(Database::in_memory()?);
    ///
    /// // Short fragments are rejected outright
    /// let err = translator.match_fragment("acgt", None, false).unwrap_err();
    /// assert!(err.to_string().contains("too short"));
    ///
    /// // An unmatched (but valid) fragment is an empty result, not an error
    /// let fragment = "acgt".repeat(30);
    /// assert!(translator.match_fragment(&fragment, None, false)?.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub fn match_fragment(
        &self,
        fragment: &str,
        region: Option<&str>,
        exact: bool,
    ) -> Result<Vec<String>, TranslateError> {
        if fragment.len() < MIN_FRAGMENT_LEN {
            return Err(TranslateError::FragmentTooShort(fragment.to_string()));
        }
        let fragment = fragment.to_lowercase();
        let region = region.map(str::to_lowercase);

        let mode = if exact {
            MatchMode::Exact
        } else {
            MatchMode::Prefix
        };
        debug!(?mode, "looking for fragment matches");

        let conn = self.db.connection();
        let mut stmt = conn.prepare(mode.query())?;
        let rows = stmt.query_map([mode.parameter(&fragment)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
            ))
        })?;

        let mut accessions = Vec::new();
        for row in rows {
            let (accession_id, row_region) = row?;
            if let Some(ref wanted) = region
                && row_region.as_deref() != Some(wanted.as_str())
            {
                continue;
            }
            accessions.push(accession_id);
        }
        debug!(count = accessions.len(), "matches with correct region");
        Ok(accessions)
    }

    /// Resolves accession IDs to catalog IDs through the authoritative
    /// mapping table (the slow path).
    ///
    /// Returns one de-duplicated list per input accession, aligned to input
    /// order; unmatched accessions yield an empty list. When `db_name` is
    /// given without a version, the highest version on record is used; an
    /// unknown name is an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use seqtrans::{Database, Translator};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let translator = Translator::new(Database::in_memory()?);
    ///
    /// let resolved =
    ///     translator.resolve_accessions(&["jq782411".to_string()], None, None)?;
    /// assert_eq!(resolved.len(), 1);
    /// assert!(resolved[0].is_empty(), "unmatched accession resolves to nothing");
    /// # Ok(())
    /// # }
    /// ```
    pub fn resolve_accessions(
        &self,
        accessions: &[String],
        db_name: Option<&str>,
        db_version: Option<&str>,
    ) -> Result<Vec<Vec<CatalogId>>, TranslateError> {
        let db_id = match db_name {
            Some(name) => Some(self.reference_db_id(name, db_version)?),
            None => None,
        };
        debug!(?db_id, count = accessions.len(), "resolving accessions");

        let conn = self.db.connection();
        let mut stmt = match db_id {
            Some(_) => conn.prepare(LINKS_BY_ACCESSION_AND_DB)?,
            None => conn.prepare(LINKS_BY_ACCESSION)?,
        };

        let mut resolved = Vec::with_capacity(accessions.len());
        for accession in accessions {
            let accession = accession.to_lowercase();
            let rows: Vec<rusqlite::Result<i64>> = match db_id {
                Some(db_id) => stmt
                    .query_map(params![accession, db_id.get()], |row| {
                        row.get::<_, i64>(0)
                    })?
                    .collect(),
                None => stmt
                    .query_map(params![accession], |row| row.get::<_, i64>(0))?
                    .collect(),
            };

            let mut ids = BTreeSet::new();
            for row in rows {
                ids.insert(CatalogId::new(row?));
            }
            resolved.push(ids.into_iter().collect());
        }
        Ok(resolved)
    }

    /// Resolves raw fragments to catalog IDs through the precomputed
    /// sequence index (the fast path).
    ///
    /// Takes at most one index row per fragment, using the same
    /// left-anchored prefix semantics as [`Self::match_fragment`]. The index
    /// lags the authoritative tables until the external reindex job folds
    /// the pending queue in, so results here must never be assumed
    /// consistent with the slow path.
    pub fn resolve_fragments_fast(
        &self,
        fragments: &[String],
    ) -> Result<Vec<Vec<CatalogId>>, TranslateError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(FAST_INDEX_LOOKUP)?;

        let mut resolved = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let fragment = fragment.to_lowercase();
            let entry: Option<String> = stmt
                .query_row([format!("{fragment}%")], |row| row.get(0))
                .optional()?;

            let ids = match entry {
                Some(text) => parse_catalog_id_list(&text)?,
                None => Vec::new(),
            };
            resolved.push(ids);
        }
        Ok(resolved)
    }

    /// Resolves a species name to the catalog IDs reachable through every
    /// taxonomy record whose species label starts with the query.
    ///
    /// The collected accessions are resolved through the slow path across
    /// all reference databases, then flattened and de-duplicated into one
    /// set.
    pub fn resolve_species(
        &self,
        species: &str,
        db: Option<ReferenceDbId>,
    ) -> Result<Vec<CatalogId>, TranslateError> {
        let species = species.to_lowercase();
        let conn = self.db.connection();

        let accessions: Vec<String> = {
            let mut stmt = match db {
                Some(_) => conn.prepare(
                    "SELECT accession_id FROM taxonomy_names WHERE species LIKE ?1 AND db_id = ?2",
                )?,
                None => {
                    conn.prepare("SELECT accession_id FROM taxonomy_names WHERE species LIKE ?1")?
                }
            };
            let pattern = format!("{species}%");
            let rows: Vec<rusqlite::Result<String>> = match db {
                Some(db_id) => stmt
                    .query_map(params![pattern, db_id.get()], |row| row.get(0))?
                    .collect(),
                None => stmt
                    .query_map(params![pattern], |row| row.get(0))?
                    .collect(),
            };
            rows.into_iter().collect::<Result<_, _>>()?
        };
        debug!(
            count = accessions.len(),
            %species,
            "accessions matching species"
        );

        let resolved = self.resolve_accessions(&accessions, None, None)?;
        let ids: BTreeSet<CatalogId> = resolved.into_iter().flatten().collect();
        Ok(ids.into_iter().collect())
    }

    /// Looks up a reference database by name, at a specific version or, when
    /// none is given, the highest version on record.
    pub fn reference_db_id(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<ReferenceDbId, TranslateError> {
        let name = name.to_lowercase();
        let conn = self.db.connection();

        let result = match version {
            Some(version) => conn.query_row(
                "SELECT id FROM reference_databases WHERE name = ?1 AND version = ?2",
                params![name, version],
                |row| row.get::<_, i64>(0),
            ),
            None => conn.query_row(
                "SELECT id FROM reference_databases WHERE name = ?1 ORDER BY version DESC LIMIT 1",
                params![name],
                |row| row.get::<_, i64>(0),
            ),
        };

        match result {
            Ok(id) => Ok(ReferenceDbId::new(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(TranslateError::UnknownDatabase(name))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lists the reference database releases on record, newest version
    /// first within each name.
    pub fn reference_databases(&self) -> Result<Vec<ReferenceDatabase>, TranslateError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, name, version FROM reference_databases ORDER BY name, version DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ReferenceDatabase {
                id: ReferenceDbId::new(row.get(0)?),
                name: row.get(1)?,
                version: row.get(2)?,
            })
        })?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    /// Records that an accession maps to a catalog sequence.
    ///
    /// With `test_exists` the insert is gated on a lookup, making re-adds of
    /// an existing (db, catalog, accession) triple a no-op. The gate may be
    /// skipped when populating an empty store, where the check only costs
    /// time.
    pub fn add_accession_link(
        &self,
        db_id: ReferenceDbId,
        catalog_id: CatalogId,
        accession_id: &str,
        test_exists: bool,
    ) -> Result<(), TranslateError> {
        let accession_id = accession_id.to_lowercase();
        if test_exists && self.accession_link_exists(db_id, catalog_id, Some(&accession_id))? {
            debug!(%catalog_id, %accession_id, "link already recorded");
            return Ok(());
        }
        self.db.connection().execute(
            "INSERT INTO accession_links (db_id, catalog_id, accession_id) VALUES (?1, ?2, ?3)",
            params![db_id.get(), catalog_id.get(), accession_id],
        )?;
        Ok(())
    }

    /// Checks whether a mapping row exists for the given catalog sequence,
    /// optionally for one specific accession.
    pub fn accession_link_exists(
        &self,
        db_id: ReferenceDbId,
        catalog_id: CatalogId,
        accession_id: Option<&str>,
    ) -> Result<bool, TranslateError> {
        let conn = self.db.connection();
        let exists = match accession_id {
            Some(accession_id) => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM accession_links WHERE db_id = ?1 AND catalog_id = ?2 AND accession_id = ?3)",
                params![db_id.get(), catalog_id.get(), accession_id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM accession_links WHERE db_id = ?1 AND catalog_id = ?2)",
                params![db_id.get(), catalog_id.get()],
                |row| row.get(0),
            )?,
        };
        Ok(exists)
    }

    /// Fetches the stored taxonomy record for each accession, at most one
    /// per accession.
    ///
    /// With `only_species`, records without a species label are skipped.
    /// `max_records` truncates the result once that many records have been
    /// collected; 0 means unlimited.
    pub fn taxonomy_records(
        &self,
        accessions: &[String],
        db: Option<ReferenceDbId>,
        only_species: bool,
        max_records: usize,
    ) -> Result<Vec<TaxonomyRecord>, TranslateError> {
        let conn = self.db.connection();
        let mut stmt = match db {
            Some(_) => conn.prepare(
                "SELECT db_id, name, full_header, species FROM taxonomy_names WHERE accession_id = ?1 AND db_id = ?2 LIMIT 1",
            )?,
            None => conn.prepare(
                "SELECT db_id, name, full_header, species FROM taxonomy_names WHERE accession_id = ?1 LIMIT 1",
            )?,
        };

        let mut records = Vec::new();
        for accession in accessions {
            let accession = accession.to_lowercase();
            let row = match db {
                Some(db_id) => stmt
                    .query_row(params![accession, db_id.get()], map_taxonomy_row)
                    .optional()?,
                None => stmt
                    .query_row(params![accession], map_taxonomy_row)
                    .optional()?,
            };

            let Some((db_id, name, full_header, species)) = row else {
                continue;
            };
            if only_species && species.is_empty() {
                continue;
            }
            records.push(TaxonomyRecord {
                accession_id: accession,
                db_id: ReferenceDbId::new(db_id),
                name,
                full_header,
                species,
            });
            if max_records > 0 && records.len() >= max_records {
                break;
            }
        }
        Ok(records)
    }
}

fn map_taxonomy_row(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<(i64, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// Parses the fast index's comma-separated catalog-id list.
fn parse_catalog_id_list(text: &str) -> Result<Vec<CatalogId>, TranslateError> {
    text.split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map(CatalogId::new)
                .map_err(|_| TranslateError::InvalidIndexEntry(text.to_string()))
        })
        .collect()
}

#[cfg(test)]
#[path = "translator/tests.rs"]
mod tests;
