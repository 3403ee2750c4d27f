//! Bulk loaders for reference FASTA releases.
//!
//! Both loaders follow the same discipline: one transaction per load,
//! secondary indexes dropped up front, every record stream-inserted, indexes
//! rebuilt, then a single commit. A store error rolls the whole load back;
//! commit is never issued before the full stream completes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{OptionalExtension, params};
use tracing::{debug, info};

use crate::db::{Database, REFERENCE_SEQUENCE_INDEXES, TAXONOMY_NAME_INDEXES};
use crate::fasta;
use crate::models::ReferenceDbId;
use crate::taxonomy;

/// Header taxonomy dialects the taxonomy loader can parse.
pub const SUPPORTED_DB_TYPES: &[&str] = &["silva"];

const PROGRESS_INTERVAL: usize = 10_000;

/// Options for [`load_reference_sequences`].
#[derive(Debug, Clone, Default)]
pub struct SequenceLoadOptions {
    /// Primer region the file was trimmed to, recorded on every row.
    pub region: Option<String>,
    /// Skip the index rebuild after the load, for multi-file batches.
    /// The caller must re-create the indexes before querying.
    pub defer_index: bool,
}

/// Options for [`load_taxonomy_names`].
#[derive(Debug, Clone)]
pub struct TaxonomyLoadOptions {
    /// Skip records whose taxonomy resolved to no species-level label.
    pub only_species: bool,
}

impl Default for TaxonomyLoadOptions {
    fn default() -> Self {
        Self { only_species: true }
    }
}

/// Counters reported by a taxonomy load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxonomyLoadStats {
    /// Records scanned from the file.
    pub scanned: usize,
    /// Records inserted.
    pub loaded: usize,
    /// Records whose deepest informative rank was not species-level.
    pub no_species: usize,
}

/// Gets or creates the `reference_databases` row for a (name, version)
/// release and returns its ID.
pub fn register_reference_database(
    db: &Database,
    name: &str,
    version: &str,
) -> Result<ReferenceDbId> {
    let name = name.to_lowercase();
    let conn = db.connection();

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM reference_databases WHERE name = ?1 AND version = ?2",
            params![name, version],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(ReferenceDbId::new(id));
    }

    conn.execute(
        "INSERT INTO reference_databases (name, version) VALUES (?1, ?2)",
        params![name, version],
    )?;
    Ok(ReferenceDbId::new(conn.last_insert_rowid()))
}

/// Normalizes a FASTA header into the stored accession ID.
///
/// Takes the token before the first space; headers of the form
/// `ACCESSION.START.END` carry trim coordinates in the last two
/// dot-separated components, which are removed. The result is lowercased.
pub fn normalize_accession(header: &str) -> String {
    let token = header.split(' ').next().unwrap_or("");
    let parts: Vec<&str> = token.split('.').collect();
    let id = if parts.len() > 2 {
        parts[..parts.len() - 2].join(".")
    } else {
        parts.join(".")
    };
    id.to_lowercase()
}

/// Everything after the accession token: the taxonomy string.
fn taxonomy_part(header: &str) -> String {
    match header.split_once(' ') {
        Some((_, rest)) => rest.to_string(),
        None => String::new(),
    }
}

/// Loads a region-trimmed reference FASTA into `reference_sequences` for
/// the given database release.
///
/// Returns the number of records loaded.
pub fn load_reference_sequences(
    db: &Database,
    db_id: ReferenceDbId,
    path: &Path,
    options: &SequenceLoadOptions,
) -> Result<usize> {
    info!(file = %path.display(), %db_id, "loading reference sequences");
    let mut reader = fasta::open(path)?;
    let region = options.region.as_deref().map(str::to_lowercase);

    let conn = db.connection();
    conn.execute("BEGIN TRANSACTION", [])?;

    let result: Result<usize> = (|| {
        debug!("dropping reference sequence indexes");
        db.drop_indexes(REFERENCE_SEQUENCE_INDEXES)?;

        let mut stmt = conn.prepare(
            "INSERT INTO reference_sequences (sequence, accession_id, db_id, region)
             VALUES (?1, ?2, ?3, ?4)",
        )?;

        let mut loaded = 0usize;
        for record in reader.records() {
            let record = record.context("Failed to read FASTA record")?;
            let header = fasta::record_header(&record);
            let accession_id = normalize_accession(&header);
            let sequence = fasta::normalized_sequence(&record);

            stmt.execute(params![sequence, accession_id, db_id.get(), region])?;
            loaded += 1;
            if loaded % PROGRESS_INTERVAL == 0 {
                debug!(processed = loaded, "load progress");
            }
        }
        drop(stmt);

        if options.defer_index {
            info!("index rebuild deferred; re-create indexes after the last file of the batch");
        } else {
            debug!("rebuilding reference sequence indexes");
            db.create_indexes(REFERENCE_SEQUENCE_INDEXES)?;
        }
        Ok(loaded)
    })();

    match result {
        Ok(loaded) => {
            conn.execute("COMMIT", [])?;
            info!(loaded, "reference sequence load complete");
            Ok(loaded)
        }
        Err(e) => {
            conn.execute("ROLLBACK", []).ok();
            Err(e)
        }
    }
}

/// Loads taxonomy names from a whole-sequence reference FASTA into
/// `taxonomy_names` for the given database release.
///
/// The species label is extracted from each header by the taxonomy
/// resolver; records where every rank is rejected are skipped outright,
/// and records without a species-level label are skipped when
/// `only_species` is set. The db-type is validated before the store is
/// touched.
pub fn load_taxonomy_names(
    db: &Database,
    db_id: ReferenceDbId,
    path: &Path,
    db_type: &str,
    options: &TaxonomyLoadOptions,
) -> Result<TaxonomyLoadStats> {
    let db_type = db_type.to_lowercase();
    if !SUPPORTED_DB_TYPES.contains(&db_type.as_str()) {
        bail!(
            "database type {} not supported. supported options are: {}",
            db_type,
            SUPPORTED_DB_TYPES.join(", ")
        );
    }

    info!(file = %path.display(), %db_id, %db_type, "loading taxonomy names");
    let mut reader = fasta::open(path)?;

    let conn = db.connection();
    conn.execute("BEGIN TRANSACTION", [])?;

    let result: Result<TaxonomyLoadStats> = (|| {
        debug!("dropping taxonomy name indexes");
        db.drop_indexes(TAXONOMY_NAME_INDEXES)?;

        let mut stmt = conn.prepare(
            "INSERT INTO taxonomy_names (accession_id, db_id, name, full_header, species)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        let mut stats = TaxonomyLoadStats {
            scanned: 0,
            loaded: 0,
            no_species: 0,
        };
        for record in reader.records() {
            let record = record.context("Failed to read FASTA record")?;
            stats.scanned += 1;
            if stats.scanned % PROGRESS_INTERVAL == 0 {
                debug!(processed = stats.scanned, "load progress");
            }

            let header = fasta::record_header(&record);
            let accession_id = normalize_accession(&header);

            let Some(resolved) = taxonomy::deepest_informative_rank(&taxonomy_part(&header))
            else {
                continue;
            };
            let species = if resolved.is_species {
                resolved.label.clone()
            } else {
                stats.no_species += 1;
                if options.only_species {
                    continue;
                }
                String::new()
            };

            stmt.execute(params![
                accession_id,
                db_id.get(),
                resolved.label,
                header.to_lowercase(),
                species,
            ])?;
            stats.loaded += 1;
        }
        drop(stmt);

        debug!("rebuilding taxonomy name indexes");
        db.create_indexes(TAXONOMY_NAME_INDEXES)?;
        Ok(stats)
    })();

    match result {
        Ok(stats) => {
            conn.execute("COMMIT", [])?;
            info!(
                scanned = stats.scanned,
                loaded = stats.loaded,
                no_species = stats.no_species,
                "taxonomy load complete"
            );
            Ok(stats)
        }
        Err(e) => {
            conn.execute("ROLLBACK", []).ok();
            Err(e)
        }
    }
}

/// Writes catalog sequences that have no accession link in the given
/// reference database to a FASTA file, keyed by catalog ID.
///
/// The output feeds the external whole-sequence matching job that produces
/// new accession links.
pub fn export_unlinked_catalog(
    db: &Database,
    db_id: ReferenceDbId,
    output: &Path,
) -> Result<usize> {
    let conn = db.connection();
    let mut stmt = conn.prepare(
        "SELECT id, sequence FROM catalog_sequences
         WHERE id NOT IN (SELECT DISTINCT catalog_id FROM accession_links WHERE db_id = ?1)",
    )?;
    let rows = stmt.query_map([db_id.get()], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let file = File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    let mut count = 0usize;
    for row in rows {
        let (id, sequence) = row?;
        writeln!(writer, ">{id}")?;
        writeln!(writer, "{sequence}")?;
        count += 1;
    }
    writer.flush()?;

    info!(count, file = %output.display(), "exported unlinked catalog sequences");
    Ok(count)
}
