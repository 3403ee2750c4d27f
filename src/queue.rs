//! Write path into the reindex queue.
//!
//! New catalog sequences wait in `pending_sequences` until an out-of-band
//! job folds them into the fast sequence index. The queue is append-only
//! here and deliberately does no de-duplication; the folding job is
//! idempotent. Keeping index maintenance out of this path is what lets
//! high-volume producers enqueue without blocking fast-index readers.

use std::collections::HashMap;

use anyhow::Result;
use rusqlite::params;
use time::OffsetDateTime;
use tracing::debug;

use crate::db::Database;
use crate::models::CatalogId;

/// Appends a batch of catalog sequences to the reindex queue.
///
/// Sequences are lowercased on the way in. The batch is written under a
/// single commit boundary; a mid-batch failure leaves no partial visible
/// state. Returns the number of rows appended.
pub fn enqueue_sequences(db: &Database, entries: &HashMap<CatalogId, String>) -> Result<usize> {
    debug!(count = entries.len(), "adding sequences to reindex queue");
    let conn = db.connection();
    let now = OffsetDateTime::now_utc().unix_timestamp();

    conn.execute("BEGIN TRANSACTION", [])?;

    let result: Result<usize> = (|| {
        let mut stmt = conn.prepare(
            "INSERT INTO pending_sequences (catalog_id, sequence, enqueued_at) VALUES (?1, ?2, ?3)",
        )?;
        let mut added = 0usize;
        for (catalog_id, sequence) in entries {
            stmt.execute(params![catalog_id.get(), sequence.to_lowercase(), now])?;
            added += 1;
        }
        Ok(added)
    })();

    match result {
        Ok(added) => {
            conn.execute("COMMIT", [])?;
            debug!(added, "sequences enqueued");
            Ok(added)
        }
        Err(e) => {
            conn.execute("ROLLBACK", []).ok();
            Err(e)
        }
    }
}

/// Reads every catalog sequence, keyed by catalog ID.
///
/// This is the producer-side snapshot submitted to [`enqueue_sequences`]
/// when seeding the queue from an existing catalog.
pub fn collect_catalog_sequences(db: &Database) -> Result<HashMap<CatalogId, String>> {
    let conn = db.connection();
    let mut stmt = conn.prepare("SELECT id, sequence FROM catalog_sequences")?;
    let rows = stmt.query_map([], |row| {
        Ok((CatalogId::new(row.get(0)?), row.get::<_, String>(1)?))
    })?;

    let mut sequences = HashMap::new();
    for row in rows {
        let (id, sequence) = row?;
        sequences.insert(id, sequence);
    }
    Ok(sequences)
}
