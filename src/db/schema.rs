/// Complete schema for the translator catalog store.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
/// All statements are designed to be run in a single transaction.
pub const INITIAL_SCHEMA: &str = r#"
-- Reference databases: one row per (name, version) release
CREATE TABLE IF NOT EXISTS reference_databases (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    UNIQUE (name, version)
);

-- Region-trimmed reference sequences: one row per (accession, region)
CREATE TABLE IF NOT EXISTS reference_sequences (
    id INTEGER PRIMARY KEY,
    sequence TEXT NOT NULL,
    accession_id TEXT NOT NULL,
    db_id INTEGER NOT NULL,
    region TEXT
);

-- Catalog sequences: owned by the external catalog producer, read-only here
CREATE TABLE IF NOT EXISTS catalog_sequences (
    id INTEGER PRIMARY KEY,
    sequence TEXT NOT NULL
);

-- Accession <-> catalog mapping (many-to-many)
CREATE TABLE IF NOT EXISTS accession_links (
    db_id INTEGER NOT NULL,
    catalog_id INTEGER NOT NULL,
    accession_id TEXT NOT NULL
);

-- Taxonomy names: one record per accession per reference database
CREATE TABLE IF NOT EXISTS taxonomy_names (
    accession_id TEXT NOT NULL,
    db_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    full_header TEXT NOT NULL,
    species TEXT NOT NULL DEFAULT ''
);

-- Precomputed fragment lookup, maintained by the external reindex job;
-- catalog_ids is a comma-separated integer list encoded as text
CREATE TABLE IF NOT EXISTS sequence_index (
    sequence TEXT NOT NULL,
    catalog_ids TEXT NOT NULL
);

-- Sequences waiting for the reindex job; append-only from this crate
CREATE TABLE IF NOT EXISTS pending_sequences (
    id INTEGER PRIMARY KEY,
    catalog_id INTEGER NOT NULL,
    sequence TEXT NOT NULL,
    enqueued_at INTEGER
);
"#;

/// Secondary indexes on reference_sequences, dropped and rebuilt around
/// bulk sequence loads. Prefix queries against the sequence column can only
/// use this index under case-sensitive LIKE (see Database::initialize_schema).
pub const REFERENCE_SEQUENCE_INDEXES: &[(&str, &str)] = &[
    (
        "idx_reference_sequences_sequence",
        "CREATE INDEX IF NOT EXISTS idx_reference_sequences_sequence ON reference_sequences(sequence)",
    ),
    (
        "idx_reference_sequences_accession",
        "CREATE INDEX IF NOT EXISTS idx_reference_sequences_accession ON reference_sequences(accession_id)",
    ),
];

/// Secondary indexes on taxonomy_names, dropped and rebuilt around bulk
/// taxonomy loads.
pub const TAXONOMY_NAME_INDEXES: &[(&str, &str)] = &[
    (
        "idx_taxonomy_names_accession_db",
        "CREATE INDEX IF NOT EXISTS idx_taxonomy_names_accession_db ON taxonomy_names(accession_id, db_id)",
    ),
    (
        "idx_taxonomy_names_accession",
        "CREATE INDEX IF NOT EXISTS idx_taxonomy_names_accession ON taxonomy_names(accession_id)",
    ),
    (
        "idx_taxonomy_names_species",
        "CREATE INDEX IF NOT EXISTS idx_taxonomy_names_species ON taxonomy_names(species)",
    ),
];

/// Indexes that never participate in the bulk-load drop/rebuild cycle.
pub const STATIC_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_accession_links_accession ON accession_links(accession_id);
CREATE INDEX IF NOT EXISTS idx_accession_links_catalog ON accession_links(db_id, catalog_id);
CREATE INDEX IF NOT EXISTS idx_sequence_index_sequence ON sequence_index(sequence);
"#;
