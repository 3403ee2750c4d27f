use super::*;

use std::collections::HashMap;

use rusqlite::params;

use crate::ingest::register_reference_database;
use crate::queue;

fn translator() -> Translator {
    Translator::new(Database::in_memory().expect("failed to create in-memory database"))
}

/// A valid 120bp query fragment built from a 4bp motif.
fn long_seq(motif: &str) -> String {
    assert_eq!(motif.len(), 4);
    motif.repeat(30)
}

fn insert_reference_sequence(
    t: &Translator,
    sequence: &str,
    accession_id: &str,
    db_id: i64,
    region: Option<&str>,
) {
    t.database()
        .connection()
        .execute(
            "INSERT INTO reference_sequences (sequence, accession_id, db_id, region)
             VALUES (?1, ?2, ?3, ?4)",
            params![sequence, accession_id, db_id, region],
        )
        .unwrap();
}

fn insert_link(t: &Translator, db_id: i64, catalog_id: i64, accession_id: &str) {
    t.database()
        .connection()
        .execute(
            "INSERT INTO accession_links (db_id, catalog_id, accession_id) VALUES (?1, ?2, ?3)",
            params![db_id, catalog_id, accession_id],
        )
        .unwrap();
}

fn insert_taxonomy(t: &Translator, accession_id: &str, db_id: i64, name: &str, species: &str) {
    t.database()
        .connection()
        .execute(
            "INSERT INTO taxonomy_names (accession_id, db_id, name, full_header, species)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![accession_id, db_id, name, format!("{accession_id} {name}"), species],
        )
        .unwrap();
}

fn insert_index_entry(t: &Translator, sequence: &str, catalog_ids: &str) {
    t.database()
        .connection()
        .execute(
            "INSERT INTO sequence_index (sequence, catalog_ids) VALUES (?1, ?2)",
            params![sequence, catalog_ids],
        )
        .unwrap();
}

fn link_count(t: &Translator) -> i64 {
    t.database()
        .connection()
        .query_row("SELECT COUNT(*) FROM accession_links", [], |row| row.get(0))
        .unwrap()
}

// --- match_fragment ---

#[test]
fn match_fragment_rejects_short_sequences_before_store_access() {
    let t = translator();
    // Even a stored exact match must not rescue a short query
    insert_reference_sequence(&t, "acgt", "jq782411", 1, None);

    let err = t.match_fragment("acgt", None, false).unwrap_err();
    assert!(matches!(err, TranslateError::FragmentTooShort(_)));
    assert!(err.to_string().contains("at least 100bp"));
}

#[test]
fn match_fragment_boundary_length_is_accepted() {
    let t = translator();
    let sequence = "a".repeat(MIN_FRAGMENT_LEN);
    insert_reference_sequence(&t, &sequence, "jq782411", 1, None);

    let matches = t.match_fragment(&sequence, None, true).unwrap();
    assert_eq!(matches, vec!["jq782411".to_string()]);

    let err = t
        .match_fragment(&sequence[..MIN_FRAGMENT_LEN - 1], None, false)
        .unwrap_err();
    assert!(matches!(err, TranslateError::FragmentTooShort(_)));
}

#[test]
fn match_fragment_exact_requires_full_equality() {
    let t = translator();
    let stored = format!("{}{}", long_seq("acgt"), "tt");
    insert_reference_sequence(&t, &stored, "jq782411", 1, None);

    // The stored sequence starts with the query, so the default mode matches
    let matches = t.match_fragment(&long_seq("acgt"), None, false).unwrap();
    assert_eq!(matches, vec!["jq782411".to_string()]);

    // Exact mode does not
    let matches = t.match_fragment(&long_seq("acgt"), None, true).unwrap();
    assert!(matches.is_empty());

    // Exact mode with the full stored sequence does
    let matches = t.match_fragment(&stored, None, true).unwrap();
    assert_eq!(matches, vec!["jq782411".to_string()]);
}

#[test]
fn match_fragment_lowercases_the_query() {
    let t = translator();
    insert_reference_sequence(&t, &long_seq("acgt"), "jq782411", 1, None);

    let matches = t
        .match_fragment(&long_seq("acgt").to_uppercase(), None, true)
        .unwrap();
    assert_eq!(matches, vec!["jq782411".to_string()]);
}

#[test]
fn match_fragment_filters_by_region_post_match() {
    let t = translator();
    let sequence = long_seq("acgt");
    insert_reference_sequence(&t, &sequence, "acc_v4", 1, Some("v4"));
    insert_reference_sequence(&t, &sequence, "acc_v3", 1, Some("v3"));
    insert_reference_sequence(&t, &sequence, "acc_none", 1, None);

    let mut all = t.match_fragment(&sequence, None, false).unwrap();
    all.sort();
    assert_eq!(all, vec!["acc_none", "acc_v3", "acc_v4"]);

    let v4_only = t.match_fragment(&sequence, Some("V4"), false).unwrap();
    assert_eq!(v4_only, vec!["acc_v4".to_string()]);
}

#[test]
fn match_fragment_returns_empty_set_when_nothing_matches() {
    let t = translator();
    let matches = t.match_fragment(&long_seq("acgt"), None, false).unwrap();
    assert!(matches.is_empty());
}

// --- resolve_accessions ---

#[test]
fn resolve_accessions_aligns_results_to_input_order() {
    let t = translator();
    register_reference_database(t.database(), "silva", "13.2").unwrap();
    insert_link(&t, 1, 10, "jq782411");
    insert_link(&t, 1, 11, "jq782411");
    insert_link(&t, 1, 20, "fj978486");

    let resolved = t
        .resolve_accessions(
            &[
                "fj978486".to_string(),
                "missing".to_string(),
                "jq782411".to_string(),
            ],
            None,
            None,
        )
        .unwrap();

    assert_eq!(resolved.len(), 3);
    assert_eq!(resolved[0], vec![CatalogId::new(20)]);
    assert_eq!(resolved[1], Vec::<CatalogId>::new());
    assert_eq!(resolved[2], vec![CatalogId::new(10), CatalogId::new(11)]);
}

#[test]
fn resolve_accessions_deduplicates_catalog_ids() {
    let t = translator();
    insert_link(&t, 1, 10, "jq782411");
    insert_link(&t, 1, 10, "jq782411");

    let resolved = t
        .resolve_accessions(&["jq782411".to_string()], None, None)
        .unwrap();
    assert_eq!(resolved[0], vec![CatalogId::new(10)]);
}

#[test]
fn resolve_accessions_lowercases_input() {
    let t = translator();
    insert_link(&t, 1, 10, "jq782411");

    let resolved = t
        .resolve_accessions(&["JQ782411".to_string()], None, None)
        .unwrap();
    assert_eq!(resolved[0], vec![CatalogId::new(10)]);
}

#[test]
fn resolve_accessions_scopes_to_the_named_database() {
    let t = translator();
    let silva = register_reference_database(t.database(), "silva", "13.2").unwrap();
    let gg = register_reference_database(t.database(), "greengenes", "13.8").unwrap();
    insert_link(&t, silva.get(), 10, "jq782411");
    insert_link(&t, gg.get(), 99, "jq782411");

    let resolved = t
        .resolve_accessions(&["jq782411".to_string()], Some("silva"), None)
        .unwrap();
    assert_eq!(resolved[0], vec![CatalogId::new(10)]);

    // Unscoped resolution sees both databases
    let resolved = t
        .resolve_accessions(&["jq782411".to_string()], None, None)
        .unwrap();
    assert_eq!(resolved[0], vec![CatalogId::new(10), CatalogId::new(99)]);
}

#[test]
fn resolve_accessions_uses_highest_version_when_unspecified() {
    let t = translator();
    let old = register_reference_database(t.database(), "silva", "13.2").unwrap();
    let new = register_reference_database(t.database(), "silva", "13.5").unwrap();
    insert_link(&t, old.get(), 10, "jq782411");
    insert_link(&t, new.get(), 20, "jq782411");

    let resolved = t
        .resolve_accessions(&["jq782411".to_string()], Some("silva"), None)
        .unwrap();
    assert_eq!(resolved[0], vec![CatalogId::new(20)]);

    let resolved = t
        .resolve_accessions(&["jq782411".to_string()], Some("silva"), Some("13.2"))
        .unwrap();
    assert_eq!(resolved[0], vec![CatalogId::new(10)]);
}

#[test]
fn resolve_accessions_unknown_database_is_an_error() {
    let t = translator();
    let err = t
        .resolve_accessions(&["jq782411".to_string()], Some("nonexistent"), None)
        .unwrap_err();
    assert!(matches!(err, TranslateError::UnknownDatabase(_)));
    assert!(err.to_string().contains("nonexistent"));
}

// --- reference_db_id ---

#[test]
fn reference_db_id_is_case_insensitive_on_name() {
    let t = translator();
    let id = register_reference_database(t.database(), "SILVA", "13.2").unwrap();
    assert_eq!(t.reference_db_id("Silva", None).unwrap(), id);
}

#[test]
fn reference_db_id_with_unknown_version_is_an_error() {
    let t = translator();
    register_reference_database(t.database(), "silva", "13.2").unwrap();
    let err = t.reference_db_id("silva", Some("99.9")).unwrap_err();
    assert!(matches!(err, TranslateError::UnknownDatabase(_)));
}

#[test]
fn reference_databases_lists_newest_version_first() {
    let t = translator();
    register_reference_database(t.database(), "silva", "13.2").unwrap();
    register_reference_database(t.database(), "silva", "13.5").unwrap();
    register_reference_database(t.database(), "greengenes", "13.8").unwrap();

    let databases = t.reference_databases().unwrap();
    let summary: Vec<(String, String)> = databases
        .into_iter()
        .map(|d| (d.name, d.version))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("greengenes".to_string(), "13.8".to_string()),
            ("silva".to_string(), "13.5".to_string()),
            ("silva".to_string(), "13.2".to_string()),
        ]
    );
}

// --- resolve_fragments_fast ---

#[test]
fn resolve_fragments_fast_uses_prefix_semantics() {
    let t = translator();
    insert_index_entry(&t, &long_seq("acgt"), "1,2,3");

    let resolved = t
        .resolve_fragments_fast(&[long_seq("acgt")[..100].to_uppercase()])
        .unwrap();
    assert_eq!(
        resolved[0],
        vec![CatalogId::new(1), CatalogId::new(2), CatalogId::new(3)]
    );
}

#[test]
fn resolve_fragments_fast_takes_at_most_one_row_per_fragment() {
    let t = translator();
    insert_index_entry(&t, &long_seq("acgt"), "1");
    insert_index_entry(&t, &format!("{}aa", long_seq("acgt")), "2");

    let resolved = t.resolve_fragments_fast(&[long_seq("acgt")]).unwrap();
    assert_eq!(resolved[0].len(), 1);
}

#[test]
fn resolve_fragments_fast_returns_empty_for_missing_fragments() {
    let t = translator();
    insert_index_entry(&t, &long_seq("acgt"), "1");

    let resolved = t
        .resolve_fragments_fast(&[long_seq("ttaa"), long_seq("acgt")])
        .unwrap();
    assert_eq!(resolved[0], Vec::<CatalogId>::new());
    assert_eq!(resolved[1], vec![CatalogId::new(1)]);
}

#[test]
fn resolve_fragments_fast_rejects_malformed_id_lists() {
    let t = translator();
    insert_index_entry(&t, &long_seq("acgt"), "1,x,3");

    let err = t.resolve_fragments_fast(&[long_seq("acgt")]).unwrap_err();
    assert!(matches!(err, TranslateError::InvalidIndexEntry(_)));
}

#[test]
fn fast_path_lags_slow_path_until_reindex_job_runs() {
    let t = translator();
    let sequence = long_seq("acgt");

    // A new catalog sequence arrives: mapping row exists, queue entry
    // waits, fast index has not been folded yet
    insert_reference_sequence(&t, &sequence, "jq782411", 1, None);
    insert_link(&t, 1, 42, "jq782411");
    queue::enqueue_sequences(
        t.database(),
        &HashMap::from([(CatalogId::new(42), sequence.clone())]),
    )
    .unwrap();

    // Slow path is authoritative
    assert_eq!(
        t.match_fragment(&sequence, None, false).unwrap(),
        vec!["jq782411".to_string()]
    );
    assert_eq!(
        t.resolve_accessions(&["jq782411".to_string()], None, None)
            .unwrap()[0],
        vec![CatalogId::new(42)]
    );

    // Fast path knows nothing until the external job folds the queue
    assert_eq!(
        t.resolve_fragments_fast(&[sequence.clone()]).unwrap()[0],
        Vec::<CatalogId>::new()
    );

    // Simulate the fold, then the fast path serves the entry
    insert_index_entry(&t, &sequence, "42");
    assert_eq!(
        t.resolve_fragments_fast(&[sequence]).unwrap()[0],
        vec![CatalogId::new(42)]
    );
}

// --- resolve_species ---

#[test]
fn resolve_species_unions_catalog_ids_across_matching_records() {
    let t = translator();
    insert_taxonomy(&t, "acc1", 1, "akkermansia muciniphila", "akkermansia muciniphila");
    insert_taxonomy(&t, "acc2", 1, "akkermansia glycaniphila", "akkermansia glycaniphila");
    insert_taxonomy(&t, "acc3", 1, "lactobacillus rhamnosus", "lactobacillus rhamnosus");
    insert_link(&t, 1, 10, "acc1");
    insert_link(&t, 1, 11, "acc1");
    insert_link(&t, 1, 11, "acc2");
    insert_link(&t, 1, 30, "acc3");

    let ids = t.resolve_species("akkermansia", None).unwrap();
    assert_eq!(
        ids,
        vec![CatalogId::new(10), CatalogId::new(11)],
        "union must be de-duplicated and exclude other species"
    );
}

#[test]
fn resolve_species_is_case_insensitive() {
    let t = translator();
    insert_taxonomy(&t, "acc1", 1, "akkermansia muciniphila", "akkermansia muciniphila");
    insert_link(&t, 1, 10, "acc1");

    let ids = t.resolve_species("Akkermansia", None).unwrap();
    assert_eq!(ids, vec![CatalogId::new(10)]);
}

#[test]
fn resolve_species_scopes_taxonomy_lookup_to_the_given_database() {
    let t = translator();
    insert_taxonomy(&t, "acc1", 1, "akkermansia muciniphila", "akkermansia muciniphila");
    insert_taxonomy(&t, "acc2", 2, "akkermansia muciniphila", "akkermansia muciniphila");
    insert_link(&t, 1, 10, "acc1");
    insert_link(&t, 2, 20, "acc2");

    let ids = t
        .resolve_species("akkermansia", Some(ReferenceDbId::new(1)))
        .unwrap();
    assert_eq!(ids, vec![CatalogId::new(10)]);
}

#[test]
fn resolve_species_with_no_match_returns_empty_set() {
    let t = translator();
    let ids = t.resolve_species("akkermansia", None).unwrap();
    assert!(ids.is_empty());
}

#[test]
fn resolve_species_ignores_empty_species_records() {
    let t = translator();
    // Record with a name but no species label; a bare prefix query must
    // not pick it up via the name column
    insert_taxonomy(&t, "acc1", 1, "lactobacillaceae", "");
    insert_link(&t, 1, 10, "acc1");

    let ids = t.resolve_species("lactobacillaceae", None).unwrap();
    assert!(ids.is_empty());
}

// --- accession links ---

#[test]
fn add_accession_link_is_idempotent_with_test_exists() {
    let t = translator();
    let db_id = ReferenceDbId::new(1);
    let catalog_id = CatalogId::new(10);

    t.add_accession_link(db_id, catalog_id, "jq782411", true)
        .unwrap();
    t.add_accession_link(db_id, catalog_id, "jq782411", true)
        .unwrap();

    assert_eq!(link_count(&t), 1);
}

#[test]
fn add_accession_link_without_test_exists_appends_blindly() {
    let t = translator();
    let db_id = ReferenceDbId::new(1);
    let catalog_id = CatalogId::new(10);

    t.add_accession_link(db_id, catalog_id, "jq782411", false)
        .unwrap();
    t.add_accession_link(db_id, catalog_id, "jq782411", false)
        .unwrap();

    assert_eq!(link_count(&t), 2);
}

#[test]
fn add_accession_link_lowercases_the_accession() {
    let t = translator();
    t.add_accession_link(ReferenceDbId::new(1), CatalogId::new(10), "JQ782411", true)
        .unwrap();

    let stored: String = t
        .database()
        .connection()
        .query_row("SELECT accession_id FROM accession_links", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(stored, "jq782411");
}

#[test]
fn accession_link_exists_without_accession_checks_any_record() {
    let t = translator();
    let db_id = ReferenceDbId::new(1);
    let catalog_id = CatalogId::new(10);

    assert!(!t.accession_link_exists(db_id, catalog_id, None).unwrap());

    t.add_accession_link(db_id, catalog_id, "jq782411", false)
        .unwrap();

    assert!(t.accession_link_exists(db_id, catalog_id, None).unwrap());
    assert!(
        t.accession_link_exists(db_id, catalog_id, Some("jq782411"))
            .unwrap()
    );
    assert!(
        !t.accession_link_exists(db_id, catalog_id, Some("other"))
            .unwrap()
    );
}

// --- taxonomy_records ---

#[test]
fn taxonomy_records_returns_one_record_per_accession() {
    let t = translator();
    insert_taxonomy(&t, "acc1", 1, "lactobacillus rhamnosus", "lactobacillus rhamnosus");
    insert_taxonomy(&t, "acc2", 1, "lactobacillaceae", "");

    let records = t
        .taxonomy_records(
            &["acc1".to_string(), "missing".to_string(), "acc2".to_string()],
            None,
            false,
            0,
        )
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].accession_id, "acc1");
    assert_eq!(records[0].species, "lactobacillus rhamnosus");
    assert_eq!(records[1].accession_id, "acc2");
    assert_eq!(records[1].species, "");
}

#[test]
fn taxonomy_records_only_species_skips_unresolved_rows() {
    let t = translator();
    insert_taxonomy(&t, "acc1", 1, "lactobacillaceae", "");
    insert_taxonomy(&t, "acc2", 1, "lactobacillus rhamnosus", "lactobacillus rhamnosus");

    let records = t
        .taxonomy_records(&["acc1".to_string(), "acc2".to_string()], None, true, 0)
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].accession_id, "acc2");
}

#[test]
fn taxonomy_records_truncates_at_max_records() {
    let t = translator();
    for i in 0..5 {
        insert_taxonomy(
            &t,
            &format!("acc{i}"),
            1,
            "lactobacillus rhamnosus",
            "lactobacillus rhamnosus",
        );
    }
    let accessions: Vec<String> = (0..5).map(|i| format!("acc{i}")).collect();

    let records = t.taxonomy_records(&accessions, None, false, 2).unwrap();
    assert_eq!(records.len(), 2);

    let records = t.taxonomy_records(&accessions, None, false, 0).unwrap();
    assert_eq!(records.len(), 5, "max_records of 0 means unlimited");
}

#[test]
fn taxonomy_records_scopes_to_the_given_database() {
    let t = translator();
    insert_taxonomy(&t, "acc1", 1, "lactobacillus rhamnosus", "lactobacillus rhamnosus");
    insert_taxonomy(&t, "acc1", 2, "other name", "other name");

    let records = t
        .taxonomy_records(&["acc1".to_string()], Some(ReferenceDbId::new(2)), false, 0)
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "other name");
    assert_eq!(records[0].db_id, ReferenceDbId::new(2));
}
