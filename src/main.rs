use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use seqtrans::ingest::{self, SequenceLoadOptions, TaxonomyLoadOptions};
use seqtrans::translator::TranslateError;
use seqtrans::{Database, Translator, queue};

/// seqtrans - translate amplicon fragments between reference-database
/// accessions and catalog sequence IDs
#[derive(Parser)]
#[command(name = "seqtrans")]
#[command(about = "Translate amplicon sequence fragments between reference accessions and catalog IDs")]
#[command(version)]
struct Cli {
    /// Path to the catalog store (defaults to $SEQTRANS_DB, then the
    /// platform data directory)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Load a region-trimmed reference FASTA into the sequence tables
    LoadSequences(LoadSequencesCommand),
    /// Load taxonomy names from a whole-sequence reference FASTA
    LoadTaxonomy(LoadTaxonomyCommand),
    /// Find reference accessions matching a query fragment
    MatchFragment(MatchFragmentCommand),
    /// Resolve accession IDs to catalog IDs (authoritative slow path)
    ResolveAccession(ResolveAccessionCommand),
    /// Resolve fragments to catalog IDs through the precomputed index
    ResolveFast(ResolveFastCommand),
    /// Resolve a species name to catalog IDs
    ResolveSpecies(ResolveSpeciesCommand),
    /// Show stored taxonomy records for accessions
    TaxonomyInfo(TaxonomyInfoCommand),
    /// List the reference database releases on record
    ListDatabases,
    /// Submit every catalog sequence to the reindex queue
    EnqueueCatalog,
    /// Write catalog sequences without accession links to a FASTA file
    ExportUnlinked(ExportUnlinkedCommand),
}

#[derive(Parser)]
struct LoadSequencesCommand {
    /// Reference FASTA file (plain or gzipped)
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Reference database name (e.g. SILVA)
    #[arg(long, value_name = "NAME")]
    db_name: String,

    /// Reference database version (e.g. 13.2)
    #[arg(long, value_name = "VERSION")]
    db_version: String,

    /// Primer region the file was trimmed to (e.g. v4)
    #[arg(short, long, value_name = "REGION")]
    region: Option<String>,

    /// Skip index rebuild (when loading multiple region files in a batch)
    #[arg(long)]
    no_index: bool,
}

#[derive(Parser)]
struct LoadTaxonomyCommand {
    /// Whole-sequence reference FASTA file (plain or gzipped)
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Reference database name (e.g. SILVA)
    #[arg(long, value_name = "NAME")]
    db_name: String,

    /// Reference database version (e.g. 13.2)
    #[arg(long, value_name = "VERSION")]
    db_version: String,

    /// Header taxonomy dialect
    #[arg(short = 't', long, default_value = "silva", value_name = "TYPE")]
    db_type: String,

    /// Also keep records whose taxonomy has no species-level label
    #[arg(long)]
    all_ranks: bool,
}

#[derive(Parser)]
struct MatchFragmentCommand {
    /// Query fragment (at least 100bp, from the start of a trimmed region)
    #[arg(value_name = "SEQUENCE")]
    sequence: String,

    /// Only return matches recorded for this primer region
    #[arg(short, long, value_name = "REGION")]
    region: Option<String>,

    /// Require an exact sequence match instead of prefix matching
    #[arg(long)]
    exact: bool,
}

#[derive(Parser)]
struct ResolveAccessionCommand {
    /// Accession IDs to resolve
    #[arg(value_name = "ACCESSION", required = true)]
    accessions: Vec<String>,

    /// Restrict resolution to this reference database
    #[arg(long, value_name = "NAME")]
    db_name: Option<String>,

    /// Specific database version (defaults to the highest on record)
    #[arg(long, value_name = "VERSION")]
    db_version: Option<String>,
}

#[derive(Parser)]
struct ResolveFastCommand {
    /// Query fragments
    #[arg(value_name = "SEQUENCE", required = true)]
    sequences: Vec<String>,
}

#[derive(Parser)]
struct ResolveSpeciesCommand {
    /// Species name prefix (e.g. "akkermansia")
    #[arg(value_name = "SPECIES")]
    species: String,

    /// Restrict the taxonomy lookup to this reference database
    #[arg(long, value_name = "NAME")]
    db_name: Option<String>,

    /// Specific database version (defaults to the highest on record)
    #[arg(long, value_name = "VERSION")]
    db_version: Option<String>,
}

#[derive(Parser)]
struct TaxonomyInfoCommand {
    /// Accession IDs to look up
    #[arg(value_name = "ACCESSION", required = true)]
    accessions: Vec<String>,

    /// Restrict the lookup to this reference database
    #[arg(long, value_name = "NAME")]
    db_name: Option<String>,

    /// Specific database version (defaults to the highest on record)
    #[arg(long, value_name = "VERSION")]
    db_version: Option<String>,

    /// Only return records carrying a species-level label
    #[arg(long)]
    only_species: bool,

    /// Stop after this many records (0 for unlimited)
    #[arg(long, default_value_t = 100, value_name = "N")]
    max_records: usize,
}

#[derive(Parser)]
struct ExportUnlinkedCommand {
    /// Output FASTA file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Reference database whose links decide what is already covered
    #[arg(long, value_name = "NAME")]
    db_name: String,

    /// Specific database version (defaults to the highest on record)
    #[arg(long, value_name = "VERSION")]
    db_version: Option<String>,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("seqtrans=debug,info")
    } else {
        EnvFilter::new("seqtrans=warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    if let Err(e) = run(&cli) {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors include validation failures like short fragments and unknown
/// database names. Internal errors include store and I/O failures.
fn is_user_error(error: &anyhow::Error) -> bool {
    if let Some(translate) = error.downcast_ref::<TranslateError>() {
        return matches!(
            translate,
            TranslateError::FragmentTooShort(_) | TranslateError::UnknownDatabase(_)
        );
    }
    error.to_string().contains("not supported")
}

fn run(cli: &Cli) -> Result<()> {
    let db_path = resolve_database_path(cli.db.as_deref())?;
    ensure_database_directory(&db_path)?;
    let db = Database::open(&db_path).context("Failed to open catalog store")?;

    match &cli.command {
        Commands::LoadSequences(cmd) => handle_load_sequences(cmd, db),
        Commands::LoadTaxonomy(cmd) => handle_load_taxonomy(cmd, db),
        Commands::MatchFragment(cmd) => handle_match_fragment(cmd, db),
        Commands::ResolveAccession(cmd) => handle_resolve_accession(cmd, db),
        Commands::ResolveFast(cmd) => handle_resolve_fast(cmd, db),
        Commands::ResolveSpecies(cmd) => handle_resolve_species(cmd, db),
        Commands::TaxonomyInfo(cmd) => handle_taxonomy_info(cmd, db),
        Commands::ListDatabases => handle_list_databases(db),
        Commands::EnqueueCatalog => handle_enqueue_catalog(db),
        Commands::ExportUnlinked(cmd) => handle_export_unlinked(cmd, db),
    }
}

fn handle_load_sequences(cmd: &LoadSequencesCommand, db: Database) -> Result<()> {
    let db_id = ingest::register_reference_database(&db, &cmd.db_name, &cmd.db_version)?;
    let options = SequenceLoadOptions {
        region: cmd.region.clone(),
        defer_index: cmd.no_index,
    };
    let loaded = ingest::load_reference_sequences(&db, db_id, &cmd.file, &options)?;

    print!("Loaded {loaded} reference sequences into {} {}", cmd.db_name, cmd.db_version);
    if cmd.no_index {
        print!(" (index rebuild deferred)");
    }
    println!();
    Ok(())
}

fn handle_load_taxonomy(cmd: &LoadTaxonomyCommand, db: Database) -> Result<()> {
    let db_id = ingest::register_reference_database(&db, &cmd.db_name, &cmd.db_version)?;
    let options = TaxonomyLoadOptions {
        only_species: !cmd.all_ranks,
    };
    let stats = ingest::load_taxonomy_names(&db, db_id, &cmd.file, &cmd.db_type, &options)?;

    println!(
        "Scanned {} records, loaded {} taxonomy names ({} without species label)",
        stats.scanned, stats.loaded, stats.no_species
    );
    Ok(())
}

fn handle_match_fragment(cmd: &MatchFragmentCommand, db: Database) -> Result<()> {
    let translator = Translator::new(db);
    let accessions =
        translator.match_fragment(&cmd.sequence, cmd.region.as_deref(), cmd.exact)?;
    println!("{}", serde_json::to_string(&accessions)?);
    Ok(())
}

fn handle_resolve_accession(cmd: &ResolveAccessionCommand, db: Database) -> Result<()> {
    let translator = Translator::new(db);
    let resolved = translator.resolve_accessions(
        &cmd.accessions,
        cmd.db_name.as_deref(),
        cmd.db_version.as_deref(),
    )?;
    println!("{}", serde_json::to_string(&resolved)?);
    Ok(())
}

fn handle_resolve_fast(cmd: &ResolveFastCommand, db: Database) -> Result<()> {
    let translator = Translator::new(db);
    let resolved = translator.resolve_fragments_fast(&cmd.sequences)?;
    println!("{}", serde_json::to_string(&resolved)?);
    Ok(())
}

fn handle_resolve_species(cmd: &ResolveSpeciesCommand, db: Database) -> Result<()> {
    let translator = Translator::new(db);
    let scope = match cmd.db_name.as_deref() {
        Some(name) => Some(translator.reference_db_id(name, cmd.db_version.as_deref())?),
        None => None,
    };
    let ids = translator.resolve_species(&cmd.species, scope)?;
    println!("{}", serde_json::to_string(&ids)?);
    Ok(())
}

fn handle_taxonomy_info(cmd: &TaxonomyInfoCommand, db: Database) -> Result<()> {
    let translator = Translator::new(db);
    let scope = match cmd.db_name.as_deref() {
        Some(name) => Some(translator.reference_db_id(name, cmd.db_version.as_deref())?),
        None => None,
    };
    let records = translator.taxonomy_records(
        &cmd.accessions,
        scope,
        cmd.only_species,
        cmd.max_records,
    )?;
    println!("{}", serde_json::to_string(&records)?);
    Ok(())
}

fn handle_list_databases(db: Database) -> Result<()> {
    let translator = Translator::new(db);
    let databases = translator.reference_databases()?;
    println!("{}", serde_json::to_string(&databases)?);
    Ok(())
}

fn handle_enqueue_catalog(db: Database) -> Result<()> {
    let sequences = queue::collect_catalog_sequences(&db)?;
    let added = queue::enqueue_sequences(&db, &sequences)?;
    println!("Enqueued {added} catalog sequences for reindexing");
    Ok(())
}

fn handle_export_unlinked(cmd: &ExportUnlinkedCommand, db: Database) -> Result<()> {
    let translator = Translator::new(db);
    let db_id = translator.reference_db_id(&cmd.db_name, cmd.db_version.as_deref())?;
    let count = ingest::export_unlinked_catalog(translator.database(), db_id, &cmd.output)?;
    println!("Exported {count} unlinked catalog sequences to {}", cmd.output.display());
    Ok(())
}

/// Resolves the catalog store path: explicit flag, then the SEQTRANS_DB
/// environment variable, then the platform data directory.
fn resolve_database_path(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("SEQTRANS_DB") {
        return Ok(PathBuf::from(path));
    }
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;
    Ok(data_dir.join("seqtrans").join("translator.db"))
}

/// Ensures the parent directory of the database file exists.
fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}
