//! Streaming reader for reference FASTA files using noodles.
//!
//! Supports both uncompressed and gzip compressed files. Sequences are
//! normalized for catalog storage: lowercased, with RNA `u` mapped to `t`.

use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use noodles::fasta;

/// Check if the path is a gzipped file
fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Opens a FASTA file for streaming, transparently decompressing gzip input.
pub fn open(path: &Path) -> Result<fasta::io::Reader<Box<dyn BufRead>>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open FASTA file: {}", path.display()))?;

    let reader: Box<dyn BufRead> = if is_gzipped(path) {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(fasta::io::Reader::new(reader))
}

/// Reassembles the full header line of a record (name plus description),
/// without the leading '>'.
pub fn record_header(record: &fasta::Record) -> String {
    let name = String::from_utf8_lossy(record.name());
    match record.description() {
        Some(description) => format!("{} {}", name, String::from_utf8_lossy(description)),
        None => name.to_string(),
    }
}

/// Returns the record's sequence normalized for catalog storage:
/// lowercased, with `u` replaced by `t`.
pub fn normalized_sequence(record: &fasta::Record) -> String {
    record
        .sequence()
        .as_ref()
        .iter()
        .map(|b| match b.to_ascii_lowercase() {
            b'u' => 't',
            other => other as char,
        })
        .collect()
}
