//! Newline-delimited staging files: one token per line.
//!
//! Lines are trimmed on read; blank lines and whitespace-only lines are
//! skipped. Writes are whole-file replacements with tokens in sorted order,
//! so a written file is stable regardless of probe completion order.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use keypool_store::Token;

/// Read tokens from a staging file, preserving file order and duplicates.
///
/// Returns an empty list if the file does not exist — an absent staging file
/// means "nothing staged", not an error.
pub fn load_tokens(path: &Path) -> io::Result<Vec<Token>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    Ok(contents
        .lines()
        .filter_map(|line| Token::new(line.trim()).ok())
        .collect())
}

/// Replace the file's contents with the given tokens, one per line.
pub fn write_tokens(path: &Path, tokens: &BTreeSet<Token>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = fs::File::create(path)?;
    for token in tokens {
        writeln!(file, "{token}")?;
    }
    Ok(())
}

/// Truncate a staging file after its contents have been applied to the store.
/// Creates the file if it does not exist.
pub fn truncate(path: &Path) -> io::Result<()> {
    write_tokens(path, &BTreeSet::new())
}
