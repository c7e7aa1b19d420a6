//! Dictionary-backed token manipulators.
//!
//! Dictionary files are UTF-8, newline-separated records of tab-separated
//! columns: column 0 is the surface form, column 1 the lemma, column 2 a
//! POS tag, and column 3 a decimal occurrence count. Additional columns
//! are ignored, as are missing ones.

mod lemmatizer;
mod remover;
mod tagger;

use std::{num::ParseIntError, path::PathBuf};

use snafu::{ResultExt, Snafu};

pub use crate::{lemmatizer::Lemmatizer, remover::StopwordRemover, tagger::Tagger};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Column containing the lemma in a dictionary file.
pub const COL_LEMMA: usize = 1;

/// Column containing the POS tag in a dictionary file.
pub const COL_TAG: usize = 2;

/// Column containing the number of occurrences in a dictionary file.
pub const COL_COUNT: usize = 3;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Error)))]
pub enum Error {
    #[snafu(display("could not read dictionary '{}': {source}", path.display()))]
    ReadDictionary {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display(
        "invalid occurrence count in dictionary '{}', line {line}: {source}",
        path.display()
    ))]
    BadCount {
        source: ParseIntError,
        path: PathBuf,
        line: usize,
    },
}

/// One property of a dictionary entry; a surface form may carry several.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DictProperty {
    pub(crate) lemma: String,
    pub(crate) tag: String,
    pub(crate) count: u64,
}

/// Reads a dictionary file into per-line columns, skipping empty lines.
pub(crate) fn read_columns(path: &PathBuf) -> Result<Vec<Vec<String>>> {
    let content = std::fs::read_to_string(path).context(ReadDictionaryError { path: path.clone() })?;

    Ok(content
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect())
}

/// Parses the occurrence count column, if present.
pub(crate) fn parse_count(columns: &[String], path: &PathBuf, line: usize) -> Result<u64> {
    match columns.get(COL_COUNT) {
        Some(count) => count.parse().context(BadCountError {
            path: path.clone(),
            line,
        }),
        None => Ok(0),
    }
}

/// The length of the surface form inside a token: everything up to the
/// first space, i.e. ignoring an attached POS tag.
pub(crate) fn surface_len(token: &str) -> usize {
    token.find(' ').unwrap_or(token.len())
}
