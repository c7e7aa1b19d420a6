//! Text maps annotate parts of a corpus, e.g. the articles and dates its
//! parts belong to. Positions and lengths are bytes while the corpus is
//! continuous and token indices once it has been tokenised.

mod check;
mod date;
mod ops;

use serde::{Deserialize, Serialize};
use snafu::Snafu;

pub use crate::{
    check::{check_sentence_map, check_text_map},
    date::{is_iso_date, is_iso_date_in_range},
    ops::{
        entry_begins_at, entry_end_or_last, first_end, remove_empty_entries, remove_token,
        remove_token_from_length, skip_entries_before, skip_entries_before_span, update_position,
        EntrySpan,
    },
};

type Result<T, E = Error> = std::result::Result<T, E>;

/// The length of a date value in the format `YYYY-MM-DD`.
pub const DATE_LENGTH: usize = 10;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(context(suffix(Error)))]
pub enum Error {
    #[snafu(display(
        "{function}(): {map} entry at #{pos} cannot be moved {removed} positions back"
    ))]
    PositionTooSmall {
        function: String,
        map: &'static str,
        pos: usize,
        removed: usize,
    },
    #[snafu(display("{function}(): {map} entry starts at #{pos} instead of #{expected}"))]
    InvalidPosition {
        function: String,
        map: &'static str,
        pos: usize,
        expected: usize,
    },
    #[snafu(display("{function}(): {map} ends at #{end} instead of #{expected}"))]
    InvalidEnd {
        function: String,
        map: &'static str,
        end: usize,
        expected: usize,
    },
    #[snafu(display("{function}(): invalid date '{value}' in {map}"))]
    InvalidDate {
        function: String,
        map: &'static str,
        value: String,
    },
    #[snafu(display("cannot remove a token from an already empty {map} entry"))]
    EntryAlreadyEmpty { map: &'static str },
}

/// A text map entry annotates one part of a text, defined by its position
/// and length, with a string value (an article ID or a date).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMapEntry {
    /// Position of the annotated part, zero at the very beginning.
    pub pos: usize,
    /// Length of the annotated part.
    pub len: usize,
    /// Value of the annotation; empty for unlabelled spans.
    pub value: String,
}

impl TextMapEntry {
    /// Creates an unlabelled annotation.
    pub fn new(pos: usize, len: usize) -> Self {
        Self {
            pos,
            len,
            value: String::new(),
        }
    }

    /// Creates a labelled annotation.
    pub fn with_value(pos: usize, len: usize, value: impl Into<String>) -> Self {
        Self {
            pos,
            len,
            value: value.into(),
        }
    }
}

/// A sentence map entry has a position and a length only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceEntry {
    pub pos: usize,
    pub len: usize,
}

impl SentenceEntry {
    pub fn new(pos: usize, len: usize) -> Self {
        Self { pos, len }
    }
}

/// A text map is a vector of text map entries.
pub type TextMap = Vec<TextMapEntry>;

/// A sentence map is a vector of sentence entries.
pub type SentenceMap = Vec<SentenceEntry>;

/// Position and length access shared by text and sentence map entries.
///
/// The map primitives in [`ops`](crate::ops) are generic over this trait;
/// they are the only places that mutate map entries.
pub trait MapEntry {
    fn pos(&self) -> usize;
    fn set_pos(&mut self, pos: usize);
    fn len(&self) -> usize;
    fn set_len(&mut self, len: usize);

    /// One past the last annotated position.
    fn end(&self) -> usize {
        self.pos() + self.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MapEntry for TextMapEntry {
    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn len(&self) -> usize {
        self.len
    }

    fn set_len(&mut self, len: usize) {
        self.len = len;
    }
}

impl MapEntry for SentenceEntry {
    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn len(&self) -> usize {
        self.len
    }

    fn set_len(&mut self, len: usize) {
        self.len = len;
    }
}
