//! A text corpus with optional article and date maps that can be sliced
//! into smaller chunks to fit into a database, filtered, and tokenized
//! into a processed token sequence with a parallel sentence map.
//!
//! NOTE: All input data needs to be sorted by date. Texts without dates
//! need to be added first.

mod check;
mod chunks;
mod combine;
mod error;
mod filter;
mod merge;
mod tokenize;

use std::path::PathBuf;

use scr_dict::{Lemmatizer, StopwordRemover};
use scr_textmap::MapEntry;

pub use scr_status::StatusSetter;
pub use scr_textmap::{SentenceEntry, SentenceMap, TextMap, TextMapEntry, DATE_LENGTH};

pub use crate::{
    error::Error,
    tokenize::{
        SENTENCE_MANIP_NONE, SENTENCE_MANIP_TAGGER, TOKEN_MANIP_ENGLISH_STEMMER,
        TOKEN_MANIP_GERMAN_STEMMER, TOKEN_MANIP_LEMMATIZER, TOKEN_MANIP_NONE,
        TOKEN_MANIP_REMOVE_SINGLE_UTF8_CHARS, TOKEN_MANIP_STOPWORD_REMOVER,
    },
};

type Result<T, E = Error> = std::result::Result<T, E>;

/// After how many sentences the status is updated when merging corpora.
pub const MERGE_UPDATE_EVERY: usize = 10_000;

/// After how many sentences the status is updated when tokenizing.
pub const TOKENIZE_UPDATE_EVERY: usize = 10_000;

/// After how many articles the status is updated when filtering.
pub const FILTER_UPDATE_EVERY: usize = 10_000;

/// Default directory containing manipulator dictionaries and models.
pub const DEFAULT_DICTIONARY_DIR: &str = "dicts";

/// Callback deciding whether to keep an article, given all tokens of the
/// corpus plus the position and length of the article.
pub type ArticleCallback<'a> = &'a mut dyn FnMut(&[String], usize, usize) -> bool;

/// Callback manipulating a whole sentence.
pub type SentenceCallback<'a> = &'a mut dyn FnMut(&mut Vec<String>);

/// Callback manipulating a single token; emptying the token removes it.
pub type TokenCallback<'a> = &'a mut dyn FnMut(&mut String);

/// The text of a corpus: one continuous, space-delimited buffer, or the
/// token sequence it is turned into by tokenization. Once tokenized, a
/// corpus never returns to its continuous form.
pub(crate) enum Text {
    Continuous(String),
    Tokenized(Tokenized),
}

#[derive(Default)]
pub(crate) struct Tokenized {
    pub(crate) tokens: Vec<String>,
    /// Sum of the UTF-8 byte lengths of all non-empty tokens.
    pub(crate) token_bytes: usize,
    pub(crate) sentence_map: SentenceMap,
}

/// A text corpus.
///
/// Article and date maps annotate which parts of the corpus belong to
/// which article or day; both reference the corpus by byte offsets while
/// it is continuous and by token indices after tokenization.
pub struct Corpus {
    pub(crate) text: Text,
    pub(crate) article_map: TextMap,
    pub(crate) date_map: TextMap,
    pub(crate) check_consistency: bool,
    pub(crate) dictionary_dir: PathBuf,
    pub(crate) lemmatizer: Lemmatizer,
    pub(crate) stopword_remover: StopwordRemover,
}

impl Corpus {
    /// Creates an empty corpus.
    ///
    /// If `check_consistency` is set, the corpus invariants are validated
    /// after every mutating operation.
    pub fn new(check_consistency: bool) -> Self {
        Self::with_dictionary_dir(check_consistency, DEFAULT_DICTIONARY_DIR)
    }

    /// Creates an empty corpus resolving manipulator dictionaries and
    /// models against the given directory.
    pub fn with_dictionary_dir(check_consistency: bool, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();

        Self {
            text: Text::Continuous(String::new()),
            article_map: TextMap::new(),
            date_map: TextMap::new(),
            check_consistency,
            lemmatizer: Lemmatizer::new(&dir),
            stopword_remover: StopwordRemover::new(&dir),
            dictionary_dir: dir,
        }
    }

    /*
     * GETTERS
     */

    /// Whether the corpus has been tokenized.
    pub fn is_tokenized(&self) -> bool {
        matches!(self.text, Text::Tokenized(_))
    }

    /// The continuous text of the corpus.
    pub fn text(&self) -> Result<&str> {
        self.require_continuous("text").map(String::as_str)
    }

    /// The tokens of a tokenized corpus.
    pub fn tokens(&self) -> Result<&[String]> {
        self.require_tokenized("tokens")
            .map(|t| t.tokens.as_slice())
    }

    /// The number of tokens in a tokenized corpus.
    pub fn num_tokens(&self) -> Result<usize> {
        self.require_tokenized("num_tokens").map(|t| t.tokens.len())
    }

    /// Whether the corpus has an article map.
    pub fn has_article_map(&self) -> bool {
        !self.article_map.is_empty()
    }

    /// The article map of the corpus; empty if none has been specified.
    pub fn article_map(&self) -> &TextMap {
        &self.article_map
    }

    /// Whether the corpus has a date map.
    pub fn has_date_map(&self) -> bool {
        !self.date_map.is_empty()
    }

    /// The date map of the corpus; empty if none has been specified.
    pub fn date_map(&self) -> &TextMap {
        &self.date_map
    }

    /// Whether the corpus has a sentence map.
    pub fn has_sentence_map(&self) -> bool {
        match &self.text {
            Text::Continuous(_) => false,
            Text::Tokenized(t) => !t.sentence_map.is_empty(),
        }
    }

    /// The sentence map of a tokenized corpus.
    pub fn sentence_map(&self) -> Result<&SentenceMap> {
        self.require_tokenized("sentence_map")
            .map(|t| &t.sentence_map)
    }

    /// The size of the corpus, in bytes.
    ///
    /// The number of characters may differ, as the corpus is UTF-8.
    pub fn size(&self) -> usize {
        match &self.text {
            Text::Continuous(corpus) => corpus.len(),
            Text::Tokenized(t) => t.token_bytes,
        }
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        match &self.text {
            Text::Continuous(corpus) => corpus.is_empty(),
            Text::Tokenized(t) => t.tokens.is_empty(),
        }
    }

    /// A copy of the article with the given index from a continuous
    /// corpus.
    pub fn get(&self, index: usize) -> Result<String> {
        let corpus = self.require_continuous("get")?;
        let entry = self.article_at("get", index)?;

        Ok(corpus[entry.pos..entry.end()].to_string())
    }

    /// A copy of the article with the given ID from a continuous corpus,
    /// or an empty string if there is no such article.
    pub fn get_by_id(&self, id: &str) -> Result<String> {
        let corpus = self.require_continuous("get_by_id")?;

        if id.is_empty() {
            return error::EmptyArticleIdError {
                operation: "get_by_id",
            }
            .fail();
        }

        Ok(self
            .article_map
            .iter()
            .find(|entry| entry.value == id)
            .map(|entry| corpus[entry.pos..entry.end()].to_string())
            .unwrap_or_default())
    }

    /// A copy of all articles at the given date from a continuous corpus,
    /// concatenated, or an empty string if there are none.
    pub fn get_date(&self, date: &str) -> Result<String> {
        let corpus = self.require_continuous("get_date")?;

        check_date_length("get_date", date)?;

        Ok(self
            .date_map
            .iter()
            .find(|entry| entry.value == date)
            .map(|entry| corpus[entry.pos..entry.end()].to_string())
            .unwrap_or_default())
    }

    /// Copies of the tokens of the article with the given index from a
    /// tokenized corpus.
    pub fn get_tokenized(&self, index: usize) -> Result<Vec<String>> {
        let tokenized = self.require_tokenized("get_tokenized")?;
        let entry = self.article_at("get_tokenized", index)?;

        Ok(tokenized.tokens[entry.pos..entry.end()].to_vec())
    }

    /// Copies of the tokens of the article with the given ID from a
    /// tokenized corpus, or an empty vector if there is no such article.
    pub fn get_tokenized_by_id(&self, id: &str) -> Result<Vec<String>> {
        let tokenized = self.require_tokenized("get_tokenized_by_id")?;

        if id.is_empty() {
            return error::EmptyArticleIdError {
                operation: "get_tokenized_by_id",
            }
            .fail();
        }

        Ok(tokens_for_entry(&self.article_map, id, &tokenized.tokens))
    }

    /// Copies of the tokens of all articles at the given date from a
    /// tokenized corpus, or an empty vector if there are none.
    pub fn get_date_tokenized(&self, date: &str) -> Result<Vec<String>> {
        let tokenized = self.require_tokenized("get_date_tokenized")?;

        check_date_length("get_date_tokenized", date)?;

        Ok(tokens_for_entry(&self.date_map, date, &tokenized.tokens))
    }

    /// Copies of the tokens of all articles from a tokenized corpus.
    pub fn get_articles(&self) -> Result<Vec<Vec<String>>> {
        let tokenized = self.require_tokenized("get_articles")?;

        Ok(self
            .article_map
            .iter()
            .map(|entry| tokenized.tokens[entry.pos..entry.end()].to_vec())
            .collect())
    }

    /// A copy of the given byte range of a continuous corpus.
    pub fn substr(&self, from: usize, len: usize) -> Result<String> {
        let corpus = self.require_continuous("substr")?;

        corpus
            .get(from..from + len)
            .map(str::to_string)
            .ok_or(Error::SubstrOutOfBounds {
                operation: "substr",
                from,
                len,
            })
    }

    /*
     * CREATION
     */

    /// Creates the corpus from a vector of texts, concatenated and
    /// delimited by single spaces. An existing corpus is cleared first.
    ///
    /// If `delete_input`, every input string is released as soon as it
    /// has been appended, freeing its memory early.
    pub fn create(&mut self, texts: &mut Vec<String>, delete_input: bool) {
        self.clear();

        let mut corpus = String::new();

        for text in texts.iter_mut() {
            corpus.push_str(text);

            if delete_input {
                std::mem::take(text);
            }

            corpus.push(' ');
        }

        if delete_input {
            std::mem::take(texts);
        }

        // remove the trailing space
        corpus.pop();

        self.text = Text::Continuous(corpus);
    }

    /// Creates the corpus from parsed data, including article and date
    /// maps. An existing corpus is cleared first.
    ///
    /// Consecutive texts sharing an article ID merge into one article
    /// entry; the empty ID is a valid unlabelled article. Dates behave
    /// the same on the first ten bytes of the date/time; a date/time too
    /// short to contain a date closes the pending date entry.
    pub fn create_with_maps(
        &mut self,
        texts: &mut Vec<String>,
        article_ids: &mut Vec<String>,
        date_times: &mut Vec<String>,
        delete_input: bool,
    ) {
        if article_ids.is_empty() && date_times.is_empty() {
            self.create(texts, delete_input);

            return;
        }

        self.clear();

        let mut corpus = String::new();
        let mut article_map = TextMap::new();
        let mut date_map = TextMap::new();
        let mut pending_date = TextMapEntry::default();

        for n in 0..texts.len() {
            let pos = corpus.len();
            let text_len = texts[n].len();
            let id = article_ids.get(n).map(String::as_str).unwrap_or("");

            // extend the previous article entry or start a new one
            if matches!(article_map.last(), Some(last) if last.value == id) {
                if let Some(last) = article_map.last_mut() {
                    // including the space before the current text
                    last.len += text_len + 1;
                }
            } else {
                article_map.push(TextMapEntry::with_value(pos, text_len, id));
            }

            // track the pending date entry
            let date_time = date_times.get(n).map(String::as_str).unwrap_or("");

            if !date_time.is_empty() {
                match date_time.get(..DATE_LENGTH) {
                    Some(date) => {
                        if pending_date.value.is_empty() {
                            pending_date = TextMapEntry::with_value(pos, text_len, date);
                        } else if pending_date.value == date {
                            // including the space before the current text
                            pending_date.len += text_len + 1;
                        } else {
                            date_map.push(std::mem::replace(
                                &mut pending_date,
                                TextMapEntry::with_value(pos, text_len, date),
                            ));
                        }
                    }
                    None if !pending_date.value.is_empty() => {
                        // no valid date, conclude the pending one
                        date_map.push(std::mem::take(&mut pending_date));
                    }
                    None => {}
                }
            }

            corpus.push_str(&texts[n]);

            if delete_input {
                std::mem::take(&mut texts[n]);

                if let Some(id) = article_ids.get_mut(n) {
                    std::mem::take(id);
                }

                if let Some(date_time) = date_times.get_mut(n) {
                    std::mem::take(date_time);
                }
            }

            corpus.push(' ');
        }

        if delete_input {
            std::mem::take(texts);
            std::mem::take(article_ids);
            std::mem::take(date_times);
        }

        // remove the trailing space
        corpus.pop();

        // conclude the last date
        if !pending_date.value.is_empty() {
            date_map.push(pending_date);
        }

        self.text = Text::Continuous(corpus);
        self.article_map = article_map;
        self.date_map = date_map;
    }

    /*
     * CLEANUP
     */

    /// Clears the text of the corpus as well as its maps, freeing the
    /// memory used by them.
    pub fn clear(&mut self) {
        self.text = Text::Continuous(String::new());
        self.article_map = TextMap::new();
        self.date_map = TextMap::new();
    }

    /*
     * INTERNAL HELPERS
     */

    pub(crate) fn require_continuous(&self, operation: &'static str) -> Result<&String> {
        match &self.text {
            Text::Continuous(corpus) => Ok(corpus),
            Text::Tokenized(_) => error::CorpusAlreadyTokenizedError { operation }.fail(),
        }
    }

    pub(crate) fn require_tokenized(&self, operation: &'static str) -> Result<&Tokenized> {
        match &self.text {
            Text::Continuous(_) => error::CorpusNotTokenizedError { operation }.fail(),
            Text::Tokenized(tokenized) => Ok(tokenized),
        }
    }

    fn article_at(&self, operation: &'static str, index: usize) -> Result<&TextMapEntry> {
        if self.article_map.is_empty() {
            return error::ArticleMapEmptyError { operation, index }.fail();
        }

        self.article_map
            .get(index)
            .ok_or(Error::ArticleOutOfBounds {
                operation,
                index,
                size: self.article_map.len(),
            })
    }
}

fn check_date_length(operation: &'static str, date: &str) -> Result<()> {
    if date.len() != DATE_LENGTH {
        return error::InvalidDateLengthError {
            operation,
            len: date.len(),
        }
        .fail();
    }

    Ok(())
}

/// All tokens belonging to the first map entry with the given value.
fn tokens_for_entry(map: &TextMap, value: &str, tokens: &[String]) -> Vec<String> {
    map.iter()
        .find(|entry| entry.value == value)
        .map(|entry| tokens[entry.pos..entry.end()].to_vec())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    pub(crate) fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_corpus() {
        let mut corpus = Corpus::new(true);

        corpus.create_with_maps(&mut vec![], &mut vec![], &mut vec![], false);

        assert_eq!(corpus.size(), 0);
        assert!(corpus.is_empty());
        assert!(!corpus.has_article_map());
        assert!(!corpus.has_date_map());
    }

    #[test]
    fn three_articles_same_date() {
        let mut corpus = Corpus::new(true);

        corpus.create_with_maps(
            &mut strings(&["A b c", "D e", "F g h i"]),
            &mut strings(&["a1", "a2", "a3"]),
            &mut strings(&[
                "2020-01-01T00:00:00",
                "2020-01-01T12:00:00",
                "2020-01-01T23:59:59",
            ]),
            false,
        );

        assert_eq!(corpus.text().unwrap(), "A b c D e F g h i");
        assert_eq!(
            *corpus.article_map(),
            vec![
                TextMapEntry::with_value(0, 5, "a1"),
                TextMapEntry::with_value(6, 3, "a2"),
                TextMapEntry::with_value(10, 7, "a3"),
            ]
        );
        assert_eq!(
            *corpus.date_map(),
            vec![TextMapEntry::with_value(0, 17, "2020-01-01")]
        );
    }

    #[test]
    fn consecutive_articles_with_equal_ids_merge() {
        let mut corpus = Corpus::new(true);

        corpus.create_with_maps(
            &mut strings(&["one", "two", "three"]),
            &mut strings(&["a", "a", "b"]),
            &mut vec![],
            false,
        );

        assert_eq!(corpus.text().unwrap(), "one two three");
        assert_eq!(
            *corpus.article_map(),
            vec![
                TextMapEntry::with_value(0, 7, "a"),
                TextMapEntry::with_value(8, 5, "b"),
            ]
        );
    }

    #[test]
    fn unlabelled_articles_merge_too() {
        let mut corpus = Corpus::new(true);

        corpus.create_with_maps(
            &mut strings(&["x", "y"]),
            &mut strings(&["", ""]),
            &mut vec![],
            false,
        );

        assert_eq!(*corpus.article_map(), vec![TextMapEntry::new(0, 3)]);
    }

    #[test]
    fn date_changes_conclude_entries() {
        let mut corpus = Corpus::new(true);

        corpus.create_with_maps(
            &mut strings(&["early", "later", "last"]),
            &mut strings(&["a1", "a2", "a3"]),
            &mut strings(&["2020-01-01T06:00:00", "2020-01-02T06:00:00", "2020-01-02"]),
            false,
        );

        assert_eq!(
            *corpus.date_map(),
            vec![
                TextMapEntry::with_value(0, 5, "2020-01-01"),
                TextMapEntry::with_value(6, 10, "2020-01-02"),
            ]
        );
    }

    #[test]
    fn short_date_time_concludes_pending_date() {
        let mut corpus = Corpus::new(false);

        corpus.create_with_maps(
            &mut strings(&["a", "b"]),
            &mut strings(&["a1", "a2"]),
            &mut strings(&["2020-01-01T00:00:00", "?"]),
            false,
        );

        assert_eq!(
            *corpus.date_map(),
            vec![TextMapEntry::with_value(0, 1, "2020-01-01")]
        );
    }

    #[test]
    fn delete_input_releases_sources() {
        let mut corpus = Corpus::new(true);
        let mut texts = strings(&["a", "b"]);

        corpus.create(&mut texts, true);

        assert!(texts.is_empty());
        assert_eq!(corpus.text().unwrap(), "a b");
    }

    #[test]
    fn getters_enforce_the_active_variant() {
        let mut corpus = Corpus::new(true);

        corpus.create_with_maps(
            &mut strings(&["A b c", "D e"]),
            &mut strings(&["a1", "a2"]),
            &mut vec![],
            false,
        );

        assert_eq!(corpus.get(0).unwrap(), "A b c");
        assert_eq!(corpus.get_by_id("a2").unwrap(), "D e");
        assert_eq!(corpus.get_by_id("nope").unwrap(), "");
        assert!(matches!(
            corpus.get(2),
            Err(Error::ArticleOutOfBounds { .. })
        ));
        assert!(matches!(
            corpus.tokens(),
            Err(Error::CorpusNotTokenized { .. })
        ));
        assert!(matches!(
            corpus.get_date("2020"),
            Err(Error::InvalidDateLength { .. })
        ));
        assert_eq!(corpus.substr(2, 3).unwrap(), "b c");
        assert!(corpus.substr(2, 30).is_err());
    }
}
