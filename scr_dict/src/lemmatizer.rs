//! Multilingual lemmatizer backed by per-language dictionary files.

use std::{collections::HashMap, path::PathBuf};

use tracing::{debug, warn};

use crate::{parse_count, read_columns, surface_len, DictProperty, Result};

type Dictionary = HashMap<String, Vec<DictProperty>>;

/// Lemmatizer holding one dictionary per language/model name.
///
/// Dictionaries are loaded from `<base>/<name>` once via
/// [`preload`](Self::preload); lemmatization itself is infallible.
pub struct Lemmatizer {
    base: PathBuf,
    dictionaries: HashMap<String, Dictionary>,
}

impl Lemmatizer {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            dictionaries: HashMap::new(),
        }
    }

    /// Loads the dictionary with the given name, if not already loaded.
    pub fn preload(&mut self, name: &str) -> Result<()> {
        if self.dictionaries.contains_key(name) {
            return Ok(());
        }

        let path = self.base.join(name);
        let mut dictionary = Dictionary::new();

        for (index, columns) in read_columns(&path)?.into_iter().enumerate() {
            let count = parse_count(&columns, &path, index + 1)?;
            let mut columns = columns.into_iter();

            let surface = match columns.next() {
                Some(surface) if !surface.is_empty() => surface,
                _ => continue,
            };

            let property = DictProperty {
                lemma: columns.next().unwrap_or_default(),
                tag: columns.next().unwrap_or_default(),
                count,
            };

            dictionary.entry(surface).or_default().push(property);
        }

        debug!(name, entries = dictionary.len(), "loaded lemma dictionary");

        self.dictionaries.insert(name.to_string(), dictionary);

        Ok(())
    }

    /// Replaces the token with its lemma, leaving unknown tokens alone.
    ///
    /// A token may carry a POS tag after a space; among multiple lemma
    /// candidates the one whose tag shares the longest prefix with the
    /// token's tag wins, ties broken by occurrence count.
    pub fn lemmatize(&self, token: &mut String, dictionary: &str) {
        let Some(dictionary) = self.dictionaries.get(dictionary) else {
            warn!(dictionary, "lemma dictionary has not been loaded");

            return;
        };

        let word_len = surface_len(token);

        let Some(properties) = dictionary.get(&token[..word_len]) else {
            return;
        };

        match properties.as_slice() {
            [] => {}
            [single] => *token = single.lemma.clone(),
            _ => {
                let tag = token.get(word_len + 1..).unwrap_or("");

                let best = properties
                    .iter()
                    .max_by_key(|property| (shared_prefix(tag, &property.tag), property.count));

                if let Some(best) = best {
                    *token = best.lemma.clone();
                }
            }
        }
    }

    /// Frees the memory used by all loaded dictionaries.
    pub fn clear(&mut self) {
        self.dictionaries = HashMap::new();
    }
}

/// Number of equal bytes at the beginning of both strings.
fn shared_prefix(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn dictionary_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("de")).unwrap();

        writeln!(file, "Häuser\tHaus\tNN\t120").unwrap();
        writeln!(file, "läuft\tlaufen\tVVFIN\t80").unwrap();
        writeln!(file, "Lauf\tLauf\tNN\t50").unwrap();
        writeln!(file, "Lauf\tlaufen\tVVIMP\t10").unwrap();

        dir
    }

    fn lemmatized(lemmatizer: &Lemmatizer, token: &str) -> String {
        let mut token = token.to_string();

        lemmatizer.lemmatize(&mut token, "de");

        token
    }

    #[test]
    fn single_candidate_wins() {
        let dir = dictionary_dir();
        let mut lemmatizer = Lemmatizer::new(dir.path());

        lemmatizer.preload("de").unwrap();

        assert_eq!(lemmatized(&lemmatizer, "Häuser"), "Haus");
        assert_eq!(lemmatized(&lemmatizer, "läuft"), "laufen");
        assert_eq!(lemmatized(&lemmatizer, "unbekannt"), "unbekannt");
    }

    #[test]
    fn tag_disambiguates_candidates() {
        let dir = dictionary_dir();
        let mut lemmatizer = Lemmatizer::new(dir.path());

        lemmatizer.preload("de").unwrap();

        assert_eq!(lemmatized(&lemmatizer, "Lauf VVIMP"), "laufen");
        // without a tag the more frequent candidate wins
        assert_eq!(lemmatized(&lemmatizer, "Lauf"), "Lauf");
    }

    #[test]
    fn bad_count_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("bad")).unwrap();

        writeln!(file, "a\tb\tc\tnot-a-number").unwrap();

        let mut lemmatizer = Lemmatizer::new(dir.path());

        assert!(lemmatizer.preload("bad").is_err());
    }
}
