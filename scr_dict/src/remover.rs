//! Stopword removal against a pre-loaded dictionary.

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
};

use tracing::{debug, warn};

use crate::{read_columns, surface_len, Result};

/// Empties tokens whose surface form appears in a dictionary.
pub struct StopwordRemover {
    base: PathBuf,
    dictionaries: HashMap<String, HashSet<String>>,
}

impl StopwordRemover {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            dictionaries: HashMap::new(),
        }
    }

    /// Loads the dictionary with the given name, if not already loaded.
    /// Only the surface column is used.
    pub fn preload(&mut self, name: &str) -> Result<()> {
        if self.dictionaries.contains_key(name) {
            return Ok(());
        }

        let path = self.base.join(name);
        let mut dictionary = HashSet::new();

        for mut columns in read_columns(&path)? {
            if !columns.is_empty() && !columns[0].is_empty() {
                dictionary.insert(columns.swap_remove(0));
            }
        }

        debug!(name, entries = dictionary.len(), "loaded stopword dictionary");

        self.dictionaries.insert(name.to_string(), dictionary);

        Ok(())
    }

    /// Empties the token if its surface form is in the dictionary.
    pub fn remove(&self, token: &mut String, dictionary: &str) {
        let Some(dictionary) = self.dictionaries.get(dictionary) else {
            warn!(dictionary, "stopword dictionary has not been loaded");

            return;
        };

        if dictionary.contains(&token[..surface_len(token)]) {
            token.clear();
        }
    }

    /// Frees the memory used by all loaded dictionaries.
    pub fn clear(&mut self) {
        self.dictionaries = HashMap::new();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn listed_words_are_emptied() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("stop")).unwrap();

        writeln!(file, "der\t\tART\t1000").unwrap();
        writeln!(file, "die").unwrap();

        let mut remover = StopwordRemover::new(dir.path());

        remover.preload("stop").unwrap();

        let mut kept = "Haus".to_string();
        let mut dropped = "der".to_string();
        let mut tagged = "die ART".to_string();

        remover.remove(&mut kept, "stop");
        remover.remove(&mut dropped, "stop");
        remover.remove(&mut tagged, "stop");

        assert_eq!(kept, "Haus");
        assert_eq!(dropped, "");
        assert_eq!(tagged, "");
    }
}
