//! The model vocabulary: token strings, their frequencies, and the
//! reordering applied when infrequent and overly frequent tokens are
//! removed before training.

use std::collections::HashMap;

use crate::{ModelFileInvalidError, Result};

/// Interned vocabulary with collection and document frequencies.
///
/// After [`prepare`](Self::prepare), the words used for training occupy
/// the front of the dictionary; removed words follow, with the removed
/// most-frequent words at the very end.
#[derive(Clone, Debug, Default)]
pub(crate) struct Vocabulary {
    words: Vec<String>,
    ids: HashMap<String, u32>,
    cf: Vec<u64>,
    df: Vec<u64>,
    used: usize,
    removed_top: usize,
}

impl Vocabulary {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a prepared vocabulary from its serialized form.
    pub(crate) fn restore(
        frequencies: Vec<(String, u64, u64)>,
        used: usize,
        removed_top: usize,
    ) -> Result<Self> {
        if used + removed_top > frequencies.len() {
            return ModelFileInvalidError {
                reason: "vocabulary partition exceeds its size",
            }
            .fail();
        }

        let mut vocab = Self::new();

        for (id, (word, cf, df)) in frequencies.into_iter().enumerate() {
            vocab.ids.insert(word.clone(), id as u32);
            vocab.words.push(word);
            vocab.cf.push(cf);
            vocab.df.push(df);
        }

        vocab.used = used;
        vocab.removed_top = removed_top;

        Ok(vocab)
    }

    /// Interns one occurrence of a word, returning its ID.
    pub(crate) fn add_occurrence(&mut self, word: &str) -> u32 {
        match self.ids.get(word) {
            Some(&id) => {
                self.cf[id as usize] += 1;

                id
            }
            None => {
                let id = self.words.len() as u32;

                self.words.push(word.to_string());
                self.ids.insert(word.to_string(), id);
                self.cf.push(1);
                self.df.push(0);

                id
            }
        }
    }

    /// Counts one document containing the word.
    pub(crate) fn add_document_with(&mut self, id: u32) {
        self.df[id as usize] += 1;
    }

    pub(crate) fn word(&self, id: u32) -> &str {
        &self.words[id as usize]
    }

    pub(crate) fn id(&self, word: &str) -> Option<u32> {
        self.ids.get(word).copied()
    }

    pub(crate) fn words(&self) -> &[String] {
        &self.words
    }

    pub(crate) fn cf(&self, id: u32) -> u64 {
        self.cf[id as usize]
    }

    pub(crate) fn df(&self, id: u32) -> u64 {
        self.df[id as usize]
    }

    /// Number of distinct words, including removed ones.
    pub(crate) fn len(&self) -> usize {
        self.words.len()
    }

    /// Number of distinct words used for training.
    pub(crate) fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn removed_top(&self) -> usize {
        self.removed_top
    }

    /// The removed most-frequent words, stored at the tail of the
    /// dictionary.
    pub(crate) fn removed_tokens(&self) -> Vec<String> {
        self.words[self.words.len() - self.removed_top..].to_vec()
    }

    /// Applies token removal and reorders the dictionary: words passing
    /// the frequency criteria first, then the words below them, then the
    /// `top_n` most frequent words, which are always removed.
    ///
    /// Returns the mapping from old to new IDs.
    pub(crate) fn prepare(&mut self, min_cf: u64, min_df: u64, top_n: usize) -> Vec<u32> {
        let min_cf = min_cf.max(1);
        let min_df = min_df.max(1);

        let mut usable: Vec<u32> = Vec::new();
        let mut infrequent: Vec<u32> = Vec::new();

        for id in 0..self.words.len() as u32 {
            if self.cf[id as usize] >= min_cf && self.df[id as usize] >= min_df {
                usable.push(id);
            } else {
                infrequent.push(id);
            }
        }

        // the most frequent usable words become stopwords
        let top_n = top_n.min(usable.len());
        let mut by_frequency = usable.clone();

        by_frequency.sort_by_key(|&id| (std::cmp::Reverse(self.cf[id as usize]), id));

        let removed_top: Vec<u32> = by_frequency[..top_n].to_vec();

        usable.retain(|id| !removed_top.contains(id));

        self.used = usable.len();
        self.removed_top = top_n;

        // rebuild the dictionary in the new order
        let order: Vec<u32> = usable
            .iter()
            .chain(infrequent.iter())
            .chain(removed_top.iter())
            .copied()
            .collect();

        let mut remap = vec![0u32; self.words.len()];
        let mut words = Vec::with_capacity(self.words.len());
        let mut cf = Vec::with_capacity(self.cf.len());
        let mut df = Vec::with_capacity(self.df.len());

        for (new_id, &old_id) in order.iter().enumerate() {
            remap[old_id as usize] = new_id as u32;

            words.push(std::mem::take(&mut self.words[old_id as usize]));
            cf.push(self.cf[old_id as usize]);
            df.push(self.df[old_id as usize]);
        }

        self.ids = words
            .iter()
            .enumerate()
            .map(|(id, word)| (word.clone(), id as u32))
            .collect();
        self.words = words;
        self.cf = cf;
        self.df = df;

        remap
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn vocabulary(documents: &[&[&str]]) -> Vocabulary {
        let mut vocab = Vocabulary::new();

        for document in documents {
            let mut seen = Vec::new();

            for word in *document {
                let id = vocab.add_occurrence(word);

                if !seen.contains(&id) {
                    seen.push(id);

                    vocab.add_document_with(id);
                }
            }
        }

        vocab
    }

    #[test]
    fn frequencies_are_tracked() {
        let vocab = vocabulary(&[&["a", "b", "a"], &["a", "c"]]);

        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.cf(vocab.id("a").unwrap()), 3);
        assert_eq!(vocab.df(vocab.id("a").unwrap()), 2);
        assert_eq!(vocab.df(vocab.id("b").unwrap()), 1);
    }

    #[test]
    fn preparation_moves_removed_words_to_the_tail() {
        let mut vocab = vocabulary(&[&["a", "b", "a", "rare"], &["a", "b", "c"], &["b", "c"]]);

        // remove words occurring in fewer than two documents, plus the
        // single most frequent word
        let remap = vocab.prepare(0, 2, 1);

        assert_eq!(vocab.used(), 2);
        assert_eq!(vocab.removed_top(), 1);
        // "a" and "b" tie at cf 3; the earlier word wins and is removed
        assert_eq!(vocab.removed_tokens(), vec!["a".to_string()]);
        assert_eq!(vocab.words()[..2], ["b".to_string(), "c".to_string()]);
        // "rare" fails both criteria and sits between used and top
        assert_eq!(vocab.word(2), "rare");
        assert_eq!(remap.len(), 4);
        assert_eq!(vocab.id("b"), Some(0));
    }
}
