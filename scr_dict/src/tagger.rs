//! Lexicon-based POS tagging over whole sentences.

use std::{collections::HashMap, path::Path};

use tracing::debug;

use crate::{parse_count, read_columns, Result, COL_TAG};

/// Sentence manipulator appending a POS tag to every known token.
///
/// Tags are attached after a single space, the convention the lemmatizer
/// understands. Unknown tokens are left untouched.
pub struct Tagger {
    lexicon: HashMap<String, (String, u64)>,
}

impl Tagger {
    /// Loads a tagging model from a dictionary file; for ambiguous surface
    /// forms the tag with the highest occurrence count wins.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut lexicon: HashMap<String, (String, u64)> = HashMap::new();

        for (index, columns) in read_columns(&path)?.into_iter().enumerate() {
            let count = parse_count(&columns, &path, index + 1)?;

            let (Some(surface), Some(tag)) = (columns.first(), columns.get(COL_TAG)) else {
                continue;
            };

            if surface.is_empty() || tag.is_empty() {
                continue;
            }

            match lexicon.get_mut(surface) {
                Some(existing) if existing.1 >= count => {}
                Some(existing) => *existing = (tag.clone(), count),
                None => {
                    lexicon.insert(surface.clone(), (tag.clone(), count));
                }
            }
        }

        debug!(entries = lexicon.len(), "loaded tagging lexicon");

        Ok(Self { lexicon })
    }

    /// Tags all tokens of a sentence in place.
    pub fn label(&self, sentence: &mut [String]) {
        for token in sentence {
            if let Some((tag, _)) = self.lexicon.get(token.as_str()) {
                token.push(' ');
                token.push_str(tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn known_tokens_are_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags");
        let mut file = std::fs::File::create(&path).unwrap();

        writeln!(file, "Haus\tHaus\tNN\t120").unwrap();
        writeln!(file, "liegt\tliegen\tVVFIN\t80").unwrap();
        writeln!(file, "liegt\tliegen\tXY\t3").unwrap();

        let tagger = Tagger::load(&path).unwrap();
        let mut sentence: Vec<String> = ["Das", "Haus", "liegt"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        tagger.label(&mut sentence);

        assert_eq!(sentence, vec!["Das", "Haus NN", "liegt VVFIN"]);
    }
}
