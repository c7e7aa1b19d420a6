//! Whole-corpus consistency checks.

use scr_textmap::{check_sentence_map, check_text_map, MapEntry};

use crate::{error::SentenceBehindEntryError, Corpus, Result, Text, TextMap};

/// Validates the corpus invariants: all maps tile the text without gaps
/// and end at the corpus length, date values are well-formed, and every
/// sentence lies inside its enclosing article and date.
pub(crate) fn check_corpus(
    function: &'static str,
    article_map: &TextMap,
    date_map: &TextMap,
    text: &Text,
) -> Result<()> {
    let (end, is_tokenized) = match text {
        Text::Continuous(corpus) => (corpus.len(), false),
        Text::Tokenized(t) => (t.tokens.len(), true),
    };

    if let Text::Tokenized(t) = text {
        check_nesting(function, article_map, date_map, &t.sentence_map)?;

        check_sentence_map(function, &t.sentence_map, end, true)?;
    }

    check_text_map(function, "date map", date_map, end, is_tokenized, true)?;
    check_text_map(function, "article map", article_map, end, is_tokenized, false)?;

    Ok(())
}

/// Checks that every sentence ends at or before the end of the article
/// and the date it starts in.
fn check_nesting(
    function: &'static str,
    article_map: &TextMap,
    date_map: &TextMap,
    sentence_map: &[scr_textmap::SentenceEntry],
) -> Result<()> {
    if article_map.is_empty() || date_map.is_empty() || sentence_map.is_empty() {
        return Ok(());
    }

    let mut articles = article_map.iter().peekable();
    let mut sentences = sentence_map.iter().peekable();

    for date in date_map {
        let date_end = date.end();

        // jump to the first article and sentence of the date
        while articles.peek().is_some_and(|article| article.pos < date.pos) {
            articles.next();
        }

        while sentences.peek().is_some_and(|sentence| sentence.pos < date.pos) {
            sentences.next();
        }

        while let Some(article) = articles.peek().copied() {
            if article.pos >= date_end {
                break;
            }

            // jump to the first sentence of the article
            while sentences
                .peek()
                .is_some_and(|sentence| sentence.pos < article.pos)
            {
                sentences.next();
            }

            let article_end = article.end();

            while let Some(sentence) = sentences.peek().copied() {
                if sentence.pos >= article_end {
                    break;
                }

                let sentence_end = sentence.end();

                if sentence_end > date_end {
                    return SentenceBehindEntryError {
                        function,
                        kind: "date",
                        sentence_pos: sentence.pos,
                        sentence_end,
                        entry_end: date_end,
                    }
                    .fail();
                }

                if sentence_end > article_end {
                    return SentenceBehindEntryError {
                        function,
                        kind: "article",
                        sentence_pos: sentence.pos,
                        sentence_end,
                        entry_end: article_end,
                    }
                    .fail();
                }

                sentences.next();
            }

            articles.next();
        }
    }

    Ok(())
}

impl Corpus {
    /// Validates all corpus invariants; see [`check_corpus`].
    pub(crate) fn check(&self, function: &'static str) -> Result<()> {
        check_corpus(function, &self.article_map, &self.date_map, &self.text)
    }
}

#[cfg(test)]
mod tests {
    use scr_textmap::{SentenceEntry, TextMapEntry};

    use super::*;
    use crate::{Error, Tokenized};

    fn tokenized(tokens: &[&str], sentences: &[(usize, usize)]) -> Text {
        Text::Tokenized(Tokenized {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            token_bytes: tokens.iter().map(|t| t.len()).sum(),
            sentence_map: sentences
                .iter()
                .map(|&(pos, len)| SentenceEntry::new(pos, len))
                .collect(),
        })
    }

    #[test]
    fn nested_maps_pass() {
        let text = tokenized(&["a", "b", "c", "d"], &[(0, 2), (2, 2)]);
        let articles = vec![
            TextMapEntry::with_value(0, 2, "a1"),
            TextMapEntry::with_value(2, 2, "a2"),
        ];
        let dates = vec![TextMapEntry::with_value(0, 4, "2020-01-01")];

        check_corpus("test", &articles, &dates, &text).unwrap();
    }

    #[test]
    fn sentence_crossing_an_article_fails() {
        let text = tokenized(&["a", "b", "c", "d"], &[(0, 3), (3, 1)]);
        let articles = vec![
            TextMapEntry::with_value(0, 2, "a1"),
            TextMapEntry::with_value(2, 2, "a2"),
        ];
        let dates = vec![TextMapEntry::with_value(0, 4, "2020-01-01")];

        let err = check_corpus("test", &articles, &dates, &text).unwrap_err();

        assert!(matches!(err, Error::SentenceBehindEntry { .. }));
    }
}
