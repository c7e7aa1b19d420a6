//! Combining previously separated corpus chunks back into one corpus.

use scr_textmap::MapEntry;
use tracing::debug;

use crate::{
    error::{
        EmptySentenceMapError, InconsistentSentenceBoundaryError, InvalidArticleMapStartError,
        InvalidSentenceMapStartError, LastSentenceBehindCorpusError, MoreMapsThanChunksError,
    },
    Corpus, Result, SentenceEntry, SentenceMap, Text, TextMap, TextMapEntry, Tokenized,
};

impl Corpus {
    /// Creates a continuous corpus by combining chunks, as well as their
    /// article and date maps. An existing corpus is replaced on success;
    /// on failure the corpus is left untouched.
    ///
    /// Chunk maps are chunk-local; positions are shifted by the byte
    /// offset of each chunk. An article continued across a chunk boundary
    /// is merged back into one entry, as is a date; a date extended
    /// across a boundary that also starts a new article grows by one
    /// extra byte for the separating space.
    pub fn combine_continuous(
        &mut self,
        chunks: &mut Vec<String>,
        article_maps: &mut Vec<TextMap>,
        date_maps: &mut Vec<TextMap>,
        delete_input: bool,
    ) -> Result<()> {
        let mut corpus = String::with_capacity(chunks.iter().map(String::len).sum());
        let mut article_map = TextMap::with_capacity(article_maps.iter().map(Vec::len).sum());
        let mut date_map = TextMap::with_capacity(date_maps.iter().map(Vec::len).sum());
        let num_chunks = chunks.len();

        for (chunk_index, chunk) in chunks.iter_mut().enumerate() {
            // current position in the combined corpus
            let pos = corpus.len();

            corpus.push_str(chunk);

            if delete_input {
                std::mem::take(chunk);
            }

            let mut begins_with_new_article = false;

            if let Some(map) = article_maps.get_mut(chunk_index) {
                if !map.is_empty() {
                    let first = &map[0];

                    if self.check_consistency && first.pos > 1 {
                        return InvalidArticleMapStartError {
                            chunk: chunk_index,
                            num_chunks,
                            start: first.pos,
                            expected: "#0 or #1",
                        }
                        .fail();
                    }

                    let mut entries = map.iter();

                    // compare the first new article ID with the last one
                    match article_map.last_mut() {
                        Some(last) if last.value == first.value => {
                            // append the current article to the last one
                            last.len += first.len;

                            entries.next();
                        }
                        _ => begins_with_new_article = true,
                    }

                    for entry in entries {
                        article_map.push(TextMapEntry::with_value(
                            pos + entry.pos,
                            entry.len,
                            entry.value.clone(),
                        ));
                    }

                    if delete_input {
                        std::mem::take(map);
                    }
                }
            }

            if let Some(map) = date_maps.get_mut(chunk_index) {
                if !map.is_empty() {
                    let first = &map[0];
                    let mut entries = map.iter();

                    // compare the first new date with the last one
                    if let Some(last) = date_map.last_mut() {
                        if last.value == first.value {
                            // append the current date to the last one
                            last.len += first.len;

                            // count the space between the articles if the
                            // chunk begins with a new article
                            if begins_with_new_article {
                                last.len += 1;
                            }

                            entries.next();
                        }
                    }

                    for entry in entries {
                        date_map.push(TextMapEntry::with_value(
                            pos + entry.pos,
                            entry.len,
                            entry.value.clone(),
                        ));
                    }

                    if delete_input {
                        std::mem::take(map);
                    }
                }
            }
        }

        if delete_input {
            std::mem::take(chunks);
            std::mem::take(article_maps);
            std::mem::take(date_maps);
        }

        debug!(
            bytes = corpus.len(),
            articles = article_map.len(),
            "combined continuous corpus"
        );

        self.clear();

        self.text = Text::Continuous(corpus);
        self.article_map = article_map;
        self.date_map = date_map;

        Ok(())
    }

    /// Creates a tokenized corpus by combining chunks, as well as their
    /// article, date and sentence maps. An existing corpus is replaced on
    /// success; on failure the corpus is left untouched.
    ///
    /// Each chunk is a newline-separated run of token bytes whose last
    /// token may be incomplete; a token split across a chunk boundary is
    /// rejoined exactly when, and only when, the previous chunk did not
    /// end on a newline.
    pub fn combine_tokenized(
        &mut self,
        chunks: &mut Vec<String>,
        word_nums: &mut Vec<usize>,
        article_maps: &mut Vec<TextMap>,
        date_maps: &mut Vec<TextMap>,
        sentence_maps: &mut Vec<SentenceMap>,
        delete_input: bool,
    ) -> Result<()> {
        if self.check_consistency
            && (word_nums.len() > chunks.len()
                || article_maps.len() > chunks.len()
                || date_maps.len() > chunks.len()
                || sentence_maps.len() > chunks.len())
        {
            return MoreMapsThanChunksError.fail();
        }

        if chunks.is_empty() {
            self.clear();

            return Ok(());
        }

        if sentence_maps.is_empty() {
            return EmptySentenceMapError.fail();
        }

        let total_words: usize = word_nums.iter().sum();

        if delete_input {
            std::mem::take(word_nums);
        }

        let mut tokens: Vec<String> = Vec::with_capacity(total_words);
        let mut token_bytes = 0;
        let mut article_map = TextMap::with_capacity(article_maps.iter().map(Vec::len).sum());
        let mut date_map = TextMap::with_capacity(date_maps.iter().map(Vec::len).sum());
        let mut sentence_map = SentenceMap::with_capacity(sentence_maps.iter().map(Vec::len).sum());
        let num_chunks = chunks.len();

        let mut last_word = String::new();
        let mut skip_next_separator = false;

        for (chunk_index, chunk) in chunks.iter_mut().enumerate() {
            let mut chunk_offset = tokens.len();
            let mut skip_separator = skip_next_separator;
            let mut begin = 0;

            skip_next_separator = false;

            // split the chunk into tokens, carrying an incomplete last
            // token over to the next chunk
            while begin < chunk.len() {
                let end = chunk[begin..]
                    .find('\n')
                    .map(|found| begin + found)
                    .unwrap_or(chunk.len());

                if !last_word.is_empty() && end == 0 {
                    // the carried token was complete after all
                    chunk_offset += 1;

                    skip_separator = true;
                }

                if end == chunk.len() {
                    last_word = chunk[begin..end].to_string();
                } else if last_word.is_empty() {
                    token_bytes += end - begin;

                    tokens.push(chunk[begin..end].to_string());
                } else {
                    token_bytes += last_word.len() + end - begin;

                    last_word.push_str(&chunk[begin..end]);

                    tokens.push(std::mem::take(&mut last_word));
                }

                begin = end + 1;
            }

            if delete_input {
                std::mem::take(chunk);
            }

            if let Some(map) = sentence_maps.get_mut(chunk_index) {
                if !map.is_empty() {
                    let first = map[0];

                    if self.check_consistency && first.pos > 0 {
                        return InvalidSentenceMapStartError {
                            chunk: chunk_index,
                            num_chunks,
                            start: first.pos,
                        }
                        .fail();
                    }

                    let mut entries = map.iter();

                    if let Some(last) = sentence_map.last() {
                        // check whether the combined map already includes
                        // the first sentence of this chunk
                        let last_sentence_end = last.end();

                        if last_sentence_end > chunk_offset {
                            if self.check_consistency
                                && first.len != last_sentence_end - chunk_offset
                            {
                                return InconsistentSentenceBoundaryError {
                                    chunk: chunk_index,
                                    num_chunks,
                                    len: first.len,
                                    last_end: last_sentence_end,
                                    offset: chunk_offset,
                                }
                                .fail();
                            }

                            // already added with the previous chunk
                            entries.next();
                        }
                    }

                    for entry in entries {
                        sentence_map.push(SentenceEntry::new(chunk_offset + entry.pos, entry.len));
                    }

                    if delete_input {
                        std::mem::take(map);
                    }
                }

                // check whether the last sentence, and with it the last
                // word, is already complete
                if let Some(last) = sentence_map.last() {
                    if last.end() == tokens.len() + 1 {
                        token_bytes += last_word.len();

                        tokens.push(std::mem::take(&mut last_word));

                        skip_next_separator = true;
                    }
                }
            }

            if let Some(map) = article_maps.get_mut(chunk_index) {
                if !map.is_empty() {
                    let first = &map[0];

                    if self.check_consistency && first.pos > 0 {
                        return InvalidArticleMapStartError {
                            chunk: chunk_index,
                            num_chunks,
                            start: first.pos,
                            expected: "#0",
                        }
                        .fail();
                    }

                    let mut entries = map.iter();

                    match article_map.last_mut() {
                        Some(last) if last.value == first.value => {
                            // append the current article to the previous one
                            last.len += first.len;

                            if !skip_separator {
                                // do not count the rejoined token twice
                                last.len -= 1;
                            }

                            entries.next();
                        }
                        _ => {}
                    }

                    for entry in entries {
                        article_map.push(TextMapEntry::with_value(
                            chunk_offset + entry.pos,
                            entry.len,
                            entry.value.clone(),
                        ));
                    }

                    if delete_input {
                        std::mem::take(map);
                    }
                }
            }

            if let Some(map) = date_maps.get_mut(chunk_index) {
                if !map.is_empty() {
                    let first = &map[0];
                    let mut entries = map.iter();

                    match date_map.last_mut() {
                        Some(last) if last.value == first.value => {
                            // append the current date to the previous one
                            last.len += first.len;

                            if !skip_separator {
                                // do not count the rejoined token twice
                                last.len -= 1;
                            }

                            entries.next();
                        }
                        _ => {}
                    }

                    for entry in entries {
                        date_map.push(TextMapEntry::with_value(
                            chunk_offset + entry.pos,
                            entry.len,
                            entry.value.clone(),
                        ));
                    }

                    if delete_input {
                        std::mem::take(map);
                    }
                }
            }
        }

        if !last_word.is_empty() {
            token_bytes += last_word.len();

            tokens.push(std::mem::take(&mut last_word));
        }

        if sentence_map.is_empty() {
            return EmptySentenceMapError.fail();
        }

        if self.check_consistency {
            let last = sentence_map.last().expect("sentence map is non-empty");

            if last.end() > tokens.len() {
                return LastSentenceBehindCorpusError {
                    pos: last.pos,
                    len: last.len,
                    size: tokens.len(),
                }
                .fail();
            }
        }

        if delete_input {
            std::mem::take(chunks);
            std::mem::take(article_maps);
            std::mem::take(date_maps);
            std::mem::take(sentence_maps);
        }

        debug!(
            tokens = tokens.len(),
            sentences = sentence_map.len(),
            "combined tokenized corpus"
        );

        let text = Text::Tokenized(Tokenized {
            tokens,
            token_bytes,
            sentence_map,
        });

        if self.check_consistency {
            crate::check::check_corpus("combine_tokenized", &article_map, &date_map, &text)?;
        }

        self.clear();

        self.text = text;
        self.article_map = article_map;
        self.date_map = date_map;

        Ok(())
    }
}
