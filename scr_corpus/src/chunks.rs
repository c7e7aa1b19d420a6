//! Slicing the corpus into database-shippable chunks.

use scr_textmap::MapEntry;
use scr_utf8::valid_length;
use tracing::debug;

use crate::{
    error::{
        ArticleBehindDateError, ArticleMapEndsBeforeCorpusError, ChunkSizeZeroError,
        ChunkTooLargeError, EmptyChunkError, EmptySentenceMapError, EntryBeforeSentenceError,
    },
    Corpus, Result, SentenceEntry, SentenceMap, TextMap, TextMapEntry,
};

impl Corpus {
    /// Copies the continuous text corpus together with its article and
    /// date maps.
    pub fn copy_continuous(&self) -> Result<(String, TextMap, TextMap)> {
        let corpus = self.require_continuous("copy_continuous")?;

        Ok((
            corpus.clone(),
            self.article_map.clone(),
            self.date_map.clone(),
        ))
    }

    /// Slices the continuous text corpus into chunks of at most
    /// `chunk_size` bytes, appending them to `to`; chunk-local article
    /// and date maps are appended alongside.
    ///
    /// UTF-8 code points are never split, so chunks may fall slightly
    /// short of the budget. Articles are split across chunks where
    /// needed; the separating space between two articles falls to
    /// whichever chunk has room for it.
    pub fn copy_chunks_continuous(
        &self,
        chunk_size: usize,
        to: &mut Vec<String>,
        article_maps_to: &mut Vec<TextMap>,
        date_maps_to: &mut Vec<TextMap>,
    ) -> Result<()> {
        let corpus = self.require_continuous("copy_chunks_continuous")?;

        if chunk_size == 0 {
            if corpus.is_empty() {
                return Ok(());
            }

            return ChunkSizeZeroError.fail();
        }

        // no slicing necessary
        if corpus.len() <= chunk_size {
            to.push(corpus.clone());
            article_maps_to.push(self.article_map.clone());
            date_maps_to.push(self.date_map.clone());

            return Ok(());
        }

        if self.article_map.is_empty() {
            // no articles: simply slice the corpus at code point
            // boundaries
            let mut pos = 0;

            while pos < corpus.len() {
                let desired = chunk_size.min(corpus.len() - pos);
                let len = valid_length(corpus, pos, desired, chunk_size)?;

                to.push(corpus[pos..pos + len].to_string());

                pos += len;
            }

            return Ok(());
        }

        let mut corpus_pos = 0;
        let mut article_pos = 0;
        let mut article_index = 0;
        let mut date_index = 0;
        let mut no_space = false;

        'chunks: while corpus_pos < corpus.len() {
            let mut chunk = String::new();
            let mut chunk_article_map = TextMap::new();
            let mut chunk_date_map = TextMap::new();

            if no_space {
                // the space separating two articles did not fit into the
                // previous chunk
                chunk.push(' ');

                corpus_pos += 1;
                no_space = false;
            }

            // fill the chunk with as many articles as fit
            loop {
                let Some(article) = self.article_map.get(article_index) else {
                    break;
                };

                if let Some(date) = self.date_map.get(date_index) {
                    if article_pos == 0 && article.pos > date.end() {
                        date_index += 1;
                    }

                    if self.check_consistency {
                        if let Some(date) = self.date_map.get(date_index) {
                            if article.pos > date.end() {
                                return ArticleBehindDateError {
                                    article_pos: article.pos,
                                    date_pos: date.pos,
                                    date_end: date.end(),
                                }
                                .fail();
                            }
                        }
                    }
                }

                let remaining = article.len - article_pos;

                if chunk.len() + remaining <= chunk_size {
                    if remaining > 0 {
                        chunk_article_map.push(TextMapEntry::with_value(
                            chunk.len(),
                            remaining,
                            article.value.clone(),
                        ));

                        self.chunk_date_entry(
                            &mut chunk_date_map,
                            date_index,
                            chunk.len(),
                            remaining,
                            corpus_pos,
                        );

                        chunk.push_str(&corpus[corpus_pos..corpus_pos + remaining]);

                        corpus_pos += remaining;
                    }

                    // the next article starts from its beginning
                    article_pos = 0;

                    if chunk.len() < chunk_size {
                        // the space after the article still fits
                        chunk.push(' ');

                        corpus_pos += 1;
                        article_index += 1;

                        if chunk.len() == chunk_size {
                            break;
                        }
                    } else {
                        // move the space to the beginning of the next chunk
                        no_space = true;

                        article_index += 1;

                        break;
                    }
                } else {
                    // fill the remainder of the chunk with a part of the
                    // article
                    let fill = chunk_size - chunk.len();

                    if fill == 0 {
                        break;
                    }

                    let fill = valid_length(corpus, corpus_pos, fill, chunk_size)?;

                    if fill == 0 {
                        // not enough space left for the next code point
                        break;
                    }

                    chunk_article_map.push(TextMapEntry::with_value(
                        chunk.len(),
                        fill,
                        article.value.clone(),
                    ));

                    self.chunk_date_entry(
                        &mut chunk_date_map,
                        date_index,
                        chunk.len(),
                        fill,
                        corpus_pos,
                    );

                    chunk.push_str(&corpus[corpus_pos..corpus_pos + fill]);

                    corpus_pos += fill;
                    article_pos += fill;

                    break;
                }
            }

            if self.check_consistency {
                if chunk.len() > chunk_size {
                    return ChunkTooLargeError {
                        size: chunk.len(),
                        chunk_size,
                    }
                    .fail();
                }

                if article_index == self.article_map.len() && corpus_pos < corpus.len() {
                    return ArticleMapEndsBeforeCorpusError {
                        pos: corpus_pos,
                        size: corpus.len(),
                    }
                    .fail();
                }
            }

            if chunk.is_empty() {
                break 'chunks;
            }

            to.push(chunk);
            article_maps_to.push(chunk_article_map);
            date_maps_to.push(chunk_date_map);
        }

        if !to.is_empty() {
            if self.check_consistency && to.last().is_some_and(String::is_empty) {
                return EmptyChunkError.fail();
            }

            if !no_space {
                // drop the trailing space appended after the last article
                if let Some(last) = to.last_mut() {
                    last.pop();
                }
            }

            if to.last().is_some_and(String::is_empty) {
                to.pop();
                article_maps_to.pop();
                date_maps_to.pop();
            }

            if self.check_consistency && to.last().is_some_and(String::is_empty) {
                return EmptyChunkError.fail();
            }
        }

        debug!(chunks = to.len(), chunk_size, "sliced continuous corpus");

        Ok(())
    }

    // extend the current chunk's date entry, or start a new one once the
    // corpus position has entered the date
    fn chunk_date_entry(
        &self,
        chunk_date_map: &mut TextMap,
        date_index: usize,
        chunk_pos: usize,
        len: usize,
        corpus_pos: usize,
    ) {
        let Some(date) = self.date_map.get(date_index) else {
            return;
        };

        if matches!(chunk_date_map.last(), Some(last) if last.value == date.value) {
            if let Some(last) = chunk_date_map.last_mut() {
                // including the space before the article
                last.len += len + 1;
            }
        } else if corpus_pos >= date.pos {
            chunk_date_map.push(TextMapEntry::with_value(chunk_pos, len, date.value.clone()));
        }
    }

    /// Slices a tokenized corpus into chunks of at most `chunk_size`
    /// bytes of newline-joined tokens, appending them to `to` together
    /// with per-chunk token counts and chunk-local article, date and
    /// sentence maps.
    ///
    /// Sentences are never split across sentence-map entries: the last
    /// sentence of a chunk keeps its full length even when its tail is
    /// carried into the next chunk, so its end may exceed the chunk's
    /// own token count. A token cut at the byte budget is continued in
    /// the next chunk and counted in both.
    pub fn copy_chunks_tokenized(
        &self,
        chunk_size: usize,
        to: &mut Vec<String>,
        word_nums_to: &mut Vec<usize>,
        article_maps_to: &mut Vec<TextMap>,
        date_maps_to: &mut Vec<TextMap>,
        sentence_maps_to: &mut Vec<SentenceMap>,
    ) -> Result<()> {
        let tokenized = self.require_tokenized("copy_chunks_tokenized")?;

        if chunk_size == 0 {
            if tokenized.tokens.is_empty() {
                return Ok(());
            }

            return ChunkSizeZeroError.fail();
        }

        if tokenized.tokens.is_empty() {
            return Ok(());
        }

        if tokenized.sentence_map.is_empty() {
            return EmptySentenceMapError.fail();
        }

        // no slicing necessary
        if tokenized.token_bytes + tokenized.tokens.len() - 1 <= chunk_size {
            to.push(itertools::join(&tokenized.tokens, "\n"));
            word_nums_to.push(tokenized.tokens.len());
            article_maps_to.push(self.article_map.clone());
            date_maps_to.push(self.date_map.clone());
            sentence_maps_to.push(tokenized.sentence_map.clone());

            return Ok(());
        }

        let mut chunk = String::new();
        let mut chunk_article_map = TextMap::new();
        let mut chunk_date_map = TextMap::new();
        let mut chunk_sentence_map = SentenceMap::new();
        let mut chunk_offset = 0;
        let mut chunk_num_complete_tokens = 0;
        let mut next_article_index = 0;
        let mut next_date_index = 0;

        for sentence in &tokenized.sentence_map {
            let old_chunk_size = chunk.len();

            // append the sentence's tokens to the current chunk
            for token in &tokenized.tokens[sentence.pos..sentence.end()] {
                chunk.push_str(token);
                chunk.push('\n');
            }

            chunk_num_complete_tokens += sentence.len;

            // take over the articles beginning with this sentence
            while let Some(article) = self.article_map.get(next_article_index) {
                if article.pos != sentence.pos {
                    break;
                }

                if article.len > 0 {
                    chunk_article_map.push(TextMapEntry::with_value(
                        article.pos - chunk_offset,
                        article.len,
                        article.value.clone(),
                    ));
                }

                next_article_index += 1;
            }

            if self.check_consistency {
                if let Some(article) = self.article_map.get(next_article_index) {
                    if article.pos < sentence.pos {
                        return EntryBeforeSentenceError {
                            kind: "article",
                            value: article.value.clone(),
                            pos: article.pos,
                            sentence_pos: sentence.pos,
                        }
                        .fail();
                    }
                }
            }

            // take over the dates beginning with this sentence
            while let Some(date) = self.date_map.get(next_date_index) {
                if date.pos != sentence.pos {
                    break;
                }

                if date.len > 0 {
                    chunk_date_map.push(TextMapEntry::with_value(
                        date.pos - chunk_offset,
                        date.len,
                        date.value.clone(),
                    ));
                }

                next_date_index += 1;
            }

            if self.check_consistency {
                if let Some(date) = self.date_map.get(next_date_index) {
                    if date.pos < sentence.pos {
                        return EntryBeforeSentenceError {
                            kind: "date",
                            value: date.value.clone(),
                            pos: date.pos,
                            sentence_pos: sentence.pos,
                        }
                        .fail();
                    }
                }
            }

            chunk_sentence_map.push(SentenceEntry::new(sentence.pos - chunk_offset, sentence.len));

            if chunk.len() < chunk_size {
                continue;
            }

            // the chunk is full; remove the trailing newline
            chunk.pop();

            let mut rest = String::new();
            let mut rest_num_tokens = 0;
            let mut split_token = false;

            if chunk.len() > chunk_size {
                // cut the chunk at the byte budget, carrying the tail of
                // the sentence into the next chunk
                let mut chunk_len = valid_length(&chunk, 0, chunk_size, chunk_size)?;

                split_token = true;

                if chunk_len > 1 && chunk.as_bytes()[chunk_len - 1] == b'\n' {
                    // the budget ends on a separator: cut in front of it,
                    // so that the last kept token is carried as complete
                    chunk_len -= 1;

                    split_token = false;
                }

                rest = chunk[chunk_len..].to_string();

                chunk.truncate(chunk_len);

                // count how many tokens of the current sentence fit
                // completely within the cut
                rest_num_tokens = sentence.len;

                let mut chunk_end = old_chunk_size;

                for token in &tokenized.tokens[sentence.pos..sentence.end()] {
                    chunk_end += token.len() + 1;

                    if chunk_end - 1 > chunk_size {
                        break;
                    }

                    rest_num_tokens -= 1;

                    if chunk_end - 1 == chunk_size {
                        split_token = false;

                        break;
                    }
                }

                chunk_num_complete_tokens -= rest_num_tokens;
            }

            // split the last article and date entry if they extend past
            // the completed tokens
            let article_rest = split_entry(
                &mut chunk_article_map,
                chunk_num_complete_tokens,
                split_token,
            );
            let date_rest = split_entry(&mut chunk_date_map, chunk_num_complete_tokens, split_token);

            chunk_offset += chunk_num_complete_tokens;

            to.push(std::mem::take(&mut chunk));
            word_nums_to.push(chunk_num_complete_tokens + usize::from(split_token));
            sentence_maps_to.push(std::mem::take(&mut chunk_sentence_map));

            if !self.article_map.is_empty() {
                article_maps_to.push(std::mem::take(&mut chunk_article_map));
            }

            if !self.date_map.is_empty() {
                date_maps_to.push(std::mem::take(&mut chunk_date_map));
            }

            // begin the next chunk with the rest of the sentence
            if rest.is_empty() {
                chunk_num_complete_tokens = 0;
            } else {
                chunk.push_str(&rest);
                chunk.push('\n');

                chunk_sentence_map.push(SentenceEntry::new(0, rest_num_tokens));

                chunk_num_complete_tokens = rest_num_tokens;
            }

            if let Some(article_rest) = article_rest {
                chunk_article_map.push(article_rest);
            }

            if let Some(date_rest) = date_rest {
                chunk_date_map.push(date_rest);
            }
        }

        if !chunk.is_empty() {
            // remove the trailing newline and add the last chunk
            chunk.pop();

            to.push(chunk);
            word_nums_to.push(chunk_num_complete_tokens);
            sentence_maps_to.push(chunk_sentence_map);

            if !self.article_map.is_empty() {
                article_maps_to.push(chunk_article_map);
            }

            if !self.date_map.is_empty() {
                date_maps_to.push(chunk_date_map);
            }
        }

        debug!(chunks = to.len(), chunk_size, "sliced tokenized corpus");

        Ok(())
    }
}

/// Splits the last entry of a chunk map when it extends past the number
/// of completed tokens, returning the part belonging to the next chunk.
/// A split token is counted in both parts.
fn split_entry(
    chunk_map: &mut TextMap,
    num_complete_tokens: usize,
    split_token: bool,
) -> Option<TextMapEntry> {
    let last = chunk_map.last_mut()?;
    let end = last.end();

    if end > num_complete_tokens || (split_token && end == num_complete_tokens) {
        let rest = TextMapEntry::with_value(0, end - num_complete_tokens, last.value.clone());

        last.len = num_complete_tokens - last.pos;

        if split_token {
            // the split token counts in both chunks
            last.len += 1;
        }

        (rest.len > 0).then_some(rest)
    } else {
        None
    }
}
