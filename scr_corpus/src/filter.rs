//! Filtering the corpus by date and by article.

use scr_textmap::{
    is_iso_date_in_range, remove_empty_entries, remove_token_from_length, skip_entries_before_span,
    update_position, EntrySpan, MapEntry,
};
use scr_status::StatusSetter;
use tracing::debug;

use crate::{error::ArticleDateMismatchError, Corpus, Result, Text, FILTER_UPDATE_EVERY};

impl Corpus {
    /// Filters the corpus by the given inclusive date range; empty bounds
    /// are unbounded on their side. Afterwards the corpus only contains
    /// text marked with dates inside the range, or is empty if no part of
    /// the corpus matches.
    ///
    /// Returns whether the corpus has been changed.
    pub fn filter_by_date(&mut self, from: &str, to: &str) -> Result<bool> {
        if from.is_empty() && to.is_empty() {
            return Ok(false);
        }

        if self.is_empty() {
            return Ok(false);
        }

        if self.date_map.is_empty() {
            // no dates at all: nothing can be in range
            self.clear();

            return Ok(true);
        }

        // find the first date in range
        let Some(begin) = self
            .date_map
            .iter()
            .position(|date| is_iso_date_in_range(&date.value, from, to))
        else {
            self.clear();

            return Ok(true);
        };

        // find the first date out of range again
        let end = self.date_map[begin + 1..]
            .iter()
            .position(|date| !is_iso_date_in_range(&date.value, from, to))
            .map(|found| begin + 1 + found)
            .unwrap_or(self.date_map.len());

        if begin == 0 && end == self.date_map.len() {
            // everything is in range already
            return Ok(false);
        }

        // the retained range of the corpus
        let offset = self.date_map[begin].pos;
        let len = self.date_map[end - 1].end() - offset;

        // find the retained articles; the first one has to begin exactly
        // at the offset of the first retained date
        let mut article_begin = None;

        for (index, article) in self.article_map.iter().enumerate() {
            if article.pos == offset {
                article_begin = Some(index);

                break;
            }

            if self.check_consistency && article.pos > offset {
                return ArticleDateMismatchError {
                    kind: "article",
                    pos: article.pos,
                    offset,
                }
                .fail();
            }
        }

        if self.check_consistency && !self.article_map.is_empty() && article_begin.is_none() {
            return ArticleDateMismatchError {
                kind: "article",
                pos: self.article_map.last().map(|entry| entry.pos).unwrap_or(0),
                offset,
            }
            .fail();
        }

        let article_begin = article_begin.unwrap_or(self.article_map.len());
        let article_end = self.article_map[article_begin..]
            .iter()
            .position(|article| article.pos >= offset + len)
            .map(|found| article_begin + found)
            .unwrap_or(self.article_map.len());

        // find the retained sentences of a tokenized corpus
        let sentence_range = match &self.text {
            Text::Continuous(_) => None,
            Text::Tokenized(t) => {
                let mut sentence_begin = None;

                for (index, sentence) in t.sentence_map.iter().enumerate() {
                    if sentence.pos == offset {
                        sentence_begin = Some(index);

                        break;
                    }

                    if self.check_consistency && sentence.pos > offset {
                        return ArticleDateMismatchError {
                            kind: "sentence",
                            pos: sentence.pos,
                            offset,
                        }
                        .fail();
                    }
                }

                let sentence_begin = sentence_begin.unwrap_or(t.sentence_map.len());
                let sentence_end = t.sentence_map[sentence_begin..]
                    .iter()
                    .position(|sentence| sentence.pos >= offset + len)
                    .map(|found| sentence_begin + found)
                    .unwrap_or(t.sentence_map.len());

                Some((sentence_begin, sentence_end))
            }
        };

        // trim the maps
        self.date_map.truncate(end);
        self.date_map.drain(..begin);

        self.article_map.truncate(article_end);
        self.article_map.drain(..article_begin);

        // trim the corpus itself
        match &mut self.text {
            Text::Continuous(corpus) => {
                corpus.truncate(offset + len);
                corpus.drain(..offset);
                corpus.shrink_to_fit();
            }
            Text::Tokenized(t) => {
                let (sentence_begin, sentence_end) =
                    sentence_range.expect("sentence range was computed for a tokenized corpus");

                t.sentence_map.truncate(sentence_end);
                t.sentence_map.drain(..sentence_begin);

                let deleted: usize = t.tokens[..offset]
                    .iter()
                    .chain(t.tokens[offset + len..].iter())
                    .map(String::len)
                    .sum();

                t.tokens.truncate(offset + len);
                t.tokens.drain(..offset);
                t.tokens.shrink_to_fit();

                t.token_bytes -= deleted;

                for sentence in t.sentence_map.iter_mut() {
                    sentence.pos -= offset;
                }
            }
        }

        // re-base the retained entries
        for date in self.date_map.iter_mut() {
            date.pos -= offset;
        }

        for article in self.article_map.iter_mut() {
            article.pos -= offset;
        }

        debug!(from, to, offset, len, "filtered corpus by date");

        if self.check_consistency {
            self.check("filter_by_date")?;
        }

        Ok(true)
    }

    /// Filters a tokenized corpus by removing whole articles.
    ///
    /// The callback receives all tokens of the corpus plus the position
    /// and length of each article, and returns whether to keep it. The
    /// tokens of removed articles are deleted and all maps are shrunk
    /// accordingly.
    ///
    /// Returns the number of removed articles; zero means the corpus is
    /// unchanged, including the case of a cancelled run.
    pub fn filter_articles(
        &mut self,
        callback: crate::ArticleCallback<'_>,
        status: &mut StatusSetter<'_>,
    ) -> Result<usize> {
        let tokenized = self.require_tokenized("filter_articles")?;

        if tokenized.tokens.is_empty() {
            return Ok(0);
        }

        if !status.change("Filtering corpus...") {
            return Ok(0);
        }

        // decide first, mutate later: a cancelled run must leave the
        // corpus untouched
        let mut keep = Vec::with_capacity(self.article_map.len());
        let mut status_counter = 0;

        for (article_counter, article) in self.article_map.iter().enumerate() {
            keep.push(callback(&tokenized.tokens, article.pos, article.len));

            status_counter += 1;

            if status_counter == FILTER_UPDATE_EVERY {
                if !status.update(article_counter + 1, self.article_map.len(), true) {
                    return Ok(0);
                }

                status_counter = 0;
            }
        }

        status.finish();

        let removed = keep.iter().filter(|&&kept| !kept).count();

        if removed == 0 {
            return Ok(0);
        }

        let Text::Tokenized(t) = &mut self.text else {
            unreachable!("the corpus was checked to be tokenized above");
        };

        // empty all tokens belonging to filtered-out articles
        for (article, _) in self
            .article_map
            .iter()
            .zip(keep.iter())
            .filter(|(_, &kept)| !kept)
        {
            for token in &mut t.tokens[article.pos..article.end()] {
                t.token_bytes -= token.len();

                token.clear();
            }
        }

        debug!(removed, "filtered articles from corpus");

        // remove the emptied dates, articles, sentences and tokens
        self.re_tokenize()?;

        if self.check_consistency {
            self.check("filter_articles")?;
        }

        Ok(removed)
    }

    /// Removes every empty token, shrinking and shifting all map entries,
    /// and dropping entries that become empty themselves.
    pub(crate) fn re_tokenize(&mut self) -> Result<()> {
        let Text::Tokenized(t) = &mut self.text else {
            return Ok(());
        };

        // drop entries whose tokens are all empty
        remove_empty_entries(&mut self.date_map, &t.tokens);
        remove_empty_entries(&mut self.article_map, &t.tokens);
        remove_empty_entries(&mut t.sentence_map, &t.tokens);

        let mut date_index = 0;
        let mut article_index = 0;
        let mut sentence_index = 0;
        let mut date_span = EntrySpan::default();
        let mut article_span = EntrySpan::default();
        let mut sentence_span = EntrySpan::default();
        let mut removed = 0;

        for token_index in 0..t.tokens.len() {
            skip_entries_before_span(&self.date_map, &mut date_index, &mut date_span, token_index);
            skip_entries_before_span(
                &self.article_map,
                &mut article_index,
                &mut article_span,
                token_index,
            );
            skip_entries_before_span(
                &t.sentence_map,
                &mut sentence_index,
                &mut sentence_span,
                token_index,
            );

            update_position(
                "re_tokenize",
                "date map",
                &mut self.date_map,
                date_index,
                date_span.start,
                token_index,
                removed,
            )?;
            update_position(
                "re_tokenize",
                "article map",
                &mut self.article_map,
                article_index,
                article_span.start,
                token_index,
                removed,
            )?;
            update_position(
                "re_tokenize",
                "sentence map",
                &mut t.sentence_map,
                sentence_index,
                sentence_span.start,
                token_index,
                removed,
            )?;

            if t.tokens[token_index].is_empty() {
                remove_token_from_length(&mut self.date_map, date_index, date_span, token_index);
                remove_token_from_length(
                    &mut self.article_map,
                    article_index,
                    article_span,
                    token_index,
                );
                remove_token_from_length(
                    &mut t.sentence_map,
                    sentence_index,
                    sentence_span,
                    token_index,
                );

                removed += 1;
            }
        }

        t.tokens.retain(|token| !token.is_empty());

        Ok(())
    }
}
