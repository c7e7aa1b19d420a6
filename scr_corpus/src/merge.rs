//! Merging several tokenized corpora into one, grouped by date and
//! article.

use std::collections::BTreeMap;

use scr_status::StatusSetter;
use scr_textmap::{entry_begins_at, first_end, skip_entries_before, MapEntry};
use tracing::debug;

use crate::{
    Corpus, Result, SentenceEntry, Text, TextMap, TextMapEntry, Tokenized, MERGE_UPDATE_EVERY,
};

/// Sentences grouped by date, then article; the ordered keys restore the
/// chronological order of the combined corpus.
type DateArticleSentences = BTreeMap<String, BTreeMap<String, Vec<Vec<String>>>>;

impl Corpus {
    /// Creates one tokenized corpus from multiple tokenized corpora,
    /// moving their data out and freeing each source as soon as it has
    /// been merged.
    ///
    /// Sentences are regrouped by date and article; unlabelled spans sort
    /// first. Returns an empty corpus if the operation is cancelled via
    /// the status callbacks.
    pub fn from_corpora(
        mut sources: Vec<Corpus>,
        check_consistency: bool,
        status: &mut StatusSetter<'_>,
    ) -> Result<Self> {
        let mut combined = Self::new(check_consistency);

        if sources.is_empty() {
            return Ok(combined);
        }

        if sources.len() == 1 {
            let mut only = sources.pop().expect("one source is present");

            only.check_consistency = check_consistency;

            return Ok(only);
        }

        let mut merged = DateArticleSentences::new();
        let total = sources.len();

        for (number, corpus) in sources.iter_mut().enumerate() {
            if !add_corpus(corpus, &mut merged, number + 1, total, status)? {
                return Ok(combined);
            }
        }

        status.change("Preparing combined corpus...");

        combined.move_combined_in(merged);

        if check_consistency {
            combined.check("from_corpora")?;
        }

        Ok(combined)
    }

    // move the regrouped sentences into this corpus, rebuilding all maps
    fn move_combined_in(&mut self, merged: DateArticleSentences) {
        let mut tokens: Vec<String> = Vec::new();
        let mut token_bytes = 0;
        let mut article_map = TextMap::new();
        let mut date_map = TextMap::new();
        let mut sentence_map = Vec::new();

        for (date, articles) in merged {
            let date_pos = tokens.len();
            let mut date_len = 0;

            for (article, sentences) in articles {
                let article_pos = tokens.len();
                let mut article_len = 0;

                for mut sentence in sentences {
                    sentence_map.push(SentenceEntry::new(tokens.len(), sentence.len()));

                    date_len += sentence.len();
                    article_len += sentence.len();
                    token_bytes += sentence.iter().map(String::len).sum::<usize>();

                    tokens.append(&mut sentence);
                }

                article_map.push(TextMapEntry::with_value(article_pos, article_len, article));
            }

            // unlabelled spans carry no date entry
            if !date.is_empty() {
                date_map.push(TextMapEntry::with_value(date_pos, date_len, date));
            }
        }

        debug!(
            tokens = tokens.len(),
            articles = article_map.len(),
            dates = date_map.len(),
            "combined corpora"
        );

        self.text = Text::Tokenized(Tokenized {
            tokens,
            token_bytes,
            sentence_map,
        });
        self.article_map = article_map;
        self.date_map = date_map;
    }
}

// merge one corpus into the combined map, returning whether the
// operation is still running; the source is cleared afterwards either way
fn add_corpus(
    from: &mut Corpus,
    to: &mut DateArticleSentences,
    number: usize,
    total: usize,
    status: &mut StatusSetter<'_>,
) -> Result<bool> {
    if from.is_empty() {
        return Ok(true);
    }

    from.require_tokenized("from_corpora")?;

    let mut running = status.change(&format!("Merging corpora ({number}/{total})..."));

    if running {
        running = add_sentences(from, to, status)?;
    }

    status.finish();

    from.clear();

    Ok(running)
}

// regroup the sentences of one corpus by date and article
fn add_sentences(
    from: &mut Corpus,
    to: &mut DateArticleSentences,
    status: &mut StatusSetter<'_>,
) -> Result<bool> {
    let tokenized = from.require_tokenized("from_corpora")?;

    let mut article_index = 0;
    let mut date_index = 0;
    let mut article_end = first_end(&from.article_map);
    let mut date_end = first_end(&from.date_map);
    let mut in_article = false;
    let mut in_date = false;
    let mut status_counter = 0;
    let mut article = String::new();
    let mut date = String::new();
    let mut content: Vec<Vec<String>> = Vec::new();

    let num_sentences = tokenized.sentence_map.len();

    for (sentence_counter, sentence) in tokenized.sentence_map.iter().enumerate() {
        // skip articles and dates finished before the current sentence
        skip_entries_before(
            &from.article_map,
            &mut article_index,
            &mut article_end,
            sentence.pos,
            &mut in_article,
        );
        skip_entries_before(
            &from.date_map,
            &mut date_index,
            &mut date_end,
            sentence.pos,
            &mut in_date,
        );

        // check for the beginning of an article and/or date
        if entry_begins_at(&from.article_map, article_index, sentence.pos) {
            // a new article starts here; everything gathered so far
            // belongs to the previous one
            finish_article(&mut content, to, &date, &article);

            next_entry(
                &from.article_map,
                article_index,
                &mut article,
                &mut article_end,
                tokenized.tokens.len(),
            );

            in_article = true;
        } else if !in_article {
            article.clear();
        }

        if entry_begins_at(&from.date_map, date_index, sentence.pos) {
            next_entry(
                &from.date_map,
                date_index,
                &mut date,
                &mut date_end,
                tokenized.tokens.len(),
            );

            in_date = true;
        } else if !in_date {
            date.clear();
        }

        content.push(tokenized.tokens[sentence.pos..sentence.end()].to_vec());

        status_counter += 1;

        if status_counter == MERGE_UPDATE_EVERY {
            if !status.update(sentence_counter + 1, num_sentences, true) {
                return Ok(false);
            }

            status_counter = 0;
        }
    }

    finish_article(&mut content, to, &date, &article);

    Ok(true)
}

// append the gathered sentences to their article in the combined map
fn finish_article(
    content: &mut Vec<Vec<String>>,
    to: &mut DateArticleSentences,
    date: &str,
    article: &str,
) {
    if content.is_empty() {
        return;
    }

    to.entry(date.to_string())
        .or_default()
        .entry(article.to_string())
        .or_default()
        .append(content);
}

// read the name and end of the entry with the given index, or fall back
// to the end of the corpus once the map has been exhausted
fn next_entry(
    map: &[TextMapEntry],
    index: usize,
    name: &mut String,
    end: &mut usize,
    corpus_end: usize,
) {
    match map.get(index) {
        Some(entry) => {
            *name = entry.value.clone();
            *end = entry.end();
        }
        None => {
            name.clear();

            *end = corpus_end;
        }
    }
}
