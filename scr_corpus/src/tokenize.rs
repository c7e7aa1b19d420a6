//! The tokenization pipeline: turning a continuous corpus into processed
//! tokens, or re-running manipulators over an already tokenized one.

use scr_dict::{Lemmatizer, StopwordRemover, Tagger};
use scr_status::StatusSetter;
use scr_stem::{stem_english, stem_german};
use scr_textmap::{entry_begins_at, first_end, remove_token, skip_entries_before, MapEntry};
use tracing::{debug, warn};

use crate::{
    check::check_corpus,
    error::{
        MissingManipulatorModelError, UnexpectedAfterEndError, UnfinishedEntryError,
        UnknownManipulatorError,
    },
    Corpus, Result, SentenceCallback, SentenceEntry, SentenceMap, Text, TextMap, TextMapEntry,
    TokenCallback, Tokenized, TOKENIZE_UPDATE_EVERY,
};

/// Do not manipulate sentences.
pub const SENTENCE_MANIP_NONE: u16 = 0;

/// Label every token of a sentence with its part of speech.
pub const SENTENCE_MANIP_TAGGER: u16 = 1;

/// Do not manipulate tokens.
pub const TOKEN_MANIP_NONE: u16 = 0;

/// Remove tokens that consist of a single multi-byte UTF-8 code point.
pub const TOKEN_MANIP_REMOVE_SINGLE_UTF8_CHARS: u16 = 1;

/// Stem tokens in English.
pub const TOKEN_MANIP_ENGLISH_STEMMER: u16 = 2;

/// Stem tokens in German.
pub const TOKEN_MANIP_GERMAN_STEMMER: u16 = 3;

/// Replace tokens by their lemmas; requires a dictionary name.
pub const TOKEN_MANIP_LEMMATIZER: u16 = 4;

/// Remove tokens found in a dictionary; requires a dictionary name.
pub const TOKEN_MANIP_STOPWORD_REMOVER: u16 = 5;

/// Minimum byte length of single UTF-8 code points to remove.
const MIN_SINGLE_UTF8_CHAR_SIZE: usize = 2;

/// Maximum byte length of single UTF-8 code points to remove.
const MAX_SINGLE_UTF8_CHAR_SIZE: usize = 4;

/// Sentence-terminating bytes also end the current word.
fn is_sentence_terminator(byte: u8) -> bool {
    matches!(byte, b'.' | b':' | b';' | b'!' | b'?')
}

/// Word separators, including the ASCII control range.
fn is_word_separator(byte: u8) -> bool {
    matches!(
        byte,
        b' ' | b',' | b'/' | b'\\' | b'|' | b'&' | 0x00 | 0x07 | 0x08 | b'\t' | b'\n' | 0x0b
            | 0x0c | b'\r'
    )
}

/// The outcome of a manipulator pass over an already tokenized corpus.
struct PassOutcome {
    running: bool,
    token_bytes: usize,
    num_deleted: usize,
    empty_dates: bool,
    empty_articles: bool,
    empty_sentences: bool,
}

impl Corpus {
    /// Converts the corpus into processed tokens using the given
    /// manipulators, identified by ID.
    ///
    /// Sentence manipulators run first on every sentence as a whole, then
    /// token manipulators on every token of the sentence; a token emptied
    /// by a manipulator is dropped from the corpus. Models and
    /// dictionaries are resolved against the corpus dictionary directory
    /// and loaded before the pipeline starts.
    ///
    /// Returns `false` if tokenization has been cancelled via the status
    /// callbacks; the corpus is then left unchanged (or cleared, if parts
    /// of it have already been released due to `free_memory_every`).
    pub fn tokenize(
        &mut self,
        sentence_manipulators: &[u16],
        sentence_models: &[String],
        token_manipulators: &[u16],
        token_models: &[String],
        free_memory_every: usize,
        status: &mut StatusSetter<'_>,
    ) -> Result<bool> {
        for &id in sentence_manipulators {
            if id > SENTENCE_MANIP_TAGGER {
                return UnknownManipulatorError {
                    kind: "sentence",
                    id,
                }
                .fail();
            }
        }

        for &id in token_manipulators {
            if id > TOKEN_MANIP_STOPWORD_REMOVER {
                return UnknownManipulatorError { kind: "token", id }.fail();
            }
        }

        let sentence_manipulation = sentence_manipulators
            .iter()
            .any(|&id| id != SENTENCE_MANIP_NONE);
        let token_manipulation = token_manipulators.iter().any(|&id| id != TOKEN_MANIP_NONE);

        // load all models and dictionaries up front so that the
        // per-sentence and per-token closures cannot fail
        let mut taggers: Vec<Option<Tagger>> = Vec::with_capacity(sentence_manipulators.len());

        for (index, &id) in sentence_manipulators.iter().enumerate() {
            match id {
                SENTENCE_MANIP_TAGGER => {
                    let Some(model) = sentence_models.get(index).filter(|model| !model.is_empty())
                    else {
                        return MissingManipulatorModelError { id }.fail();
                    };

                    taggers.push(Some(Tagger::load(self.dictionary_dir.join(model))?));
                }
                _ => taggers.push(None),
            }
        }

        let mut lemmatizer = std::mem::replace(
            &mut self.lemmatizer,
            Lemmatizer::new(&self.dictionary_dir),
        );
        let mut stopword_remover = std::mem::replace(
            &mut self.stopword_remover,
            StopwordRemover::new(&self.dictionary_dir),
        );
        let mut models: Vec<String> = vec![String::new(); token_manipulators.len()];

        for (index, &id) in token_manipulators.iter().enumerate() {
            if id == TOKEN_MANIP_LEMMATIZER || id == TOKEN_MANIP_STOPWORD_REMOVER {
                let Some(model) = token_models.get(index).filter(|model| !model.is_empty()) else {
                    return MissingManipulatorModelError { id }.fail();
                };

                if id == TOKEN_MANIP_LEMMATIZER {
                    lemmatizer.preload(model)?;
                } else {
                    stopword_remover.preload(model)?;
                }

                models[index] = model.clone();
            }
        }

        let mut sentence_callback = |sentence: &mut Vec<String>| {
            for (index, &id) in sentence_manipulators.iter().enumerate() {
                match id {
                    SENTENCE_MANIP_NONE => return,
                    SENTENCE_MANIP_TAGGER => {
                        if let Some(tagger) = &taggers[index] {
                            tagger.label(sentence);
                        }
                    }
                    _ => {}
                }
            }
        };

        let mut token_callback = |token: &mut String| {
            for (index, &id) in token_manipulators.iter().enumerate() {
                match id {
                    TOKEN_MANIP_NONE => return,
                    TOKEN_MANIP_REMOVE_SINGLE_UTF8_CHARS => {
                        if (MIN_SINGLE_UTF8_CHAR_SIZE..=MAX_SINGLE_UTF8_CHAR_SIZE)
                            .contains(&token.len())
                            && scr_utf8::is_single_code_point(token)
                        {
                            token.clear();
                        }
                    }
                    TOKEN_MANIP_ENGLISH_STEMMER => stem_english(token),
                    TOKEN_MANIP_GERMAN_STEMMER => stem_german(token),
                    TOKEN_MANIP_LEMMATIZER => lemmatizer.lemmatize(token, &models[index]),
                    TOKEN_MANIP_STOPWORD_REMOVER => stopword_remover.remove(token, &models[index]),
                    _ => {}
                }
            }
        };

        self.tokenize_custom(
            sentence_manipulation
                .then_some(&mut sentence_callback as &mut dyn FnMut(&mut Vec<String>)),
            token_manipulation.then_some(&mut token_callback as &mut dyn FnMut(&mut String)),
            free_memory_every,
            status,
        )
    }

    /// Converts the corpus into processed tokens using custom callbacks;
    /// see [`tokenize`](Self::tokenize).
    ///
    /// On an already tokenized corpus the callbacks are re-run over every
    /// sentence instead.
    pub fn tokenize_custom(
        &mut self,
        callback_sentence: Option<SentenceCallback<'_>>,
        callback_word: Option<TokenCallback<'_>>,
        free_memory_every: usize,
        status: &mut StatusSetter<'_>,
    ) -> Result<bool> {
        let done = if self.is_tokenized() {
            self.tokenize_tokenized(callback_sentence, callback_word, status)?
        } else {
            self.tokenize_continuous(callback_sentence, callback_word, free_memory_every, status)?
        };

        if !done {
            return Ok(false);
        }

        status.finish();

        // free the memory used by manipulator dictionaries
        self.lemmatizer.clear();
        self.stopword_remover.clear();

        Ok(true)
    }

    /// Tokenizes a still continuous corpus.
    ///
    /// Walks the text byte by byte: sentence terminators (`.:;!?`) end
    /// both the word and the sentence, separators (whitespace, `,/\|&`
    /// and ASCII control bytes) end only the word, and the end of an
    /// article or date closes the sentence as well. With
    /// `free_memory_every` set, the already processed prefix of the text
    /// is released every time it exceeds that many bytes.
    fn tokenize_continuous(
        &mut self,
        mut callback_sentence: Option<SentenceCallback<'_>>,
        mut callback_word: Option<TokenCallback<'_>>,
        free_memory_every: usize,
        status: &mut StatusSetter<'_>,
    ) -> Result<bool> {
        let Text::Continuous(corpus_text) = &mut self.text else {
            unreachable!("tokenize_continuous is only called for continuous corpora");
        };

        let mut corpus = std::mem::take(corpus_text);
        let article_map = std::mem::take(&mut self.article_map);
        let date_map = std::mem::take(&mut self.date_map);

        let mut sentence: Vec<String> = Vec::new();
        let mut word_begin = 0;
        let mut sentence_first_word = 0;
        let mut current_word = 0;
        let mut status_counter = 0;
        let mut corpus_trimmed = 0;

        let mut in_article = false;
        let mut in_date = false;
        let mut article_first_word = 0;
        let mut date_first_word = 0;
        let mut article_end = first_end(&article_map);
        let mut date_end = first_end(&date_map);
        let mut next_article = 0;
        let mut next_date = 0;

        let mut new_article_map = TextMap::with_capacity(article_map.len());
        let mut new_date_map = TextMap::with_capacity(date_map.len());
        let mut tokens: Vec<String> = Vec::new();
        let mut token_bytes = 0;
        let mut sentence_map = SentenceMap::new();

        let mut cancelled = false;
        let mut pos = 0;

        while pos < corpus.len() + corpus_trimmed {
            let mut sentence_ends = false;
            let mut no_separator = false;
            let mut append_to_article = false;
            let mut append_to_date = false;

            // check for the beginning of an article
            if !in_article
                && next_article < article_map.len()
                && pos == article_map[next_article].pos
            {
                article_first_word = current_word;
                article_end = article_map[next_article].end();
                in_article = true;

                next_article += 1;
            }

            // check for the end of the current article
            if in_article && pos == article_end {
                in_article = false;

                new_article_map.push(TextMapEntry::with_value(
                    article_first_word,
                    current_word - article_first_word,
                    article_map[next_article - 1].value.clone(),
                ));

                sentence_ends = true;
                append_to_article = true;
            }

            // check for the beginning of a date
            if !in_date && next_date < date_map.len() && pos == date_map[next_date].pos {
                date_first_word = current_word;
                date_end = date_map[next_date].end();
                in_date = true;

                next_date += 1;
            }

            // check for the end of the current date
            if in_date && pos == date_end {
                in_date = false;

                new_date_map.push(TextMapEntry::with_value(
                    date_first_word,
                    current_word - date_first_word,
                    date_map[next_date - 1].value.clone(),
                ));

                sentence_ends = true;
                append_to_date = true;
            }

            // classify the current byte
            let byte = corpus.as_bytes()[pos - corpus_trimmed];

            if is_sentence_terminator(byte) {
                sentence_ends = true;
            } else if !is_word_separator(byte) {
                if sentence_ends {
                    // the byte completes the word inside the ending
                    // sentence, without a separating character
                    no_separator = true;
                } else {
                    pos += 1;

                    continue;
                }
            }

            // end the current word
            let mut word_len = pos - word_begin;

            if no_separator {
                word_len += 1;
            }

            if word_len > 0 {
                let start = word_begin - corpus_trimmed;

                sentence.push(copy_word(&corpus, start, word_len));

                current_word += 1;

                if append_to_article {
                    if let Some(last) = new_article_map.last_mut() {
                        last.len += 1;
                    }
                }

                if append_to_date {
                    if let Some(last) = new_date_map.last_mut() {
                        last.len += 1;
                    }
                }
            }

            if free_memory_every > 0 && pos - corpus_trimmed > free_memory_every {
                // release the already processed prefix of the text
                let cut = pos - corpus_trimmed;

                if corpus.is_char_boundary(cut) {
                    corpus.drain(..cut);
                    corpus.shrink_to_fit();

                    corpus_trimmed = pos;
                }
            }

            word_begin = pos + 1;

            if sentence_ends && !sentence.is_empty() {
                flush_sentence(
                    &mut sentence,
                    &mut callback_sentence,
                    &mut callback_word,
                    &mut current_word,
                    append_to_article,
                    append_to_date,
                    &mut new_article_map,
                    &mut new_date_map,
                    &mut token_bytes,
                    &mut tokens,
                    &mut sentence_map,
                    &mut sentence_first_word,
                );

                status_counter += 1;

                if status_counter == TOKENIZE_UPDATE_EVERY {
                    if !status.update(pos + 1, corpus.len() + corpus_trimmed, true) {
                        cancelled = true;

                        break;
                    }

                    status_counter = 0;
                }
            }

            pos += 1;
        }

        if cancelled || !status.is_running() {
            self.restore_continuous(corpus, article_map, date_map, corpus_trimmed > 0);

            return Ok(false);
        }

        let total_len = corpus.len() + corpus_trimmed;

        // close a still open article at the end of the text
        let mut end_of_last_article = false;
        let mut end_of_last_date = false;

        if in_article && total_len == article_end {
            in_article = false;

            new_article_map.push(TextMapEntry::with_value(
                article_first_word,
                current_word - article_first_word,
                article_map[next_article - 1].value.clone(),
            ));

            end_of_last_article = true;
        }

        if in_date && total_len == date_end {
            in_date = false;

            new_date_map.push(TextMapEntry::with_value(
                date_first_word,
                current_word - date_first_word,
                date_map[next_date - 1].value.clone(),
            ));

            end_of_last_date = true;
        }

        // add the trailing word, if any
        if word_begin < total_len {
            let start = word_begin - corpus_trimmed;

            sentence.push(copy_word(&corpus, start, corpus.len() - start));

            current_word += 1;

            if end_of_last_article {
                if let Some(last) = new_article_map.last_mut() {
                    last.len += 1;
                }
            }

            if end_of_last_date {
                if let Some(last) = new_date_map.last_mut() {
                    last.len += 1;
                }
            }
        }

        // run the final sentence through the pipeline
        flush_sentence(
            &mut sentence,
            &mut callback_sentence,
            &mut callback_word,
            &mut current_word,
            end_of_last_article,
            end_of_last_date,
            &mut new_article_map,
            &mut new_date_map,
            &mut token_bytes,
            &mut tokens,
            &mut sentence_map,
            &mut sentence_first_word,
        );

        if self.check_consistency {
            let error = if in_article {
                Some(
                    UnfinishedEntryError {
                        operation: "tokenize_continuous",
                        kind: "article",
                        value: article_map[next_article - 1].value.clone(),
                    }
                    .build(),
                )
            } else if in_date {
                Some(
                    UnfinishedEntryError {
                        operation: "tokenize_continuous",
                        kind: "date",
                        value: date_map[next_date - 1].value.clone(),
                    }
                    .build(),
                )
            } else if next_article < article_map.len() {
                Some(
                    UnexpectedAfterEndError {
                        operation: "tokenize_continuous",
                        kind: "article",
                        value: article_map[next_article].value.clone(),
                    }
                    .build(),
                )
            } else if next_date < date_map.len() {
                Some(
                    UnexpectedAfterEndError {
                        operation: "tokenize_continuous",
                        kind: "date",
                        value: date_map[next_date].value.clone(),
                    }
                    .build(),
                )
            } else {
                None
            };

            if let Some(error) = error {
                self.restore_continuous(corpus, article_map, date_map, corpus_trimmed > 0);

                return Err(error);
            }
        }

        debug!(
            tokens = tokens.len(),
            sentences = sentence_map.len(),
            "tokenized continuous corpus"
        );

        let text = Text::Tokenized(Tokenized {
            tokens,
            token_bytes,
            sentence_map,
        });

        if self.check_consistency {
            if let Err(error) =
                check_corpus("tokenize_continuous", &new_article_map, &new_date_map, &text)
            {
                self.restore_continuous(corpus, article_map, date_map, corpus_trimmed > 0);

                return Err(error);
            }
        }

        self.text = text;
        self.article_map = new_article_map;
        self.date_map = new_date_map;

        Ok(true)
    }

    // put a continuous corpus back after a cancelled or failed
    // tokenization; once parts of the text have been released, only the
    // cleared state is consistent
    fn restore_continuous(
        &mut self,
        corpus: String,
        article_map: TextMap,
        date_map: TextMap,
        trimmed: bool,
    ) {
        if trimmed {
            warn!("tokenization aborted after releasing memory; clearing the corpus");

            self.clear();
        } else {
            self.text = Text::Continuous(corpus);
            self.article_map = article_map;
            self.date_map = date_map;
        }
    }

    /// Re-runs manipulators over an already tokenized corpus.
    fn tokenize_tokenized(
        &mut self,
        callback_sentence: Option<SentenceCallback<'_>>,
        callback_word: Option<TokenCallback<'_>>,
        status: &mut StatusSetter<'_>,
    ) -> Result<bool> {
        if callback_sentence.is_none() && callback_word.is_none() {
            return Ok(status.is_running());
        }

        let Text::Tokenized(t) = &mut self.text else {
            unreachable!("tokenize_tokenized is only called for tokenized corpora");
        };

        // snapshot for rollback on cancellation or failure
        let snapshot_tokens = t.tokens.clone();
        let snapshot_token_bytes = t.token_bytes;
        let snapshot_sentences = t.sentence_map.clone();
        let snapshot_articles = self.article_map.clone();
        let snapshot_dates = self.date_map.clone();

        let restore = |corpus: &mut Corpus| {
            if let Text::Tokenized(t) = &mut corpus.text {
                t.tokens = snapshot_tokens.clone();
                t.token_bytes = snapshot_token_bytes;
                t.sentence_map = snapshot_sentences.clone();
            }

            corpus.article_map = snapshot_articles.clone();
            corpus.date_map = snapshot_dates.clone();
        };

        let outcome = tokenized_pass(
            &mut self.article_map,
            &mut self.date_map,
            t,
            callback_sentence,
            callback_word,
            status,
        );

        let outcome = match outcome {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                restore(self);

                return Ok(false);
            }
            Err(error) => {
                restore(self);

                return Err(error);
            }
        };

        status.change("Cleaning corpus...");

        if outcome.empty_dates {
            self.date_map.retain(|date| date.len > 0);
        }

        if outcome.empty_articles {
            self.article_map.retain(|article| article.len > 0);
        }

        let Text::Tokenized(t) = &mut self.text else {
            unreachable!("the corpus is still tokenized");
        };

        if outcome.empty_sentences {
            t.sentence_map.retain(|sentence| sentence.len > 0);
        }

        if outcome.num_deleted > 0 {
            t.tokens.retain(|token| !token.is_empty());
        }

        t.token_bytes = outcome.token_bytes;

        if self.check_consistency {
            if let Err(error) = self.check("tokenize_tokenized") {
                restore(self);

                return Err(error);
            }
        }

        if !outcome.running {
            restore(self);

            return Ok(false);
        }

        Ok(true)
    }
}

/// Copies one word out of the corpus text. Word boundaries normally fall
/// on ASCII separators; should a map boundary cut a multi-byte code
/// point, the word is copied lossily instead of splitting the corpus.
fn copy_word(corpus: &str, start: usize, len: usize) -> String {
    match corpus.get(start..start + len) {
        Some(word) => word.to_string(),
        None => String::from_utf8_lossy(&corpus.as_bytes()[start..start + len]).into_owned(),
    }
}

/// Finishes one sentence of a continuous tokenization: runs the
/// callbacks, drops emptied tokens while shrinking the just closed map
/// entries, and moves the surviving tokens into the corpus.
#[allow(clippy::too_many_arguments)]
fn flush_sentence(
    sentence: &mut Vec<String>,
    callback_sentence: &mut Option<SentenceCallback<'_>>,
    callback_word: &mut Option<TokenCallback<'_>>,
    current_word: &mut usize,
    append_to_article: bool,
    append_to_date: bool,
    new_article_map: &mut TextMap,
    new_date_map: &mut TextMap,
    token_bytes: &mut usize,
    tokens: &mut Vec<String>,
    sentence_map: &mut SentenceMap,
    sentence_first_word: &mut usize,
) {
    if sentence.is_empty() {
        return;
    }

    if let Some(callback) = callback_sentence {
        callback(sentence);
    }

    sentence.retain_mut(|word| {
        if let Some(callback) = callback_word {
            callback(word);
        }

        if word.is_empty() {
            *current_word -= 1;

            if append_to_article {
                shrink_last(new_article_map);
            }

            if append_to_date {
                shrink_last(new_date_map);
            }

            false
        } else {
            *token_bytes += word.len();

            true
        }
    });

    if !sentence.is_empty() {
        sentence_map.push(SentenceEntry::new(*sentence_first_word, sentence.len()));

        tokens.append(sentence);
    }

    *sentence_first_word = *current_word;
}

// shrink the just emitted entry by one token, removing it entirely when
// it becomes empty
fn shrink_last(map: &mut TextMap) {
    if let Some(last) = map.last_mut() {
        last.len -= 1;

        if last.len == 0 {
            map.pop();
        }
    }
}

/// One manipulator pass over a tokenized corpus. Returns `None` when the
/// pass has been cancelled.
fn tokenized_pass(
    article_map: &mut TextMap,
    date_map: &mut TextMap,
    t: &mut Tokenized,
    mut callback_sentence: Option<SentenceCallback<'_>>,
    mut callback_word: Option<TokenCallback<'_>>,
    status: &mut StatusSetter<'_>,
) -> Result<Option<PassOutcome>> {
    let mut outcome = PassOutcome {
        running: true,
        token_bytes: 0,
        num_deleted: 0,
        empty_dates: false,
        empty_articles: false,
        empty_sentences: false,
    };

    let mut date_index = 0;
    let mut article_index = 0;
    let mut date_end = 0;
    let mut article_end = 0;
    let mut in_date = false;
    let mut in_article = false;
    let mut status_counter = 0;

    let num_sentences = t.sentence_map.len();

    for s in 0..num_sentences {
        let sentence_begin = t.sentence_map[s].pos;
        let sentence_end = t.sentence_map[s].end();

        // skip dates and articles finished before the current sentence
        skip_entries_before(date_map, &mut date_index, &mut date_end, sentence_begin, &mut in_date);
        skip_entries_before(
            article_map,
            &mut article_index,
            &mut article_end,
            sentence_begin,
            &mut in_article,
        );

        // move the beginning of a date or article starting here
        if entry_begins_at(date_map, date_index, sentence_begin) {
            in_date = true;

            date_map[date_index].pos -= outcome.num_deleted;
        }

        if entry_begins_at(article_map, article_index, sentence_begin) {
            in_article = true;

            article_map[article_index].pos -= outcome.num_deleted;
        }

        t.sentence_map[s].pos -= outcome.num_deleted;

        if let Some(callback) = &mut callback_sentence {
            let mut sentence: Vec<String> = t.tokens[sentence_begin..sentence_end].to_vec();

            callback(&mut sentence);

            if sentence.len() == sentence_end - sentence_begin {
                for (offset, token) in sentence.into_iter().enumerate() {
                    t.tokens[sentence_begin + offset] = token;
                }
            } else {
                warn!("a sentence manipulator changed the token count; changes discarded");
            }
        }

        for n in sentence_begin..sentence_end {
            if let Some(callback) = &mut callback_word {
                callback(&mut t.tokens[n]);
            }

            if t.tokens[n].is_empty() {
                if in_date {
                    remove_token("date map", date_map, date_index, &mut outcome.empty_dates)?;
                }

                if in_article {
                    remove_token(
                        "article map",
                        article_map,
                        article_index,
                        &mut outcome.empty_articles,
                    )?;
                }

                remove_token(
                    "sentence map",
                    &mut t.sentence_map[s..=s],
                    0,
                    &mut outcome.empty_sentences,
                )?;

                outcome.num_deleted += 1;
            } else {
                outcome.token_bytes += t.tokens[n].len();
            }
        }

        status_counter += 1;

        if status_counter == TOKENIZE_UPDATE_EVERY {
            if !status.update(s + 1, num_sentences, true) {
                return Ok(None);
            }

            status_counter = 0;
        }
    }

    outcome.running = status.is_running();

    Ok(Some(outcome))
}
