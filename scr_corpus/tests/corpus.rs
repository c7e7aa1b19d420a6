//! End-to-end tests for corpus creation, slicing, recombination,
//! filtering and tokenization.

use pretty_assertions::assert_eq;
use scr_corpus::{
    Corpus, Error, SentenceEntry, SentenceMap, StatusSetter, TextMapEntry,
    TOKEN_MANIP_ENGLISH_STEMMER, TOKEN_MANIP_STOPWORD_REMOVER,
};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// The corpus of the "three articles, same date" scenario.
fn sample_corpus(check_consistency: bool) -> Corpus {
    let mut corpus = Corpus::new(check_consistency);

    corpus.create_with_maps(
        &mut strings(&["A b c", "D e", "F g h i"]),
        &mut strings(&["a1", "a2", "a3"]),
        &mut strings(&[
            "2020-01-01T00:00:00",
            "2020-01-01T12:00:00",
            "2020-01-01T23:59:59",
        ]),
        false,
    );

    corpus
}

fn tokenized_sample(check_consistency: bool) -> Corpus {
    let mut corpus = sample_corpus(check_consistency);
    let mut status = StatusSetter::noop();

    assert!(corpus
        .tokenize_custom(None, None, 0, &mut status)
        .unwrap());

    corpus
}

#[test]
fn date_filter_can_prune_everything() {
    let mut corpus = sample_corpus(true);

    assert!(corpus.filter_by_date("2019-01-01", "2019-12-31").unwrap());
    assert!(corpus.is_empty());
    assert_eq!(corpus.size(), 0);
    assert!(!corpus.has_article_map());
    assert!(!corpus.has_date_map());
}

#[test]
fn empty_date_filter_is_a_no_op() {
    let mut corpus = sample_corpus(true);

    assert!(!corpus.filter_by_date("", "").unwrap());
    assert_eq!(corpus.text().unwrap(), "A b c D e F g h i");
}

#[test]
fn date_filter_is_idempotent() {
    let mut corpus = Corpus::new(true);

    corpus.create_with_maps(
        &mut strings(&["a b", "c d", "e f"]),
        &mut strings(&["a1", "a2", "a3"]),
        &mut strings(&["2020-01-01", "2020-01-02", "2020-01-03"]),
        false,
    );

    assert!(corpus.filter_by_date("2020-01-02", "2020-01-02").unwrap());

    assert_eq!(corpus.text().unwrap(), "c d");
    assert_eq!(
        *corpus.article_map(),
        vec![TextMapEntry::with_value(0, 3, "a2")]
    );
    assert_eq!(
        *corpus.date_map(),
        vec![TextMapEntry::with_value(0, 3, "2020-01-02")]
    );

    // a second identical call finds everything already in range
    assert!(!corpus.filter_by_date("2020-01-02", "2020-01-02").unwrap());
}

#[test]
fn date_filter_works_on_tokenized_corpora() {
    let mut corpus = Corpus::new(true);
    let mut status = StatusSetter::noop();

    corpus.create_with_maps(
        &mut strings(&["a b", "c d", "e f"]),
        &mut strings(&["a1", "a2", "a3"]),
        &mut strings(&["2020-01-01", "2020-01-02", "2020-01-03"]),
        false,
    );

    assert!(corpus.tokenize_custom(None, None, 0, &mut status).unwrap());
    assert!(corpus.filter_by_date("2020-01-02", "").unwrap());

    assert_eq!(corpus.tokens().unwrap(), &strings(&["c", "d", "e", "f"]));
    assert_eq!(
        *corpus.article_map(),
        vec![
            TextMapEntry::with_value(0, 2, "a2"),
            TextMapEntry::with_value(2, 2, "a3"),
        ]
    );
    assert_eq!(
        *corpus.sentence_map().unwrap(),
        vec![SentenceEntry::new(0, 2), SentenceEntry::new(2, 2)]
    );
    assert_eq!(corpus.size(), 4);
}

#[test]
fn tokenization_splits_sentences_at_article_ends() {
    let corpus = tokenized_sample(true);

    assert_eq!(
        corpus.tokens().unwrap(),
        &strings(&["A", "b", "c", "D", "e", "F", "g", "h", "i"])
    );
    assert_eq!(
        *corpus.sentence_map().unwrap(),
        vec![
            SentenceEntry::new(0, 3),
            SentenceEntry::new(3, 2),
            SentenceEntry::new(5, 4),
        ]
    );
    assert_eq!(
        *corpus.article_map(),
        vec![
            TextMapEntry::with_value(0, 3, "a1"),
            TextMapEntry::with_value(3, 2, "a2"),
            TextMapEntry::with_value(5, 4, "a3"),
        ]
    );
    assert_eq!(
        *corpus.date_map(),
        vec![TextMapEntry::with_value(0, 9, "2020-01-01")]
    );
    // the size of a tokenized corpus is the byte total of its tokens
    assert_eq!(corpus.size(), 9);
}

#[test]
fn tokenization_splits_sentences_at_punctuation() {
    let mut corpus = Corpus::new(true);
    let mut status = StatusSetter::noop();

    corpus.create(
        &mut strings(&["One two. Three! Four?", "Five,six seven"]),
        false,
    );

    assert!(corpus.tokenize_custom(None, None, 0, &mut status).unwrap());

    assert_eq!(
        corpus.tokens().unwrap(),
        &strings(&["One", "two", "Three", "Four", "Five", "six", "seven"])
    );
    assert_eq!(
        *corpus.sentence_map().unwrap(),
        vec![
            SentenceEntry::new(0, 2),
            SentenceEntry::new(2, 1),
            SentenceEntry::new(3, 1),
            SentenceEntry::new(4, 3),
        ]
    );
}

#[test]
fn cancelled_tokenization_leaves_the_corpus_unchanged() {
    let mut corpus = sample_corpus(true);
    let mut status = StatusSetter::new(|_| true, |_| true, || false);

    assert!(!corpus.tokenize_custom(None, None, 0, &mut status).unwrap());

    assert!(!corpus.is_tokenized());
    assert_eq!(corpus.text().unwrap(), "A b c D e F g h i");
}

#[test]
fn freeing_memory_early_does_not_change_the_result() {
    let mut corpus = sample_corpus(true);
    let mut status = StatusSetter::noop();

    assert!(corpus.tokenize_custom(None, None, 4, &mut status).unwrap());

    assert_eq!(
        corpus.tokens().unwrap(),
        &strings(&["A", "b", "c", "D", "e", "F", "g", "h", "i"])
    );
}

#[test]
fn continuous_chunks_round_trip() {
    let original = sample_corpus(true);

    for chunk_size in 1..=20 {
        let mut chunks = Vec::new();
        let mut article_maps = Vec::new();
        let mut date_maps = Vec::new();

        original
            .copy_chunks_continuous(chunk_size, &mut chunks, &mut article_maps, &mut date_maps)
            .unwrap();

        assert!(
            chunks.iter().all(|chunk| chunk.len() <= chunk_size),
            "chunk too large for size {chunk_size}"
        );

        let mut combined = Corpus::new(true);

        combined
            .combine_continuous(&mut chunks, &mut article_maps, &mut date_maps, true)
            .unwrap();

        assert_eq!(
            combined.text().unwrap(),
            original.text().unwrap(),
            "text differs for chunk size {chunk_size}"
        );
        assert_eq!(
            combined.article_map(),
            original.article_map(),
            "article map differs for chunk size {chunk_size}"
        );
        assert_eq!(
            combined.date_map(),
            original.date_map(),
            "date map differs for chunk size {chunk_size}"
        );
    }
}

#[test]
fn whole_corpus_fits_into_one_chunk() {
    let corpus = sample_corpus(true);
    let mut chunks = Vec::new();
    let mut article_maps = Vec::new();
    let mut date_maps = Vec::new();

    corpus
        .copy_chunks_continuous(corpus.size(), &mut chunks, &mut article_maps, &mut date_maps)
        .unwrap();

    assert_eq!(chunks, vec!["A b c D e F g h i".to_string()]);
    assert_eq!(article_maps, vec![corpus.article_map().clone()]);
    assert_eq!(date_maps, vec![corpus.date_map().clone()]);
}

#[test]
fn chunking_never_splits_utf8_code_points() {
    let mut corpus = Corpus::new(true);

    corpus.create(&mut strings(&["AB\u{e9}CD"]), false);

    let mut chunks = Vec::new();
    let mut article_maps = Vec::new();
    let mut date_maps = Vec::new();

    corpus
        .copy_chunks_continuous(3, &mut chunks, &mut article_maps, &mut date_maps)
        .unwrap();

    assert_eq!(chunks, vec!["AB".to_string(), "\u{e9}C".to_string(), "D".to_string()]);
    assert!(chunks.iter().all(|chunk| chunk.as_bytes().last() != Some(&0xC3)));
}

#[test]
fn zero_chunk_size_is_rejected_for_non_empty_corpora() {
    let corpus = sample_corpus(true);
    let mut chunks = Vec::new();
    let mut article_maps = Vec::new();
    let mut date_maps = Vec::new();

    assert!(matches!(
        corpus.copy_chunks_continuous(0, &mut chunks, &mut article_maps, &mut date_maps),
        Err(Error::ChunkSizeZero)
    ));
}

#[test]
fn tokenized_chunks_round_trip() {
    let original = tokenized_sample(true);

    // budgets below the byte length of the longest sentence tail cannot
    // be honoured, as the carried rest of a sentence is only re-cut when
    // a following sentence arrives
    for chunk_size in 6..=24 {
        let mut chunks = Vec::new();
        let mut word_nums = Vec::new();
        let mut article_maps = Vec::new();
        let mut date_maps = Vec::new();
        let mut sentence_maps = Vec::new();

        original
            .copy_chunks_tokenized(
                chunk_size,
                &mut chunks,
                &mut word_nums,
                &mut article_maps,
                &mut date_maps,
                &mut sentence_maps,
            )
            .unwrap();

        assert!(
            chunks.iter().all(|chunk| chunk.len() <= chunk_size),
            "chunk too large for size {chunk_size}"
        );

        let mut combined = Corpus::new(true);

        combined
            .combine_tokenized(
                &mut chunks,
                &mut word_nums,
                &mut article_maps,
                &mut date_maps,
                &mut sentence_maps,
                true,
            )
            .unwrap();

        assert_eq!(
            combined.tokens().unwrap(),
            original.tokens().unwrap(),
            "tokens differ for chunk size {chunk_size}"
        );
        assert_eq!(
            combined.sentence_map().unwrap(),
            original.sentence_map().unwrap(),
            "sentence map differs for chunk size {chunk_size}"
        );
        assert_eq!(
            combined.article_map(),
            original.article_map(),
            "article map differs for chunk size {chunk_size}"
        );
        assert_eq!(
            combined.date_map(),
            original.date_map(),
            "date map differs for chunk size {chunk_size}"
        );
        assert_eq!(combined.size(), original.size());
    }
}

#[test]
fn tokenized_chunking_with_chunk_size_ten_emits_two_chunks() {
    let corpus = tokenized_sample(true);

    let mut chunks = Vec::new();
    let mut word_nums = Vec::new();
    let mut article_maps = Vec::new();
    let mut date_maps = Vec::new();
    let mut sentence_maps = Vec::new();

    corpus
        .copy_chunks_tokenized(
            10,
            &mut chunks,
            &mut word_nums,
            &mut article_maps,
            &mut date_maps,
            &mut sentence_maps,
        )
        .unwrap();

    assert_eq!(chunks, strings(&["A\nb\nc\nD\ne", "F\ng\nh\ni"]));
    assert_eq!(word_nums, vec![5, 4]);
    assert_eq!(
        sentence_maps,
        vec![
            vec![SentenceEntry::new(0, 3), SentenceEntry::new(3, 2)],
            vec![SentenceEntry::new(0, 4)],
        ]
    );
    assert_eq!(
        date_maps,
        vec![
            vec![TextMapEntry::with_value(0, 5, "2020-01-01")],
            vec![TextMapEntry::with_value(0, 4, "2020-01-01")],
        ]
    );
}

#[test]
fn combining_tokenized_chunks_requires_sentence_maps() {
    let mut corpus = Corpus::new(true);

    let result = corpus.combine_tokenized(
        &mut strings(&["a\nb"]),
        &mut vec![2],
        &mut Vec::new(),
        &mut Vec::new(),
        &mut Vec::new(),
        false,
    );

    assert!(matches!(result, Err(Error::EmptySentenceMap)));
}

#[test]
fn combining_rejects_more_maps_than_chunks() {
    let mut corpus = Corpus::new(true);
    let mut sentence_maps: Vec<SentenceMap> =
        vec![vec![SentenceEntry::new(0, 1)], vec![SentenceEntry::new(0, 1)]];

    let result = corpus.combine_tokenized(
        &mut strings(&["a"]),
        &mut vec![1],
        &mut Vec::new(),
        &mut Vec::new(),
        &mut sentence_maps,
        false,
    );

    assert!(matches!(result, Err(Error::MoreMapsThanChunks)));
}

#[test]
fn filtering_articles_removes_their_tokens() {
    let mut corpus = tokenized_sample(true);
    let mut status = StatusSetter::noop();

    let removed = corpus
        .filter_articles(
            &mut |tokens: &[String], pos: usize, _len: usize| tokens[pos] != "D",
            &mut status,
        )
        .unwrap();

    assert_eq!(removed, 1);
    assert_eq!(
        corpus.tokens().unwrap(),
        &strings(&["A", "b", "c", "F", "g", "h", "i"])
    );
    assert_eq!(
        *corpus.article_map(),
        vec![
            TextMapEntry::with_value(0, 3, "a1"),
            TextMapEntry::with_value(3, 4, "a3"),
        ]
    );
    assert_eq!(
        *corpus.date_map(),
        vec![TextMapEntry::with_value(0, 7, "2020-01-01")]
    );
    assert_eq!(
        *corpus.sentence_map().unwrap(),
        vec![SentenceEntry::new(0, 3), SentenceEntry::new(3, 4)]
    );
    assert_eq!(corpus.size(), 7);
}

#[test]
fn keeping_every_article_changes_nothing() {
    let mut corpus = tokenized_sample(true);
    let mut status = StatusSetter::noop();

    let removed = corpus
        .filter_articles(&mut |_: &[String], _, _| true, &mut status)
        .unwrap();

    assert_eq!(removed, 0);
    assert_eq!(corpus.num_tokens().unwrap(), 9);
}

#[test]
fn manipulators_drop_emptied_tokens() {
    let dir = tempfile::tempdir().unwrap();

    std::fs::write(dir.path().join("stop"), "the\t\t\t1\na\t\t\t1\n").unwrap();

    let mut corpus = Corpus::with_dictionary_dir(true, dir.path());
    let mut status = StatusSetter::noop();

    corpus.create(&mut strings(&["the cat. the dog."]), false);

    assert!(corpus
        .tokenize(
            &[],
            &[],
            &[TOKEN_MANIP_STOPWORD_REMOVER],
            &strings(&["stop"]),
            0,
            &mut status,
        )
        .unwrap());

    assert_eq!(corpus.tokens().unwrap(), &strings(&["cat", "dog"]));
    assert_eq!(
        *corpus.sentence_map().unwrap(),
        vec![SentenceEntry::new(0, 1), SentenceEntry::new(1, 1)]
    );
}

#[test]
fn stemming_runs_inside_the_pipeline() {
    let mut corpus = Corpus::new(true);
    let mut status = StatusSetter::noop();

    corpus.create(&mut strings(&["cats running. ponies"]), false);

    assert!(corpus
        .tokenize(
            &[],
            &[],
            &[TOKEN_MANIP_ENGLISH_STEMMER],
            &[],
            0,
            &mut status,
        )
        .unwrap());

    assert_eq!(corpus.tokens().unwrap(), &strings(&["cat", "run", "poni"]));
}

#[test]
fn unknown_manipulators_are_rejected() {
    let mut corpus = sample_corpus(true);
    let mut status = StatusSetter::noop();

    assert!(matches!(
        corpus.tokenize(&[7], &[], &[], &[], 0, &mut status),
        Err(Error::UnknownManipulator { kind: "sentence", id: 7 })
    ));
    assert!(matches!(
        corpus.tokenize(&[], &[], &[9], &[], 0, &mut status),
        Err(Error::UnknownManipulator { kind: "token", id: 9 })
    ));
}

#[test]
fn retokenizing_shrinks_all_maps() {
    let mut corpus = tokenized_sample(true);
    let mut status = StatusSetter::noop();

    let mut drop_b = |token: &mut String| {
        if token == "b" {
            token.clear();
        }
    };

    assert!(corpus
        .tokenize_custom(None, Some(&mut drop_b), 0, &mut status)
        .unwrap());

    assert_eq!(
        corpus.tokens().unwrap(),
        &strings(&["A", "c", "D", "e", "F", "g", "h", "i"])
    );
    assert_eq!(
        *corpus.article_map(),
        vec![
            TextMapEntry::with_value(0, 2, "a1"),
            TextMapEntry::with_value(2, 2, "a2"),
            TextMapEntry::with_value(4, 4, "a3"),
        ]
    );
    assert_eq!(
        *corpus.date_map(),
        vec![TextMapEntry::with_value(0, 8, "2020-01-01")]
    );
    assert_eq!(
        *corpus.sentence_map().unwrap(),
        vec![
            SentenceEntry::new(0, 2),
            SentenceEntry::new(2, 2),
            SentenceEntry::new(4, 4),
        ]
    );
    assert_eq!(corpus.size(), 8);
}

#[test]
fn corpora_merge_grouped_by_date_and_article() {
    let mut status = StatusSetter::noop();
    let mut first = Corpus::new(true);
    let mut second = Corpus::new(true);

    first.create_with_maps(
        &mut strings(&["x y"]),
        &mut strings(&["a1"]),
        &mut strings(&["2020-01-02T08:00:00"]),
        false,
    );
    second.create_with_maps(
        &mut strings(&["z w"]),
        &mut strings(&["a2"]),
        &mut strings(&["2020-01-01T08:00:00"]),
        false,
    );

    assert!(first.tokenize_custom(None, None, 0, &mut status).unwrap());
    assert!(second.tokenize_custom(None, None, 0, &mut status).unwrap());

    let combined = Corpus::from_corpora(vec![first, second], true, &mut status).unwrap();

    // the earlier date sorts first, regardless of input order
    assert_eq!(combined.tokens().unwrap(), &strings(&["z", "w", "x", "y"]));
    assert_eq!(
        *combined.date_map(),
        vec![
            TextMapEntry::with_value(0, 2, "2020-01-01"),
            TextMapEntry::with_value(2, 2, "2020-01-02"),
        ]
    );
    assert_eq!(
        *combined.article_map(),
        vec![
            TextMapEntry::with_value(0, 2, "a2"),
            TextMapEntry::with_value(2, 2, "a1"),
        ]
    );
}

#[test]
fn merging_requires_tokenized_sources() {
    let mut status = StatusSetter::noop();
    let first = sample_corpus(true);
    let second = tokenized_sample(true);

    assert!(matches!(
        Corpus::from_corpora(vec![first, second], true, &mut status),
        Err(Error::CorpusNotTokenized { .. })
    ));
}
