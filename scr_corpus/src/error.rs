use snafu::Snafu;

/// Errors surfaced by corpus operations.
///
/// Every public operation either succeeds and leaves all invariants
/// intact, or fails with one of these kinds without visible side effects
/// on the corpus.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(Error)))]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{operation}(): the corpus has been tokenized"))]
    CorpusAlreadyTokenized { operation: &'static str },

    #[snafu(display("{operation}(): the corpus has not been tokenized"))]
    CorpusNotTokenized { operation: &'static str },

    #[snafu(display("{operation}(): article #{index} requested, but the article map is empty"))]
    ArticleMapEmpty {
        operation: &'static str,
        index: usize,
    },

    #[snafu(display(
        "{operation}(): the article index #{index} is out of bounds [#0;#{}]", size - 1
    ))]
    ArticleOutOfBounds {
        operation: &'static str,
        index: usize,
        size: usize,
    },

    #[snafu(display("{operation}(): no article ID has been specified"))]
    EmptyArticleId { operation: &'static str },

    #[snafu(display(
        "{operation}(): invalid length of date ({len} instead of {})",
        scr_textmap::DATE_LENGTH
    ))]
    InvalidDateLength { operation: &'static str, len: usize },

    #[snafu(display(
        "{operation}(): substring [{from}..{from}+{len}] lies outside the corpus"
    ))]
    SubstrOutOfBounds {
        operation: &'static str,
        from: usize,
        len: usize,
    },

    #[snafu(display(
        "article map in corpus chunk {}/{num_chunks} starts at #{start} instead of {expected}",
        chunk + 1
    ))]
    InvalidArticleMapStart {
        chunk: usize,
        num_chunks: usize,
        start: usize,
        expected: &'static str,
    },

    #[snafu(display(
        "sentence map in corpus chunk {}/{num_chunks} starts at #{start} instead of #0",
        chunk + 1
    ))]
    InvalidSentenceMapStart {
        chunk: usize,
        num_chunks: usize,
        start: usize,
    },

    #[snafu(display(
        "length of the first sentence in chunk {}/{num_chunks} conflicts with the previous chunk \
         ({len} != {last_end} - {offset})",
        chunk + 1
    ))]
    InconsistentSentenceBoundary {
        chunk: usize,
        num_chunks: usize,
        len: usize,
        last_end: usize,
        offset: usize,
    },

    #[snafu(display(
        "length of the last sentence ({pos} + {len}) exceeds the length of the corpus ({size})"
    ))]
    LastSentenceBehindCorpus { pos: usize, len: usize, size: usize },

    #[snafu(display(
        "article position (#{article_pos}) lies behind its date at [#{date_pos};#{date_end}]"
    ))]
    ArticleBehindDate {
        article_pos: usize,
        date_pos: usize,
        date_end: usize,
    },

    #[snafu(display(
        "after date filtering, the first retained {kind} begins at #{pos} instead of #{offset}"
    ))]
    ArticleDateMismatch {
        kind: &'static str,
        pos: usize,
        offset: usize,
    },

    #[snafu(display("invalid chunk size (zero) for a non-empty corpus"))]
    ChunkSizeZero,

    #[snafu(display("chunk is too large: {size} > {chunk_size}"))]
    ChunkTooLarge { size: usize, chunk_size: usize },

    #[snafu(display("end of articles, but not of corpus (#{pos} < #{size})"))]
    ArticleMapEndsBeforeCorpus { pos: usize, size: usize },

    #[snafu(display("the final chunk is empty"))]
    EmptyChunk,

    #[snafu(display("no sentence map for a non-empty corpus"))]
    EmptySentenceMap,

    #[snafu(display(
        "more word counts, article maps, date maps, and/or sentence maps than corpus chunks"
    ))]
    MoreMapsThanChunks,

    #[snafu(display("{kind} '{value}' at #{pos} begins before the sentence at #{sentence_pos}"))]
    EntryBeforeSentence {
        kind: &'static str,
        value: String,
        pos: usize,
        sentence_pos: usize,
    },

    #[snafu(display("{operation}(): last {kind} '{value}' has not been finished"))]
    UnfinishedEntry {
        operation: &'static str,
        kind: &'static str,
        value: String,
    },

    #[snafu(display("{operation}(): unexpected {kind} '{value}' after the end of the corpus"))]
    UnexpectedAfterEnd {
        operation: &'static str,
        kind: &'static str,
        value: String,
    },

    #[snafu(display(
        "{function}(): sentence [#{sentence_pos};#{sentence_end}] ends behind its {kind} \
         ending at #{entry_end}"
    ))]
    SentenceBehindEntry {
        function: &'static str,
        kind: &'static str,
        sentence_pos: usize,
        sentence_end: usize,
        entry_end: usize,
    },

    #[snafu(display("unknown {kind} manipulator: {id}"))]
    UnknownManipulator { kind: &'static str, id: u16 },

    #[snafu(display("manipulator {id} requires a model or dictionary name"))]
    MissingManipulatorModel { id: u16 },

    #[snafu(display("could not slice the corpus: {source}"))]
    Boundary { source: scr_utf8::Error },

    #[snafu(display("inconsistent text map: {source}"))]
    Map { source: scr_textmap::Error },

    #[snafu(display("could not prepare a manipulator: {source}"))]
    Dictionary { source: scr_dict::Error },
}

impl From<scr_utf8::Error> for Error {
    fn from(source: scr_utf8::Error) -> Self {
        Error::Boundary { source }
    }
}

impl From<scr_textmap::Error> for Error {
    fn from(source: scr_textmap::Error) -> Self {
        Error::Map { source }
    }
}

impl From<scr_dict::Error> for Error {
    fn from(source: scr_dict::Error) -> Self {
        Error::Dictionary { source }
    }
}
