use snafu::Snafu;

type Result<T, E = Error> = std::result::Result<T, E>;

/// Maximum number of bytes used by one UTF-8-encoded code point.
pub const UTF8_MAX_BYTES: usize = 4;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(context(suffix(Error)))]
pub enum Error {
    #[snafu(display("invalid chunk size: {desired} > {max}"))]
    InvalidChunkSize { desired: usize, max: usize },
    #[snafu(display(
        "chunk size {max} is too small to slice text containing multi-byte code points"
    ))]
    ChunkTooSmall { max: usize },
    #[snafu(display("no valid UTF-8 boundary within the last {UTF8_MAX_BYTES} bytes"))]
    InvalidUtf8,
}

/// Finds the largest length `L <= desired_len` such that
/// `source[offset..offset + L]` ends on a UTF-8 code point boundary.
///
/// At most the last `UTF8_MAX_BYTES - 1` bytes are cut, so the result lies
/// within `desired_len - 3..=desired_len`. Returns zero when no boundary
/// fits but the chunk may still grow (`desired_len < max_chunk_len`).
///
/// Fails with [`Error::InvalidChunkSize`] when `desired_len` exceeds
/// `max_chunk_len`, with [`Error::ChunkTooSmall`] when the next code point
/// alone does not fit into a chunk of the maximum size, and with
/// [`Error::InvalidUtf8`] when no boundary exists in the inspected window.
pub fn valid_length(
    source: &str,
    offset: usize,
    desired_len: usize,
    max_chunk_len: usize,
) -> Result<usize> {
    if desired_len > max_chunk_len || max_chunk_len == 0 {
        return InvalidChunkSizeError {
            desired: desired_len,
            max: max_chunk_len,
        }
        .fail();
    }

    if desired_len == 0 {
        return Ok(0);
    }

    let mut cut = 0;

    while cut < UTF8_MAX_BYTES {
        if cut > desired_len {
            break;
        }

        let len = desired_len - cut;

        if len > 0 && source.is_char_boundary(offset + len) {
            return Ok(len);
        }

        cut += 1;
    }

    if cut == UTF8_MAX_BYTES {
        return InvalidUtf8Error.fail();
    }

    if desired_len >= max_chunk_len {
        return ChunkTooSmallError { max: max_chunk_len }.fail();
    }

    Ok(0)
}

/// Whether the string consists of exactly one code point.
pub fn is_single_code_point(s: &str) -> bool {
    let mut chars = s.chars();

    chars.next().is_some() && chars.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_never_cut() {
        let s = "abcdefgh";

        for n in 0..=s.len() {
            assert_eq!(valid_length(s, 0, n, s.len()).unwrap(), n);
        }
    }

    #[test]
    fn two_byte_code_point_not_split() {
        // "AB" + 'é' (0xC3 0xA9) + "CD"
        let s = "AB\u{e9}CD";

        assert_eq!(s.len(), 6);
        assert_eq!(valid_length(s, 0, 3, 3).unwrap(), 2);
        assert_eq!(valid_length(s, 0, 4, 4).unwrap(), 4);
    }

    #[test]
    fn four_byte_code_point_cut_back() {
        // U+1F600 takes four bytes
        let s = "a\u{1F600}";

        assert_eq!(valid_length(s, 0, 2, 10).unwrap(), 1);
        assert_eq!(valid_length(s, 0, 3, 10).unwrap(), 1);
        assert_eq!(valid_length(s, 0, 4, 10).unwrap(), 1);
        assert_eq!(valid_length(s, 0, 5, 10).unwrap(), 5);
    }

    #[test]
    fn desired_longer_than_max_rejected() {
        assert_eq!(
            valid_length("abc", 0, 3, 2),
            Err(Error::InvalidChunkSize { desired: 3, max: 2 })
        );
    }

    #[test]
    fn chunk_too_small_for_code_point() {
        // a chunk of two bytes can never hold the emoji
        let s = "\u{1F600}";

        assert_eq!(
            valid_length(s, 0, 2, 2),
            Err(Error::ChunkTooSmall { max: 2 })
        );
    }

    #[test]
    fn zero_when_chunk_may_grow() {
        let s = "\u{1F600}x";

        assert_eq!(valid_length(s, 0, 2, 3).unwrap(), 0);
    }

    #[test]
    fn offset_is_respected() {
        let s = "xy\u{e9}z";

        assert_eq!(valid_length(s, 2, 1, 8).unwrap(), 0);
        assert_eq!(valid_length(s, 2, 2, 8).unwrap(), 2);
    }

    #[test]
    fn single_code_point() {
        assert!(is_single_code_point("a"));
        assert!(is_single_code_point("\u{e9}"));
        assert!(is_single_code_point("\u{1F600}"));
        assert!(!is_single_code_point(""));
        assert!(!is_single_code_point("ab"));
        assert!(!is_single_code_point("\u{e9}\u{e9}"));
    }
}
