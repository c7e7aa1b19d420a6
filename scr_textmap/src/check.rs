//! Map-level consistency checks, run by the corpus after every mutation
//! when consistency checking is enabled.

use crate::{
    date::is_iso_date, InvalidDateError, InvalidEndError, InvalidPositionError, MapEntry, Result,
    SentenceEntry, TextMapEntry,
};

/// Checks that the entries of an article or date map tile the corpus:
/// every entry starts where its predecessor ended (plus one separating
/// space in the continuous form) and the last entry ends at the corpus
/// length. For date maps, every value must be a `YYYY-MM-DD` date.
pub fn check_text_map(
    function: &str,
    name: &'static str,
    map: &[TextMapEntry],
    end: usize,
    is_tokenized: bool,
    is_date_map: bool,
) -> Result<()> {
    if map.is_empty() {
        return Ok(());
    }

    let mut last = 0;

    for entry in map {
        if last > 0 && entry.pos != last {
            return InvalidPositionError {
                function,
                map: name,
                pos: entry.pos,
                expected: last,
            }
            .fail();
        }

        last = entry.end();

        if !is_tokenized {
            // account for the separating space
            last += 1;
        }

        if is_date_map && !is_iso_date(&entry.value) {
            return InvalidDateError {
                function,
                map: name,
                value: entry.value.clone(),
            }
            .fail();
        }
    }

    let back = map.last().expect("map is non-empty");

    if back.end() != end {
        return InvalidEndError {
            function,
            map: name,
            end: back.end(),
            expected: end,
        }
        .fail();
    }

    Ok(())
}

/// Checks that the sentence map tiles the tokens without gaps, starting at
/// zero and ending at the corpus length.
pub fn check_sentence_map(
    function: &str,
    map: &[SentenceEntry],
    end: usize,
    is_tokenized: bool,
) -> Result<()> {
    if map.is_empty() {
        return Ok(());
    }

    let mut last = 0;

    for entry in map {
        if entry.pos != last {
            return InvalidPositionError {
                function,
                map: "sentence map",
                pos: entry.pos,
                expected: last,
            }
            .fail();
        }

        last = entry.end();

        if !is_tokenized {
            last += 1;
        }
    }

    let back = map.last().expect("map is non-empty");

    if back.end() != end {
        return InvalidEndError {
            function,
            map: "sentence map",
            end: back.end(),
            expected: end,
        }
        .fail();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn tiled_text_map_passes() {
        let map = vec![
            TextMapEntry::with_value(0, 5, "a1"),
            TextMapEntry::with_value(6, 3, "a2"),
            TextMapEntry::with_value(10, 7, "a3"),
        ];

        check_text_map("test", "article map", &map, 17, false, false).unwrap();
    }

    #[test]
    fn gap_in_text_map_fails() {
        let map = vec![
            TextMapEntry::with_value(0, 5, "a1"),
            TextMapEntry::with_value(7, 3, "a2"),
        ];

        let err = check_text_map("test", "article map", &map, 10, false, false).unwrap_err();

        assert!(matches!(err, Error::InvalidPosition { .. }));
    }

    #[test]
    fn short_text_map_fails() {
        let map = vec![TextMapEntry::with_value(0, 5, "a1")];

        let err = check_text_map("test", "article map", &map, 9, false, false).unwrap_err();

        assert!(matches!(err, Error::InvalidEnd { .. }));
    }

    #[test]
    fn date_values_are_validated() {
        let map = vec![TextMapEntry::with_value(0, 5, "not a date")];

        let err = check_text_map("test", "date map", &map, 5, true, true).unwrap_err();

        assert!(matches!(err, Error::InvalidDate { .. }));
    }

    #[test]
    fn sentence_map_tiles_tokens() {
        let map = vec![SentenceEntry::new(0, 4), SentenceEntry::new(4, 2)];

        check_sentence_map("test", &map, 6, true).unwrap();

        let err = check_sentence_map("test", &map, 7, true).unwrap_err();

        assert!(matches!(err, Error::InvalidEnd { .. }));
    }
}
