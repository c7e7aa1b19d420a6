//! Shared bookkeeping primitives used by every corpus mutation.

use crate::{EntryAlreadyEmptyError, MapEntry, PositionTooSmallError, Result};

/// The span of the map entry a token walker is currently inside of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntrySpan {
    pub start: usize,
    pub end: usize,
}

/// The end of the entry with the given index, or of the last entry once the
/// index has run past the map.
pub fn entry_end_or_last<E: MapEntry>(map: &[E], entry_index: usize) -> usize {
    match map.get(entry_index) {
        Some(entry) => entry.end(),
        None => map.last().map(MapEntry::end).unwrap_or(0),
    }
}

/// The end of the first entry, regardless of whether the map covers the
/// beginning of the corpus: an entry starting past zero leaves an implicit
/// unlabelled span in front of it.
pub fn first_end<E: MapEntry>(map: &[E]) -> usize {
    match map.first() {
        Some(first) if first.pos() > 0 => first.pos(),
        Some(first) => first.len(),
        None => 0,
    }
}

/// Whether the entry with the given index exists and begins exactly at `pos`.
pub fn entry_begins_at<E: MapEntry>(map: &[E], entry_index: usize, pos: usize) -> bool {
    entry_index < map.len() && map[entry_index].pos() == pos
}

/// Advances `entry_index` past all entries that end at or before `pos`, as
/// well as past zero-length entries. `entry_end` tracks the end of the
/// current entry; `in_entry` is reset once any entry has been skipped.
///
/// When `in_entry` is set on entry, the walker is still inside the entry at
/// `entry_index`, so the first skip moves past it; otherwise the entry at
/// `entry_index` has not been entered yet and the first "skip" only
/// re-reads its end.
pub fn skip_entries_before<E: MapEntry>(
    map: &[E],
    entry_index: &mut usize,
    entry_end: &mut usize,
    pos: usize,
    in_entry: &mut bool,
) {
    let mut increase_index = *in_entry;
    let mut skipped = false;

    while *entry_index < map.len() && (*entry_end <= pos || map[*entry_index].is_empty()) {
        if increase_index {
            *entry_index += 1;
        } else {
            increase_index = true;
        }

        *entry_end = entry_end_or_last(map, *entry_index);

        skipped = true;
    }

    if skipped {
        *in_entry = false;
    }
}

/// Variant of [`skip_entries_before`] keeping the full span of the current
/// entry, used when walking tokens one by one.
pub fn skip_entries_before_span<E: MapEntry>(
    map: &[E],
    entry_index: &mut usize,
    span: &mut EntrySpan,
    pos: usize,
) {
    if *entry_index == 0 {
        if let Some(first) = map.first() {
            span.start = first.pos();
            span.end = first.end();
        }
    }

    while *entry_index < map.len() && (span.end <= pos || map[*entry_index].is_empty()) {
        *entry_index += 1;

        if let Some(entry) = map.get(*entry_index) {
            span.start = entry.pos();
            span.end = entry.end();
        }
    }
}

/// Removes all entries whose referenced tokens are all empty.
pub fn remove_empty_entries<E: MapEntry>(map: &mut Vec<E>, tokens: &[String]) {
    map.retain(|entry| (entry.pos()..entry.end()).any(|index| !tokens[index].is_empty()));
}

/// Moves an entry starting exactly at `pos` back by the number of tokens
/// removed in front of it. Does nothing while the entry at `entry_index`
/// has not been reached, or once the map has been exhausted.
pub fn update_position<E: MapEntry>(
    function: &str,
    map_name: &'static str,
    map: &mut [E],
    entry_index: usize,
    entry_pos: usize,
    pos: usize,
    removed: usize,
) -> Result<()> {
    if entry_index >= map.len() || pos != entry_pos {
        return Ok(());
    }

    let entry = &mut map[entry_index];

    if removed > entry.pos() {
        return PositionTooSmallError {
            function,
            map: map_name,
            pos: entry.pos(),
            removed,
        }
        .fail();
    }

    entry.set_pos(entry.pos() - removed);

    Ok(())
}

/// Shrinks the current entry by one token, provided the token at
/// `token_index` lies inside the entry's original span.
pub fn remove_token_from_length<E: MapEntry>(
    map: &mut [E],
    entry_index: usize,
    span: EntrySpan,
    token_index: usize,
) {
    if entry_index < map.len() && token_index >= span.start && token_index < span.end {
        let entry = &mut map[entry_index];

        entry.set_len(entry.len() - 1);
    }
}

/// Removes one token from the entry with the given index, flagging the map
/// as containing an emptied entry when its length drops to zero.
pub fn remove_token<E: MapEntry>(
    map_name: &'static str,
    map: &mut [E],
    entry_index: usize,
    emptied: &mut bool,
) -> Result<()> {
    let entry = &mut map[entry_index];

    if entry.is_empty() {
        return EntryAlreadyEmptyError { map: map_name }.fail();
    }

    entry.set_len(entry.len() - 1);

    if entry.is_empty() {
        *emptied = true;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{SentenceEntry, TextMapEntry};

    fn map() -> Vec<TextMapEntry> {
        vec![
            TextMapEntry::with_value(0, 3, "a"),
            TextMapEntry::with_value(3, 2, "b"),
            TextMapEntry::with_value(5, 4, "c"),
        ]
    }

    #[test]
    fn first_end_with_leading_gap() {
        let m = vec![TextMapEntry::with_value(2, 3, "a")];

        assert_eq!(first_end(&m), 2);
        assert_eq!(first_end(&map()), 3);
        assert_eq!(first_end::<TextMapEntry>(&[]), 0);
    }

    #[test]
    fn begins_at() {
        let m = map();

        assert!(entry_begins_at(&m, 0, 0));
        assert!(entry_begins_at(&m, 1, 3));
        assert!(!entry_begins_at(&m, 1, 4));
        assert!(!entry_begins_at(&m, 3, 9));
    }

    #[test]
    fn skipping_advances_past_finished_entries() {
        let m = map();
        let mut index = 0;
        let mut end = first_end(&m);
        let mut in_entry = true;

        skip_entries_before(&m, &mut index, &mut end, 4, &mut in_entry);

        assert_eq!(index, 1);
        assert_eq!(end, 5);
        assert!(!in_entry);

        skip_entries_before(&m, &mut index, &mut end, 5, &mut in_entry);

        assert_eq!(index, 2);
        assert_eq!(end, 9);
    }

    #[test]
    fn skipping_with_span() {
        let m = map();
        let mut index = 0;
        let mut span = EntrySpan::default();

        skip_entries_before_span(&m, &mut index, &mut span, 0);
        assert_eq!((index, span.start, span.end), (0, 0, 3));

        skip_entries_before_span(&m, &mut index, &mut span, 6);
        assert_eq!((index, span.start, span.end), (2, 5, 9));
    }

    #[test]
    fn empty_entries_are_dropped() {
        let tokens: Vec<String> = ["", "", "x", "", "y"].iter().map(|s| s.to_string()).collect();
        let mut m = vec![
            TextMapEntry::with_value(0, 2, "gone"),
            TextMapEntry::with_value(2, 1, "kept"),
            TextMapEntry::with_value(3, 2, "kept too"),
        ];

        remove_empty_entries(&mut m, &tokens);

        assert_eq!(m.len(), 2);
        assert_eq!(m[0].value, "kept");
    }

    #[test]
    fn position_updates_only_at_entry_start() {
        let mut m = map();
        let mut sentence = vec![SentenceEntry::new(3, 2)];

        update_position("test", "article map", &mut m, 1, 3, 2, 1).unwrap();
        assert_eq!(m[1].pos, 3);

        update_position("test", "article map", &mut m, 1, 3, 3, 1).unwrap();
        assert_eq!(m[1].pos, 2);

        update_position("test", "sentence map", &mut sentence, 0, 3, 3, 1).unwrap();
        assert_eq!(sentence[0].pos, 2);
    }

    #[test]
    fn position_cannot_move_before_zero() {
        let mut m = map();

        let err = update_position("test", "date map", &mut m, 0, 0, 0, 1).unwrap_err();

        assert!(matches!(err, crate::Error::PositionTooSmall { .. }));
    }

    #[test]
    fn length_shrinks_inside_span() {
        let mut m = map();
        let span = EntrySpan { start: 3, end: 5 };

        remove_token_from_length(&mut m, 1, span, 4);
        assert_eq!(m[1].len, 1);

        remove_token_from_length(&mut m, 1, span, 5);
        assert_eq!(m[1].len, 1);
    }

    #[test]
    fn removing_tokens_flags_emptied_entries() {
        let mut m = vec![TextMapEntry::with_value(0, 1, "a")];
        let mut emptied = false;

        remove_token("article map", &mut m, 0, &mut emptied).unwrap();
        assert!(emptied);
        assert!(remove_token("article map", &mut m, 0, &mut emptied).is_err());
    }
}
