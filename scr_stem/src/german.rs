//! Simple German stemmer following CISTEM by Leonie Weißweiler and
//! Alexander Fraser.
//!
//! See: Weißweiler, Leonie / Fraser, Alexander: Developing a Stemmer for
//! German Based on a Comparative Analysis of Publicly Available Stemmers,
//! in: Proceedings of the GSCL, 27th International Conference. Berlin,
//! September 13-14, 2017.

/// Minimum length of a word to strip two letters from the end or the
/// beginning.
const MIN_LENGTH_STRIP_2: usize = 6;

/// Minimum length of a word to strip one letter from the end.
const MIN_LENGTH_STRIP_1: usize = 4;

fn is_punctuation(c: char) -> bool {
    matches!(
        c,
        '"' | '!'
            | '#'
            | '$'
            | '%'
            | '&'
            | '\''
            | '('
            | ')'
            | '*'
            | '+'
            | ','
            | '-'
            | '.'
            | '/'
            | ':'
            | ';'
            | '<'
            | '='
            | '>'
            | '?'
            | '@'
            | '['
            | '\\'
            | ']'
            | '^'
            | '_'
            | '`'
            | '{'
            | '|'
            | '}'
            | '~'
    )
}

/// Stems a token in German, in place.
pub fn stem_german(token: &mut String) {
    if token.is_empty() {
        return;
    }

    // normalize: drop punctuation, lower-case ASCII, fold umlauts and sharp s
    let mut word: Vec<char> = Vec::with_capacity(token.chars().count() + 1);

    for c in token.chars() {
        match c {
            c if is_punctuation(c) => {}
            'A'..='Z' => word.push(c.to_ascii_lowercase()),
            'ä' | 'Ä' => word.push('a'),
            'ö' | 'Ö' => word.push('o'),
            'ü' | 'Ü' => word.push('u'),
            'ß' | 'ẞ' => {
                word.push('s');
                word.push('s');
            }
            c => word.push(c),
        }
    }

    if word.len() < MIN_LENGTH_STRIP_1 {
        *token = word.into_iter().collect();

        return;
    }

    // strip 'ge-' if the word is long enough
    if word.len() >= MIN_LENGTH_STRIP_2 && word[0] == 'g' && word[1] == 'e' {
        word.drain(..2);
    }

    // keep important character sequences
    let mut ignore = 0;
    let mut n = 1;

    while n < word.len() {
        if word[n - 1] == 'e' && word[n] == 'i' {
            word[n - 1] = '%';
            word[n] = '%';

            n += 2;
            ignore += 1;
        } else if word[n - 1] == 'i' && word[n] == 'e' {
            word[n - 1] = '&';
            word[n] = '&';

            n += 2;
            ignore += 1;
        } else if n + 1 < word.len() && word[n - 1] == 's' && word[n] == 'c' && word[n + 1] == 'h' {
            word[n - 1] = '$';
            word[n] = '$';
            word[n + 1] = '$';

            n += 3;
            ignore += 2;
        } else {
            n += 1;
        }
    }

    // mark doubled characters
    let mut last = '\0';

    for c in word.iter_mut() {
        if *c == last && *c != '%' && *c != '&' && *c != '$' {
            *c = '*';
            last = '\0';
        } else {
            last = *c;
        }
    }

    // strip suffixes
    while word.len() - ignore >= MIN_LENGTH_STRIP_1 {
        let index_last = word.len() - 1;

        if word.len() - ignore >= MIN_LENGTH_STRIP_2 {
            let strip_two = matches!(
                (word[index_last - 1], word[index_last]),
                ('e', 'm') | ('e', 'r') | ('n', 'd')
            );

            if strip_two {
                word.truncate(index_last - 1);

                continue;
            }
        }

        match word[index_last] {
            't' | 'e' | 's' | 'n' => {
                word.truncate(index_last);

                continue;
            }
            _ => {}
        }

        break;
    }

    // undo the double-character markers
    let mut last = '\0';

    for c in word.iter_mut() {
        if *c == '*' {
            *c = last;
        } else {
            last = *c;
        }
    }

    // undo the sequence substitutions
    let mut n = 1;

    while n < word.len() {
        match word[n - 1] {
            '%' => {
                word[n - 1] = 'e';
                word[n] = 'i';

                n += 2;
            }
            '&' => {
                word[n - 1] = 'i';
                word[n] = 'e';

                n += 2;
            }
            '$' => {
                word[n - 1] = 's';
                word[n] = 'c';

                if n + 1 < word.len() {
                    word[n + 1] = 'h';
                }

                n += 3;
            }
            _ => {
                n += 1;
            }
        }
    }

    *token = word.into_iter().collect();
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn stemmed(word: &str) -> String {
        let mut token = word.to_string();

        stem_german(&mut token);

        token
    }

    #[test]
    fn suffixes_are_stripped() {
        assert_eq!(stemmed("laufen"), "lauf");
        assert_eq!(stemmed("gelaufen"), "lauf");
        assert_eq!(stemmed("Käufer"), "kauf");
        assert_eq!(stemmed("Mädchen"), "madch");
    }

    #[test]
    fn umlauts_and_sharp_s_are_folded() {
        assert_eq!(stemmed("schönes"), "schon");
        assert_eq!(stemmed("Straße"), "strass");
    }

    #[test]
    fn double_consonants_survive() {
        assert_eq!(stemmed("Koffer"), "koff");
    }

    #[test]
    fn protected_sequences_are_kept() {
        assert_eq!(stemmed("schreiben"), "schreib");
        assert_eq!(stemmed("spielt"), "spiel");
    }

    #[test]
    fn short_words_are_left_alone() {
        assert_eq!(stemmed("ja"), "ja");
        assert_eq!(stemmed("Rad"), "rad");
    }

    #[test]
    fn punctuation_tokens_are_emptied() {
        assert_eq!(stemmed("."), "");
        assert_eq!(stemmed("..."), "");
    }
}
