//! Token vocabulary table.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

/// Mapping from token id to display string.
///
/// Parsed from a text table with one entry per line, either `<token> <id>`
/// or a bare `<token>`. Existing `tokens.txt` files rely on two rules:
///
/// - a repeated id overwrites the earlier entry (last wins);
/// - a bare token takes the current table size as its id, so it can collide
///   with (and overwrite) an explicit id.
///
/// Negative ids are kept. They can never be decoded, but they still occupy a
/// slot and shift the ids of later bare tokens.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    tokens: HashMap<i64, String>,
}

impl Vocabulary {
    /// Parse a vocabulary table.
    ///
    /// Lines are trimmed and blank lines skipped. The id is the last
    /// space-separated field, or the last tab-separated field when the line has
    /// no space. Lines whose id field is not an integer are skipped.
    pub fn parse(text: &str) -> Self {
        let mut vocab = Self::default();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let split = if line.contains(' ') {
                line.rsplit_once(' ')
            } else {
                line.rsplit_once('\t')
            };

            match split {
                Some((token, id)) => match id.parse::<i64>() {
                    Ok(id) => {
                        vocab.tokens.insert(id, token.to_string());
                    }
                    Err(_) => tracing::debug!(line, "skipping vocabulary line with invalid id"),
                },
                None => {
                    let id = vocab.tokens.len() as i64;
                    vocab.tokens.insert(id, line.to_string());
                }
            }
        }

        vocab
    }

    /// Read and parse a UTF-8 vocabulary file.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        let id = i64::try_from(id).ok()?;
        self.tokens.get(&id).map(String::as_str)
    }

    /// Display string for `id`, or `<UNK_id>` if the id is not in the table.
    pub fn render(&self, id: usize) -> Cow<'_, str> {
        match self.get(id) {
            Some(token) => Cow::Borrowed(token),
            None => Cow::Owned(format!("<UNK_{id}>")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_id_pairs() {
        let vocab = Vocabulary::parse("<blank> 0\n<s> 1\n▁hello 5\n");

        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.get(0), Some("<blank>"));
        assert_eq!(vocab.get(5), Some("▁hello"));
        assert_eq!(vocab.get(2), None);
    }

    #[test]
    fn parses_tab_separated_ids() {
        let vocab = Vocabulary::parse("a\t7\nb\t8");

        assert_eq!(vocab.get(7), Some("a"));
        assert_eq!(vocab.get(8), Some("b"));
    }

    #[test]
    fn splits_on_last_space() {
        let vocab = Vocabulary::parse("<|zh en|> 24884");
        assert_eq!(vocab.get(24884), Some("<|zh en|>"));
    }

    #[test]
    fn bare_tokens_take_insertion_order() {
        let vocab = Vocabulary::parse("<blank>\n<s>\n\n</s>\n");

        assert_eq!(vocab.get(0), Some("<blank>"));
        assert_eq!(vocab.get(1), Some("<s>"));
        assert_eq!(vocab.get(2), Some("</s>"));
    }

    #[test]
    fn duplicate_id_last_wins() {
        let vocab = Vocabulary::parse("first 3\nsecond 3");

        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.get(3), Some("second"));
    }

    #[test]
    fn bare_token_can_overwrite_explicit_id() {
        let vocab = Vocabulary::parse("x 1\ny");

        assert_eq!(vocab.get(1), Some("y"));
        assert_eq!(vocab.len(), 1);
    }

    #[test]
    fn skips_invalid_ids() {
        let vocab = Vocabulary::parse("word abc\nhalf 1.5\nok 2");

        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.get(2), Some("ok"));
    }

    #[test]
    fn negative_id_still_takes_a_slot() {
        let vocab = Vocabulary::parse("neg -1\nbare");

        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.get(1), Some("bare"));
        assert_eq!(vocab.get(0), None);
    }

    #[test]
    fn accepts_explicit_plus_sign() {
        let vocab = Vocabulary::parse("a +4");
        assert_eq!(vocab.get(4), Some("a"));
    }

    #[test]
    fn renders_unknown_ids_as_placeholder() {
        let vocab = Vocabulary::parse("a 1");

        assert_eq!(vocab.render(1), "a");
        assert_eq!(vocab.render(42), "<UNK_42>");
    }
}
