//! Message text cleaning and tokenization.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static RE_MENTION_OR_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"((\B@)|(\bhttps?://))\S+").unwrap());
static RE_NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Strip mentions and URLs, then every non-word character.
pub fn clean(text: &str) -> String {
    let stripped = RE_MENTION_OR_URL.replace_all(text, " ");
    RE_NON_WORD.replace_all(&stripped, " ").into_owned()
}

/// Distinct lower-cased tokens of a cleaned message.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    clean(text)
        .split_whitespace()
        .map(|token| token.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        tokenize(text).into_iter().collect()
    }

    #[test]
    fn mentions_and_urls_only_yield_nothing() {
        assert!(tokenize("@user http://x.com").is_empty());
        assert!(tokenize("https://t.co/abc @someone").is_empty());
    }

    #[test]
    fn tokens_are_lowercased_and_deduplicated() {
        assert_eq!(words("Fire FIRE fire on 5th"), vec!["5th", "fire", "on"]);
    }

    #[test]
    fn punctuation_splits_tokens() {
        assert_eq!(words("smoke,downtown!!(again)"), vec!["again", "downtown", "smoke"]);
    }

    #[test]
    fn email_at_sign_is_not_a_mention() {
        // `@` inside a word sits on a word boundary, so only punctuation is stripped.
        assert_eq!(words("mail bob@example"), vec!["bob", "example", "mail"]);
    }

    #[test]
    fn url_in_middle_of_sentence_is_removed() {
        assert_eq!(words("parade now http://pics.example/1 wow"), vec!["now", "parade", "wow"]);
    }

    #[test]
    fn clean_keeps_underscores() {
        assert_eq!(clean("snake_case!"), "snake_case ");
    }
}
