use std::sync::LazyLock;

use regex::Regex;

static STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{P}\s]+").expect("static pattern compiles"));

/// Canonical comparison form of a word: lower-cased, with every punctuation
/// and whitespace character removed.
///
/// Script words and spoken words go through the same function so that
/// comparisons are symmetric.
pub fn normalize(word: &str) -> String {
    let lowered = word.to_lowercase();
    STRIP.replace_all(&lowered, "").into_owned()
}

/// Whitespace tokenization of recognizer output, dropping tokens that carry
/// no comparable content (stray punctuation, dashes).
pub fn spoken_words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .filter(|w| !normalize(w).is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_case() {
        assert_eq!(normalize("Hello,"), "hello");
        assert_eq!(normalize("\"World!\""), "world");
        assert_eq!(normalize("첫째,"), "첫째");
        assert_eq!(normalize("시작하겠습니다."), "시작하겠습니다");
    }

    #[test]
    fn keeps_inner_letters_and_digits() {
        assert_eq!(normalize("AI-based"), "aibased");
        assert_eq!(normalize("3.5"), "35");
    }

    #[test]
    fn punctuation_only_is_empty() {
        assert_eq!(normalize("..."), "");
        assert_eq!(normalize(" — "), "");
    }

    #[test]
    fn spoken_words_drops_noise_tokens() {
        assert_eq!(spoken_words("  hello -- world ... "), vec!["hello", "world"]);
        assert!(spoken_words("").is_empty());
    }

    #[quickcheck_macros::quickcheck]
    fn prop_idempotent(word: String) -> bool {
        let once = normalize(&word);
        normalize(&once) == once
    }
}
