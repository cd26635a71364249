//! Word tokenizer for response text

use std::sync::OnceLock;

use regex::Regex;

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+(?:['’]\p{L}+)?|[^\s\p{L}\p{N}]").expect("static regex"))
}

/// Lowercased word tokens plus one token per punctuation character
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_regex()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_words_and_punctuation() {
        assert_eq!(
            tokenize("See a Doctor, don't wait!"),
            vec!["see", "a", "doctor", ",", "don't", "wait", "!"]
        );
    }

    #[test]
    fn test_tokenize_keeps_accented_words_whole() {
        assert_eq!(tokenize("Café naïve; Ärzte"), vec!["café", "naïve", ";", "ärzte"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("   ").is_empty());
    }
}
