//! Flesch readability formulas
//!
//! Sentence, word and syllable counts are heuristic: sentences end at runs
//! of `.`, `!` or `?`, words are whitespace tokens carrying at least one
//! alphanumeric character, and syllables are vowel groups with the usual
//! English suffix adjustments.

use crate::collect::is_error_marker;

/// Raw counts behind the readability formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStats {
    pub sentences: usize,
    pub words: usize,
    pub syllables: usize,
}

impl TextStats {
    pub fn from_text(text: &str) -> Self {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|tok| {
                tok.chars()
                    .filter(|c| c.is_alphanumeric() || *c == '\'')
                    .collect::<String>()
            })
            .filter(|w| w.chars().any(char::is_alphanumeric))
            .collect();

        let syllables = words.iter().map(|w| count_syllables(w)).sum();

        Self {
            sentences: count_sentences(text),
            words: words.len(),
            syllables,
        }
    }

    /// Average words per sentence
    pub fn words_per_sentence(&self) -> f64 {
        safe_div(self.words as f64, self.sentences as f64)
    }

    /// Average syllables per word
    pub fn syllables_per_word(&self) -> f64 {
        safe_div(self.syllables as f64, self.words as f64)
    }
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn count_sentences(text: &str) -> usize {
    let count = text
        .split(|c| matches!(c, '.' | '!' | '?'))
        .filter(|segment| segment.chars().any(char::is_alphanumeric))
        .count();
    count.max(1)
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Estimate the syllables in one word. Never returns 0 for a word with letters.
pub fn count_syllables(word: &str) -> usize {
    let w: Vec<char> = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();

    if w.is_empty() {
        // Numbers and non-Latin tokens count as one
        return usize::from(word.chars().any(char::is_alphanumeric));
    }
    if w.len() <= 3 {
        return 1;
    }

    let mut groups: usize = 0;
    let mut prev_vowel = false;
    for &c in &w {
        let v = is_vowel(c);
        if v && !prev_vowel {
            groups += 1;
        }
        prev_vowel = v;
    }

    let n = w.len();
    let ends_with = |suffix: &str| w.iter().rev().zip(suffix.chars().rev()).all(|(a, b)| *a == b);

    if w[n - 1] == 'e' {
        let consonant_le = ends_with("le") && !is_vowel(w[n - 3]);
        if !consonant_le && groups > 1 {
            groups -= 1;
        }
    } else if ends_with("es") && !matches!(w[n - 3], 's' | 'x' | 'z' | 'c' | 'g') {
        groups = groups.saturating_sub(1);
    } else if ends_with("ed") && !matches!(w[n - 3], 't' | 'd') {
        groups = groups.saturating_sub(1);
    }

    groups.max(1)
}

fn scorable(text: &str) -> Option<TextStats> {
    if text.is_empty() || is_error_marker(text) {
        return None;
    }
    Some(TextStats::from_text(text))
}

/// Flesch reading ease, rounded to two decimals.
///
/// `None` for empty text and error markers.
pub fn flesch_reading_ease(text: &str) -> Option<f64> {
    let stats = scorable(text)?;
    Some(round2(
        206.835 - 1.015 * stats.words_per_sentence() - 84.6 * stats.syllables_per_word(),
    ))
}

/// Flesch-Kincaid grade level, rounded to two decimals.
///
/// `None` for empty text and error markers.
pub fn flesch_kincaid_grade(text: &str) -> Option<f64> {
    let stats = scorable(text)?;
    Some(round2(
        0.39 * stats.words_per_sentence() + 11.8 * stats.syllables_per_word() - 15.59,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_syllables() {
        let cases = [
            ("cat", 1),
            ("the", 1),
            ("make", 1),
            ("table", 2),
            ("beautiful", 3),
            ("medicine", 3),
            ("jumped", 1),
            ("wanted", 2),
            ("boxes", 2),
            ("hopes", 1),
            ("hydration", 3),
            ("42", 1),
        ];
        for (word, expected) in cases {
            assert_eq!(count_syllables(word), expected, "word: {}", word);
        }
    }

    #[test]
    fn test_text_stats() {
        let stats = TextStats::from_text("Drink water. Rest well! Is it bad?");
        assert_eq!(stats.sentences, 3);
        assert_eq!(stats.words, 7);
    }

    #[test]
    fn test_simple_text_reads_easier_than_dense_text() {
        let simple = "Drink water. Get some rest. Call your doctor if it hurts.";
        let dense = "Persistent cephalalgia necessitates comprehensive neurological \
                     evaluation, particularly when accompanied by visual disturbances.";

        let simple_ease = flesch_reading_ease(simple).unwrap();
        let dense_ease = flesch_reading_ease(dense).unwrap();
        assert!(simple_ease > dense_ease);

        let simple_grade = flesch_kincaid_grade(simple).unwrap();
        let dense_grade = flesch_kincaid_grade(dense).unwrap();
        assert!(simple_grade < dense_grade);
    }

    #[test]
    fn test_known_value() {
        // 1 sentence, 3 words, 3 syllables
        assert_eq!(flesch_reading_ease("The cat sat."), Some(119.19));
        assert_eq!(flesch_kincaid_grade("The cat sat."), Some(-2.62));
    }

    #[test]
    fn test_empty_and_error_text_is_none() {
        for text in ["", "[Error]: timed out", "[Error]"] {
            assert_eq!(flesch_reading_ease(text), None, "text: {:?}", text);
            assert_eq!(flesch_kincaid_grade(text), None, "text: {:?}", text);
        }
    }

    #[test]
    fn test_any_other_text_is_scored() {
        for text in ["ok", "!!!", "Error: not a marker", "42"] {
            assert!(flesch_reading_ease(text).is_some(), "text: {:?}", text);
            assert!(flesch_kincaid_grade(text).is_some(), "text: {:?}", text);
        }
    }

    #[test]
    fn test_whitespace_only_text_is_scored() {
        // No words: both averages are 0, leaving the formula constants
        assert_eq!(flesch_reading_ease("   \n"), Some(206.84));
        assert_eq!(flesch_kincaid_grade("   "), Some(-15.59));
    }

    #[test]
    fn test_syllable_suffix_adjustments() {
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("jumped"), 1);
        assert_eq!(count_syllables("wanted"), 2);
    }
}
