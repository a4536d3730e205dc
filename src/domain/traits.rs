//! Static per-domain traits.
//!
//! Derived once from the name alone the first time a domain is seen, then
//! immutable: if a row already exists the derivation is skipped entirely.

use serde::{Deserialize, Serialize};

/// Immutable lexical traits of a domain name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainTraits {
    pub name: String,
    /// Label before the first dot.
    pub label: String,
    /// Suffix after the last dot; empty when the name has no dot.
    pub extension: String,
    /// Character length of the label.
    pub length: usize,
    pub is_numeric: bool,
    pub has_hyphen: bool,
    /// Vowels over total letters in the label, 0.0 when no letters.
    pub vowel_ratio: f64,
    /// Composite brandability score in [0, 100].
    pub brandability: u8,
}

impl DomainTraits {
    /// Derive traits from a domain name.
    #[must_use]
    pub fn derive(name: &str) -> Self {
        let label = name.split('.').next().unwrap_or(name).to_string();
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_default();

        let length = label.chars().count();
        let is_numeric = !label.is_empty() && label.chars().all(|c| c.is_ascii_digit());
        let has_hyphen = label.contains('-');
        let vowel_ratio = vowel_ratio(&label);
        let brandability = brandability(length, is_numeric, has_hyphen, vowel_ratio, &extension);

        Self {
            name: name.to_string(),
            label,
            extension,
            length,
            is_numeric,
            has_hyphen,
            vowel_ratio,
            brandability,
        }
    }
}

/// Extensions that carry a market premium.
pub(crate) const PREMIUM_EXTENSIONS: &[&str] = &["com", "net", "org", "io", "ai", "xyz"];

fn vowel_ratio(label: &str) -> f64 {
    let letters: Vec<char> = label
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if letters.is_empty() {
        return 0.0;
    }
    let vowels = letters
        .iter()
        .filter(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
        .count();
    vowels as f64 / letters.len() as f64
}

/// Composite brandability in [0, 100]: short, pronounceable, clean labels
/// on premium extensions score highest.
fn brandability(
    length: usize,
    is_numeric: bool,
    has_hyphen: bool,
    vowel_ratio: f64,
    extension: &str,
) -> u8 {
    let length_score: f64 = match length {
        0 => 0.0,
        1..=3 => 1.0,
        4..=5 => 0.85,
        6..=7 => 0.65,
        8..=10 => 0.4,
        _ => 0.2,
    };

    // Labels with a vowel share near natural language read as words.
    let pronounceability: f64 = if is_numeric {
        0.3
    } else if (0.25..=0.6).contains(&vowel_ratio) {
        1.0
    } else if vowel_ratio > 0.0 {
        0.5
    } else {
        0.1
    };

    let cleanliness: f64 = if has_hyphen { 0.3 } else { 1.0 };

    let extension_score: f64 = if PREMIUM_EXTENSIONS
        .iter()
        .any(|e| e.eq_ignore_ascii_case(extension))
    {
        1.0
    } else {
        0.5
    };

    let composite = 0.35 * length_score
        + 0.30 * pronounceability
        + 0.15 * cleanliness
        + 0.20 * extension_score;

    (composite * 100.0).round().clamp(0.0, 100.0) as u8
}
