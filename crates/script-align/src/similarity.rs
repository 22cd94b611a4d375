use crate::normalize::normalize;

/// Normalized edit-distance similarity in `[0.0, 1.0]`.
///
/// `1 - levenshtein(a, b) / max(len(a), len(b))` over the normalized forms,
/// with lengths counted in chars. Two tokens that normalize to the same
/// string (including two punctuation-only tokens) score 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_normalized(&normalize(a), &normalize(b))
}

/// Same as [`similarity`] for inputs that are already normalized.
pub fn similarity_normalized(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }

    let distance = strsim::levenshtein(a, b);
    (1.0 - distance as f64 / longest as f64).clamp(0.0, 1.0)
}
