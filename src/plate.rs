//! Plate text normalization
//!
//! Detected plate strings arrive with inconsistent casing and separators
//! ("ab-123 c", "AB_123C"). The normalized form is the stable key used by the
//! suppression ledger and all registration calls.

/// Normalize a detected plate string: uppercase, separators removed.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Basic shape check for a normalized plate: 6-7 alphanumeric characters.
///
/// Used to decide whether a detect response looks like a real plate or an
/// OCR misfire worth one retry.
pub fn has_plausible_shape(normalized: &str) -> bool {
    let len = normalized.chars().count();
    (6..=7).contains(&len) && normalized.chars().all(|c| c.is_ascii_alphanumeric())
}
