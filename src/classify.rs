/*!
 * Translatability classification.
 *
 * Pure predicates deciding whether a string is worth sending to the
 * translation API. The default predicate is permissive: anything that
 * does not look like an identifier, a number, a placeholder or markup
 * is considered translatable prose. A stricter companion exists for
 * PO msgctxt fields, which mix prose with keys far more often.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Everything is punctuation, symbols or underscores
static SYMBOLS_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\W_]+$").unwrap());

/// The whole string is one `{placeholder}`
static PLACEHOLDER_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{\w+\}$").unwrap());

/// The whole string is one HTML-like tag
static SINGLE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<[a-zA-Z/][^<>]*>$").unwrap());

/// An HTML-like tag anywhere in the string
static TAG_FRAGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[a-zA-Z/][^>]*>").unwrap());

/// Decide whether a string should be translated at all.
///
/// Rejects empty and whitespace-only strings, pure numbers, pure
/// punctuation, strings carrying literal `\u` escapes, single
/// placeholders or tags, and identifier-style strings (underscore but
/// no space). Everything else is treated as translatable prose.
pub fn is_translatable(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.chars().all(|c| c.is_numeric()) {
        return false;
    }
    if SYMBOLS_ONLY.is_match(trimmed) {
        return false;
    }
    // Pre-encoded unicode escapes indicate machine data, not prose
    if trimmed.contains("\\u") {
        return false;
    }
    if PLACEHOLDER_ONLY.is_match(trimmed) || SINGLE_TAG.is_match(trimmed) {
        return false;
    }
    // Identifier heuristic: snake_case without any space
    if trimmed.contains('_') && !trimmed.contains(' ') {
        return false;
    }
    true
}

/// Stricter predicate for PO `msgctxt` fields.
///
/// Context fields are usually keys ("1165\tBIRTHDAY", "ItemName") with
/// occasional real prose. On top of [`is_translatable`] this rejects
/// tabs, embedded tags, any underscore, and space-less tokens bearing
/// digits or a case mix (all-lowercase and ALL-UPPERCASE tokens pass).
pub fn is_translatable_context(text: &str) -> bool {
    if !is_translatable(text) || text.contains('_') {
        return false;
    }
    if text.contains('\t') {
        return false;
    }
    if TAG_FRAGMENT.is_match(text) {
        return false;
    }

    let trimmed = text.trim();
    if !trimmed.contains(' ') {
        if trimmed.chars().any(|c| c.is_ascii_digit()) {
            return false;
        }
        let all_lower = !trimmed.chars().any(|c| c.is_uppercase());
        let all_upper = !trimmed.chars().any(|c| c.is_lowercase());
        if !all_lower && !all_upper {
            return false;
        }
    }
    true
}
