//! Shared text helpers for the expansion engine.
//!
//! All offsets in the engine are counted in `char`s (Unicode scalar values),
//! matching the one-key-one-unit assumption of the backspace synthesis path,
//! so the helpers here work on char positions rather than byte indices.

/// Lowercase a single char without length expansion.
///
/// `char::to_lowercase` may expand (e.g. 'İ' lowers to two scalars); offsets
/// must stay 1:1 with the original text, so only the first scalar is kept.
fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Find the first case-insensitive occurrence of `needle` in `haystack`,
/// returning its char offset.
///
/// # Examples
///
/// ```
/// use atalho::utils::find_ci;
///
/// assert_eq!(find_ci("bom dia", "DIA"), Some(4));
/// assert_eq!(find_ci("olá", "LÁ"), Some(1));
/// assert_eq!(find_ci("oi", "tchau"), None);
/// ```
pub fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h: Vec<char> = haystack.chars().map(lower).collect();
    let n: Vec<char> = needle.chars().map(lower).collect();
    if n.is_empty() {
        return Some(0);
    }
    if n.len() > h.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()] == n[..])
}

/// Case-insensitive substring test
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    find_ci(haystack, needle).is_some()
}

/// Case-insensitive prefix test
pub fn starts_with_ci(haystack: &str, prefix: &str) -> bool {
    find_ci(haystack, prefix) == Some(0)
}

/// Case-insensitive equality
pub fn eq_ci(a: &str, b: &str) -> bool {
    a.chars().count() == b.chars().count() && starts_with_ci(a, b)
}

/// Truncate to at most `budget` chars, appending an ellipsis when truncated.
///
/// # Examples
///
/// ```
/// use atalho::utils::truncate_chars;
///
/// assert_eq!(truncate_chars("bom dia", 10), "bom dia");
/// assert_eq!(truncate_chars("bom dia", 3), "bom…");
/// ```
pub fn truncate_chars(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut out: String = text.chars().take(budget).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_ci_basic() {
        assert_eq!(find_ci("abcdef", "cde"), Some(2));
        assert_eq!(find_ci("abcdef", "CDE"), Some(2));
        assert_eq!(find_ci("ABCDEF", "cde"), Some(2));
        assert_eq!(find_ci("abc", "abcd"), None);
    }

    #[test]
    fn test_find_ci_empty_needle() {
        assert_eq!(find_ci("abc", ""), Some(0));
        assert_eq!(find_ci("", ""), Some(0));
    }

    #[test]
    fn test_find_ci_char_offsets_not_bytes() {
        // 'á' is two bytes but one char; offsets must count chars
        assert_eq!(find_ci("olá oi", "oi"), Some(4));
    }

    #[test]
    fn test_starts_with_and_eq() {
        assert!(starts_with_ci("OiOi", "oi"));
        assert!(!starts_with_ci("boi", "oi"));
        assert!(eq_ci("Oi", "oI"));
        assert!(!eq_ci("oi", "oio"));
    }

    #[test]
    fn test_truncate_chars_exact_budget() {
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abcd", 3), "abc…");
    }
}
