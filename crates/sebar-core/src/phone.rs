// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone identifier normalization.
//!
//! Accepts the formats seen in imported contact lists (`0812...`, `62812...`,
//! `+62 812-345`, bare `812...`) and canonicalizes them to the international
//! `62...` digit form used as the recipient key everywhere else.

/// Normalize a phone identifier to canonical `62...` digit form.
///
/// Returns an empty string for input with no digits, which callers treat as
/// a validation failure (target skipped, never sent).
pub fn normalize(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return String::new();
    }

    if let Some(rest) = digits.strip_prefix('0') {
        format!("62{rest}")
    } else if digits.starts_with('8') {
        format!("62{digits}")
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_prefix_becomes_international() {
        assert_eq!(normalize("0812345"), "62812345");
    }

    #[test]
    fn bare_mobile_prefix_becomes_international() {
        assert_eq!(normalize("812345"), "62812345");
    }

    #[test]
    fn already_international_is_kept() {
        assert_eq!(normalize("62812345"), "62812345");
    }

    #[test]
    fn punctuation_and_spaces_are_stripped() {
        assert_eq!(normalize("+62 812-345"), "62812345");
        assert_eq!(normalize("081-234"), "6281234");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize("0812345");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn empty_and_digitless_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("abc"), "");
    }
}
