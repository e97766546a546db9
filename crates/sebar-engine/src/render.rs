// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Placeholder rendering for message templates.
//!
//! Templates may contain `{var}` or `{var|fallback}` placeholders. A variable
//! resolving to an empty value takes its inline fallback, or the caller's
//! default fallback word when none is given.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex"));

/// Render `template`, substituting placeholders from `vars`.
///
/// Unknown variables behave like empty ones and take a fallback. Whitespace
/// around variable names and inline fallbacks is trimmed.
pub fn render(template: &str, vars: &HashMap<&str, &str>, default_fallback: &str) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let body = &caps[1];
            let (name, fallback) = match body.split_once('|') {
                Some((name, fallback)) => (name.trim(), fallback.trim()),
                None => (body.trim(), default_fallback),
            };
            match vars.get(name).map(|v| v.trim()) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => fallback.to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(name: &'static str) -> HashMap<&'static str, &'static str> {
        HashMap::from([("name", name)])
    }

    #[test]
    fn substitutes_known_variable() {
        assert_eq!(render("hi {name}!", &vars("Budi"), "there"), "hi Budi!");
    }

    #[test]
    fn empty_value_takes_inline_fallback() {
        assert_eq!(
            render("hi {name|friend}!", &vars(""), "there"),
            "hi friend!"
        );
    }

    #[test]
    fn empty_value_takes_default_fallback() {
        assert_eq!(render("hi {name}!", &vars(""), "there"), "hi there!");
        assert_eq!(render("hi {name}!", &vars("   "), "there"), "hi there!");
    }

    #[test]
    fn unknown_variable_takes_fallback() {
        assert_eq!(render("order {code|N/A}", &vars("Budi"), "there"), "order N/A");
    }

    #[test]
    fn non_placeholder_text_untouched() {
        let template = "no placeholders here";
        assert_eq!(render(template, &vars("Budi"), "there"), template);
    }

    #[test]
    fn multiple_placeholders() {
        let out = render("{name|pal}, meet {name}", &vars("Ana"), "there");
        assert_eq!(out, "Ana, meet Ana");
    }
}
