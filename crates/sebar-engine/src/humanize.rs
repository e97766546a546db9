// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anti-fingerprinting text variation.
//!
//! Applies small, human-looking perturbations to every outbound message:
//! casual abbreviations for common words, end-punctuation drift, and the
//! occasional trailing emoji. Line structure is always preserved so
//! multi-paragraph templates keep their shape. Randomness comes from an
//! injected RNG, making the output reproducible under a fixed seed.

use rand::Rng;

const SLANG: &[(&str, &[&str])] = &[
    ("thanks", &["thx", "ty"]),
    ("thank you", &["thanks", "ty"]),
    ("please", &["pls", "plz"]),
    ("okay", &["ok", "okie"]),
    ("tomorrow", &["tmrw"]),
    ("today", &["tdy"]),
    ("because", &["bc", "cause"]),
    ("really", &["rly"]),
    ("message", &["msg"]),
    ("promo", &["promo", "deal"]),
];

const EMOJI: &[&str] = &["\u{1F60A}", "\u{1F64F}", "\u{1F44D}", "\u{1F44C}", "\u{2728}", "\u{1F44B}"];

const SLANG_PROBABILITY: f64 = 0.3;
const EMOJI_PROBABILITY: f64 = 0.2;

/// Humanize one outbound message.
pub fn humanize<R: Rng>(text: &str, rng: &mut R) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut out = apply_slang(text, rng);
    out = apply_punctuation_drift(out, rng);
    if rng.gen_bool(EMOJI_PROBABILITY) {
        out.push(' ');
        out.push_str(EMOJI[rng.gen_range(0..EMOJI.len())]);
    }
    out
}

/// Swap eligible words for a casual abbreviation with fixed probability,
/// line by line so paragraph breaks survive.
fn apply_slang<R: Rng>(text: &str, rng: &mut R) -> String {
    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                return line.to_string();
            }
            line.split_whitespace()
                .map(|word| slang_word(word, rng))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn slang_word<R: Rng>(word: &str, rng: &mut R) -> String {
    let clean = word
        .to_lowercase()
        .trim_matches(|c: char| ",.!?".contains(c))
        .to_string();
    for (formal, casual) in SLANG {
        if clean == *formal && rng.gen_bool(SLANG_PROBABILITY) {
            let pick = casual[rng.gen_range(0..casual.len())];
            // Keep surrounding punctuation from the original word.
            return word.to_lowercase().replace(&clean, pick);
        }
    }
    word.to_string()
}

/// Vary a trailing full stop: sometimes dropped, sometimes doubled or tripled.
fn apply_punctuation_drift<R: Rng>(text: String, rng: &mut R) -> String {
    if !text.ends_with('.') || text.ends_with("..") {
        return text;
    }
    let roll: f64 = rng.gen_range(0.0..1.0);
    if roll < 0.3 {
        text[..text.len() - 1].to_string()
    } else if roll < 0.5 {
        format!("{text}.")
    } else if roll < 0.6 {
        format!("{text}..")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn preserves_line_structure() {
        let text = "first paragraph, thanks.\n\nsecond paragraph please.";
        for seed in 0..100u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = humanize(text, &mut rng);
            assert_eq!(out.matches('\n').count(), 2, "seed {seed}: {out:?}");
        }
    }

    #[test]
    fn non_slang_words_survive() {
        let text = "your order number is 4471";
        for seed in 0..100u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = humanize(text, &mut rng);
            assert!(out.starts_with("your order number is 4471"), "seed {seed}: {out:?}");
        }
    }

    #[test]
    fn slang_substitution_occurs_under_some_seed() {
        let text = "thanks for your order";
        let mut substituted = false;
        for seed in 0..200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = humanize(text, &mut rng);
            if out.starts_with("thx") || out.starts_with("ty") {
                substituted = true;
                break;
            }
        }
        assert!(substituted);
    }

    #[test]
    fn keeps_punctuation_next_to_slang() {
        let text = "thanks!";
        for seed in 0..200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = humanize(text, &mut rng);
            let word = out.split_whitespace().next().unwrap();
            assert!(
                word == "thanks!" || word == "thx!" || word == "ty!",
                "seed {seed}: {out:?}"
            );
        }
    }

    #[test]
    fn punctuation_drift_only_touches_trailing_period() {
        let text = "see you soon";
        for seed in 0..100u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = humanize(text, &mut rng);
            assert!(!out.contains(".."), "seed {seed}: {out:?}");
        }
    }

    #[test]
    fn deterministic_under_fixed_seed() {
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        assert_eq!(humanize("thanks, see you.", &mut a), humanize("thanks, see you.", &mut b));
    }

    #[test]
    fn empty_input() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(humanize("", &mut rng), "");
    }
}
