//! Crypto market lexicon
//!
//! Rule-based polarity for short market texts: headline and post words are
//! looked up in a weighted word list, a preceding negation flips the next
//! scored word and an intensifier scales it.

use std::collections::{HashMap, HashSet};

/// Tokens a negation stays active for before it lapses
const NEGATION_SCOPE: usize = 3;

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("bullish", 0.8),
    ("surge", 0.7),
    ("rally", 0.7),
    ("soar", 0.8),
    ("moon", 0.7),
    ("gain", 0.5),
    ("profit", 0.6),
    ("growth", 0.6),
    ("rise", 0.5),
    ("jump", 0.5),
    ("climb", 0.5),
    ("recover", 0.5),
    ("recovery", 0.5),
    ("rebound", 0.5),
    ("breakout", 0.6),
    ("adoption", 0.6),
    ("approve", 0.6),
    ("approval", 0.6),
    ("partnership", 0.5),
    ("upgrade", 0.5),
    ("launch", 0.3),
    ("record", 0.5),
    ("strong", 0.5),
    ("positive", 0.5),
    ("optimistic", 0.6),
    ("confidence", 0.4),
    ("accumulate", 0.4),
    ("inflow", 0.4),
    ("support", 0.3),
    ("success", 0.6),
    ("successful", 0.6),
    ("good", 0.5),
    ("great", 0.7),
    ("win", 0.5),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("bearish", -0.8),
    ("crash", -0.9),
    ("plunge", -0.8),
    ("tumble", -0.7),
    ("slump", -0.7),
    ("drop", -0.6),
    ("fall", -0.5),
    ("decline", -0.6),
    ("loss", -0.6),
    ("sell-off", -0.7),
    ("selloff", -0.7),
    ("dump", -0.7),
    ("outflow", -0.4),
    ("weak", -0.5),
    ("negative", -0.5),
    ("pessimistic", -0.6),
    ("fear", -0.6),
    ("panic", -0.8),
    ("concern", -0.4),
    ("uncertainty", -0.5),
    ("risk", -0.3),
    ("volatile", -0.3),
    ("hack", -0.9),
    ("exploit", -0.8),
    ("scam", -0.9),
    ("fraud", -0.9),
    ("ban", -0.7),
    ("lawsuit", -0.6),
    ("crackdown", -0.7),
    ("liquidation", -0.6),
    ("delist", -0.7),
    ("bad", -0.5),
    ("fail", -0.6),
    ("failure", -0.6),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "neither", "nor", "none", "nothing", "cannot", "cant", "can't",
    "dont", "don't", "doesnt", "doesn't", "didnt", "didn't", "wont", "won't", "isnt", "isn't",
    "arent", "aren't", "wasnt", "wasn't", "hardly", "barely", "without",
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.5),
    ("extremely", 2.0),
    ("massive", 1.8),
    ("massively", 1.8),
    ("huge", 1.7),
    ("hugely", 1.7),
    ("sharply", 1.6),
    ("significantly", 1.5),
    ("strongly", 1.5),
    ("slightly", 0.5),
    ("somewhat", 0.7),
    ("marginally", 0.5),
];

/// Suffixes tried when a word is not in the lexicon as written
const SUFFIXES: &[&str] = &["s", "es", "ed", "d", "ing"];

/// Weighted word list with negations and intensifiers
pub struct CryptoLexicon {
    words: HashMap<&'static str, f64>,
    negations: HashSet<&'static str>,
    intensifiers: HashMap<&'static str, f64>,
}

impl Default for CryptoLexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoLexicon {
    pub fn new() -> Self {
        Self {
            words: POSITIVE_WORDS.iter().chain(NEGATIVE_WORDS).copied().collect(),
            negations: NEGATIONS.iter().copied().collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
        }
    }

    /// Score of a single token, trying common inflections
    pub fn word_score(&self, token: &str) -> Option<f64> {
        if let Some(score) = self.words.get(token) {
            return Some(*score);
        }
        SUFFIXES.iter().find_map(|suffix| {
            token
                .strip_suffix(suffix)
                .filter(|stem| stem.len() > 2)
                .and_then(|stem| self.words.get(stem).copied())
        })
    }

    /// Mean polarity of the scored words in `text`, clamped to [-1, 1]
    ///
    /// Returns 0.0 when no word matches.
    pub fn polarity(&self, text: &str) -> f64 {
        let mut total = 0.0;
        let mut matched = 0usize;
        let mut negation_left = 0usize;
        let mut multiplier = 1.0;

        for token in tokenize(text) {
            if self.negations.contains(token.as_str()) {
                negation_left = NEGATION_SCOPE;
                continue;
            }
            if let Some(m) = self.intensifiers.get(token.as_str()) {
                multiplier = *m;
                continue;
            }

            match self.word_score(&token) {
                Some(mut score) => {
                    if negation_left > 0 {
                        score = -score;
                        negation_left = 0;
                    }
                    total += score * multiplier;
                    matched += 1;
                    multiplier = 1.0;
                }
                None => {
                    negation_left = negation_left.saturating_sub(1);
                }
            }
        }

        if matched == 0 {
            0.0
        } else {
            (total / matched as f64).clamp(-1.0, 1.0)
        }
    }
}

/// Lower-cased words with surrounding punctuation removed
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
                .trim_matches('\'')
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
}
