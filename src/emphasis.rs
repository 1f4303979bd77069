//! Bionic-style word emphasis.
//!
//! Splits text on whitespace and marks the leading fraction of every word
//! that is long enough. The output is a list of [`Segment`]s borrowing from
//! the input; concatenating them always reproduces the input exactly.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Emphasis parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Emphasis {
    /// Fraction of each word to emphasize, rounded up.
    pub ratio: f64,
    /// Words shorter than this (in characters) are left unmarked.
    pub min_word_len: usize,
}

impl Default for Emphasis {
    fn default() -> Self {
        Self {
            ratio: 0.35,
            min_word_len: 3,
        }
    }
}

impl Emphasis {
    pub fn validate(&self) -> Result<()> {
        if !(self.ratio >= 0.001 && self.ratio <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "emphasis.ratio must be in [0.001, 1], got {}",
                self.ratio
            )));
        }
        if self.min_word_len == 0 {
            return Err(Error::InvalidConfig(
                "emphasis.min_word_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of leading characters to emphasize in a word of `len` characters.
    ///
    /// The ratio is fixed to thousandths before rounding up so that products
    /// like `0.35 * 20` land on 7 rather than a float a hair above it.
    pub fn lead_len(&self, len: usize) -> usize {
        if len < self.min_word_len {
            return 0;
        }
        let per_mille = (self.ratio * 1000.0).round() as usize;
        len.saturating_mul(per_mille).div_ceil(1000).min(len)
    }

    /// Split `text` into emphasized and plain segments.
    pub fn segments<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        let mut out = Vec::new();
        let mut plain_start = 0;
        let mut rest = text;
        let mut offset = 0;

        while !rest.is_empty() {
            let word_start = rest
                .char_indices()
                .find(|(_, c)| !c.is_whitespace())
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            let after_ws = &rest[word_start..];
            let word_len_bytes = after_ws
                .char_indices()
                .find(|(_, c)| c.is_whitespace())
                .map(|(i, _)| i)
                .unwrap_or(after_ws.len());
            let word = &after_ws[..word_len_bytes];

            let lead_chars = self.lead_len(word.chars().count());
            if lead_chars > 0 {
                let split = word
                    .char_indices()
                    .nth(lead_chars)
                    .map(|(i, _)| i)
                    .unwrap_or(word.len());
                let start = offset + word_start;
                if plain_start < start {
                    out.push(Segment::Plain(&text[plain_start..start]));
                }
                out.push(Segment::Strong(&text[start..start + split]));
                plain_start = start + split;
            }

            let consumed = word_start + word_len_bytes;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if plain_start < text.len() {
            out.push(Segment::Plain(&text[plain_start..]));
        }
        out
    }
}

/// A run of text in emphasized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Leading part of a word, rendered bold.
    Strong(&'a str),
    /// Everything else, including whitespace and short words.
    Plain(&'a str),
}

impl<'a> Segment<'a> {
    pub fn text(&self) -> &'a str {
        match *self {
            Segment::Strong(s) | Segment::Plain(s) => s,
        }
    }
}

/// Markdown-ish rendering used by the CLI's `--preview` and tests:
/// emphasized runs are wrapped in `**`.
pub fn render_marked(segments: &[Segment<'_>]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Strong(s) => {
                out.push_str("**");
                out.push_str(s);
                out.push_str("**");
            }
            Segment::Plain(s) => out.push_str(s),
        }
    }
    out
}
