//! Recursive boundary-aware text splitter
//!
//! Splits on the coarsest separator that appears in the text, recursing into
//! oversized pieces with the finer separators, and falls back to raw character
//! windows when no separator helps. Adjacent chunks overlap to preserve
//! context across boundaries. Pure and deterministic; idempotent re-ingestion
//! depends on that.

use std::collections::VecDeque;

use crate::error::{Error, Result};

/// Recursive character splitter with configurable separators
///
/// Sizes and overlap are measured in characters, not bytes, so CJK text is
/// budgeted the same as ASCII.
#[derive(Debug)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// Create a splitter; `chunk_overlap` must be smaller than `chunk_size`
    ///
    /// Both values come straight from user configuration, so violations are
    /// configuration errors rather than invariants.
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    /// Split text into overlapping chunks
    ///
    /// Chunks are contiguous substrings of the input, trimmed of surrounding
    /// whitespace; whitespace-only chunks are dropped.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let mut chunks = Vec::new();
        self.split_with(text, &self.separators, &mut chunks);
        chunks
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    fn split_with(&self, text: &str, separators: &[String], out: &mut Vec<String>) {
        let (separator, remaining) = pick_separator(text, separators);
        let pieces = split_keeping_separator(text, separator);

        let mut pending: Vec<String> = Vec::new();
        for piece in pieces {
            if char_len(&piece) <= self.chunk_size {
                pending.push(piece);
            } else {
                if !pending.is_empty() {
                    self.merge(std::mem::take(&mut pending), out);
                }
                if remaining.is_empty() {
                    self.slice_chars(&piece, out);
                } else {
                    self.split_with(&piece, remaining, out);
                }
            }
        }
        if !pending.is_empty() {
            self.merge(pending, out);
        }
    }

    /// Merge sized pieces into chunks, carrying `chunk_overlap` characters of
    /// trailing pieces into the next chunk
    fn merge(&self, pieces: Vec<String>, out: &mut Vec<String>) {
        let mut window: VecDeque<String> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let piece_len = char_len(&piece);
            if total + piece_len > self.chunk_size && !window.is_empty() {
                out.push(window.iter().map(String::as_str).collect());
                while total > self.chunk_overlap
                    || (total + piece_len > self.chunk_size && total > 0)
                {
                    let dropped = window.pop_front().expect("window is non-empty");
                    total -= char_len(&dropped);
                }
            }
            total += piece_len;
            window.push_back(piece);
        }

        if !window.is_empty() {
            out.push(window.iter().map(String::as_str).collect());
        }
    }

    /// Last-resort slicing into fixed character windows
    fn slice_chars(&self, text: &str, out: &mut Vec<String>) {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            out.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
    }
}

/// Pick the first separator present in the text; the finer separators remain
/// available for recursion into oversized pieces
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep.as_str()) {
            return (sep, &separators[i + 1..]);
        }
    }
    // No separator matched and no raw-slice fallback configured: treat the
    // text as a single piece and let the caller hard-slice it.
    match separators.last() {
        Some(sep) => (sep, &[]),
        None => ("", &[]),
    }
}

/// Split on a separator, keeping the separator attached to the preceding piece
/// so that pieces partition the text exactly
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut pieces = Vec::new();
    let mut rest = text;
    while let Some(idx) = rest.find(separator) {
        let end = idx + separator.len();
        pieces.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
