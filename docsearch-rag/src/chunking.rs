//! Text splitting.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveCharacterSplitter`],
//! which splits text on a hierarchy of separators (paragraphs, lines, words,
//! characters) and merges the pieces back into overlapping chunks of at most
//! `chunk_size` characters.

use std::collections::VecDeque;

use serde_json::Value;

use crate::config::{RagConfig, check_chunking};
use crate::document::{DOC_ID_KEY, FILENAME_KEY, Segment, UPLOAD_TIME_KEY};
use crate::error::Result;

/// Separators tried in order, from coarsest to finest.
const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A strategy for splitting text into chunks.
pub trait Chunker: Send + Sync {
    /// Split a text into chunks. Returns an empty `Vec` for blank input.
    fn split_text(&self, text: &str) -> Vec<String>;

    /// Split every segment, copying the source segment's metadata onto each chunk.
    fn split_segments(&self, segments: &[Segment]) -> Vec<Segment> {
        segments
            .iter()
            .flat_map(|segment| {
                self.split_text(&segment.content)
                    .into_iter()
                    .map(|chunk| Segment::new(chunk, segment.metadata.clone()))
            })
            .collect()
    }
}

/// Splits text recursively by separators, then merges the pieces into
/// chunks of at most `chunk_size` characters with up to `chunk_overlap`
/// characters of shared context between neighbours.
///
/// Lengths are counted in `char`s, so multi-byte text is never cut inside
/// a code point.
///
/// # Example
///
/// ```rust,ignore
/// use docsearch_rag::RecursiveCharacterSplitter;
///
/// let splitter = RecursiveCharacterSplitter::new(1000, 200)?;
/// let chunks = splitter.split_text(&text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a new splitter.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        check_chunking(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Create a splitter from the chunking fields of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator hierarchy. An empty string means "split into characters".
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge_pieces(&small));
                small.clear();
            }
            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge_pieces(&small));
        }

        chunks
    }

    /// Greedily merge small pieces into chunks, carrying a window of at most
    /// `chunk_overlap` characters into the next chunk.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_trimmed(&window) {
                    chunks.push(chunk);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, front_len)) => total -= front_len,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if let Some(chunk) = join_trimmed(&window) {
            chunks.push(chunk);
        }
        chunks
    }
}

impl Chunker for RecursiveCharacterSplitter {
    fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }
}

/// Tag every chunk of an upload with its doc id, filename and upload time.
pub fn tag_chunks(chunks: &mut [Segment], doc_id: &str, filename: &str, upload_time: &str) {
    for chunk in chunks {
        chunk.metadata.insert(DOC_ID_KEY.to_string(), Value::String(doc_id.to_string()));
        chunk.metadata.insert(FILENAME_KEY.to_string(), Value::String(filename.to_string()));
        chunk.metadata.insert(UPLOAD_TIME_KEY.to_string(), Value::String(upload_time.to_string()));
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split at every occurrence of `separator`, keeping the separator at the
/// start of the piece that follows it. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_trimmed(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_stays_with_following_piece() {
        assert_eq!(split_keeping_separator("a b c", " "), vec!["a", " b", " c"]);
        assert_eq!(split_keeping_separator(" lead", " "), vec![" lead"]);
        assert_eq!(split_keeping_separator("x\n\ny", "\n\n"), vec!["x", "\n\ny"]);
    }

    #[test]
    fn empty_separator_splits_into_chars() {
        assert_eq!(split_keeping_separator("hé", ""), vec!["h", "é"]);
    }
}
