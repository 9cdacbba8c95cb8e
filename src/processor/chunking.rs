//! Recursive character chunking
//!
//! Splits normalized text into bounded, overlapping chunks. The splitter
//! tries the coarsest separator first (paragraph breaks), then line breaks,
//! sentence boundaries, and spaces, and only hard-cuts when a run of text
//! has no separator at all. Pieces keep their separators attached, so every
//! chunk is a contiguous substring of the input and concatenating chunks
//! (accounting for overlap) loses no characters.
//!
//! All sizes are measured in characters, not bytes; the corpus is largely
//! Korean and multi-byte.

use crate::processor::config::ChunkOptions;
use crate::processor::error::ProcessError;
use tracing::debug;

/// Separator fallback order, coarsest first
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// Split text into overlapping chunks of at most `chunk_size` characters.
///
/// Deterministic for a given (text, options) pair; chunk order is
/// positional and stable across runs.
pub fn split_text(text: &str, options: &ChunkOptions) -> Result<Vec<String>, ProcessError> {
    if options.chunk_size == 0 {
        return Err(ProcessError::InvalidOptions(
            "chunk_size must be positive".to_string(),
        ));
    }
    if options.chunk_overlap >= options.chunk_size {
        return Err(ProcessError::InvalidOptions(format!(
            "chunk_overlap {} must be smaller than chunk_size {}",
            options.chunk_overlap, options.chunk_size
        )));
    }

    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut pieces = Vec::new();
    split_recursive(text, SEPARATORS, options.chunk_size, &mut pieces);
    let chunks = merge_pieces(pieces, options.chunk_size, options.chunk_overlap);
    debug!(chunks = chunks.len(), "Split text into chunks");
    Ok(chunks)
}

/// Recursively split `text` into pieces no longer than `max` characters,
/// preferring the coarsest separator that actually divides the text.
/// Separators stay attached to the piece they terminate.
fn split_recursive(text: &str, separators: &[&str], max: usize, out: &mut Vec<String>) {
    if char_len(text) <= max {
        if !text.is_empty() {
            out.push(text.to_string());
        }
        return;
    }

    for (i, sep) in separators.iter().enumerate() {
        let parts: Vec<&str> = text.split_inclusive(sep).collect();
        if parts.len() > 1 {
            for part in parts {
                split_recursive(part, &separators[i + 1..], max, out);
            }
            return;
        }
    }

    // No separator left: hard character cut
    let chars: Vec<char> = text.chars().collect();
    for window in chars.chunks(max) {
        out.push(window.iter().collect());
    }
}

/// Greedily pack pieces into chunks of at most `max` characters, seeding
/// each new chunk with the trailing pieces of the previous one up to
/// `overlap` characters.
fn merge_pieces(pieces: Vec<String>, max: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for piece in pieces {
        let piece_len = char_len(&piece);
        if current_len + piece_len > max && !current.is_empty() {
            push_chunk(&mut chunks, &current);

            let mut tail: Vec<String> = Vec::new();
            let mut tail_len = 0usize;
            for prev in current.iter().rev() {
                let prev_len = char_len(prev);
                if tail_len + prev_len > overlap {
                    break;
                }
                tail_len += prev_len;
                tail.push(prev.clone());
            }
            tail.reverse();
            current = tail;
            current_len = tail_len;

            // The seeded tail plus the new piece must still fit the size
            // bound; shed tail pieces from the front until it does.
            while current_len + piece_len > max {
                match current.first().map(|s| char_len(s)) {
                    Some(dropped) => {
                        current.remove(0);
                        current_len -= dropped;
                    }
                    None => break,
                }
            }
        }
        current_len += piece_len;
        current.push(piece);
    }

    if !current.is_empty() {
        push_chunk(&mut chunks, &current);
    }
    chunks
}

fn push_chunk(chunks: &mut Vec<String>, pieces: &[String]) {
    let chunk = pieces.concat();
    if !chunk.trim().is_empty() {
        chunks.push(chunk);
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
