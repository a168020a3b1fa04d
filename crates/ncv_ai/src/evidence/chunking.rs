use ncv_core::domain::Document;
use ncv_core::error::AppError;
use sha2::{Digest, Sha256};

use super::model::Chunk;

/// Window parameters, in characters. `overlap` must be smaller than `max_chars`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub max_chars: usize,
    pub overlap: usize,
}

impl ChunkParams {
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self, AppError> {
        if max_chars == 0 {
            return Err(AppError::invalid_argument("Chunk max_chars must be positive"));
        }
        if overlap >= max_chars {
            return Err(
                AppError::invalid_argument("Chunk overlap must be smaller than max_chars")
                    .with_details(format!("overlap={overlap}; max_chars={max_chars}")),
            );
        }
        Ok(Self { max_chars, overlap })
    }
}

/// Split a document into overlapping windows of at most `max_chars` characters.
///
/// Consecutive chunks share exactly `overlap` characters, so the document is
/// recovered by appending each chunk after dropping its first `overlap` characters.
/// A window ends just after whitespace when one falls in its back half; otherwise it
/// is cut mid-word at the size limit. Empty documents yield no chunks.
pub fn chunk_document(doc: &Document, params: ChunkParams) -> Vec<Chunk> {
    let text = doc.text.as_str();
    // Byte offset of every char boundary, plus the end of the text.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let n = bounds.len();
    bounds.push(text.len());
    let is_space = |pos: usize| text[bounds[pos]..bounds[pos + 1]].chars().all(char::is_whitespace);

    let ChunkParams { max_chars, overlap } = params;
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < n {
        let limit = (start + max_chars).min(n);
        let end = if limit == n {
            n
        } else {
            // Keep `end > start + overlap` so the next window always advances.
            let floor = (start + overlap + 1).max(start + max_chars / 2);
            (floor..=limit)
                .rev()
                .find(|&e| is_space(e - 1))
                .unwrap_or(limit)
        };

        let span = &text[bounds[start]..bounds[end]];
        out.push(make_chunk(&doc.document_id, out.len() as u32, span, start, end));

        if end == n {
            break;
        }
        start = end - overlap;
    }
    out
}

fn make_chunk(document_id: &str, ordinal: u32, text: &str, start: usize, end: usize) -> Chunk {
    let text_sha256 = hex::encode(Sha256::digest(text.as_bytes()));
    let id_payload = format!("document_id={document_id}\nordinal={ordinal}\ntext_sha256={text_sha256}");
    Chunk {
        chunk_id: hex::encode(Sha256::digest(id_payload.as_bytes())),
        document_id: document_id.to_string(),
        ordinal,
        text: text.to_string(),
        text_sha256,
        char_range: [to_u32(start), to_u32(end)],
    }
}

fn to_u32(v: usize) -> u32 {
    v.min(u32::MAX as usize) as u32
}
