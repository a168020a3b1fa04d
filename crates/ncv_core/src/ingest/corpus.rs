use std::fs;
use std::path::Path;

use crate::domain::Document;
use crate::error::AppError;

/// Load every `.txt` file in `dir` as a document keyed by its file stem,
/// ordered by document id.
pub fn load_corpus_dir(dir: &Path) -> Result<Vec<Document>, AppError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::new("CORPUS_READ_FAILED", "Failed to read corpus directory")
            .with_details(format!("path={}; err={}", dir.display(), e))
    })?;

    let mut documents = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            AppError::new("CORPUS_READ_FAILED", "Failed to list corpus directory")
                .with_details(format!("path={}; err={}", dir.display(), e))
        })?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!(path = %path.display(), "skipping corpus file with non-UTF-8 name");
            continue;
        };
        let bytes = fs::read(&path).map_err(|e| {
            AppError::new("CORPUS_READ_FAILED", "Failed to read corpus file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        documents.push(Document::new(stem, String::from_utf8_lossy(&bytes).into_owned()));
    }

    documents.sort_by(|a, b| a.document_id.cmp(&b.document_id));
    tracing::info!(dir = %dir.display(), documents = documents.len(), "loaded corpus");
    Ok(documents)
}
