use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::BatchConfig;
use crate::domain::{BackstoryRecord, ValidationWarning};
use crate::error::{AppError, MISSING_FIELD};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchIngestSummary {
    pub records: Vec<BackstoryRecord>,
    pub skipped: usize,
    pub warnings: Vec<ValidationWarning>,
}

fn get<'a>(row: &'a csv::StringRecord, idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| row.get(i))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Parse batch input. A record missing its id, backstory or document reference is
/// skipped with a `MISSING_FIELD` warning; only unreadable CSV fails the batch.
pub fn parse_batch_csv(csv_text: &str, columns: &BatchConfig) -> Result<BatchIngestSummary, AppError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| {
            AppError::new("BATCH_CSV_HEADERS_FAILED", "Failed to read batch CSV headers")
                .with_details(e.to_string())
        })?
        .clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let id_idx = position(&columns.id_column);
    let backstory_idx = position(&columns.backstory_column);
    let document_idx = position(&columns.document_column);

    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut skipped = 0usize;

    for (i, result) in rdr.records().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                skipped += 1;
                warnings.push(
                    ValidationWarning::new("BATCH_CSV_ROW_UNREADABLE", "Skipped unreadable batch row")
                        .with_details(format!("line={line}; err={e}")),
                );
                continue;
            }
        };

        let story_id = get(&row, id_idx);
        let backstory = get(&row, backstory_idx);
        let document_id = get(&row, document_idx);

        let mut missing = Vec::new();
        if story_id.is_none() {
            missing.push(columns.id_column.as_str());
        }
        if backstory.is_none() {
            missing.push(columns.backstory_column.as_str());
        }
        if document_id.is_none() {
            missing.push(columns.document_column.as_str());
        }

        match (story_id, backstory, document_id) {
            (Some(story_id), Some(backstory), Some(document_id)) => records.push(BackstoryRecord {
                story_id: story_id.to_string(),
                backstory: backstory.to_string(),
                document_id: document_id.to_string(),
            }),
            _ => {
                skipped += 1;
                tracing::warn!(line, missing = ?missing, "skipping batch record with missing fields");
                warnings.push(
                    ValidationWarning::new(MISSING_FIELD, "Batch record is missing required fields")
                        .with_details(format!("line={line}; missing={}", missing.join(","))),
                );
            }
        }
    }

    Ok(BatchIngestSummary {
        records,
        skipped,
        warnings,
    })
}

pub fn read_batch_csv(path: &Path, columns: &BatchConfig) -> Result<BatchIngestSummary, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::new("BATCH_CSV_READ_FAILED", "Failed to read batch CSV")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    parse_batch_csv(&text, columns)
}
