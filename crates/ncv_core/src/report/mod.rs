use std::path::Path;

use crate::domain::PredictionRow;
use crate::error::AppError;

pub const NO_CONTRADICTION_RATIONALE: &str = "No contradiction found";

/// Render batch output as CSV with columns `story_id,prediction,rationale`.
pub fn predictions_csv(rows: &[PredictionRow]) -> Result<String, AppError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["story_id", "prediction", "rationale"])
        .map_err(write_failed)?;
    for row in rows {
        let label = row.prediction.label().to_string();
        wtr.write_record([row.story_id.as_str(), label.as_str(), row.rationale.as_str()])
            .map_err(write_failed)?;
    }
    let bytes = wtr.into_inner().map_err(|e| {
        AppError::new("BATCH_OUTPUT_FAILED", "Failed to flush predictions CSV").with_details(e.to_string())
    })?;
    String::from_utf8(bytes).map_err(|e| {
        AppError::new("BATCH_OUTPUT_FAILED", "Predictions CSV was not UTF-8").with_details(e.to_string())
    })
}

pub fn write_predictions_csv(path: &Path, rows: &[PredictionRow]) -> Result<(), AppError> {
    let csv_text = predictions_csv(rows)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, csv_text.as_bytes()).map_err(|e| {
        AppError::new("BATCH_OUTPUT_FAILED", "Failed to write predictions CSV")
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        AppError::new("BATCH_OUTPUT_FAILED", "Failed to finalize predictions CSV write")
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })
}

fn write_failed(e: csv::Error) -> AppError {
    AppError::new("BATCH_OUTPUT_FAILED", "Failed to encode predictions CSV").with_details(e.to_string())
}
