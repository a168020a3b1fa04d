pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod report;

#[cfg(test)]
mod tests {
    use super::domain::Prediction;
    use super::error::AppError;

    #[test]
    fn app_error_is_structured() {
        let err = AppError::invalid_argument("k must be positive").with_details("k=0");
        assert_eq!(err.code, "INVALID_ARGUMENT");
        assert!(err.is_invalid_argument());
        assert!(!err.retryable);
        assert_eq!(err.to_string(), "[INVALID_ARGUMENT] k must be positive (k=0)");
    }

    #[test]
    fn prediction_labels_are_binary() {
        assert_eq!(Prediction::Consistent.label(), 1);
        assert_eq!(Prediction::Inconsistent.label(), 0);
    }
}
