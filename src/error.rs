use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("could not read workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("could not read csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("sheet has no header row")]
    Empty,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("event cycle {0} does not exist")]
    UnknownCycle(uuid::Uuid),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failures that abort an import before any row is written.
///
/// Per-row problems are never reported here; they are counted as skips.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No file uploaded")]
    NoFile,

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(
        "Missing column for '{field}' (tried: {}). Available columns: {}",
        .tried.join(" | "),
        .available.join(", ")
    )]
    MissingColumn {
        field: &'static str,
        tried: Vec<String>,
        available: Vec<String>,
    },

    #[error("could not load event cycles: {0}")]
    Store(#[from] StoreError),
}

impl ImportError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ImportError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_names_field_and_headers() {
        let err = ImportError::MissingColumn {
            field: "overallSatisfaction",
            tried: vec![
                "8 (overall satisfaction)".to_string(),
                "overall & satisfaction".to_string(),
            ],
            available: vec!["start time".to_string(), "role".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("overallSatisfaction"));
        assert!(message.contains("8 (overall satisfaction) | overall & satisfaction"));
        assert!(message.contains("start time, role"));
        assert!(err.is_client_error());
    }

    #[test]
    fn store_failures_are_not_client_errors() {
        let err = ImportError::from(StoreError::Unavailable("down".to_string()));
        assert!(!err.is_client_error());
    }
}
