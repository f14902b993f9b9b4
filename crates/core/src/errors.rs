use thiserror::Error;

/// Data-quality failures raised inside the analytics pipelines.
///
/// A `DataError` aborts only the pipeline that raised it; sibling pipelines
/// and templates keep running and persisting their own results.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("required columns absent from every row: {columns:?}")]
    MissingColumns { columns: Vec<&'static str> },
    #[error("no rows available for {stage}")]
    EmptyDataset { stage: &'static str },
    #[error("quantile binning for {metric} collapsed from {requested} buckets to {actual}")]
    BinningCollapse { metric: &'static str, requested: usize, actual: usize },
}

/// Failures surfaced by the orchestration layer.
///
/// `SchemaMismatch` and `Precondition` propagate synchronously to the caller
/// of single-item operations before any generation work starts. The rest are
/// recorded per task under the all-results-collected discipline.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("unknown template or goal reference: {0}")]
    SchemaMismatch(String),
    #[error("precondition not met: {0}")]
    Precondition(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("generation mechanism failure: {0}")]
    Generation(String),
}

#[cfg(test)]
mod tests {
    use super::{DataError, OrchestrationError};

    #[test]
    fn data_error_wraps_into_orchestration_error() {
        let err = OrchestrationError::from(DataError::EmptyDataset { stage: "customer kpis" });
        assert_eq!(err.to_string(), "no rows available for customer kpis");
    }

    #[test]
    fn missing_columns_names_the_columns() {
        let err = DataError::MissingColumns { columns: vec!["invoice_no", "item_total"] };
        assert!(err.to_string().contains("invoice_no"));
        assert!(err.to_string().contains("item_total"));
    }
}
