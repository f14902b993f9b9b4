//! Runs both analysis pipelines over a program's raw orders.

use std::sync::Arc;

use tracing::{info, warn};

use offerly_core::analysis::AnalysisType;
use offerly_core::config::AnalysisConfig;
use offerly_core::errors::OrchestrationError;
use offerly_core::ingest::{flatten_orders, RawOrderRecord};
use offerly_core::preprocess::{preprocess, OrderLineRow};
use offerly_core::program::ProgramId;
use offerly_core::summarize::customer::CustomerSummarizer;
use offerly_core::summarize::order::OrderSummarizer;
use offerly_core::{CustomerAnalyzer, OrderAnalyzer};
use offerly_db::repositories::{
    AnalysisResultRepository, NewAnalysisRecord, OrderSource,
};

/// Result of one analysis run. Pipeline slots hold the persisted document's
/// row id, or the error that stopped that pipeline; a failure in one never
/// blocks the other.
#[derive(Debug)]
pub struct AnalysisRunReport {
    pub program: ProgramId,
    /// True when the program had no orders and nothing was persisted.
    pub skipped: bool,
    pub customer: Option<Result<i64, OrchestrationError>>,
    pub order: Option<Result<i64, OrchestrationError>>,
}

impl AnalysisRunReport {
    fn skipped(program: ProgramId) -> Self {
        Self { program, skipped: true, customer: None, order: None }
    }
}

pub struct AnalysisOrchestrator {
    orders: Arc<dyn OrderSource>,
    results: Arc<dyn AnalysisResultRepository>,
    config: AnalysisConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        orders: Arc<dyn OrderSource>,
        results: Arc<dyn AnalysisResultRepository>,
        config: AnalysisConfig,
    ) -> Self {
        Self { orders, results, config }
    }

    /// Fetches the program's raw orders, preprocesses them once, then runs
    /// the customer and order pipelines concurrently, persisting one summary
    /// document per pipeline.
    ///
    /// Failures in the shared steps (fetch, ingest, preprocess) fail the
    /// whole run; failures past that point are isolated per pipeline and
    /// reported in the [`AnalysisRunReport`].
    pub async fn run_all(
        &self,
        program: ProgramId,
    ) -> Result<AnalysisRunReport, OrchestrationError> {
        let blobs = self
            .orders
            .fetch_raw_orders(program)
            .await
            .map_err(|error| OrchestrationError::Persistence(error.to_string()))?;

        if blobs.is_empty() {
            info!(%program, "no orders found, skipping analysis");
            return Ok(AnalysisRunReport::skipped(program));
        }

        let total = blobs.len();
        let records: Vec<RawOrderRecord> = blobs
            .into_iter()
            .filter_map(|blob| match serde_json::from_value(blob) {
                Ok(record) => Some(record),
                Err(error) => {
                    warn!(%program, %error, "skipping malformed order blob");
                    None
                }
            })
            .collect();

        if records.is_empty() {
            return Err(OrchestrationError::SchemaMismatch(format!(
                "none of {total} order blobs matched the expected order shape"
            )));
        }

        let lines = flatten_orders(&records);
        let processed = preprocess(&lines, &self.config)?;
        info!(%program, orders = records.len(), rows = processed.len(), "preprocessing complete");

        let (customer, order) = tokio::join!(
            self.run_customer_pipeline(program, &processed),
            self.run_order_pipeline(program, &processed),
        );

        Ok(AnalysisRunReport { program, skipped: false, customer: Some(customer), order: Some(order) })
    }

    async fn run_customer_pipeline(
        &self,
        program: ProgramId,
        rows: &[OrderLineRow],
    ) -> Result<i64, OrchestrationError> {
        let analyzer = CustomerAnalyzer::new(self.config.clone());
        let prepared = analyzer.prepare(rows);
        let kpis = analyzer.build_customer_kpis(&prepared)?;
        let kpis = analyzer.perform_rfm_clustering(kpis)?;
        let summary = CustomerSummarizer::new(self.config.clone()).summarize(&kpis);

        let document = serde_json::to_value(summary).map_err(|error| {
            OrchestrationError::Persistence(format!("unserializable customer summary: {error}"))
        })?;

        let id = self
            .results
            .save(NewAnalysisRecord {
                loyalty_program_id: program,
                analysis_type: AnalysisType::Customer,
                analysis_json: document,
            })
            .await
            .map_err(|error| OrchestrationError::Persistence(error.to_string()))?;

        info!(%program, id, "customer analysis persisted");
        Ok(id)
    }

    async fn run_order_pipeline(
        &self,
        program: ProgramId,
        rows: &[OrderLineRow],
    ) -> Result<i64, OrchestrationError> {
        let analyzer = OrderAnalyzer::new();
        let invoices = analyzer.compute_invoice_aggregation(rows);
        let matrix = analyzer.compute_cooccurrence_matrix(rows, self.config.top_n_items);
        let summary = OrderSummarizer::new(self.config.clone()).summarize(&invoices, &matrix)?;

        let document = serde_json::to_value(summary).map_err(|error| {
            OrchestrationError::Persistence(format!("unserializable order summary: {error}"))
        })?;

        let id = self
            .results
            .save(NewAnalysisRecord {
                loyalty_program_id: program,
                analysis_type: AnalysisType::Order,
                analysis_json: document,
            })
            .await
            .map_err(|error| OrchestrationError::Persistence(error.to_string()))?;

        info!(%program, id, "order analysis persisted");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use offerly_core::analysis::AnalysisType;
    use offerly_core::config::AnalysisConfig;
    use offerly_core::errors::{DataError, OrchestrationError};
    use offerly_core::program::ProgramId;
    use offerly_db::repositories::{
        AnalysisResultRepository, InMemoryAnalysisResultRepository, InMemoryOrderSource,
    };

    use super::AnalysisOrchestrator;

    fn order_blob(invoice: &str, phone: Option<&str>, item: &str, total: f64) -> serde_json::Value {
        let mut blob = json!({
            "Order": {
                "orderID": invoice,
                "created_on": "2025-06-01 12:30:00",
                "order_type": "Dine In",
                "total": total
            },
            "OrderItem": [
                {"name": item, "quantity": 1, "total": total}
            ]
        });
        if let Some(phone) = phone {
            blob["Customer"] = json!({"phone": phone, "name": "Asha"});
        }
        blob
    }

    fn orchestrator(
        orders: Arc<InMemoryOrderSource>,
        results: Arc<InMemoryAnalysisResultRepository>,
    ) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(orders, results, AnalysisConfig::default())
    }

    #[tokio::test]
    async fn zero_orders_skip_the_run() {
        let orders = Arc::new(InMemoryOrderSource::default());
        let results = Arc::new(InMemoryAnalysisResultRepository::default());
        let report = orchestrator(orders, results.clone())
            .run_all(ProgramId(1))
            .await
            .expect("run");

        assert!(report.skipped);
        assert!(report.customer.is_none());
        assert!(report.order.is_none());
        let persisted =
            results.get_latest(ProgramId(1), AnalysisType::Customer).await.expect("query");
        assert!(persisted.is_none());
    }

    #[tokio::test]
    async fn both_pipelines_persist_documents() {
        let orders = Arc::new(InMemoryOrderSource::default());
        orders
            .push_orders(
                ProgramId(1),
                vec![
                    order_blob("I-1", Some("98"), "Dosa", 120.0),
                    order_blob("I-2", Some("99"), "Coffee", 40.0),
                ],
            )
            .await;
        let results = Arc::new(InMemoryAnalysisResultRepository::default());

        let report =
            orchestrator(orders, results.clone()).run_all(ProgramId(1)).await.expect("run");

        assert!(!report.skipped);
        assert!(report.customer.expect("customer slot").is_ok());
        assert!(report.order.expect("order slot").is_ok());

        let customer = results
            .get_latest(ProgramId(1), AnalysisType::Customer)
            .await
            .expect("query")
            .expect("customer document");
        assert_eq!(customer.analysis_json["customer_segments"]["total_customers"], json!(2));

        let order = results
            .get_latest(ProgramId(1), AnalysisType::Order)
            .await
            .expect("query")
            .expect("order document");
        assert_eq!(order.analysis_json["invoice_analysis"]["total_orders"], json!(2));
    }

    #[tokio::test]
    async fn customer_failure_does_not_block_order_pipeline() {
        // No phone numbers anywhere: the customer pipeline has nothing to
        // work with, while invoices still aggregate fine.
        let orders = Arc::new(InMemoryOrderSource::default());
        orders
            .push_orders(
                ProgramId(1),
                vec![order_blob("I-1", None, "Dosa", 120.0)],
            )
            .await;
        let results = Arc::new(InMemoryAnalysisResultRepository::default());

        let report =
            orchestrator(orders, results.clone()).run_all(ProgramId(1)).await.expect("run");

        let customer = report.customer.expect("customer slot");
        assert!(matches!(
            customer,
            Err(OrchestrationError::Data(DataError::EmptyDataset { .. }))
        ));
        assert!(report.order.expect("order slot").is_ok());

        let order = results
            .get_latest(ProgramId(1), AnalysisType::Order)
            .await
            .expect("query")
            .expect("order document");
        assert_eq!(order.analysis_json["invoice_analysis"]["total_orders"], json!(1));
    }

    #[tokio::test]
    async fn malformed_blobs_are_skipped_not_fatal() {
        let orders = Arc::new(InMemoryOrderSource::default());
        orders
            .push_orders(
                ProgramId(1),
                vec![json!("not an order"), order_blob("I-1", Some("98"), "Dosa", 120.0)],
            )
            .await;
        let results = Arc::new(InMemoryAnalysisResultRepository::default());

        let report =
            orchestrator(orders, results.clone()).run_all(ProgramId(1)).await.expect("run");
        assert!(report.order.expect("order slot").is_ok());
    }

    #[tokio::test]
    async fn all_malformed_blobs_are_a_schema_mismatch() {
        let orders = Arc::new(InMemoryOrderSource::default());
        orders.push_orders(ProgramId(1), vec![json!("junk"), json!(42)]).await;
        let results = Arc::new(InMemoryAnalysisResultRepository::default());

        let err = orchestrator(orders, results).run_all(ProgramId(1)).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::SchemaMismatch(_)));
    }
}
