//! Forecast refresh for an already-generated suggestion batch.

use std::sync::Arc;

use tracing::info;

use offerly_agent::client::GenerationClient;
use offerly_agent::context::AnalysisContext;
use offerly_core::analysis::AnalysisType;
use offerly_core::errors::OrchestrationError;
use offerly_core::forecast::Forecast;
use offerly_core::program::ProgramId;
use offerly_core::templates::{GenerationCategory, TemplateSchema};
use offerly_db::repositories::{AnalysisResultRepository, OfferRepository};

pub struct ForecastOrchestrator {
    analyses: Arc<dyn AnalysisResultRepository>,
    offers: Arc<dyn OfferRepository>,
    client: Arc<dyn GenerationClient>,
}

impl ForecastOrchestrator {
    pub fn new(
        analyses: Arc<dyn AnalysisResultRepository>,
        offers: Arc<dyn OfferRepository>,
        client: Arc<dyn GenerationClient>,
    ) -> Self {
        Self { analyses, offers, client }
    }

    /// Regenerates the forecast for the latest suggestion row of one
    /// (program, template) and persists it onto that row only.
    ///
    /// Requires a previously generated batch; the generated payload must
    /// deserialize into the full [`Forecast`] shape before anything is
    /// written.
    pub async fn refresh_forecast(
        &self,
        program: ProgramId,
        template_id: i64,
    ) -> Result<Forecast, OrchestrationError> {
        let (customer, order, latest) = tokio::join!(
            self.analyses.get_latest(program, AnalysisType::Customer),
            self.analyses.get_latest(program, AnalysisType::Order),
            self.offers.get_latest(program, template_id),
        );

        let customer =
            customer.map_err(|error| OrchestrationError::Persistence(error.to_string()))?;
        let order = order.map_err(|error| OrchestrationError::Persistence(error.to_string()))?;
        let latest = latest
            .map_err(|error| OrchestrationError::Persistence(error.to_string()))?
            .ok_or_else(|| {
                OrchestrationError::Precondition(format!(
                    "no generated offers for template {template_id}, run generation first"
                ))
            })?;

        let context = AnalysisContext {
            customer_summary: customer.map(|record| record.analysis_json),
            order_summary: order.map(|record| record.analysis_json),
        };
        let prompt = context.render_forecast_prompt(program, &latest.offers);

        let payload = self
            .client
            .invoke(GenerationCategory::Forecast, TemplateSchema::Forecast, &prompt)
            .await
            .map_err(|error| OrchestrationError::Generation(error.to_string()))?;

        let forecast: Forecast = serde_json::from_value(payload).map_err(|error| {
            OrchestrationError::Generation(format!("forecast payload invalid: {error}"))
        })?;

        let document = serde_json::to_value(&forecast).map_err(|error| {
            OrchestrationError::Persistence(format!("unserializable forecast: {error}"))
        })?;
        let updated = self
            .offers
            .update_forecast_for_latest(program, template_id, &document)
            .await
            .map_err(|error| OrchestrationError::Persistence(error.to_string()))?;
        if updated == 0 {
            return Err(OrchestrationError::Precondition(format!(
                "suggestion row for template {template_id} disappeared during refresh"
            )));
        }

        info!(%program, template_id, row = latest.id, "forecast refreshed");
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use uuid::Uuid;

    use offerly_agent::client::StaticGenerationClient;
    use offerly_core::errors::OrchestrationError;
    use offerly_core::program::ProgramId;
    use offerly_core::templates::{GenerationCategory, Goal};
    use offerly_db::repositories::{
        InMemoryAnalysisResultRepository, InMemoryOfferRepository, NewOfferBatch, OfferRepository,
    };

    use super::ForecastOrchestrator;

    fn orchestrator(
        offers: Arc<InMemoryOfferRepository>,
        client: StaticGenerationClient,
    ) -> ForecastOrchestrator {
        ForecastOrchestrator::new(
            Arc::new(InMemoryAnalysisResultRepository::default()),
            offers,
            Arc::new(client),
        )
    }

    async fn seed_batch(offers: &InMemoryOfferRepository, template_id: i64) {
        offers
            .save_batch(NewOfferBatch {
                loyalty_program_id: ProgramId(4),
                template_id,
                goals: vec![Goal::RepeatCustomers],
                generation_ref: Uuid::new_v4(),
                offers: json!({"offers": [{"title": "Stamp Card"}]}),
                forecast: json!({"target": 0, "budget": 0, "predicted_redemptions": 0, "roi": "0x"}),
            })
            .await
            .expect("seed batch");
    }

    #[tokio::test]
    async fn refresh_replaces_the_latest_forecast() {
        let offers = Arc::new(InMemoryOfferRepository::default());
        seed_batch(&offers, 6).await;
        seed_batch(&offers, 6).await;

        let client = StaticGenerationClient::new().with_payload(
            GenerationCategory::Forecast,
            json!({"target": 40, "budget": 1500, "predicted_redemptions": 25, "roi": "1.8x"}),
        );

        let forecast = orchestrator(offers.clone(), client)
            .refresh_forecast(ProgramId(4), 6)
            .await
            .expect("refresh");
        assert_eq!(forecast.roi, "1.8x");

        let latest = offers.get_latest(ProgramId(4), 6).await.expect("query").expect("row");
        assert_eq!(latest.id, 2);
        assert_eq!(latest.forecast["predicted_redemptions"], json!(25));
    }

    #[tokio::test]
    async fn refresh_without_generated_offers_is_a_precondition_failure() {
        let offers = Arc::new(InMemoryOfferRepository::default());
        let client = StaticGenerationClient::new()
            .with_payload(GenerationCategory::Forecast, json!({"target": 1}));

        let err = orchestrator(offers, client)
            .refresh_forecast(ProgramId(4), 6)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Precondition(_)));
    }

    #[tokio::test]
    async fn malformed_forecast_payload_is_rejected_before_persisting() {
        let offers = Arc::new(InMemoryOfferRepository::default());
        seed_batch(&offers, 6).await;

        // Missing predicted_redemptions and roi.
        let client = StaticGenerationClient::new()
            .with_payload(GenerationCategory::Forecast, json!({"target": 40, "budget": 1500}));

        let err = orchestrator(offers.clone(), client)
            .refresh_forecast(ProgramId(4), 6)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Generation(_)));

        let latest = offers.get_latest(ProgramId(4), 6).await.expect("query").expect("row");
        assert_eq!(latest.forecast["roi"], json!("0x"));
    }
}
