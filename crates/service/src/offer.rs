//! Template fan-out: one generation pass produces a suggestion batch per
//! template, concurrently.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use offerly_agent::client::GenerationClient;
use offerly_agent::context::{shared_instruction, AnalysisContext};
use offerly_core::analysis::AnalysisType;
use offerly_core::errors::OrchestrationError;
use offerly_core::forecast::split_forecast;
use offerly_core::program::ProgramId;
use offerly_core::templates::{TemplateConfig, TemplateKey, TemplateRegistry};
use offerly_db::repositories::{
    AnalysisResultRepository, NewOfferBatch, OfferRepository,
};

/// One persisted generation batch for a template.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedBatch {
    pub template: TemplateKey,
    pub generation_ref: Uuid,
    /// Row ids, one per goal the template serves, in goal order.
    pub row_ids: Vec<i64>,
    /// True when the generated payload carried no forecast and the zero
    /// default was persisted instead.
    pub forecast_missing: bool,
}

/// Per-template result of a full generation pass.
#[derive(Debug)]
pub struct TemplateOutcome {
    pub template: TemplateKey,
    pub result: Result<GeneratedBatch, OrchestrationError>,
}

pub struct OfferOrchestrator {
    registry: Arc<TemplateRegistry>,
    analyses: Arc<dyn AnalysisResultRepository>,
    offers: Arc<dyn OfferRepository>,
    client: Arc<dyn GenerationClient>,
}

impl OfferOrchestrator {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        analyses: Arc<dyn AnalysisResultRepository>,
        offers: Arc<dyn OfferRepository>,
        client: Arc<dyn GenerationClient>,
    ) -> Self {
        Self { registry, analyses, offers, client }
    }

    /// Generates offers for every registered template concurrently.
    ///
    /// All templates share one analysis context and instruction. Each
    /// template persists its own batch; a failing template reports its error
    /// in the outcome list without affecting the others. Outcomes come back
    /// in template-id order.
    pub async fn generate_all_templates(
        &self,
        program: ProgramId,
    ) -> Result<Vec<TemplateOutcome>, OrchestrationError> {
        let context = Arc::new(self.load_context(program).await?);
        if context.is_empty() {
            warn!(%program, "generating offers without any analysis context");
        }
        let prompt: Arc<str> =
            Arc::from(context.render_prompt(program, &shared_instruction(program)));

        let mut tasks = JoinSet::new();
        for template in self.registry.iter() {
            let template = template.clone();
            let offers = Arc::clone(&self.offers);
            let client = Arc::clone(&self.client);
            let prompt = Arc::clone(&prompt);
            tasks.spawn(async move {
                let key = template.key;
                let result =
                    generate_for_template(program, &template, &*client, &*offers, &prompt).await;
                TemplateOutcome { template: key, result }
            });
        }

        let mut outcomes = Vec::with_capacity(self.registry.len());
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|error| {
                OrchestrationError::Generation(format!("generation task panicked: {error}"))
            })?;
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|outcome| outcome.template.id());

        let failed = outcomes.iter().filter(|outcome| outcome.result.is_err()).count();
        info!(%program, total = outcomes.len(), failed, "offer generation pass complete");
        Ok(outcomes)
    }

    /// Generates and persists a batch for a single template id.
    pub async fn generate_one_template(
        &self,
        program: ProgramId,
        template_id: i64,
    ) -> Result<GeneratedBatch, OrchestrationError> {
        let template = self.registry.by_id(template_id).ok_or_else(|| {
            OrchestrationError::SchemaMismatch(format!("unknown template id {template_id}"))
        })?;

        let context = self.load_context(program).await?;
        let prompt = context.render_prompt(program, &shared_instruction(program));
        generate_for_template(program, template, &*self.client, &*self.offers, &prompt).await
    }

    /// Loads the latest analysis documents. Absent documents are tolerated;
    /// repository failures are not.
    async fn load_context(
        &self,
        program: ProgramId,
    ) -> Result<AnalysisContext, OrchestrationError> {
        let (customer, order) = tokio::join!(
            self.analyses.get_latest(program, AnalysisType::Customer),
            self.analyses.get_latest(program, AnalysisType::Order),
        );
        let customer =
            customer.map_err(|error| OrchestrationError::Persistence(error.to_string()))?;
        let order = order.map_err(|error| OrchestrationError::Persistence(error.to_string()))?;

        Ok(AnalysisContext {
            customer_summary: customer.map(|record| record.analysis_json),
            order_summary: order.map(|record| record.analysis_json),
        })
    }
}

async fn generate_for_template(
    program: ProgramId,
    template: &TemplateConfig,
    client: &dyn GenerationClient,
    offers: &dyn OfferRepository,
    prompt: &str,
) -> Result<GeneratedBatch, OrchestrationError> {
    let payload = client
        .invoke(template.category, template.schema, prompt)
        .await
        .map_err(|error| OrchestrationError::Generation(error.to_string()))?;

    let outcome = split_forecast(payload);
    if outcome.forecast_missing {
        warn!(%program, template = template.key.as_str(), "generated payload had no forecast, persisting zero default");
    }

    let generation_ref = Uuid::new_v4();
    let row_ids = offers
        .save_batch(NewOfferBatch {
            loyalty_program_id: program,
            template_id: template.key.id(),
            goals: template.goals.clone(),
            generation_ref,
            offers: outcome.offers,
            forecast: outcome.forecast,
        })
        .await
        .map_err(|error| OrchestrationError::Persistence(error.to_string()))?;

    info!(
        %program,
        template = template.key.as_str(),
        rows = row_ids.len(),
        %generation_ref,
        "suggestion batch persisted"
    );
    Ok(GeneratedBatch {
        template: template.key,
        generation_ref,
        row_ids,
        forecast_missing: outcome.forecast_missing,
    })
}
