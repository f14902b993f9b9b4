use serde_json::Value;

use offerly_core::program::ProgramId;

/// The analysis documents available when a generation pass runs.
///
/// Either summary may be absent (the corresponding analysis has not run
/// yet); generation still proceeds with whatever context exists.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisContext {
    pub customer_summary: Option<Value>,
    pub order_summary: Option<Value>,
}

impl AnalysisContext {
    pub fn is_empty(&self) -> bool {
        self.customer_summary.is_none() && self.order_summary.is_none()
    }

    /// Renders the prompt sent for every template in a generation pass.
    pub fn render_prompt(&self, program: ProgramId, instruction: &str) -> String {
        let mut prompt = format!("{instruction}\n\nLoyalty program: {program}\n");
        match &self.customer_summary {
            Some(summary) => {
                prompt.push_str("\nCustomer analysis:\n");
                prompt.push_str(&summary.to_string());
                prompt.push('\n');
            }
            None => prompt.push_str("\nCustomer analysis: not available\n"),
        }
        match &self.order_summary {
            Some(summary) => {
                prompt.push_str("\nOrder analysis:\n");
                prompt.push_str(&summary.to_string());
                prompt.push('\n');
            }
            None => prompt.push_str("\nOrder analysis: not available\n"),
        }
        prompt
    }

    /// Prompt for regenerating the forecast of an already-generated batch.
    pub fn render_forecast_prompt(&self, program: ProgramId, latest_offers: &Value) -> String {
        let mut prompt = self.render_prompt(
            program,
            "Produce a performance forecast for the offers below: redemption target, campaign budget, predicted redemptions, and expected ROI.",
        );
        prompt.push_str("\nOffers under forecast:\n");
        prompt.push_str(&latest_offers.to_string());
        prompt.push('\n');
        prompt
    }
}

/// The instruction shared by every template in one generation pass.
pub fn shared_instruction(program: ProgramId) -> String {
    format!("Generate offers for loyalty program {program}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use offerly_core::program::ProgramId;

    use super::{shared_instruction, AnalysisContext};

    #[test]
    fn prompt_includes_available_summaries_and_flags_missing_ones() {
        let context = AnalysisContext {
            customer_summary: Some(json!({"customer_segments": {"total_customers": 12}})),
            order_summary: None,
        };

        let prompt = context.render_prompt(ProgramId(5), &shared_instruction(ProgramId(5)));
        assert!(prompt.contains("Generate offers for loyalty program 5"));
        assert!(prompt.contains("total_customers"));
        assert!(prompt.contains("Order analysis: not available"));
    }

    #[test]
    fn forecast_prompt_embeds_the_offer_payload() {
        let context = AnalysisContext::default();
        let prompt =
            context.render_forecast_prompt(ProgramId(5), &json!({"offers": [{"title": "Combo"}]}));
        assert!(prompt.contains("Offers under forecast:"));
        assert!(prompt.contains("Combo"));
    }
}
