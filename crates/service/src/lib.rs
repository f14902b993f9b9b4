//! Orchestration layer: wires the order store, analysis pipelines, template
//! registry, and generation client into the three operations callers run:
//!
//! 1. **Analysis** (`analysis`) - raw orders through both analysis pipelines,
//!    persisting one summary document per pipeline
//! 2. **Offer generation** (`offer`) - concurrent fan-out over the template
//!    registry, one persisted suggestion row per (template, goal)
//! 3. **Forecast refresh** (`forecast`) - regenerate the forecast on the
//!    latest suggestion row for one template

pub mod analysis;
pub mod forecast;
pub mod offer;
pub mod telemetry;

pub use analysis::{AnalysisOrchestrator, AnalysisRunReport};
pub use forecast::ForecastOrchestrator;
pub use offer::{GeneratedBatch, OfferOrchestrator, TemplateOutcome};
