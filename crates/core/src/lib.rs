//! Loyalty analytics core - pure domain logic for the offerly system.
//!
//! This crate turns raw point-of-sale order blobs into customer segments and
//! order patterns, summarizes them into guarded business-insight documents,
//! and owns the template/goal registry that drives offer generation:
//!
//! 1. **Ingest** (`ingest`) - flatten nested POS order JSON into line rows
//! 2. **Preprocess** (`preprocess`) - filter, coerce, derive time fields
//! 3. **Analyze** (`analysis`) - customer KPIs + RFM clustering, invoice
//!    aggregation + item co-occurrence
//! 4. **Summarize** (`summarize`) - segment/pattern summaries with guarded
//!    insight blocks, persisted as JSON documents
//! 5. **Templates** (`templates`, `offers`, `forecast`) - the canonical
//!    template-to-goal table and the discount/eligibility variant model
//!
//! Everything here is deterministic and side-effect free. Persistence and
//! generation live behind trait seams in the `offerly-db` and
//! `offerly-agent` crates.

pub mod analysis;
pub mod config;
pub mod errors;
pub mod forecast;
pub mod ingest;
pub mod offers;
pub mod preprocess;
pub mod program;
pub mod summarize;
pub mod templates;

pub use analysis::customer::{CustomerAnalyzer, CustomerKpiRow};
pub use analysis::order::{CoOccurrenceMatrix, InvoiceAggregateRow, OrderAnalyzer};
pub use analysis::AnalysisType;
pub use config::{AnalysisConfig, BinningPolicy, ConfigError};
pub use errors::{DataError, OrchestrationError};
pub use forecast::{split_forecast, Forecast, SplitOutcome};
pub use ingest::{flatten_orders, RawLineRow, RawOrderRecord};
pub use offers::{
    AppliesTo, DiscountDetails, EligibilityCriteria, OfferVariant, SelectedOfferVariant,
};
pub use preprocess::{preprocess, OrderLineRow};
pub use program::ProgramId;
pub use summarize::customer::{segment_of, CustomerSummarizer, CustomerSummary, Segment};
pub use summarize::order::{OrderSummarizer, OrderSummary};
pub use templates::{
    GenerationCategory, Goal, RegistryError, TemplateConfig, TemplateKey, TemplateRegistry,
    TemplateSchema,
};

pub use chrono;
