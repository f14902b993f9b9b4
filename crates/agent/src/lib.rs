//! Generation runtime - the seam between offer orchestration and whatever
//! model produces offer content.
//!
//! The generator is strictly a content producer. It never decides which
//! templates run, which goals they serve, or what gets persisted - those are
//! deterministic decisions made by the registry and the orchestrators. This
//! crate owns:
//!
//! - `GenerationClient` - pluggable trait invoked once per template
//! - `AnalysisContext` - the summary documents rendered into every prompt
//!
//! Production wiring plugs a real model client into `GenerationClient`;
//! tests use [`client::StaticGenerationClient`].

pub mod client;
pub mod context;

pub use client::{GenerationClient, GenerationError, StaticGenerationClient};
pub use context::AnalysisContext;
