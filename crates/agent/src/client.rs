use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use offerly_core::templates::{GenerationCategory, TemplateSchema};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generation upstream failed: {0}")]
    Upstream(String),
    #[error("generated output did not match the requested schema: {0}")]
    InvalidOutput(String),
}

/// Produces offer content for one template invocation.
///
/// Implementations must return JSON conforming to the requested schema;
/// orchestration treats the payload as opaque apart from the `forecast` key.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn invoke(
        &self,
        category: GenerationCategory,
        schema: TemplateSchema,
        prompt: &str,
    ) -> Result<Value, GenerationError>;
}

/// Canned client for tests: fixed payload per category, with an optional
/// failure set.
#[derive(Default)]
pub struct StaticGenerationClient {
    payloads: HashMap<GenerationCategory, Value>,
    failures: HashSet<GenerationCategory>,
}

impl StaticGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(mut self, category: GenerationCategory, payload: Value) -> Self {
        self.payloads.insert(category, payload);
        self
    }

    pub fn failing_for(mut self, category: GenerationCategory) -> Self {
        self.failures.insert(category);
        self
    }
}

#[async_trait]
impl GenerationClient for StaticGenerationClient {
    async fn invoke(
        &self,
        category: GenerationCategory,
        _schema: TemplateSchema,
        _prompt: &str,
    ) -> Result<Value, GenerationError> {
        if self.failures.contains(&category) {
            return Err(GenerationError::Upstream(format!("canned failure for {category:?}")));
        }
        self.payloads
            .get(&category)
            .cloned()
            .ok_or_else(|| GenerationError::Upstream(format!("no canned payload for {category:?}")))
    }
}
