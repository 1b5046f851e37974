use async_trait::async_trait;

use loomflow_types::{FlowError, Result};

// ---------------------------------------------------------------------------
// TextGenerator
// ---------------------------------------------------------------------------

/// Synchronous (from the engine's point of view) text-generation collaborator.
///
/// The engine imposes no timeout or retry of its own; implementations are
/// responsible for surfacing their own failures as
/// [`FlowError::ExternalService`] with the underlying message preserved.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name used in error messages and logs.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt` with the given model and sampling
    /// temperature.
    async fn generate(&self, model: &str, temperature: f64, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// DynGenerator — boxed wrapper
// ---------------------------------------------------------------------------

pub struct DynGenerator(Box<dyn TextGenerator>);

impl DynGenerator {
    pub fn new(generator: impl TextGenerator + 'static) -> Self {
        Self(Box::new(generator))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub async fn generate(&self, model: &str, temperature: f64, prompt: &str) -> Result<String> {
        self.0.generate(model, temperature, prompt).await
    }
}

// ---------------------------------------------------------------------------
// Deterministic stubs
// ---------------------------------------------------------------------------

/// Returns the rendered prompt unchanged. Useful for verifying the full
/// template → model → terminal data path without a live backend.
pub struct EchoGenerator;

#[async_trait]
impl TextGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, _model: &str, _temperature: f64, prompt: &str) -> Result<String> {
        Ok(prompt.to_string())
    }
}

/// Always replies with the same canned text.
pub struct StaticGenerator {
    reply: String,
}

impl StaticGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

#[async_trait]
impl TextGenerator for StaticGenerator {
    fn name(&self) -> &str {
        "static"
    }

    async fn generate(&self, _model: &str, _temperature: f64, _prompt: &str) -> Result<String> {
        Ok(self.reply.clone())
    }
}

/// Always fails with the given message, for exercising the failure path.
pub struct FailingGenerator {
    message: String,
}

impl FailingGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _model: &str, _temperature: f64, _prompt: &str) -> Result<String> {
        Err(FlowError::ExternalService {
            provider: self.name().to_string(),
            message: self.message.clone(),
        })
    }
}
