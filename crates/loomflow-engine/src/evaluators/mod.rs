//! Evaluators beyond the basic input/processing/output built-ins.

use std::sync::Arc;

use async_trait::async_trait;

use loomflow_llm::TextGenerator;
use loomflow_types::{AgentNode, FlowError, Result};

use crate::evaluator::{Evaluation, NodeEvaluator, ResolvedInput};
use crate::resolve::text_of;

/// Type tag of templated-prompt agents.
pub const PROMPT_TYPE: &str = "prompt";
/// Type tag of generative-model-call agents.
pub const MODEL_TYPE: &str = "model";

/// Model id used when a model agent's config does not name one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Sampling temperature used when a model agent's config does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

// ---------------------------------------------------------------------------
// Template rendering
// ---------------------------------------------------------------------------

/// Replace `{key}` placeholders with stringified variable values.
///
/// Placeholders without a matching variable are left as-is.
pub fn render_template(
    template: &str,
    variables: &serde_json::Map<String, serde_json::Value>,
) -> String {
    let mut rendered = template.to_string();
    for (key, value) in variables {
        let pattern = format!("{{{key}}}");
        rendered = rendered.replace(&pattern, &text_of(value));
    }
    rendered
}

// ---------------------------------------------------------------------------
// PromptTemplateEvaluator — renders config.template_string (prompt type)
// ---------------------------------------------------------------------------

/// Renders `config.template_string` against the run's variable mapping.
///
/// The variables come from the entry agent's structured config, not from the
/// concatenated predecessor text.
pub struct PromptTemplateEvaluator;

#[async_trait]
impl NodeEvaluator for PromptTemplateEvaluator {
    fn type_tag(&self) -> &str {
        PROMPT_TYPE
    }

    async fn evaluate(&self, node: &AgentNode, input: &ResolvedInput) -> Result<Evaluation> {
        let template = node
            .config_str("template_string")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| FlowError::Configuration {
                node: node.id.clone(),
                message: "template_string is missing or empty".into(),
            })?;

        let rendered = render_template(template, &input.variables);
        let trace = vec![format!("  - rendered template to: '{rendered}'")];
        Ok(Evaluation::new(serde_json::Value::String(rendered), trace))
    }
}

// ---------------------------------------------------------------------------
// ModelCallEvaluator — invokes the text-generation collaborator (model type)
// ---------------------------------------------------------------------------

/// Sends the resolved prompt to the injected [`TextGenerator`].
///
/// The only evaluator with a real external side effect; the generator is
/// injected so runs are testable without a live backend. Collaborator
/// failures surface unchanged as [`FlowError::ExternalService`].
pub struct ModelCallEvaluator {
    generator: Arc<dyn TextGenerator>,
}

impl ModelCallEvaluator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl NodeEvaluator for ModelCallEvaluator {
    fn type_tag(&self) -> &str {
        MODEL_TYPE
    }

    async fn evaluate(&self, node: &AgentNode, input: &ResolvedInput) -> Result<Evaluation> {
        let model = node.config_str("model").unwrap_or(DEFAULT_MODEL);
        let temperature = node.config_f64("temperature").unwrap_or(DEFAULT_TEMPERATURE);

        tracing::info!(agent = %node.id, model = %model, temperature, "invoking text generation");
        let reply = self
            .generator
            .generate(model, temperature, &input.text)
            .await?;

        let trace = vec![format!(
            "  - model '{model}' (temperature {temperature}) replied: '{reply}'"
        )];
        Ok(Evaluation::new(serde_json::Value::String(reply), trace))
    }
}
