//! Node evaluator trait, dynamic dispatch wrapper, and the evaluator registry.
//!
//! Dispatch is by the node's declared type tag, case-insensitively. Types the
//! registry does not know fall back to a pass-through evaluator, so new node
//! types are added by registering evaluators, never by editing the driver.

use std::collections::HashMap;

use async_trait::async_trait;

use loomflow_types::{AgentNode, Result};

use crate::resolve::text_of;

/// Type tag of entry agents.
pub const INPUT_TYPE: &str = "input";
/// Type tag of prepend/append text processors.
pub const PROCESSING_TYPE: &str = "processing";
/// Type tag of terminal pass-through agents.
pub const OUTPUT_TYPE: &str = "output";

// ---------------------------------------------------------------------------
// ResolvedInput / Evaluation
// ---------------------------------------------------------------------------

/// The materialized input handed to an evaluator.
#[derive(Debug, Clone, Default)]
pub struct ResolvedInput {
    /// Concatenated predecessor outputs (see the port resolver).
    pub text: String,
    /// Template variables from the entry agent's structured config. Evaluators
    /// that consume structured input read this and ignore `text`.
    pub variables: serde_json::Map<String, serde_json::Value>,
}

impl ResolvedInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            variables: serde_json::Map::new(),
        }
    }
}

/// Output of one evaluator call.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Opaque payload recorded under the node's id.
    pub output: serde_json::Value,
    /// Trace lines appended to the run's simulation details.
    pub trace: Vec<String>,
}

impl Evaluation {
    pub fn new(output: serde_json::Value, trace: Vec<String>) -> Self {
        Self { output, trace }
    }
}

// ---------------------------------------------------------------------------
// NodeEvaluator trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait NodeEvaluator: Send + Sync {
    /// The type tag this evaluator handles (e.g. "input", "processing").
    fn type_tag(&self) -> &str;

    /// Evaluate one node.
    async fn evaluate(&self, node: &AgentNode, input: &ResolvedInput) -> Result<Evaluation>;
}

// ---------------------------------------------------------------------------
// DynEvaluator — boxed wrapper
// ---------------------------------------------------------------------------

pub struct DynEvaluator(Box<dyn NodeEvaluator>);

impl DynEvaluator {
    pub fn new(evaluator: impl NodeEvaluator + 'static) -> Self {
        Self(Box::new(evaluator))
    }

    pub fn type_tag(&self) -> &str {
        self.0.type_tag()
    }

    pub async fn evaluate(&self, node: &AgentNode, input: &ResolvedInput) -> Result<Evaluation> {
        self.0.evaluate(node, input).await
    }
}

// ---------------------------------------------------------------------------
// EvaluatorRegistry
// ---------------------------------------------------------------------------

pub struct EvaluatorRegistry {
    evaluators: HashMap<String, DynEvaluator>,
    fallback: DynEvaluator,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self {
            evaluators: HashMap::new(),
            fallback: DynEvaluator::new(PassThroughEvaluator),
        }
    }

    /// Register an evaluator under its lowercased type tag.
    pub fn register(&mut self, evaluator: impl NodeEvaluator + 'static) {
        let tag = evaluator.type_tag().to_ascii_lowercase();
        self.evaluators.insert(tag, DynEvaluator::new(evaluator));
    }

    /// Look up the evaluator for a type tag, falling back to pass-through for
    /// unrecognized tags.
    pub fn resolve(&self, type_tag: &str) -> &DynEvaluator {
        self.evaluators
            .get(&type_tag.to_ascii_lowercase())
            .unwrap_or(&self.fallback)
    }

    pub fn has(&self, type_tag: &str) -> bool {
        self.evaluators.contains_key(&type_tag.to_ascii_lowercase())
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Built-in evaluators
// ---------------------------------------------------------------------------

/// Entry agents emit `config.message` (any JSON value) or a synthetic default
/// derived from the agent's name. The resolved input is ignored.
pub struct InputEvaluator;

#[async_trait]
impl NodeEvaluator for InputEvaluator {
    fn type_tag(&self) -> &str {
        INPUT_TYPE
    }

    async fn evaluate(&self, node: &AgentNode, _input: &ResolvedInput) -> Result<Evaluation> {
        let output = node
            .config
            .get("message")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::String(format!("Input from {}", node.name)));
        let trace = vec![format!("  - generates: '{}'", text_of(&output))];
        Ok(Evaluation::new(output, trace))
    }
}

/// Processing agents wrap their input with `config.prepend` / `config.append`
/// (absent fields default to empty) and trim the result.
pub struct ProcessingEvaluator;

#[async_trait]
impl NodeEvaluator for ProcessingEvaluator {
    fn type_tag(&self) -> &str {
        PROCESSING_TYPE
    }

    async fn evaluate(&self, node: &AgentNode, input: &ResolvedInput) -> Result<Evaluation> {
        let prepend = node.config_str("prepend").unwrap_or_default();
        let append = node.config_str("append").unwrap_or_default();
        let combined = format!("{prepend} {} {append}", input.text);
        let output = combined.trim().to_string();
        let trace = vec![
            format!("  - received: '{}'", input.text),
            format!("  - processes to: '{output}'"),
        ];
        Ok(Evaluation::new(serde_json::Value::String(output), trace))
    }
}

/// Terminal agents surface their input unchanged.
pub struct OutputEvaluator;

#[async_trait]
impl NodeEvaluator for OutputEvaluator {
    fn type_tag(&self) -> &str {
        OUTPUT_TYPE
    }

    async fn evaluate(&self, _node: &AgentNode, input: &ResolvedInput) -> Result<Evaluation> {
        let trace = vec![format!("  - final output: '{}'", input.text)];
        Ok(Evaluation::new(
            serde_json::Value::String(input.text.clone()),
            trace,
        ))
    }
}

/// Fallback for unrecognized type tags: input passes through unchanged and the
/// trace records that no action is defined.
pub struct PassThroughEvaluator;

#[async_trait]
impl NodeEvaluator for PassThroughEvaluator {
    fn type_tag(&self) -> &str {
        "passthrough"
    }

    async fn evaluate(&self, node: &AgentNode, input: &ResolvedInput) -> Result<Evaluation> {
        let trace = vec![format!(
            "  - no action defined for type '{}', passing through",
            node.agent_type
        )];
        Ok(Evaluation::new(
            serde_json::Value::String(input.text.clone()),
            trace,
        ))
    }
}

// ---------------------------------------------------------------------------
// Default registry factory
// ---------------------------------------------------------------------------

/// Registry with the always-available built-ins: input, processing, output,
/// and the templated-prompt evaluator. The model-call evaluator is added
/// separately because it needs an injected generator.
pub fn default_registry() -> EvaluatorRegistry {
    let mut reg = EvaluatorRegistry::new();
    reg.register(InputEvaluator);
    reg.register(ProcessingEvaluator);
    reg.register(OutputEvaluator);
    reg.register(crate::evaluators::PromptTemplateEvaluator);
    reg
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
