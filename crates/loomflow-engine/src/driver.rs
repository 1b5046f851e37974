//! Execution driver: orchestrates scheduler → resolver → evaluators and
//! assembles the final report.
//!
//! Two strategies share the scheduler and resolver, selected by a pre-flight
//! capability check rather than a flag threaded through every function:
//!
//! - **best-effort walk** for arbitrary graphs: structural residue and
//!   per-node evaluator failures are reported in the trace, and the rest of
//!   the run continues;
//! - **strict pipeline** whenever a generative-model agent is present: the
//!   fixed entry → prompt → model → output roles must each appear exactly
//!   once, and any failure stops the run immediately, since a partially-run
//!   external call is not a meaningful partial result.

use std::sync::Arc;

use loomflow_llm::TextGenerator;
use loomflow_types::{AgentNode, ExecutionReport, FlowError, FlowSnapshot, Result};

use crate::evaluator::{default_registry, EvaluatorRegistry, ResolvedInput, INPUT_TYPE, OUTPUT_TYPE};
use crate::evaluators::{ModelCallEvaluator, MODEL_TYPE, PROMPT_TYPE};
use crate::resolve::resolve_input;
use crate::schedule::{schedule_with_entry, Schedule};

/// The four roles of the strict generative pipeline, each required exactly once.
const PIPELINE_ROLES: [&str; 4] = [INPUT_TYPE, PROMPT_TYPE, MODEL_TYPE, OUTPUT_TYPE];

/// The core flow executor. Owns an evaluator registry and drives runs.
pub struct FlowRunner {
    registry: EvaluatorRegistry,
    entry_type: String,
}

impl FlowRunner {
    /// Create a runner with the given evaluator registry.
    pub fn new(registry: EvaluatorRegistry) -> Self {
        Self {
            registry,
            entry_type: INPUT_TYPE.to_string(),
        }
    }

    /// Runner pre-loaded with the built-in evaluators but no model-call
    /// evaluator; model-typed agents cannot execute on it.
    pub fn with_default_registry() -> Self {
        Self::new(default_registry())
    }

    /// Runner with the built-ins plus a model-call evaluator bound to the
    /// given text-generation collaborator.
    pub fn with_generator(generator: Arc<dyn TextGenerator>) -> Self {
        let mut registry = default_registry();
        registry.register(ModelCallEvaluator::new(generator));
        Self::new(registry)
    }

    pub fn registry_mut(&mut self) -> &mut EvaluatorRegistry {
        &mut self.registry
    }

    /// Execute one run over an immutable snapshot.
    ///
    /// Never returns an error: failures are carried in the report's `error`
    /// field alongside whatever order, outputs, and trace were produced.
    pub async fn run(&self, snapshot: &FlowSnapshot) -> ExecutionReport {
        tracing::info!(
            agents = snapshot.agents.len(),
            connections = snapshot.connections.len(),
            "starting flow run"
        );
        if snapshot.has_agent_type(MODEL_TYPE) {
            self.run_strict(snapshot).await
        } else {
            self.run_best_effort(snapshot).await
        }
    }

    // -- best-effort walk ---------------------------------------------------

    async fn run_best_effort(&self, snapshot: &FlowSnapshot) -> ExecutionReport {
        let Schedule { order, residue } = schedule_with_entry(snapshot, &self.entry_type);
        let mut report = ExecutionReport {
            execution_order: order,
            residue,
            ..Default::default()
        };

        if !report.residue.is_empty() {
            let notice = FlowError::Structural {
                node_ids: report.residue.clone(),
            };
            report.simulation_details.push(format!("Error: {notice}"));
        }

        let variables = collect_variables(snapshot, &self.entry_type);

        for i in 0..report.execution_order.len() {
            let id = report.execution_order[i].clone();
            let Some(agent) = snapshot.agent(&id) else {
                continue;
            };
            let input = ResolvedInput {
                text: resolve_input(&id, &snapshot.connections, &report.final_outputs),
                variables: variables.clone(),
            };
            report.simulation_details.push(header_line(agent));

            match self.registry.resolve(&agent.agent_type).evaluate(agent, &input).await {
                Ok(eval) => {
                    report.simulation_details.extend(eval.trace);
                    report.final_outputs.insert(id, eval.output);
                }
                Err(err) => {
                    // Only this node is lost; downstream agents degrade
                    // silently through the resolver.
                    tracing::warn!(agent = %id, error = %err, "agent evaluation failed");
                    report.simulation_details.push(format!("  - failed: {err}"));
                }
            }
        }

        report
    }

    // -- strict pipeline ----------------------------------------------------

    async fn run_strict(&self, snapshot: &FlowSnapshot) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        // Fail fast: every structural/configuration problem is caught before
        // the first evaluation, so no external call is half-made.
        let variables = match self.strict_preflight(snapshot) {
            Ok(variables) => variables,
            Err(err) => {
                tracing::error!(error = %err, "strict pre-flight failed");
                report.error = Some(err.to_string());
                return report;
            }
        };

        let Schedule { order, residue } = schedule_with_entry(snapshot, &self.entry_type);
        report.execution_order = order;
        if !residue.is_empty() {
            let err = FlowError::Structural { node_ids: residue.clone() };
            report.residue = residue;
            report.error = Some(err.to_string());
            return report;
        }

        for i in 0..report.execution_order.len() {
            let id = report.execution_order[i].clone();
            let Some(agent) = snapshot.agent(&id) else {
                continue;
            };
            let input = ResolvedInput {
                text: resolve_input(&id, &snapshot.connections, &report.final_outputs),
                variables: variables.clone(),
            };
            report.simulation_details.push(header_line(agent));

            match self.registry.resolve(&agent.agent_type).evaluate(agent, &input).await {
                Ok(eval) => {
                    report.simulation_details.extend(eval.trace);
                    report.final_outputs.insert(id, eval.output);
                }
                Err(err) => {
                    // Fatal: keep what already ran for diagnostics, stop here.
                    tracing::error!(agent = %id, error = %err, "strict run aborted");
                    report.simulation_details.push(format!("  - failed: {err}"));
                    report.error = Some(err.to_string());
                    break;
                }
            }
        }

        report
    }

    /// Verify the four pipeline roles are each present exactly once, a model
    /// evaluator is available, and extract the template variable mapping from
    /// the entry agent's structured config.
    fn strict_preflight(
        &self,
        snapshot: &FlowSnapshot,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        for role in PIPELINE_ROLES {
            let count = snapshot.agents_of_type(role).count();
            if count != 1 {
                return Err(FlowError::Configuration {
                    node: role.to_string(),
                    message: format!(
                        "strict pipeline requires exactly one agent of this type, found {count}"
                    ),
                });
            }
        }

        if !self.registry.has(MODEL_TYPE) {
            return Err(FlowError::ExternalService {
                provider: "none".into(),
                message: "no text generator configured for generative-model agents".into(),
            });
        }

        let entry = snapshot
            .agents_of_type(&self.entry_type)
            .next()
            .ok_or_else(|| FlowError::Configuration {
                node: self.entry_type.clone(),
                message: "strict pipeline requires an entry agent".into(),
            })?;
        match entry.config.get("value") {
            None => Ok(serde_json::Map::new()),
            Some(serde_json::Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(FlowError::Configuration {
                node: entry.id.clone(),
                message: "config.value must be an object".into(),
            }),
        }
    }
}

/// Trace header emitted once per executed agent.
fn header_line(agent: &AgentNode) -> String {
    format!(
        "Agent '{}' (ID: {}, Type: {}):",
        agent.name, agent.id, agent.agent_type
    )
}

/// Variable mapping for template rendering: the first entry-typed agent whose
/// `config.value` is an object supplies it. Best-effort runs tolerate a
/// missing or malformed mapping; the strict pre-flight does not.
fn collect_variables(
    snapshot: &FlowSnapshot,
    entry_type: &str,
) -> serde_json::Map<String, serde_json::Value> {
    snapshot
        .agents_of_type(entry_type)
        .find_map(|a| a.config.get("value").and_then(|v| v.as_object()).cloned())
        .unwrap_or_default()
}
