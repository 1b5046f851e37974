//! Shared types for the Loomflow agent-flow backend.
//!
//! This crate provides the foundational types used across all other Loomflow
//! crates:
//! - `FlowError` — unified error taxonomy
//! - `AgentNode` / `Connection` — the flow graph records
//! - `FlowSnapshot` — immutable copy-on-read view handed to the engine
//! - `ExecutionReport` — the result of a single flow run

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unified error type for all Loomflow subsystems.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Cycle detected or disconnected components in the graph. Remaining agents: [{}]", .node_ids.join(", "))]
    Structural { node_ids: Vec<String> },

    #[error("Agent '{node}' is misconfigured: {message}")]
    Configuration { node: String, message: String },

    #[error("Text generation via {provider} failed: {message}")]
    ExternalService { provider: String, message: String },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl FlowError {
    /// Maps the error to an HTTP status code for server mode.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FlowError::Structural { .. } => Some(422),
            FlowError::Configuration { .. } => Some(400),
            FlowError::ExternalService { .. } => Some(502),
            FlowError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Returns `true` for structural (cycle/disconnection) errors, which are
    /// tolerated in best-effort runs but fatal in strict ones.
    pub fn is_structural(&self) -> bool {
        matches!(self, FlowError::Structural { .. })
    }
}

/// A convenience alias for `Result<T, FlowError>`.
pub type Result<T> = std::result::Result<T, FlowError>;

// ---------------------------------------------------------------------------
// Graph records
// ---------------------------------------------------------------------------

/// Canvas coordinates of an agent. Presentation only; never read by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// A typed unit of work in the flow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub position: Position,
}

impl AgentNode {
    /// Case-insensitive type-tag check. Type tags are an open-ended set of
    /// strings; the engine compares them without regard to case.
    pub fn type_is(&self, tag: &str) -> bool {
        self.agent_type.eq_ignore_ascii_case(tag)
    }

    /// Read a string-valued config field.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }

    /// Read a numeric config field.
    pub fn config_f64(&self, key: &str) -> Option<f64> {
        self.config.get(key).and_then(|v| v.as_f64())
    }
}

/// A directed, port-labeled dependency between two agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub source_agent_id: String,
    pub target_agent_id: String,
    pub source_port: String,
    pub target_port: String,
}

/// An immutable pairing of all agents and connections at run start.
///
/// The store produces one per run (copy-on-read), so concurrent mutation of
/// the live records never affects an in-flight execution. Both collections
/// preserve store insertion order; the scheduler's deterministic tie-break
/// and the resolver's concatenation order depend on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub agents: Vec<AgentNode>,
    pub connections: Vec<Connection>,
}

impl FlowSnapshot {
    pub fn agent(&self, id: &str) -> Option<&AgentNode> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// All agents carrying the given type tag, case-insensitively.
    pub fn agents_of_type<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a AgentNode> {
        self.agents.iter().filter(move |a| a.type_is(tag))
    }

    pub fn has_agent_type(&self, tag: &str) -> bool {
        self.agents_of_type(tag).next().is_some()
    }
}

// ---------------------------------------------------------------------------
// Execution report
// ---------------------------------------------------------------------------

/// Terminal state of a run, derived from the report contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Completed,
    PartiallyCompleted,
    Failed,
}

/// The aggregate result of a single flow run.
///
/// Serializes as `{execution_order, final_outputs, simulation_details}` with
/// `error` present only on failure and `residue` present only when the
/// scheduler left nodes unordered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Node ids in the order they were scheduled.
    pub execution_order: Vec<String>,
    /// Output of every successfully evaluated node, keyed by node id.
    pub final_outputs: BTreeMap<String, serde_json::Value>,
    /// Human-readable trace lines, one or more per executed node.
    pub simulation_details: Vec<String>,
    /// Terminal error that stopped the run early, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Nodes the scheduler could not order (cycle or disconnection).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub residue: Vec<String>,
}

impl ExecutionReport {
    pub fn state(&self) -> RunState {
        if self.error.is_some() {
            RunState::Failed
        } else if !self.residue.is_empty() {
            RunState::PartiallyCompleted
        } else {
            RunState::Completed
        }
    }
}
