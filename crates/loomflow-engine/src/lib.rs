//! Flow execution engine: scheduling, input resolution, evaluator dispatch,
//! and report assembly.
//!
//! The engine consumes an immutable [`FlowSnapshot`](loomflow_types::FlowSnapshot)
//! from the store, orders it with the layer-peeling scheduler, materializes
//! each node's input from its predecessors' recorded outputs, dispatches to a
//! per-type evaluator, and assembles an
//! [`ExecutionReport`](loomflow_types::ExecutionReport) — a deterministic
//! trace, per-node outputs, and a terminal error when a run stops early.

pub mod driver;
pub mod evaluator;
pub mod evaluators;
pub mod resolve;
pub mod schedule;

pub use driver::FlowRunner;
pub use evaluator::{
    default_registry, DynEvaluator, Evaluation, EvaluatorRegistry, InputEvaluator, NodeEvaluator,
    OutputEvaluator, PassThroughEvaluator, ProcessingEvaluator, ResolvedInput, INPUT_TYPE,
    OUTPUT_TYPE, PROCESSING_TYPE,
};
pub use evaluators::{
    render_template, ModelCallEvaluator, PromptTemplateEvaluator, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE, MODEL_TYPE, PROMPT_TYPE,
};
pub use resolve::{resolve_input, text_of};
pub use schedule::{schedule, schedule_with_entry, Schedule, ENTRY_TYPE};
