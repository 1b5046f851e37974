//! Port resolver: materializes a node's input from its predecessors' outputs.

use std::collections::BTreeMap;

use loomflow_types::Connection;

/// Stringified form of an opaque node output.
///
/// JSON strings contribute their raw text, `null` contributes nothing, and
/// every other value contributes its compact JSON rendering.
pub fn text_of(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Collect the input for `node_id` from already-recorded outputs.
///
/// Incoming connections are walked in insertion order; each source with a
/// recorded, non-empty output contributes its stringified form. Sources with
/// no recorded output — not yet executed, failed, or producing nothing — are
/// skipped silently: missing contributions are degradation, not an error.
/// Contributions are joined with single spaces and the result is trimmed.
pub fn resolve_input(
    node_id: &str,
    connections: &[Connection],
    outputs: &BTreeMap<String, serde_json::Value>,
) -> String {
    let parts: Vec<String> = connections
        .iter()
        .filter(|c| c.target_agent_id == node_id)
        .filter_map(|c| outputs.get(&c.source_agent_id))
        .map(text_of)
        .filter(|s| !s.is_empty())
        .collect();

    parts.join(" ").trim().to_string()
}
