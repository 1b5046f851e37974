//! Topological scheduler: iterative layer-peeling over the snapshot.
//!
//! Not Kahn's algorithm: eligibility is structural ("not the target of any
//! remaining connection") with an override for entry-typed agents, which may
//! start a flow even when something points at them.

use std::collections::HashSet;

use loomflow_types::FlowSnapshot;

/// The agent type permitted to start a flow regardless of incoming edges.
pub const ENTRY_TYPE: &str = "input";

/// Result of scheduling: the linear order plus any unorderable residue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Agent ids in execution order.
    pub order: Vec<String>,
    /// Agents that could not be ordered (cycle, or a component not reachable
    /// from any entry-typed agent). Empty for well-formed graphs.
    pub residue: Vec<String>,
}

/// Schedule with the conventional entry type (`"input"`).
pub fn schedule(snapshot: &FlowSnapshot) -> Schedule {
    schedule_with_entry(snapshot, ENTRY_TYPE)
}

/// Layer-peeling schedule.
///
/// Each iteration gathers every agent that is either not the target of a
/// remaining connection or carries the entry type, appends them in snapshot
/// insertion order (the deterministic tie-break), and drops their outgoing
/// connections so downstream agents become eligible next round. A round with
/// no eligible agent while agents remain stops with those agents as residue.
pub fn schedule_with_entry(snapshot: &FlowSnapshot, entry_type: &str) -> Schedule {
    let mut remaining: Vec<_> = snapshot.agents.iter().collect();
    let mut connections: Vec<_> = snapshot.connections.iter().collect();
    let mut order = Vec::new();

    while !remaining.is_empty() {
        let targets: HashSet<&str> = connections
            .iter()
            .map(|c| c.target_agent_id.as_str())
            .collect();

        let (ready, blocked): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|a| !targets.contains(a.id.as_str()) || a.type_is(entry_type));

        if ready.is_empty() {
            let residue: Vec<String> = blocked.iter().map(|a| a.id.clone()).collect();
            tracing::warn!(residue = residue.len(), "schedule stalled");
            return Schedule { order, residue };
        }

        let scheduled: HashSet<&str> = ready.iter().map(|a| a.id.as_str()).collect();
        order.extend(ready.iter().map(|a| a.id.clone()));
        connections.retain(|c| !scheduled.contains(c.source_agent_id.as_str()));
        remaining = blocked;
    }

    Schedule {
        order,
        residue: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomflow_types::{AgentNode, Connection, Position};

    fn agent(id: &str, agent_type: &str) -> AgentNode {
        AgentNode {
            id: id.into(),
            name: id.to_uppercase(),
            agent_type: agent_type.into(),
            config: serde_json::Map::new(),
            position: Position::default(),
        }
    }

    fn edge(source: &str, target: &str) -> Connection {
        Connection {
            id: format!("{source}->{target}"),
            source_agent_id: source.into(),
            target_agent_id: target.into(),
            source_port: "out".into(),
            target_port: "in".into(),
        }
    }

    fn snapshot(agents: Vec<AgentNode>, connections: Vec<Connection>) -> FlowSnapshot {
        FlowSnapshot {
            agents,
            connections,
        }
    }

    #[test]
    fn empty_snapshot_yields_empty_schedule() {
        let s = schedule(&FlowSnapshot::default());
        assert!(s.order.is_empty());
        assert!(s.residue.is_empty());
    }

    #[test]
    fn linear_chain_orders_source_to_sink() {
        let snap = snapshot(
            vec![agent("a", "input"), agent("b", "processing"), agent("c", "output")],
            vec![edge("a", "b"), edge("b", "c")],
        );
        let s = schedule(&snap);
        assert_eq!(s.order, vec!["a", "b", "c"]);
        assert!(s.residue.is_empty());
    }

    #[test]
    fn entry_node_comes_first_and_ancestors_precede_descendants() {
        // Diamond: a -> b, a -> c, b -> d, c -> d
        let snap = snapshot(
            vec![
                agent("a", "input"),
                agent("b", "processing"),
                agent("c", "processing"),
                agent("d", "output"),
            ],
            vec![edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d")],
        );
        let s = schedule(&snap);
        assert_eq!(s.order[0], "a");
        let index = |id: &str| s.order.iter().position(|x| x == id).unwrap();
        for (u, v) in [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")] {
            assert!(index(u) < index(v), "{u} must precede {v}: {:?}", s.order);
        }
    }

    #[test]
    fn tie_break_is_snapshot_insertion_order() {
        // Three independent agents become eligible simultaneously.
        let snap = snapshot(
            vec![agent("z", "processing"), agent("m", "processing"), agent("a", "processing")],
            vec![],
        );
        let s = schedule(&snap);
        assert_eq!(s.order, vec!["z", "m", "a"]);
    }

    #[test]
    fn cycle_becomes_residue() {
        let snap = snapshot(
            vec![agent("a", "processing"), agent("b", "processing")],
            vec![edge("a", "b"), edge("b", "a")],
        );
        let s = schedule(&snap);
        assert!(s.order.is_empty());
        assert_eq!(s.residue, vec!["a", "b"]);
    }

    #[test]
    fn cycle_does_not_block_the_rest_of_the_graph() {
        let snap = snapshot(
            vec![
                agent("start", "input"),
                agent("x", "processing"),
                agent("y", "processing"),
                agent("end", "output"),
            ],
            vec![
                edge("start", "end"),
                edge("x", "y"),
                edge("y", "x"),
            ],
        );
        let s = schedule(&snap);
        assert_eq!(s.order, vec!["start", "end"]);
        assert_eq!(s.residue, vec!["x", "y"]);
    }

    #[test]
    fn entry_type_overrides_incoming_edge() {
        // b points at the entry agent; the entry agent still schedules first
        // alongside whatever else is free.
        let snap = snapshot(
            vec![agent("entry", "input"), agent("b", "processing")],
            vec![edge("b", "entry")],
        );
        let s = schedule(&snap);
        // Both are eligible in round one: b has no incoming edge, entry is
        // entry-typed despite being a target. Insertion order applies.
        assert_eq!(s.order, vec!["entry", "b"]);
        assert!(s.residue.is_empty());
    }

    #[test]
    fn entry_type_match_is_case_insensitive() {
        let snap = snapshot(
            vec![agent("fed", "Input"), agent("feeder", "processing")],
            vec![edge("feeder", "fed")],
        );
        let s = schedule(&snap);
        assert!(s.residue.is_empty());
        assert_eq!(s.order, vec!["fed", "feeder"]);
    }

    #[test]
    fn cycle_through_entry_node_still_schedules() {
        // a(input) -> b -> a is a cycle, but the entry override unblocks a.
        let snap = snapshot(
            vec![agent("a", "input"), agent("b", "processing")],
            vec![edge("a", "b"), edge("b", "a")],
        );
        let s = schedule(&snap);
        assert_eq!(s.order, vec!["a", "b"]);
        assert!(s.residue.is_empty());
    }

    #[test]
    fn disconnected_component_without_entry_is_residue() {
        let snap = snapshot(
            vec![agent("lone", "processing"), agent("p", "processing"), agent("q", "processing")],
            vec![edge("p", "q"), edge("q", "p")],
        );
        let s = schedule(&snap);
        assert_eq!(s.order, vec!["lone"]);
        assert_eq!(s.residue, vec!["p", "q"]);
    }
}
