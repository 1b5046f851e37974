//! In-memory store for agents and connections.
//!
//! The store is the engine's collaborator: it owns the live records, validates
//! connection endpoints at creation time, cascades connection deletion when an
//! agent is removed, and produces immutable [`FlowSnapshot`]s (copy-on-read)
//! so concurrent mutation never corrupts an in-flight run.
//!
//! Cloning a `FlowStore` yields another handle to the **same** records;
//! [`snapshot`](FlowStore::snapshot) is the only deep copy.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use loomflow_types::{AgentNode, Connection, FlowError, FlowSnapshot, Position, Result};

/// Fields accepted when creating an agent.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAgent {
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub position: Position,
}

/// Partial update for an existing agent. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub agent_type: Option<String>,
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
    pub position: Option<Position>,
}

/// Fields accepted when creating a connection.
#[derive(Debug, Clone, Deserialize)]
pub struct NewConnection {
    pub source_agent_id: String,
    pub target_agent_id: String,
    pub source_port: String,
    pub target_port: String,
}

#[derive(Debug, Default)]
struct StoreInner {
    agents: Vec<AgentNode>,
    connections: Vec<Connection>,
}

/// Shared handle to the in-memory flow records.
#[derive(Clone, Default)]
pub struct FlowStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl FlowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_agent(&self, new: NewAgent) -> AgentNode {
        let agent = AgentNode {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            agent_type: new.agent_type,
            config: new.config,
            position: new.position,
        };
        let mut inner = self.inner.write().await;
        inner.agents.push(agent.clone());
        tracing::debug!(agent = %agent.id, r#type = %agent.agent_type, "agent created");
        agent
    }

    /// All agents in insertion order.
    pub async fn list_agents(&self) -> Vec<AgentNode> {
        self.inner.read().await.agents.clone()
    }

    pub async fn update_agent(&self, id: &str, patch: AgentPatch) -> Result<AgentNode> {
        let mut inner = self.inner.write().await;
        let agent = inner
            .agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| FlowError::NotFound {
                kind: "agent",
                id: id.to_string(),
            })?;
        if let Some(name) = patch.name {
            agent.name = name;
        }
        if let Some(agent_type) = patch.agent_type {
            agent.agent_type = agent_type;
        }
        if let Some(config) = patch.config {
            agent.config = config;
        }
        if let Some(position) = patch.position {
            agent.position = position;
        }
        Ok(agent.clone())
    }

    /// Delete an agent and every connection whose source or target is that
    /// agent, so a later snapshot never observes a dangling edge.
    pub async fn delete_agent(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.agents.len();
        inner.agents.retain(|a| a.id != id);
        if inner.agents.len() == before {
            return Err(FlowError::NotFound {
                kind: "agent",
                id: id.to_string(),
            });
        }
        let edges_before = inner.connections.len();
        inner
            .connections
            .retain(|c| c.source_agent_id != id && c.target_agent_id != id);
        tracing::debug!(
            agent = %id,
            cascaded = edges_before - inner.connections.len(),
            "agent deleted"
        );
        Ok(())
    }

    /// Create a connection. Both endpoints must already exist.
    pub async fn create_connection(&self, new: NewConnection) -> Result<Connection> {
        let mut inner = self.inner.write().await;
        for endpoint in [&new.source_agent_id, &new.target_agent_id] {
            if !inner.agents.iter().any(|a| &a.id == endpoint) {
                return Err(FlowError::NotFound {
                    kind: "agent",
                    id: endpoint.clone(),
                });
            }
        }
        let connection = Connection {
            id: Uuid::new_v4().to_string(),
            source_agent_id: new.source_agent_id,
            target_agent_id: new.target_agent_id,
            source_port: new.source_port,
            target_port: new.target_port,
        };
        inner.connections.push(connection.clone());
        Ok(connection)
    }

    /// All connections in insertion order.
    pub async fn list_connections(&self) -> Vec<Connection> {
        self.inner.read().await.connections.clone()
    }

    pub async fn delete_connection(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.connections.len();
        inner.connections.retain(|c| c.id != id);
        if inner.connections.len() == before {
            return Err(FlowError::NotFound {
                kind: "connection",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Deep copy of the current records. The snapshot is fully independent of
    /// the live store; mutations after this call are invisible to it.
    pub async fn snapshot(&self) -> FlowSnapshot {
        let inner = self.inner.read().await;
        FlowSnapshot {
            agents: inner.agents.clone(),
            connections: inner.connections.clone(),
        }
    }
}
