use loomflow_engine::FlowRunner;
use loomflow_store::FlowStore;

/// Shared state handed to every route handler.
pub struct AppState {
    pub store: FlowStore,
    pub runner: FlowRunner,
    /// Whether a generative credential was found at startup. When false,
    /// runs over model-typed agents are refused up front instead of
    /// half-executing a pipeline that cannot reach its backend.
    pub generative_ready: bool,
}
