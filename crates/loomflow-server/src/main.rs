//! Loomflow server binary: build agent graphs over HTTP and run them.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;

use loomflow_engine::FlowRunner;
use loomflow_llm::GenerativeLanguageClient;
use loomflow_server::{serve, AppState};
use loomflow_store::FlowStore;

#[derive(Parser)]
#[command(name = "loomflow", version, about = "Agent flow builder backend")]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 5001)]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // The generative credential is optional: without it the store and the
    // best-effort engine still work, and model-typed runs are refused with a
    // clear error instead of failing mid-pipeline.
    let (runner, generative_ready) = match GenerativeLanguageClient::from_env() {
        Ok(client) => (FlowRunner::with_generator(Arc::new(client)), true),
        Err(err) => {
            warn!(%err, "starting without a text-generation backend");
            (FlowRunner::with_default_registry(), false)
        }
    };

    let state = Arc::new(AppState {
        store: FlowStore::new(),
        runner,
        generative_ready,
    });

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    serve(addr, state).await
}
