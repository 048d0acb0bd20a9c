//! QA client - terminal front end for a remote question-answering service
//!
//! Conversation state lives in an event-driven runtime; this binary wires
//! it to the HTTP transport and a line-oriented console.

mod config;
mod console;
mod format;
mod runtime;
mod sessions;
mod state_machine;
mod status;
mod transport;

use config::ClientConfig;
use runtime::ChatRuntime;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{HttpTransport, LoggingTransport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the console
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qa_client=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(
        base_url = %config.base_url,
        timeout_secs = config.request_timeout.as_secs(),
        "Starting QA client"
    );

    let transport = HttpTransport::new(config.base_url.clone(), config.request_timeout)?;
    let service = Arc::new(LoggingTransport::new(transport));
    let (runtime, handle) = ChatRuntime::new(service, &config);

    let shutdown = CancellationToken::new();
    let runtime_task = tokio::spawn(runtime.run(shutdown.clone()));
    let render_task = tokio::spawn(console::render_loop(handle.subscribe()));

    let result = console::read_commands(&handle).await;

    shutdown.cancel();
    runtime_task.await?;
    render_task.abort();
    result?;

    Ok(())
}
