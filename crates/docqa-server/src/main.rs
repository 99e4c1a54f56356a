//! docqa — question answering over a vector store with streamed answers.

use std::sync::Arc;

use docqa_core::{ProcessEnv, ServerConfig};
use docqa_server::{routes, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("docqa — question answering over a vector store");
    println!();
    println!("Usage: docqa [command]");
    println!();
    println!("Commands:");
    println!("  (none)    Start the server");
    println!("  help      Show this help message");
    println!();
    println!("Endpoints:");
    println!("  POST /api/chat         Pinecone + OpenAI, text/event-stream");
    println!("  POST /api/chat/local   Qdrant + Ollama, text/plain");
    println!("  GET  /api/chat/status  Which endpoints are configured");
    println!("  GET  /health");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the filter so RUST_LOG may come from it.
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {}", e),
    }

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'docqa help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let env = Arc::new(ProcessEnv);
    let config = ServerConfig::from_env(env.as_ref())?;
    let addr = config.bind_addr();

    let state = Arc::new(AppState::new(env));
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("docqa server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
