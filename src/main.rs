//! Tutor bot — API entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config (optional path from argv)
//!   3. Init logger at the configured level
//!   4. Build provider, gateway, constants table, store, router
//!   5. Serve the API until ctrl-c

use std::env;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use tutor_bot::config;
use tutor_bot::error::AppError;
use tutor_bot::llm::gateway::Gateway;
use tutor_bot::llm::providers;
use tutor_bot::logger;
use tutor_bot::router::TutorRouter;
use tutor_bot::server;
use tutor_bot::store::ConversationStore;
use tutor_bot::tools::PhysicsConstants;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config_path = env::args().nth(1);
    let config = config::load(config_path.as_deref())?;
    logger::init(&config.log_level)?;

    info!(
        bind = %config.server.bind,
        provider = %config.llm.provider,
        work_dir = %config.work_dir.display(),
        "config loaded"
    );

    // API key only ever comes from the environment, never TOML.
    let api_key = env::var("LLM_API_KEY").ok();
    let provider = providers::build(&config.llm, api_key)
        .map_err(|e| AppError::Config(e.to_string()))?;
    let gateway = Gateway::new(provider);

    let constants = Arc::new(PhysicsConstants::load(&config.constants_path));

    let store = if config.store.persist {
        ConversationStore::open(config.work_dir.clone())?
    } else {
        ConversationStore::in_memory()
    };

    let router = Arc::new(TutorRouter::new(
        gateway,
        store,
        config.prompts_dir.clone(),
        constants,
    ));

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received, shutting down");
                shutdown.cancel();
            }
        });
    }

    server::run(&config.server.bind, router, shutdown).await
}
