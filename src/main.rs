// src/main.rs

use std::{net::SocketAddr, sync::Arc};

use studydeck::{
    config::Config,
    extract::PlainTextExtractor,
    generation::{ChatCompletionsClient, Generator},
    routes,
    state::AppState,
    store::{MemoryStore, PgStore, Store},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(
            PgStore::connect(url)
                .await
                .expect("Failed to initialize the database"),
        ),
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if config.generation.api_key.is_empty() {
        tracing::warn!("GENERATION_API_KEY is empty; generation calls will be rejected upstream");
    }
    let client = ChatCompletionsClient::new(&config.generation);
    let generator = Generator::new(Arc::new(client), config.generation.max_source_chars);

    let state = AppState {
        config: config.clone(),
        store,
        generator,
        extractor: Arc::new(PlainTextExtractor),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind the listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}
