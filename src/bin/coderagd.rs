//! coderagd - repository question-answering service.
//!
//! Wires the retrieval core to the in-memory reference backends and an
//! Ollama-compatible generator, then serves the HTTP API until interrupted.

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Arg, Command};
use tokio::signal;
use tracing::{error, info};

use coderag::api::{self, AppState};
use coderag::{
    initialize_logging, HashEmbedder, HybridSearchService, IngestionService,
    KeywordSearchService, LoggingConfig, MemoryKeywordIndex, MemoryVectorStore, OllamaGenerator,
    RagConfig, RagEvaluator, RagService,
};

struct DaemonArgs {
    addr: SocketAddr,
    alpha: Option<f32>,
    ollama_url: Option<String>,
    model: Option<String>,
    log_level: String,
    json_logs: bool,
}

fn parse_args() -> DaemonArgs {
    let matches = Command::new("coderagd")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Repository question-answering service: ingestion, hybrid retrieval, generation")
        .arg(
            Arg::new("addr")
                .short('a')
                .long("addr")
                .value_name("ADDR")
                .help("Listen address")
                .default_value("127.0.0.1:8080"),
        )
        .arg(
            Arg::new("alpha")
                .long("alpha")
                .value_name("WEIGHT")
                .help("Semantic weight for hybrid fusion, in [0, 1]"),
        )
        .arg(
            Arg::new("ollama-url")
                .long("ollama-url")
                .value_name("URL")
                .help("Base URL of the Ollama-compatible generator"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("NAME")
                .help("Generator model name"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .default_value("info"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(clap::ArgAction::SetTrue)
                .help("Emit JSON-structured log lines"),
        )
        .get_matches();

    let addr = match matches
        .get_one::<String>("addr")
        .expect("addr has a default")
        .parse()
    {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Invalid listen address: {}", e);
            process::exit(2);
        }
    };

    let alpha = matches
        .get_one::<String>("alpha")
        .and_then(|raw| raw.parse().ok());

    DaemonArgs {
        addr,
        alpha,
        ollama_url: matches.get_one::<String>("ollama-url").cloned(),
        model: matches.get_one::<String>("model").cloned(),
        log_level: matches
            .get_one::<String>("log-level")
            .expect("log-level has a default")
            .clone(),
        json_logs: matches.get_flag("json-logs"),
    }
}

#[tokio::main]
async fn main() {
    let args = parse_args();

    let level = args
        .log_level
        .parse()
        .unwrap_or(tracing::Level::INFO);
    if let Err(e) = initialize_logging(LoggingConfig {
        level,
        json_format: args.json_logs,
    }) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let mut config = RagConfig::default();
    if let Some(alpha) = args.alpha {
        config.hybrid.alpha = alpha;
    }
    if let Some(url) = args.ollama_url {
        config.generator.base_url = url;
    }
    if let Some(model) = args.model {
        config.generator.model = model;
    }
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        process::exit(2);
    }
    let config = Arc::new(config);

    // Reference backends: in-memory store over the hashing embedder plus
    // the in-memory BM25 index. A production deployment swaps these for
    // clients of the external vector database and full-text index.
    let embedder = Arc::new(HashEmbedder::new(config.vector.dimensions));
    let vector_store = Arc::new(MemoryVectorStore::new(embedder));
    let keyword_index = Arc::new(MemoryKeywordIndex::new());

    let keyword_search = KeywordSearchService::new(
        keyword_index.clone(),
        Duration::from_millis(config.backend_timeout_ms),
    );
    let hybrid_search = Arc::new(HybridSearchService::new(
        vector_store.clone(),
        keyword_search,
        config.clone(),
    ));

    let generator = Arc::new(OllamaGenerator::new(&config.generator));
    let rag_service = Arc::new(RagService::new(
        hybrid_search,
        generator.clone(),
        config.clone(),
    ));
    let ingestion_service = Arc::new(IngestionService::new(
        vector_store,
        keyword_index,
        config.clone(),
    ));
    let evaluator = Arc::new(RagEvaluator::new(rag_service.clone(), generator));

    let state = AppState {
        rag_service,
        ingestion_service,
        evaluator,
    };

    let listener = match tokio::net::TcpListener::bind(args.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %args.addr, error = %e, "Failed to bind listen address");
            process::exit(1);
        }
    };

    info!(addr = %args.addr, "coderagd listening");
    let server = axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal());
    if let Err(e) = server.await {
        error!(error = %e, "Server error");
        process::exit(1);
    }
    info!("coderagd stopped");
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
