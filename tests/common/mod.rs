//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use coderag::{
    ChatGenerator, Fragment, GeneratorError, HashEmbedder, HybridSearchService,
    IngestionService, KeywordSearchService, MemoryKeywordIndex, MemoryVectorStore, Metadata,
    RagConfig, RagService, StorageError, VectorStore,
};

/// Generator that replays a scripted sequence of completions. An exhausted
/// script answers with a fixed fallback; `fail_all` makes every call error.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    fail_all: bool,
    delay: Duration,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            fail_all: false,
            delay: Duration::from_millis(5),
        }
    }

    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fail_all: true,
            delay: Duration::from_millis(1),
        }
    }
}

#[async_trait]
impl ChatGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _system: Option<&str>,
        _user: &str,
    ) -> Result<String, GeneratorError> {
        tokio::time::sleep(self.delay).await;
        if self.fail_all {
            return Err(GeneratorError::InvalidResponse(
                "scripted failure".to_string(),
            ));
        }
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| "The add method sums both operands [1].".to_string()))
    }

    fn model_label(&self) -> String {
        "scripted-test-model".to_string()
    }
}

/// Vector store whose every search fails, for outage scenarios.
pub struct FailingVectorStore;

#[async_trait]
impl VectorStore for FailingVectorStore {
    async fn add(&self, _fragments: Vec<Fragment>) -> Result<usize, StorageError> {
        Err(StorageError::Backend("store offline".to_string()))
    }

    async fn similarity_search(
        &self,
        _query: &str,
        _top_k: usize,
        _threshold: f32,
    ) -> Result<Vec<Fragment>, StorageError> {
        Err(StorageError::Backend("store offline".to_string()))
    }
}

/// Everything wired over the in-memory reference backends.
pub struct TestStack {
    pub config: Arc<RagConfig>,
    pub vector_store: Arc<MemoryVectorStore>,
    pub keyword_index: Arc<MemoryKeywordIndex>,
    pub hybrid_search: Arc<HybridSearchService>,
    pub rag_service: Arc<RagService>,
    pub ingestion_service: Arc<IngestionService>,
}

pub fn build_stack(generator: Arc<dyn ChatGenerator>) -> TestStack {
    build_stack_with_config(generator, RagConfig::default())
}

pub fn build_stack_with_config(
    generator: Arc<dyn ChatGenerator>,
    config: RagConfig,
) -> TestStack {
    let config = Arc::new(config);
    let vector_store = Arc::new(MemoryVectorStore::new(Arc::new(HashEmbedder::new(
        config.vector.dimensions,
    ))));
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
    let rag_service = Arc::new(RagService::new(
        hybrid_search.clone(),
        generator,
        config.clone(),
    ));
    let ingestion_service = Arc::new(IngestionService::new(
        vector_store.clone(),
        keyword_index.clone(),
        config.clone(),
    ));

    TestStack {
        config,
        vector_store,
        keyword_index,
        hybrid_search,
        rag_service,
        ingestion_service,
    }
}

/// Fragment fixture with identity metadata.
pub fn fragment(source: &str, content: &str, file_type: &str) -> Fragment {
    let mut metadata = Metadata::new();
    metadata.set_source(source);
    metadata.set_filename(source.rsplit('/').next().unwrap_or(source));
    metadata.set_file_type(file_type);
    metadata.set_chunk_position(0, 1);
    metadata.set_chunk_type(match file_type {
        "java" => "java_code",
        "md" => "markdown",
        _ => "generic",
    });
    Fragment::new(content, metadata)
}
