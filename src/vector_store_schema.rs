//! Persisted-state contract for the backing store.
//!
//! The production deployment keeps fragments in one table serving both
//! retrieval sides: a pgvector HNSW index over `embedding` for the
//! semantic side and a GIN-indexed `tsvector` column for the lexical side,
//! populated by an insert/update trigger with the English analyzer. The
//! core never executes this DDL itself; it is the documented contract the
//! external store must satisfy.

/// Default HNSW graph connectivity.
pub const HNSW_M: u32 = 16;
/// Default HNSW construction beam width.
pub const HNSW_EF_CONSTRUCTION: u32 = 200;

/// Fragment table. `dimensions` must match the embedding model.
pub fn create_vector_store_table_sql(dimensions: usize) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS vector_store (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    content TEXT NOT NULL,
    metadata JSON,
    embedding VECTOR({dimensions}),
    content_tsv TSVECTOR
);"#
    )
}

/// HNSW index over the embedding column, cosine distance.
pub fn create_hnsw_index_sql() -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS vector_store_embedding_idx \
         ON vector_store USING hnsw (embedding vector_cosine_ops) \
         WITH (m = {HNSW_M}, ef_construction = {HNSW_EF_CONSTRUCTION});"
    )
}

/// Inverted index over the tokenized content column.
pub const CREATE_CONTENT_TSV_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS vector_store_content_tsv_idx \
     ON vector_store USING gin (content_tsv);";

/// Trigger keeping `content_tsv` in sync with `content` on insert/update,
/// tokenized with the English analyzer.
pub const CREATE_CONTENT_TSV_TRIGGER_SQL: &str = r#"CREATE OR REPLACE FUNCTION vector_store_tsv_update() RETURNS trigger AS $$
BEGIN
    NEW.content_tsv := to_tsvector('english', NEW.content);
    RETURN NEW;
END
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS vector_store_tsv_trigger ON vector_store;
CREATE TRIGGER vector_store_tsv_trigger
    BEFORE INSERT OR UPDATE ON vector_store
    FOR EACH ROW EXECUTE FUNCTION vector_store_tsv_update();"#;

/// BM25-like ranked lexical query against the tokenized column. Bound
/// parameters: query text (twice), limit.
pub const KEYWORD_SEARCH_SQL: &str = r#"SELECT
    id,
    content,
    metadata,
    ts_rank_cd(content_tsv, plainto_tsquery('english', $1)) AS score
FROM vector_store
WHERE content_tsv @@ plainto_tsquery('english', $2)
ORDER BY score DESC
LIMIT $3"#;
