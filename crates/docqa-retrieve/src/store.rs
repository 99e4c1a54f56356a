//! Vector store trait.

use async_trait::async_trait;
use docqa_core::Result;

use crate::types::RetrievedDocument;

/// Nearest-neighbour search over an external vector database.
///
/// Implementations:
/// - `PineconeStore`: managed Pinecone index
/// - `QdrantStore`: self-hosted Qdrant collection
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `k` documents closest to `vector`, best first.
    async fn similarity_search(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedDocument>>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
