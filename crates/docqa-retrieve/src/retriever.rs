//! Query → embedding → nearest documents.

use docqa_core::Result;
use tracing::debug;

use crate::embedder::Embedder;
use crate::store::VectorStore;
use crate::types::RetrievedDocument;

pub struct Retriever {
    embedder: Box<dyn Embedder>,
    store: Box<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Box<dyn Embedder>, store: Box<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        let vector = self.embedder.embed_query(query).await?;
        debug!(
            "Searching {} with a {}-dim {} embedding (k={})",
            self.store.name(),
            vector.len(),
            self.embedder.name(),
            k
        );
        self.store.similarity_search(&vector, k).await
    }
}
