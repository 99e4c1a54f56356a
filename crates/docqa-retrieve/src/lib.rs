//! docqa retrieve: query embedding and nearest-neighbour document lookup.
//!
//! Both halves of retrieval are delegated to external services. `Embedder`
//! turns a query into a vector, `VectorStore` returns the closest stored
//! documents, and `Retriever` chains the two.

pub mod embedder;
pub mod http;
pub mod pinecone;
pub mod qdrant;
pub mod retriever;
pub mod store;
pub mod types;

pub use embedder::{Embedder, OllamaEmbeddings, OpenAiEmbeddings};
pub use pinecone::PineconeStore;
pub use qdrant::QdrantStore;
pub use retriever::Retriever;
pub use store::VectorStore;
pub use types::RetrievedDocument;
