//! Long-term memory adapters

mod qdrant;

pub use qdrant::QdrantMemoryStore;
