pub mod chunker;
pub mod embedding;

pub use chunker::Chunker;
pub use embedding::{Embedder, EmbeddingError, EmbeddingService};
