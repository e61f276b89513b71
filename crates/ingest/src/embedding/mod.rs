pub mod cache;
pub mod openai;
pub mod service;
pub mod traits;

pub use cache::EmbeddingCache;
pub use openai::OpenAiEmbedder;
pub use service::EmbeddingService;
pub use traits::{Embedder, EmbeddingError};
