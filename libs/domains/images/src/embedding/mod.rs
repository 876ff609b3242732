mod clip;
mod provider;

pub use clip::{ClipConfig, ClipHttpProvider};
pub use provider::EmbeddingProvider;

#[cfg(test)]
pub use provider::MockEmbeddingProvider;
