//! Image Search Domain Library
//!
//! Semantic image search: uploaded images are embedded with a vision-language
//! model, stored in a blob store plus a record table, and searched by text through
//! an in-memory similarity index that is rebuilt from both stores on every request.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   ImageService   │  ← upload / search / list / delete
//! └───┬─────────┬────┘
//!     │         │
//!     │   ┌─────▼──────────┐     ┌──────────────────┐
//!     │   │   Reconciler   │────▶│ SharedSearchState│  ← ArcSwap<SearchState>
//!     │   └──┬──────────┬──┘     │  SimilarityIndex │
//!     │      │          │        │  + entries       │
//! ┌───▼──────▼──┐  ┌────▼──────┐ └──────────────────┘
//! │  BlobStore  │  │RecordStore│   ┌───────────────────┐
//! │   (trait)   │  │  (trait)  │   │ EmbeddingProvider │
//! └──────┬──────┘  └─────┬─────┘   │      (trait)      │
//!        │               │         └─────────┬─────────┘
//! ┌──────▼───────────────▼─────┐   ┌─────────▼─────────┐
//! │ Supabase Storage/PostgREST │   │  ClipHttpProvider │
//! │ or in-memory adapters      │   └───────────────────┘
//! └────────────────────────────┘
//! ```
//!
//! A record is *active* only while a blob with its filename exists; the
//! reconciler drops every other row, so orphans left by partial failures are
//! never served.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_images::{
//!     ClipHttpProvider, ImageService, ImageServiceConfig, SupabaseBlobStore,
//!     SupabaseConfig, SupabaseRecordStore,
//! };
//! use core_config::FromEnv;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let supabase = SupabaseConfig::from_env()?;
//! let blobs = SupabaseBlobStore::new(supabase.clone())?;
//! let records = SupabaseRecordStore::new(supabase)?;
//! let embedder = Arc::new(ClipHttpProvider::from_env()?);
//!
//! let service = ImageService::new(blobs, records, embedder, ImageServiceConfig::default())?;
//! service.refresh().await?;
//!
//! for hit in service.search("a cat on a sofa", 5).await? {
//!     println!("{:.3} {}", hit.score, hit.entry.filename);
//! }
//! # Ok(())
//! # }
//! ```

pub mod deadline;
pub mod embedding;
pub mod error;
pub mod handlers;
pub mod index;
pub mod locks;
pub mod models;
pub mod reconciler;
pub mod service;
pub mod state;
pub mod storage;

// Re-export commonly used types
pub use embedding::{ClipConfig, ClipHttpProvider, EmbeddingProvider};
pub use error::{ImageError, ImageResult};
pub use handlers::{ImagesApiDoc, router, router_with_shared};
pub use index::SimilarityIndex;
pub use models::{
    ImageId, ImageRecord, NewImageRecord, RecordFilter, SearchEntry, SearchHit, UploadOutcome,
};
pub use service::{ImageService, ImageServiceConfig};
pub use state::{SearchState, SharedSearchState};
pub use storage::supabase::{SupabaseBlobStore, SupabaseConfig, SupabaseRecordStore};
pub use storage::{BlobStore, InMemoryBlobStore, InMemoryRecordStore, RecordStore};
