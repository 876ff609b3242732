//! Durable collaborators: the blob store holding image bytes and the record store
//! holding `(id, filename, url, embedding)` rows.

mod blob;
mod memory;
mod records;
pub mod supabase;

pub use blob::BlobStore;
pub use memory::{InMemoryBlobStore, InMemoryRecordStore};
pub use records::RecordStore;

#[cfg(test)]
pub use blob::MockBlobStore;
#[cfg(test)]
pub use records::MockRecordStore;
