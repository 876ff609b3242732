use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::error::{ImageError, ImageResult};
use crate::index::SimilarityIndex;
use crate::models::{SearchEntry, SearchHit};
use crate::reconciler::Snapshot;

/// An index and its row-aligned entries; `entries[i]` describes index row `i`.
#[derive(Debug, Clone)]
pub struct SearchState {
    index: SimilarityIndex,
    entries: Vec<SearchEntry>,
}

impl SearchState {
    pub fn empty(dimension: usize) -> Self {
        Self {
            index: SimilarityIndex::empty(dimension),
            entries: Vec::new(),
        }
    }

    pub fn from_snapshot(dimension: usize, snapshot: Snapshot) -> ImageResult<Self> {
        if snapshot.vectors.len() != snapshot.entries.len() {
            return Err(ImageError::Internal(format!(
                "snapshot has {} vectors for {} entries",
                snapshot.vectors.len(),
                snapshot.entries.len()
            )));
        }

        Ok(Self {
            index: SimilarityIndex::build(dimension, snapshot.vectors)?,
            entries: snapshot.entries,
        })
    }

    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top `top_k` entries by cosine similarity to `query`, best first.
    pub fn search(&self, query: &[f32], top_k: usize) -> ImageResult<Vec<SearchHit>> {
        let hits = self.index.query(query, top_k)?;
        Ok(hits
            .into_iter()
            .filter_map(|(score, row)| {
                self.entries.get(row).map(|entry| SearchHit {
                    entry: entry.clone(),
                    score,
                })
            })
            .collect())
    }
}

/// Process-wide current [`SearchState`].
///
/// Rebuilds happen off to the side and are published with a single pointer swap,
/// so readers see either the previous state or the new one in full.
pub struct SharedSearchState {
    current: ArcSwap<SearchState>,
}

impl SharedSearchState {
    pub fn new(dimension: usize) -> Self {
        Self {
            current: ArcSwap::from_pointee(SearchState::empty(dimension)),
        }
    }

    pub fn load(&self) -> Arc<SearchState> {
        self.current.load_full()
    }

    pub fn publish(&self, state: SearchState) -> Arc<SearchState> {
        let state = Arc::new(state);
        self.current.store(Arc::clone(&state));
        state
    }
}
