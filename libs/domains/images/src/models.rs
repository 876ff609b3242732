use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Opaque record identifier.
///
/// The record store decides the representation (PostgREST tables usually hand out
/// integers, other backends strings); it is echoed back to clients unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ImageId {
    Int(i64),
    Text(String),
}

impl ImageId {
    /// Blank text ids are treated as "not supplied".
    pub fn is_blank(&self) -> bool {
        matches!(self, ImageId::Text(s) if s.trim().is_empty())
    }

    /// Same row id in either form: `Text("7")` refers to `Int(7)`, like a PostgREST `eq.` filter.
    pub fn refers_to(&self, other: &ImageId) -> bool {
        match (self, other) {
            (ImageId::Int(a), ImageId::Int(b)) => a == b,
            (ImageId::Text(a), ImageId::Text(b)) => a == b,
            (ImageId::Int(n), ImageId::Text(s)) | (ImageId::Text(s), ImageId::Int(n)) => {
                s.trim().parse::<i64>() == Ok(*n)
            }
        }
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageId::Int(id) => write!(f, "{}", id),
            ImageId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ImageId {
    fn from(id: i64) -> Self {
        ImageId::Int(id)
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        ImageId::Text(id.to_string())
    }
}

/// Embedding as stored in the record table.
///
/// A pgvector column is returned as text (`"[0.1,0.2]"`), a json/float[] column as an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredEmbedding {
    Values(Vec<f32>),
    Text(String),
}

impl StoredEmbedding {
    pub fn to_vector(&self) -> Result<Vec<f32>, String> {
        match self {
            StoredEmbedding::Values(values) => Ok(values.clone()),
            StoredEmbedding::Text(text) => {
                let inner = text
                    .trim()
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .ok_or_else(|| {
                        format!("embedding text is not a bracketed list: {:.32}", text)
                    })?;

                if inner.trim().is_empty() {
                    return Ok(Vec::new());
                }

                inner
                    .split(',')
                    .map(|part| {
                        let part = part.trim();
                        part.parse::<f32>()
                            .map_err(|e| format!("invalid embedding component '{}': {}", part, e))
                    })
                    .collect()
            }
        }
    }
}

impl From<Vec<f32>> for StoredEmbedding {
    fn from(values: Vec<f32>) -> Self {
        StoredEmbedding::Values(values)
    }
}

/// Durable metadata row: one uploaded image and its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub embedding: Option<StoredEmbedding>,
}

/// Row to insert; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewImageRecord {
    pub filename: String,
    pub url: String,
    pub embedding: Vec<f32>,
}

/// Row selector for the record store. Empty filter selects every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub id: Option<ImageId>,
    pub filename: Option<String>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: ImageId) -> Self {
        Self {
            id: Some(id),
            filename: None,
        }
    }

    pub fn by_filename(filename: impl Into<String>) -> Self {
        Self {
            id: None,
            filename: Some(filename.into()),
        }
    }

    pub fn matches(&self, record: &ImageRecord) -> bool {
        self.id.as_ref().is_none_or(|id| id.refers_to(&record.id))
            && self
                .filename
                .as_deref()
                .is_none_or(|name| name == record.filename)
    }
}

/// In-memory view of an active record, row-aligned with the similarity index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchEntry {
    pub id: ImageId,
    pub filename: String,
    pub url: String,
}

impl From<&ImageRecord> for SearchEntry {
    fn from(record: &ImageRecord) -> Self {
        Self {
            id: record.id.clone(),
            filename: record.filename.clone(),
            url: record.url.clone(),
        }
    }
}

/// A search result with its cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub entry: SearchEntry,
    pub score: f32,
}

/// Result of an upload. A duplicate filename is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Created { id: ImageId },
    AlreadyExists { id: ImageId },
}

impl UploadOutcome {
    pub fn id(&self) -> &ImageId {
        match self {
            UploadOutcome::Created { id } | UploadOutcome::AlreadyExists { id } => id,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            UploadOutcome::Created { .. } => "Upload successful",
            UploadOutcome::AlreadyExists { .. } => "File already exists",
        }
    }
}
