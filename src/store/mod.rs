// Persistence port for guild documents
// The service layer only talks to GuildStore; adapters decide how documents are kept

pub mod cached;
pub mod json_file;
pub mod memory;

use async_trait::async_trait;
use rand::distr::Alphanumeric;
use rand::Rng;
use thiserror::Error;

use crate::models::guild::{GuildConfig, NewGuild};

pub use cached::CachedGuildStore;
pub use json_file::JsonFileGuildStore;
pub use memory::MemoryGuildStore;

/// Length of generated document IDs (Firestore auto-ID length)
const DOCUMENT_ID_LEN: usize = 20;

/// Storage failures, independent of the backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Saving a guild the store has never seen.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A guild with the same external ID is already stored.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Backend failure (I/O, connectivity).
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}

/// Equality filter for [`GuildStore::find_one`]. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildFilter {
    pub external_id: Option<u64>,
    pub document_id: Option<String>,
}

impl GuildFilter {
    pub fn external_id(external_id: u64) -> Self {
        Self {
            external_id: Some(external_id),
            ..Default::default()
        }
    }

    pub fn document_id(document_id: impl Into<String>) -> Self {
        Self {
            document_id: Some(document_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, guild: &GuildConfig) -> bool {
        self.external_id.map_or(true, |id| guild.external_id() == id)
            && self
                .document_id
                .as_deref()
                .map_or(true, |id| guild.document_id() == Some(id))
    }
}

/// Durable storage for guild documents.
///
/// # Design Rules
///
/// - `create` fills defaults, assigns the document ID and rejects a second
///   guild with the same external ID
/// - `save` writes the whole document and returns what was stored
/// - No retries; failures go straight back to the caller
#[async_trait]
pub trait GuildStore: Send + Sync {
    /// Store a new guild and return it with its document ID.
    async fn create(&self, guild: NewGuild) -> Result<GuildConfig, StoreError>;

    /// Persist the current state of an existing guild.
    async fn save(&self, guild: &GuildConfig) -> Result<GuildConfig, StoreError>;

    /// First guild matching `filter`, if any.
    async fn find_one(&self, filter: &GuildFilter) -> Result<Option<GuildConfig>, StoreError>;
}

/// Random alphanumeric ID in the style of Firestore auto-IDs
pub fn new_document_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(DOCUMENT_ID_LEN)
        .map(char::from)
        .collect()
}
