// In-process guild store
// Keeps documents in concurrent maps; nothing survives a restart

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::{new_document_id, GuildFilter, GuildStore, StoreError};
use crate::models::guild::{GuildConfig, NewGuild};

/// Guild store backed by `DashMap`
#[derive(Debug, Default)]
pub struct MemoryGuildStore {
    documents: DashMap<String, GuildConfig>,
    /// external ID -> document ID
    by_external_id: DashMap<u64, String>,
}

impl MemoryGuildStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl GuildStore for MemoryGuildStore {
    async fn create(&self, guild: NewGuild) -> Result<GuildConfig, StoreError> {
        let external_id = guild.external_id;
        let document_id = new_document_id();

        match self.by_external_id.entry(external_id) {
            Entry::Occupied(_) => {
                return Err(StoreError::AlreadyExists(format!("guild {}", external_id)));
            }
            Entry::Vacant(slot) => {
                slot.insert(document_id.clone());
            }
        }

        let mut config = guild.into_config().with_document_id(document_id.clone());
        config.touch();
        self.documents.insert(document_id.clone(), config.clone());

        debug!("Created guild {} as {}", external_id, document_id);
        Ok(config)
    }

    async fn save(&self, guild: &GuildConfig) -> Result<GuildConfig, StoreError> {
        let document_id = guild
            .document_id()
            .ok_or_else(|| StoreError::NotFound(format!("guild {} was never created", guild.external_id())))?;

        let mut stored = self
            .documents
            .get_mut(document_id)
            .ok_or_else(|| StoreError::NotFound(format!("document {}", document_id)))?;

        // discord_id is immutable; a mismatch means the document belongs to another guild
        if stored.external_id() != guild.external_id() {
            return Err(StoreError::NotFound(format!(
                "document {} is not guild {}",
                document_id,
                guild.external_id()
            )));
        }

        let mut saved = guild.clone();
        saved.touch();
        *stored = saved.clone();

        debug!("Saved guild {}", guild.external_id());
        Ok(saved)
    }

    async fn find_one(&self, filter: &GuildFilter) -> Result<Option<GuildConfig>, StoreError> {
        let document_id = match (&filter.document_id, filter.external_id) {
            (Some(id), _) => Some(id.clone()),
            (None, Some(external_id)) => self
                .by_external_id
                .get(&external_id)
                .map(|id| id.value().clone()),
            (None, None) => {
                return Ok(self.documents.iter().next().map(|g| g.value().clone()));
            }
        };

        Ok(document_id
            .and_then(|id| self.documents.get(&id).map(|g| g.value().clone()))
            .filter(|g| filter.matches(g)))
    }
}
