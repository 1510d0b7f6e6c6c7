// Read-through / write-through cache in front of another guild store
// Guild configs are read on nearly every message, so lookups by discord_id are kept in memory

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{GuildFilter, GuildStore, StoreError};
use crate::models::guild::{GuildConfig, NewGuild};

pub struct CachedGuildStore<S> {
    inner: S,
    /// discord_id -> last persisted state
    cache: DashMap<u64, GuildConfig>,
}

impl<S: GuildStore> CachedGuildStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop a cached guild so the next lookup goes to the backing store
    pub fn invalidate(&self, external_id: u64) {
        self.cache.remove(&external_id);
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl<S: GuildStore> GuildStore for CachedGuildStore<S> {
    async fn create(&self, guild: NewGuild) -> Result<GuildConfig, StoreError> {
        let created = self.inner.create(guild).await?;
        self.cache.insert(created.external_id(), created.clone());
        Ok(created)
    }

    async fn save(&self, guild: &GuildConfig) -> Result<GuildConfig, StoreError> {
        // cache only moves once the backing store has the write
        let saved = self.inner.save(guild).await?;
        self.cache.insert(saved.external_id(), saved.clone());
        Ok(saved)
    }

    async fn find_one(&self, filter: &GuildFilter) -> Result<Option<GuildConfig>, StoreError> {
        if let Some(external_id) = filter.external_id {
            if let Some(cached) = self.cache.get(&external_id) {
                if filter.matches(cached.value()) {
                    debug!("Guild cache hit for {}", external_id);
                    return Ok(Some(cached.value().clone()));
                }
            }
        }

        let found = self.inner.find_one(filter).await?;
        if let Some(guild) = &found {
            self.cache.insert(guild.external_id(), guild.clone());
        }
        Ok(found)
    }
}
