// File-backed guild store
// One pretty-printed JSON document per guild: <dir>/<discord_id>.json

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::{new_document_id, GuildFilter, GuildStore, StoreError};
use crate::models::guild::{GuildConfig, NewGuild};

pub struct JsonFileGuildStore {
    dir: PathBuf,
    /// Serializes writes so create's existence check and the write happen together
    write_lock: Mutex<()>,
}

impl JsonFileGuildStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, external_id: u64) -> PathBuf {
        self.dir.join(format!("{}.json", external_id))
    }

    async fn read(&self, path: &Path) -> Result<Option<GuildConfig>, StoreError> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!("Failed to read guild file {}: {:?}", path.display(), e);
                Err(e.into())
            }
        }
    }

    /// Write to a temp file then rename, so readers never see half a document
    async fn write(&self, guild: &GuildConfig) -> Result<(), StoreError> {
        let path = self.path_for(guild.external_id());
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(guild)?;

        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;

        debug!("Wrote guild file {}", path.display());
        Ok(())
    }

    async fn scan(&self, filter: &GuildFilter) -> Result<Option<GuildConfig>, StoreError> {
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(guild) = self.read(&path).await? {
                if filter.matches(&guild) {
                    return Ok(Some(guild));
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl GuildStore for JsonFileGuildStore {
    async fn create(&self, guild: NewGuild) -> Result<GuildConfig, StoreError> {
        let _guard = self.write_lock.lock().await;

        let path = self.path_for(guild.external_id);
        if fs::try_exists(&path).await? {
            return Err(StoreError::AlreadyExists(format!("guild {}", guild.external_id)));
        }

        let mut config = guild.into_config().with_document_id(new_document_id());
        config.touch();
        self.write(&config).await?;

        Ok(config)
    }

    async fn save(&self, guild: &GuildConfig) -> Result<GuildConfig, StoreError> {
        let _guard = self.write_lock.lock().await;

        let existing = self.read(&self.path_for(guild.external_id())).await?;
        match (&existing, guild.document_id()) {
            (Some(stored), Some(id)) if stored.document_id() == Some(id) => {}
            _ => {
                return Err(StoreError::NotFound(format!(
                    "guild {} was never created",
                    guild.external_id()
                )));
            }
        }

        let mut saved = guild.clone();
        saved.touch();
        self.write(&saved).await?;

        Ok(saved)
    }

    async fn find_one(&self, filter: &GuildFilter) -> Result<Option<GuildConfig>, StoreError> {
        match filter.external_id {
            Some(external_id) => Ok(self
                .read(&self.path_for(external_id))
                .await?
                .filter(|g| filter.matches(g))),
            None => self.scan(filter).await,
        }
    }
}
