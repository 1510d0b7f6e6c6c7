// Guild service
// Validate, change a copy, save it once, then hand the stored value back to the caller.
// Rejected input never reaches the store; a failed save leaves the caller's guild as it was.

use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{GuildError, ValidationError};
use crate::models::guild::{GuildConfig, JoinLeaveAction, NewGuild};
use crate::store::{GuildFilter, GuildStore};
use crate::utils::config::settings_keys;

/// Service for guild configuration operations.
#[derive(Clone)]
pub struct GuildService {
    store: Arc<dyn GuildStore>,
}

impl GuildService {
    pub fn new(store: Arc<dyn GuildStore>) -> Self {
        Self { store }
    }

    /// Create and store a guild; omitted fields take their defaults.
    pub async fn create(&self, guild: NewGuild) -> Result<GuildConfig, GuildError> {
        if let Err(e) = guild.validate() {
            warn!("Rejected new guild {}: {}", guild.external_id, e);
            return Err(e.into());
        }

        let external_id = guild.external_id;
        let created = self.store.create(guild).await.map_err(|e| {
            error!("Failed to create guild {}: {:?}", external_id, e);
            e
        })?;

        info!("Created guild config for {}", external_id);
        Ok(created)
    }

    /// Look a guild up by its Discord ID.
    pub async fn find_by_external_id(&self, external_id: u64) -> Result<Option<GuildConfig>, GuildError> {
        Ok(self.store.find_one(&GuildFilter::external_id(external_id)).await?)
    }

    pub async fn set_name(&self, guild: &mut GuildConfig, name: &str) -> Result<GuildConfig, GuildError> {
        self.update(guild, "name", |g| g.set_name(name)).await
    }

    /// Append a greeting template. `action` must be exactly `join` or `leave`.
    pub async fn add_join_leave_message(
        &self,
        guild: &mut GuildConfig,
        action: &str,
        message: impl Into<String>,
    ) -> Result<GuildConfig, GuildError> {
        let action = self.parse_action(guild, action)?;
        let message = message.into();
        self.update(guild, action.settings_key(), |g| {
            g.add_join_leave_message(action, message);
            Ok(())
        })
        .await
    }

    /// Remove every copy of a greeting template. Removing one that isn't there is fine.
    pub async fn remove_join_leave_message(
        &self,
        guild: &mut GuildConfig,
        action: &str,
        message: &str,
    ) -> Result<GuildConfig, GuildError> {
        let action = self.parse_action(guild, action)?;
        self.update(guild, action.settings_key(), |g| {
            g.remove_join_leave_message(action, message);
            Ok(())
        })
        .await
    }

    /// Bind a role. Keys outside the known roles are stored as extra bindings.
    pub async fn set_role(
        &self,
        guild: &mut GuildConfig,
        role: &str,
        role_id: Option<u64>,
    ) -> Result<GuildConfig, GuildError> {
        self.update(guild, "roles", |g| {
            g.set_role(role, role_id);
            Ok(())
        })
        .await
    }

    pub async fn set_channel(
        &self,
        guild: &mut GuildConfig,
        channel: &str,
        channel_id: Option<u64>,
    ) -> Result<GuildConfig, GuildError> {
        self.update(guild, "channels", |g| {
            g.set_channel(channel, channel_id);
            Ok(())
        })
        .await
    }

    /// Set the command prefix. `None` always applies the default prefix.
    pub async fn set_prefix(
        &self,
        guild: &mut GuildConfig,
        prefix: Option<&str>,
    ) -> Result<GuildConfig, GuildError> {
        self.update(guild, "cmd_prefix", |g| g.set_prefix(prefix)).await
    }

    pub async fn enable_levelling(&self, guild: &mut GuildConfig) -> Result<GuildConfig, GuildError> {
        self.set_levelling(guild, true).await
    }

    pub async fn disable_levelling(&self, guild: &mut GuildConfig) -> Result<GuildConfig, GuildError> {
        self.set_levelling(guild, false).await
    }

    pub async fn set_levelling(&self, guild: &mut GuildConfig, enabled: bool) -> Result<GuildConfig, GuildError> {
        self.set_setting(guild, settings_keys::LEVELLING_ENABLED, Value::Bool(enabled))
            .await
    }

    /// Write any settings key. Reserved keys still have to keep their types.
    pub async fn set_setting(
        &self,
        guild: &mut GuildConfig,
        key: &str,
        value: Value,
    ) -> Result<GuildConfig, GuildError> {
        self.update(guild, key, |g| g.set_setting(key, value)).await
    }

    fn parse_action(&self, guild: &GuildConfig, action: &str) -> Result<JoinLeaveAction, GuildError> {
        action.parse::<JoinLeaveAction>().map_err(|e| {
            warn!("Rejected action {:?} for guild {}", action, guild.external_id());
            e.into()
        })
    }

    /// Apply `change` to a copy, persist it, then commit it to `guild`.
    async fn update<F>(&self, guild: &mut GuildConfig, field: &str, change: F) -> Result<GuildConfig, GuildError>
    where
        F: FnOnce(&mut GuildConfig) -> Result<(), ValidationError>,
    {
        let mut candidate = guild.clone();
        if let Err(e) = change(&mut candidate) {
            warn!("Rejected {} update for guild {}: {}", field, guild.external_id(), e);
            return Err(e.into());
        }

        let saved = self.store.save(&candidate).await.map_err(|e| {
            error!("Failed to save {} for guild {}: {:?}", field, guild.external_id(), e);
            e
        })?;

        info!("Updated {} for guild {}", field, saved.external_id());
        *guild = saved.clone();
        Ok(saved)
    }
}
