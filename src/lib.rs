// Guild configuration records for the bot
// Per-server command prefix, role/channel bindings and greeting settings

pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use error::{GuildError, ValidationError};
pub use models::guild::{
    ChannelBindings, ChannelKey, GuildConfig, GuildSettings, JoinLeaveAction, NewGuild, RoleBindings, RoleKey,
};
pub use services::GuildService;
pub use store::{CachedGuildStore, GuildFilter, GuildStore, JsonFileGuildStore, MemoryGuildStore, StoreError};
