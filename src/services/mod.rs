// Orchestration over the guild store
pub mod guild_service;

pub use guild_service::GuildService;
