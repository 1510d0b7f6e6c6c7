// Guild configuration model
// Matches the guild document stored for every server the bot is in

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::utils::config::{self, settings_keys};

/// Length in UTF-16 code units, the way Discord counts name length
fn text_length(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Check a guild name against the allowed length
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if config::NAME_LENGTH.contains(&text_length(name)) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName)
    }
}

/// Check a command prefix against the allowed length
pub fn validate_prefix(prefix: &str) -> Result<(), ValidationError> {
    if config::PREFIX_LENGTH.contains(&text_length(prefix)) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPrefix)
    }
}

/// Roles the bot knows how to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleKey {
    Muted,
    Cooldown,
    Timeout,
}

impl RoleKey {
    pub const ALL: [RoleKey; 3] = [RoleKey::Muted, RoleKey::Cooldown, RoleKey::Timeout];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKey::Muted => "muted",
            RoleKey::Cooldown => "cooldown",
            RoleKey::Timeout => "timeout",
        }
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "muted" => Ok(RoleKey::Muted),
            "cooldown" => Ok(RoleKey::Cooldown),
            "timeout" => Ok(RoleKey::Timeout),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Channels the bot posts into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    Transparency,
    JoinLeave,
}

impl ChannelKey {
    pub const ALL: [ChannelKey; 2] = [ChannelKey::Transparency, ChannelKey::JoinLeave];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKey::Transparency => "transparency",
            ChannelKey::JoinLeave => "join_leave",
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transparency" => Ok(ChannelKey::Transparency),
            "join_leave" => Ok(ChannelKey::JoinLeave),
            _ => Err(format!("Unknown channel: {}", s)),
        }
    }
}

/// Which greeting list an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinLeaveAction {
    Join,
    Leave,
}

impl JoinLeaveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinLeaveAction::Join => "join",
            JoinLeaveAction::Leave => "leave",
        }
    }

    /// Settings key of the list this action edits
    pub fn settings_key(&self) -> &'static str {
        match self {
            JoinLeaveAction::Join => settings_keys::JOIN_MESSAGES,
            JoinLeaveAction::Leave => settings_keys::LEAVE_MESSAGES,
        }
    }
}

impl FromStr for JoinLeaveAction {
    type Err = ValidationError;

    /// Only the exact tokens `join` and `leave` are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "join" => Ok(JoinLeaveAction::Join),
            "leave" => Ok(JoinLeaveAction::Leave),
            _ => Err(ValidationError::InvalidAction),
        }
    }
}

impl TryFrom<&Value> for JoinLeaveAction {
    type Error = ValidationError;

    /// Untyped input (e.g. a command argument); anything but the two strings is rejected
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => s.parse(),
            _ => Err(ValidationError::InvalidAction),
        }
    }
}

/// Role IDs bound to this guild
///
/// Unrecognised keys are kept in `extra` rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleBindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Option<u64>>,
}

impl RoleBindings {
    pub fn get(&self, key: &str) -> Option<u64> {
        match key.parse::<RoleKey>() {
            Ok(RoleKey::Muted) => self.muted,
            Ok(RoleKey::Cooldown) => self.cooldown,
            Ok(RoleKey::Timeout) => self.timeout,
            Err(_) => self.extra.get(key).copied().flatten(),
        }
    }

    /// Bind (or with `None`, clear) a role
    pub fn set(&mut self, key: &str, role_id: Option<u64>) {
        match key.parse::<RoleKey>() {
            Ok(RoleKey::Muted) => self.muted = role_id,
            Ok(RoleKey::Cooldown) => self.cooldown = role_id,
            Ok(RoleKey::Timeout) => self.timeout = role_id,
            Err(_) => {
                self.extra.insert(key.to_string(), role_id);
            }
        }
    }
}

/// Channel IDs bound to this guild
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelBindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_leave: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Option<u64>>,
}

impl ChannelBindings {
    pub fn get(&self, key: &str) -> Option<u64> {
        match key.parse::<ChannelKey>() {
            Ok(ChannelKey::Transparency) => self.transparency,
            Ok(ChannelKey::JoinLeave) => self.join_leave,
            Err(_) => self.extra.get(key).copied().flatten(),
        }
    }

    pub fn set(&mut self, key: &str, channel_id: Option<u64>) {
        match key.parse::<ChannelKey>() {
            Ok(ChannelKey::Transparency) => self.transparency = channel_id,
            Ok(ChannelKey::JoinLeave) => self.join_leave = channel_id,
            Err(_) => {
                self.extra.insert(key.to_string(), channel_id);
            }
        }
    }
}

/// Settings bag: three typed reserved keys plus free-form extras
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSettings {
    #[serde(default = "config::default_join_messages")]
    pub join_messages: Vec<String>,
    #[serde(default = "config::default_leave_messages")]
    pub leave_messages: Vec<String>,
    #[serde(default = "config::default_levelling_enabled")]
    pub levelling_enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            join_messages: config::default_join_messages(),
            leave_messages: config::default_leave_messages(),
            levelling_enabled: config::DEFAULT_LEVELLING_ENABLED,
            extra: Map::new(),
        }
    }
}

impl GuildSettings {
    /// Read any key, reserved or not, as JSON
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            settings_keys::JOIN_MESSAGES => Some(Value::from(self.join_messages.clone())),
            settings_keys::LEAVE_MESSAGES => Some(Value::from(self.leave_messages.clone())),
            settings_keys::LEVELLING_ENABLED => Some(Value::Bool(self.levelling_enabled)),
            _ => self.extra.get(key).cloned(),
        }
    }

    /// Write any key. Reserved keys must keep their types; everything else is stored as given.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ValidationError> {
        match key {
            settings_keys::JOIN_MESSAGES => {
                self.join_messages = message_list(settings_keys::JOIN_MESSAGES, value)?
            }
            settings_keys::LEAVE_MESSAGES => {
                self.leave_messages = message_list(settings_keys::LEAVE_MESSAGES, value)?
            }
            settings_keys::LEVELLING_ENABLED => match value {
                Value::Bool(flag) => self.levelling_enabled = flag,
                _ => return Err(ValidationError::LevellingNotBoolean),
            },
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    pub fn messages(&self, action: JoinLeaveAction) -> &[String] {
        match action {
            JoinLeaveAction::Join => &self.join_messages,
            JoinLeaveAction::Leave => &self.leave_messages,
        }
    }

    fn messages_mut(&mut self, action: JoinLeaveAction) -> &mut Vec<String> {
        match action {
            JoinLeaveAction::Join => &mut self.join_messages,
            JoinLeaveAction::Leave => &mut self.leave_messages,
        }
    }
}

fn message_list(field: &'static str, value: Value) -> Result<Vec<String>, ValidationError> {
    serde_json::from_value(value).map_err(|_| ValidationError::InvalidMessages(field))
}

/// Full guild document
///
/// A plain value: every mutator validates first and only then changes state,
/// so a rejected call leaves the guild untouched. Persisting is up to the caller
/// (see `GuildService`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildConfig {
    /// Store-assigned identity, `None` until the guild is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document_id: Option<String>,
    #[serde(rename = "discord_id")]
    external_id: u64,
    name: String,
    #[serde(default = "config::default_prefix")]
    cmd_prefix: String,
    #[serde(default)]
    channels: ChannelBindings,
    #[serde(default)]
    roles: RoleBindings,
    #[serde(default)]
    settings: GuildSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

impl GuildConfig {
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn external_id(&self) -> u64 {
        self.external_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cmd_prefix(&self) -> &str {
        &self.cmd_prefix
    }

    pub fn channels(&self) -> &ChannelBindings {
        &self.channels
    }

    pub fn roles(&self) -> &RoleBindings {
        &self.roles
    }

    pub fn settings(&self) -> &GuildSettings {
        &self.settings
    }

    pub fn levelling_enabled(&self) -> bool {
        self.settings.levelling_enabled
    }

    /// Last durable write (RFC 3339), if the guild has been stored
    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    /// Attach the identity a store assigned on create
    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// Stamp the write time; stores call this right before persisting
    pub fn touch(&mut self) {
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), ValidationError> {
        validate_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    /// Set the command prefix; `None` resets it to the default
    pub fn set_prefix(&mut self, prefix: Option<&str>) -> Result<(), ValidationError> {
        let prefix = prefix.unwrap_or(config::DEFAULT_PREFIX);
        validate_prefix(prefix)?;
        self.cmd_prefix = prefix.to_string();
        Ok(())
    }

    /// Append a template to the end of the join or leave list
    pub fn add_join_leave_message(&mut self, action: JoinLeaveAction, message: impl Into<String>) {
        self.settings.messages_mut(action).push(message.into());
    }

    /// Remove every template equal to `message`, returning how many were dropped
    pub fn remove_join_leave_message(&mut self, action: JoinLeaveAction, message: &str) -> usize {
        let list = self.settings.messages_mut(action);
        let before = list.len();
        list.retain(|m| m != message);
        before - list.len()
    }

    pub fn set_role(&mut self, key: &str, role_id: Option<u64>) {
        self.roles.set(key, role_id);
    }

    pub fn set_channel(&mut self, key: &str, channel_id: Option<u64>) {
        self.channels.set(key, channel_id);
    }

    pub fn set_levelling(&mut self, enabled: bool) {
        self.settings.levelling_enabled = enabled;
    }

    pub fn set_setting(&mut self, key: &str, value: Value) -> Result<(), ValidationError> {
        self.settings.set(key, value)
    }
}

/// Initial fields for a new guild; anything left `None` gets its default
#[derive(Debug, Clone, PartialEq)]
pub struct NewGuild {
    pub external_id: u64,
    pub name: String,
    pub cmd_prefix: Option<String>,
    pub channels: ChannelBindings,
    pub roles: RoleBindings,
    pub settings: Option<GuildSettings>,
}

impl NewGuild {
    pub fn new(external_id: u64, name: impl Into<String>) -> Self {
        Self {
            external_id,
            name: name.into(),
            cmd_prefix: None,
            channels: ChannelBindings::default(),
            roles: RoleBindings::default(),
            settings: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cmd_prefix = Some(prefix.into());
        self
    }

    pub fn with_settings(mut self, settings: GuildSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Same rules the mutators enforce
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        if let Some(prefix) = &self.cmd_prefix {
            validate_prefix(prefix)?;
        }
        Ok(())
    }

    /// Build the stored shape with defaults filled in. Does not validate.
    pub fn into_config(self) -> GuildConfig {
        GuildConfig {
            document_id: None,
            external_id: self.external_id,
            name: self.name,
            cmd_prefix: self.cmd_prefix.unwrap_or_else(config::default_prefix),
            channels: self.channels,
            roles: self.roles,
            settings: self.settings.unwrap_or_default(),
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn guild() -> GuildConfig {
        NewGuild::new(2400000, "Test guild").into_config()
    }

    #[test]
    fn test_defaults() {
        let g = guild();
        assert_eq!(g.cmd_prefix(), "$l.");
        assert_eq!(g.settings().join_messages, config::default_join_messages());
        assert_eq!(g.settings().leave_messages, config::default_leave_messages());
        assert!(g.levelling_enabled());
        assert_eq!(g.document_id(), None);
        assert_eq!(g.roles().get("muted"), None);
    }

    #[test]
    fn test_name_bounds() {
        assert_eq!(validate_name("1"), Err(ValidationError::InvalidName));
        assert_eq!(validate_name(""), Err(ValidationError::InvalidName));
        assert!(validate_name("ab").is_ok());
        assert!(validate_name(&"x".repeat(100)).is_ok());
        assert_eq!(validate_name(&"x".repeat(101)), Err(ValidationError::InvalidName));
        // UTF-16 units: é is one, an emoji outside the BMP is two
        assert!(validate_name(&"é".repeat(100)).is_ok());
        assert!(validate_name("🎉").is_ok());
        assert!(validate_name(&"🎉".repeat(50)).is_ok());
        assert_eq!(validate_name(&"🎉".repeat(51)), Err(ValidationError::InvalidName));
    }

    #[test]
    fn test_prefix_bounds() {
        assert_eq!(validate_prefix(""), Err(ValidationError::InvalidPrefix));
        assert!(validate_prefix("!").is_ok());
        assert!(validate_prefix("1234567890").is_ok());
        assert_eq!(validate_prefix("12345678901"), Err(ValidationError::InvalidPrefix));
        assert!(validate_prefix(&"🎉".repeat(5)).is_ok());
        assert_eq!(validate_prefix(&"🎉".repeat(6)), Err(ValidationError::InvalidPrefix));
    }

    #[test]
    fn test_rejected_name_leaves_state() {
        let mut g = guild();
        assert!(g.set_name("x").is_err());
        assert_eq!(g.name(), "Test guild");
    }

    #[test]
    fn test_prefix_none_resets_to_default() {
        let mut g = NewGuild::new(1, "Prefix guild").with_prefix("cmd_prefix").into_config();
        g.set_prefix(None).unwrap();
        assert_eq!(g.cmd_prefix(), config::DEFAULT_PREFIX);
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("join".parse::<JoinLeaveAction>(), Ok(JoinLeaveAction::Join));
        assert_eq!("leave".parse::<JoinLeaveAction>(), Ok(JoinLeaveAction::Leave));
        for bad in ["", "JOIN", "some string", "1", " join"] {
            assert_eq!(bad.parse::<JoinLeaveAction>(), Err(ValidationError::InvalidAction));
        }
        for bad in [json!(null), json!(1), json!(-1), json!({}), json!([]), json!(true)] {
            assert_eq!(JoinLeaveAction::try_from(&bad), Err(ValidationError::InvalidAction));
        }
        assert_eq!(JoinLeaveAction::try_from(&json!("leave")), Ok(JoinLeaveAction::Leave));
        for action in [JoinLeaveAction::Join, JoinLeaveAction::Leave] {
            assert_eq!(action.as_str().parse::<JoinLeaveAction>(), Ok(action));
        }
    }

    #[test]
    fn test_remove_drops_every_copy() {
        let mut g = guild();
        g.add_join_leave_message(JoinLeaveAction::Leave, "bye");
        g.add_join_leave_message(JoinLeaveAction::Leave, "later");
        g.add_join_leave_message(JoinLeaveAction::Leave, "bye");

        assert_eq!(g.remove_join_leave_message(JoinLeaveAction::Leave, "bye"), 2);
        let mut expected = config::default_leave_messages();
        expected.push("later".to_string());
        assert_eq!(g.settings().messages(JoinLeaveAction::Leave), expected.as_slice());

        assert_eq!(g.remove_join_leave_message(JoinLeaveAction::Leave, "absent"), 0);
        assert_eq!(g.settings().messages(JoinLeaveAction::Join), config::default_join_messages().as_slice());
    }

    #[test]
    fn test_known_keys_map_to_named_fields() {
        let mut g = guild();
        for (i, key) in RoleKey::ALL.iter().enumerate() {
            assert_eq!(key.to_string().parse::<RoleKey>(), Ok(*key));
            g.set_role(key.as_str(), Some(100 + i as u64));
        }
        for (i, key) in ChannelKey::ALL.iter().enumerate() {
            assert_eq!(key.to_string().parse::<ChannelKey>(), Ok(*key));
            g.set_channel(key.as_str(), Some(200 + i as u64));
        }

        assert_eq!(g.roles().muted, Some(100));
        assert_eq!(g.roles().cooldown, Some(101));
        assert_eq!(g.roles().timeout, Some(102));
        assert!(g.roles().extra.is_empty());
        assert_eq!(g.channels().transparency, Some(200));
        assert_eq!(g.channels().join_leave, Some(201));
        assert!(g.channels().extra.is_empty());
    }

    #[test]
    fn test_unknown_binding_keys_are_kept() {
        let mut g = guild();
        g.set_role("cooldown", Some(250000));
        g.set_role("moderator", Some(42));
        g.set_channel("join_leave", Some(7));
        g.set_channel("logs", Some(8));

        assert_eq!(g.roles().cooldown, Some(250000));
        assert_eq!(g.roles().get("moderator"), Some(42));
        assert_eq!(g.channels().join_leave, Some(7));
        assert_eq!(g.channels().get("logs"), Some(8));

        g.set_role("cooldown", None);
        assert_eq!(g.roles().get("cooldown"), None);
    }

    #[test]
    fn test_reserved_settings_keep_types() {
        let mut g = guild();
        assert_eq!(
            g.set_setting("levelling_enabled", json!("yes")),
            Err(ValidationError::LevellingNotBoolean)
        );
        assert!(g.levelling_enabled());

        g.set_setting("levelling_enabled", json!(false)).unwrap();
        assert!(!g.levelling_enabled());

        assert_eq!(
            g.set_setting("join_messages", json!("hi")),
            Err(ValidationError::InvalidMessages("join_messages"))
        );
        g.set_setting("join_messages", json!(["hi", "hello"])).unwrap();
        assert_eq!(g.settings().join_messages, vec!["hi", "hello"]);

        g.set_setting("mocha_test", json!(true)).unwrap();
        assert_eq!(g.settings().get("mocha_test"), Some(json!(true)));
        assert_eq!(g.settings().get("levelling_enabled"), Some(json!(false)));
    }

    #[test]
    fn test_document_fills_missing_fields() {
        let doc = json!({
            "discord_id": 2400016u64,
            "name": "Stored guild",
            "roles": { "muted": 5, "custom": 9 },
            "settings": { "levelling_enabled": false, "theme": "dark" }
        });
        let g: GuildConfig = serde_json::from_value(doc).unwrap();

        assert_eq!(g.external_id(), 2400016);
        assert_eq!(g.cmd_prefix(), "$l.");
        assert!(!g.levelling_enabled());
        assert_eq!(g.settings().join_messages, config::default_join_messages());
        assert_eq!(g.settings().get("theme"), Some(json!("dark")));
        assert_eq!(g.roles().muted, Some(5));
        assert_eq!(g.roles().get("custom"), Some(9));

        let back = serde_json::to_value(&g).unwrap();
        assert_eq!(back["discord_id"], json!(2400016u64));
        assert_eq!(back["settings"]["theme"], json!("dark"));
        assert!(back.get("document_id").is_none());
    }
}
