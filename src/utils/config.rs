// Centralized configuration for guild records
// Defaults applied to freshly created guilds and the bounds enforced on every write

use std::ops::RangeInclusive;

/// Command prefix used when a guild has not picked one
pub const DEFAULT_PREFIX: &str = "$l.";

/// Greeting templates a new guild starts with
pub const DEFAULT_JOIN_MESSAGES: [&str; 1] = ["%USER_MENTION% have joined!"];

/// Farewell templates a new guild starts with
pub const DEFAULT_LEAVE_MESSAGES: [&str; 2] = [
    "%USER% have left!",
    "After time adrift among open stars. Along tides of light and through shoals of dust. %USER% returned to where they began.",
];

pub const DEFAULT_LEVELLING_ENABLED: bool = true;

/// Allowed guild name length, in UTF-16 code units
pub const NAME_LENGTH: RangeInclusive<usize> = 2..=100;

/// Allowed command prefix length, in UTF-16 code units
pub const PREFIX_LENGTH: RangeInclusive<usize> = 1..=10;

/// Reserved keys inside the settings bag
pub mod settings_keys {
    pub const JOIN_MESSAGES: &str = "join_messages";
    pub const LEAVE_MESSAGES: &str = "leave_messages";
    pub const LEVELLING_ENABLED: &str = "levelling_enabled";
}

/// Default join messages as owned strings
pub fn default_join_messages() -> Vec<String> {
    DEFAULT_JOIN_MESSAGES.iter().map(|s| s.to_string()).collect()
}

/// Default leave messages as owned strings
pub fn default_leave_messages() -> Vec<String> {
    DEFAULT_LEAVE_MESSAGES.iter().map(|s| s.to_string()).collect()
}

pub fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

pub fn default_levelling_enabled() -> bool {
    DEFAULT_LEVELLING_ENABLED
}
