//! Configuration module - environment variable parsing

use std::env;

/// Module configuration loaded from environment variables. Every field has
/// a default so the harness and tests run without any environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Minimum interval between flood-checked commands, ms. 0 disables
    /// flood limiting entirely.
    pub flood_min_ms: i64,
    /// Demerit ceiling. 0 derives the ceiling as flood_min_ms^2 / 1000.
    pub flood_max_demerits: i64,

    /// Master switch for the vote subsystem
    pub allow_vote: bool,
    /// Votes a single client may call per map. 0 = unlimited.
    pub vote_limit: u32,
    /// Seconds a fresh connection must wait before calling a vote
    pub vote_min_wait_s: i64,
    /// How long a vote stays open, ms
    pub vote_duration_ms: i64,
    /// Delay between a map-family vote passing and its execution, ms
    pub vote_execute_delay_ms: i64,
    /// Pass threshold for map/restart/nextmap/draw/poll votes, percent
    pub map_vote_percent: u8,
    /// Seconds into the round after which map votes are refused. 0 = never.
    pub map_vote_max_time_s: i64,
    /// Kick votes must carry a `-r` reason clause
    pub require_vote_reasons: bool,
    /// Maps open to vote. Empty list = every existing map is votable.
    pub votable_maps: Vec<String>,
    /// Currently configured next map, checked by nextmap votes
    pub next_map: String,
    /// Ban duration handed to the host when a kick vote passes
    pub temp_ban: String,

    /// Prepend [R]/[B]/[S] scope tags to chat names
    pub chat_team_prefix: bool,
    /// Prefix for /me action messages. Empty disables action chat.
    pub action_prefix: String,
    /// Non-admins may use the admin chat channel (their messages are
    /// tagged as player messages)
    pub public_say_admins: bool,
    /// Private messages enabled
    pub private_messages: bool,
    /// Spectators below this admin level may only use team chat
    pub min_level_non_team_chat: i32,
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or(d.log_level),
            flood_min_ms: parse("ARENAMOD_FLOOD_MIN_MS", d.flood_min_ms)?,
            flood_max_demerits: parse("ARENAMOD_FLOOD_MAX_DEMERITS", d.flood_max_demerits)?,
            allow_vote: parse("ARENAMOD_ALLOW_VOTE", d.allow_vote)?,
            vote_limit: parse("ARENAMOD_VOTE_LIMIT", d.vote_limit)?,
            vote_min_wait_s: parse("ARENAMOD_VOTE_MIN_WAIT_S", d.vote_min_wait_s)?,
            vote_duration_ms: parse("ARENAMOD_VOTE_DURATION_MS", d.vote_duration_ms)?,
            vote_execute_delay_ms: parse(
                "ARENAMOD_VOTE_EXECUTE_DELAY_MS",
                d.vote_execute_delay_ms,
            )?,
            map_vote_percent: percent("ARENAMOD_MAP_VOTE_PERCENT", d.map_vote_percent)?,
            map_vote_max_time_s: parse("ARENAMOD_MAP_VOTE_MAX_TIME_S", d.map_vote_max_time_s)?,
            require_vote_reasons: parse("ARENAMOD_REQUIRE_VOTE_REASONS", d.require_vote_reasons)?,
            votable_maps: env::var("ARENAMOD_VOTABLE_MAPS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or(d.votable_maps),
            next_map: env::var("ARENAMOD_NEXT_MAP").unwrap_or(d.next_map),
            temp_ban: env::var("ARENAMOD_TEMP_BAN").unwrap_or(d.temp_ban),
            chat_team_prefix: parse("ARENAMOD_CHAT_TEAM_PREFIX", d.chat_team_prefix)?,
            action_prefix: env::var("ARENAMOD_ACTION_PREFIX").unwrap_or(d.action_prefix),
            public_say_admins: parse("ARENAMOD_PUBLIC_SAY_ADMINS", d.public_say_admins)?,
            private_messages: parse("ARENAMOD_PRIVATE_MESSAGES", d.private_messages)?,
            min_level_non_team_chat: parse(
                "ARENAMOD_MIN_LEVEL_NON_TEAM_CHAT",
                d.min_level_non_team_chat,
            )?,
        })
    }

    /// True when the named map may be voted for.
    pub fn map_is_votable(&self, map: &str) -> bool {
        self.votable_maps.is_empty()
            || self.votable_maps.iter().any(|m| m.eq_ignore_ascii_case(map))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            flood_min_ms: 1000,
            flood_max_demerits: 0,
            allow_vote: true,
            vote_limit: 5,
            vote_min_wait_s: 60,
            vote_duration_ms: 30_000,
            vote_execute_delay_ms: 3_000,
            map_vote_percent: 50,
            map_vote_max_time_s: 0,
            require_vote_reasons: false,
            votable_maps: Vec::new(),
            next_map: String::new(),
            temp_ban: "2h".to_string(),
            chat_team_prefix: false,
            action_prefix: "* ".to_string(),
            public_say_admins: true,
            private_messages: true,
            min_level_non_team_chat: 0,
        }
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

fn percent(name: &'static str, default: u8) -> Result<u8, ConfigError> {
    let value = parse(name, default)?;
    if value > 100 {
        return Err(ConfigError::Invalid(name));
    }
    Ok(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {0} has an invalid value")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rejects_values_over_one_hundred() {
        env::set_var("ARENAMOD_TEST_PERCENT", "150");
        assert!(percent("ARENAMOD_TEST_PERCENT", 50).is_err());
        env::set_var("ARENAMOD_TEST_PERCENT", "100");
        assert_eq!(percent("ARENAMOD_TEST_PERCENT", 50).unwrap(), 100);
        env::remove_var("ARENAMOD_TEST_PERCENT");
        assert_eq!(percent("ARENAMOD_TEST_PERCENT", 50).unwrap(), 50);
    }

    #[test]
    fn votable_list_empty_means_everything() {
        let mut cfg = Config::default();
        assert!(cfg.map_is_votable("anything"));
        cfg.votable_maps = vec!["arena1".into(), "arena2".into()];
        assert!(cfg.map_is_votable("ARENA1"));
        assert!(!cfg.map_is_votable("arena3"));
    }
}
