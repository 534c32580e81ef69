use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_PREFIX: &str = "!";
pub const DEFAULT_WELCOME_CHANNEL: &str = "general";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord_token: String,
    pub command_prefix: String,
    pub welcome_channel: String,
    /// Reserved for owner-only commands; nothing checks it yet.
    pub owner_id: Option<u64>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let owner_id = match env::var("OWNER_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("OWNER_ID must be a numeric Discord user id, got '{}'", raw)
            })?),
            _ => None,
        };

        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "DISCORD_TOKEN is not set. Please set the DISCORD_TOKEN environment variable or create a .env file."
                    )
                })?,
            command_prefix: env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string()),
            welcome_channel: env::var("WELCOME_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_WELCOME_CHANNEL.to_string()),
            owner_id,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        for key in ["DISCORD_TOKEN", "PREFIX", "WELCOME_CHANNEL", "OWNER_ID", "LOG_LEVEL"] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_missing_token() {
        clear_env();

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("DISCORD_TOKEN is not set"));
    }

    #[test]
    #[serial]
    fn test_config_blank_token_is_missing() {
        clear_env();
        env::set_var("DISCORD_TOKEN", "   ");

        assert!(Config::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_with_defaults() {
        clear_env();
        env::set_var("DISCORD_TOKEN", "test_discord_token");

        let config = Config::from_env().unwrap();
        assert_eq!(config.discord_token, "test_discord_token");
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.welcome_channel, "general");
        assert_eq!(config.owner_id, None);
        assert_eq!(config.log_level, "info");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_overrides() {
        clear_env();
        env::set_var("DISCORD_TOKEN", "tok");
        env::set_var("PREFIX", "n!");
        env::set_var("WELCOME_CHANNEL", "lobby");
        env::set_var("OWNER_ID", "123456789012345678");

        let config = Config::from_env().unwrap();
        assert_eq!(config.command_prefix, "n!");
        assert_eq!(config.welcome_channel, "lobby");
        assert_eq!(config.owner_id, Some(123456789012345678));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_rejects_non_numeric_owner() {
        clear_env();
        env::set_var("DISCORD_TOKEN", "tok");
        env::set_var("OWNER_ID", "not-a-number");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("OWNER_ID"));

        clear_env();
    }
}
