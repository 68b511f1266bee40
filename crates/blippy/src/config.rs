//! Environment configuration.

use anyhow::{bail, Context, Result};

const DEFAULT_DATABASE_PATH: &str = "./blippy.db";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MODEL: &str = "google/gemini-3-flash-preview";

/// Process configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_path: String,
    pub port: u16,
    pub model: String,
    pub openrouter_api_key: String,
    /// Enables the sandboxed bash tool when set.
    pub sprites_api_key: Option<String>,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary lookup (tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let openrouter_api_key = match lookup("OPENROUTER_API_KEY") {
            Some(key) if !key.is_empty() => key,
            _ => bail!("OPENROUTER_API_KEY environment variable is required"),
        };

        let port = match lookup("PORT") {
            Some(raw) if !raw.is_empty() => {
                raw.parse::<u16>().with_context(|| format!("invalid PORT: {raw}"))?
            }
            _ => DEFAULT_PORT,
        };

        Ok(Self {
            database_path: lookup("DATABASE_PATH")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.into()),
            port,
            model: lookup("MODEL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            openrouter_api_key,
            sprites_api_key: lookup("SPRITES_API_KEY").filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn api_key_is_required() {
        let err = Config::from_lookup(env(&[])).unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(env(&[("OPENROUTER_API_KEY", "sk-or-x")])).unwrap();
        assert_eq!(config.database_path, "./blippy.db");
        assert_eq!(config.port, 8080);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.sprites_api_key.is_none());
    }

    #[test]
    fn overrides_apply() {
        let config = Config::from_lookup(env(&[
            ("OPENROUTER_API_KEY", "sk-or-x"),
            ("DATABASE_PATH", "/data/blippy.db"),
            ("PORT", "9090"),
            ("MODEL", "openai/gpt-5"),
            ("SPRITES_API_KEY", "sprite-key"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, "/data/blippy.db");
        assert_eq!(config.port, 9090);
        assert_eq!(config.model, "openai/gpt-5");
        assert_eq!(config.sprites_api_key.as_deref(), Some("sprite-key"));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = Config::from_lookup(env(&[
            ("OPENROUTER_API_KEY", "sk-or-x"),
            ("PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("invalid PORT"));
    }
}
