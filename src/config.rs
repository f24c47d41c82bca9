use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Remote record store
    pub remote_base_url: String,
    pub remote_token: String,
    pub record_type: String,

    // Local key-value store
    pub local_store_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Remote record store
            remote_base_url: std::env::var("PHRASEBOOK_REMOTE_URL")
                .context("PHRASEBOOK_REMOTE_URL not set")?,
            remote_token: std::env::var("PHRASEBOOK_REMOTE_TOKEN")
                .context("PHRASEBOOK_REMOTE_TOKEN not set")?,
            record_type: std::env::var("PHRASEBOOK_RECORD_TYPE")
                .unwrap_or_else(|_| "Phrase".to_string()),

            // Local key-value store
            local_store_path: std::env::var("PHRASEBOOK_LOCAL_PATH")
                .unwrap_or_else(|_| "data/phrases.json".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("PHRASEBOOK_REMOTE_URL");
        std::env::remove_var("PHRASEBOOK_REMOTE_TOKEN");
        std::env::remove_var("PHRASEBOOK_RECORD_TYPE");
        std::env::remove_var("PHRASEBOOK_LOCAL_PATH");
    }

    #[test]
    #[serial]
    fn test_from_env_with_all_vars() {
        clear_env();
        std::env::set_var("PHRASEBOOK_REMOTE_URL", "https://store.example.com");
        std::env::set_var("PHRASEBOOK_REMOTE_TOKEN", "secret-token");
        std::env::set_var("PHRASEBOOK_RECORD_TYPE", "TestPhrase");
        std::env::set_var("PHRASEBOOK_LOCAL_PATH", "/tmp/phrases.json");

        let config = Config::from_env().expect("config");
        assert_eq!(config.remote_base_url, "https://store.example.com");
        assert_eq!(config.remote_token, "secret-token");
        assert_eq!(config.record_type, "TestPhrase");
        assert_eq!(config.local_store_path, "/tmp/phrases.json");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("PHRASEBOOK_REMOTE_URL", "https://store.example.com");
        std::env::set_var("PHRASEBOOK_REMOTE_TOKEN", "secret-token");

        let config = Config::from_env().expect("config");
        assert_eq!(config.record_type, "Phrase");
        assert_eq!(config.local_store_path, "data/phrases.json");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_remote_url_fails() {
        clear_env();
        std::env::set_var("PHRASEBOOK_REMOTE_TOKEN", "secret-token");

        let result = Config::from_env();
        assert!(result.is_err());
        clear_env();
    }
}
