use std::fs;
use std::io;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Alphabet of generated sniffer identifiers.
const IDENTIFIER_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-";
const IDENTIFIER_LENGTH: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading or writing the configuration file failed")]
    Io(#[from] io::Error),

    #[error("configuration file is not valid json")]
    Malformed(#[from] serde_json::Error),
}

/// Persistent sniffer settings, stored as `sniffer.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub master_address: String,
    pub local_port: u16,
    /// Stable identity of this sniffer towards the master; generated on
    /// first run.
    pub identifier: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            master_address: "127.0.0.1:4222".to_string(),
            local_port: 8777,
            identifier: random_identifier(),
        }
    }
}

/// A fresh 10-character identifier over `A-Za-z0-9-`.
pub fn random_identifier() -> String {
    let mut rng = rand::thread_rng();
    (0..IDENTIFIER_LENGTH)
        .map(|_| IDENTIFIER_ALPHABET[rng.gen_range(0..IDENTIFIER_ALPHABET.len())] as char)
        .collect()
}

impl Config {
    /// Loads the configuration from `path`. A missing file is created with
    /// defaults; an empty identifier is regenerated and saved back.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            debug!(?path, "configuration file created with defaults");
            return Ok(config);
        }

        let bytes = fs::read(path)?;
        let mut config: Config = serde_json::from_slice(&bytes)?;

        if config.identifier.is_empty() {
            config.identifier = random_identifier();
            config.save(path)?;
        }

        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_stay_inside_the_alphabet() {
        for _ in 0..32 {
            let id = random_identifier();
            assert_eq!(id.len(), IDENTIFIER_LENGTH);
            assert!(id
                .bytes()
                .all(|b| IDENTIFIER_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniffer.json");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.master_address, "127.0.0.1:4222");
        assert_eq!(config.local_port, 8777);
        assert_eq!(config.identifier.len(), IDENTIFIER_LENGTH);

        // the written file loads back to the same values
        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn empty_identifier_is_regenerated_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniffer.json");
        fs::write(
            &path,
            r#"{"master_address":"10.1.2.3:4222","local_port":9000,"identifier":""}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.master_address, "10.1.2.3:4222");
        assert_eq!(config.local_port, 9000);
        assert_eq!(config.identifier.len(), IDENTIFIER_LENGTH);

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.identifier, config.identifier);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniffer.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Malformed(_))
        ));
    }
}
