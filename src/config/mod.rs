use anyhow::Context;
use serde::Deserialize;

use crate::providers::validate_key;

/// Complete Sealbox configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SealboxConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "sealbox.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Encryption configuration
///
/// The master key itself never appears in the config file; only the name of
/// the environment variable that holds it does.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionConfig {
    /// Environment variable holding the 64-character lowercase hex master key
    #[serde(default = "default_key_env")]
    pub key_env: String,
}

fn default_key_env() -> String {
    "SEALBOX_ENCRYPTION_KEY".to_string()
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
        }
    }
}

impl EncryptionConfig {
    /// Reads the master key from the configured environment variable and
    /// validates its format.
    ///
    /// Call this once at startup; a malformed or missing key is fatal and
    /// should stop the process before any store is opened.
    pub fn key_from_env(&self) -> anyhow::Result<String> {
        let key = std::env::var(&self.key_env)
            .with_context(|| format!("{} is not set", self.key_env))?;

        validate_key(&key)
            .with_context(|| format!("{} is not a valid encryption key", self.key_env))?;

        Ok(key)
    }
}

impl Default for SealboxConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            encryption: EncryptionConfig::default(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<SealboxConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: SealboxConfig = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SealboxConfig::default();
        assert_eq!(config.storage.path, "sealbox.db");
        assert_eq!(config.encryption.key_env, "SEALBOX_ENCRYPTION_KEY");
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [storage]
            path = "/var/lib/sealbox/providers.db"

            [encryption]
            key_env = "MY_MASTER_KEY"
        "#;

        let config: SealboxConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.storage.path, "/var/lib/sealbox/providers.db");
        assert_eq!(config.encryption.key_env, "MY_MASTER_KEY");
    }

    #[test]
    fn test_partial_config() {
        // Test that missing sections use defaults
        let toml = r#"
            [storage]
            path = "test.db"
        "#;

        let config: SealboxConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.storage.path, "test.db");
        assert_eq!(config.encryption.key_env, "SEALBOX_ENCRYPTION_KEY"); // Default
    }

    #[test]
    fn test_empty_config() {
        let config: SealboxConfig = toml::from_str("").unwrap();
        assert_eq!(config.storage.path, "sealbox.db");
        assert_eq!(config.encryption.key_env, "SEALBOX_ENCRYPTION_KEY");
    }

    #[test]
    fn test_key_from_env_valid() {
        let cfg = EncryptionConfig {
            key_env: "SEALBOX_TEST_KEY_VALID".to_string(),
        };
        std::env::set_var("SEALBOX_TEST_KEY_VALID", "ab".repeat(32));

        let key = cfg.key_from_env().unwrap();
        assert_eq!(key.len(), 64);

        std::env::remove_var("SEALBOX_TEST_KEY_VALID");
    }

    #[test]
    fn test_key_from_env_missing() {
        let cfg = EncryptionConfig {
            key_env: "SEALBOX_TEST_KEY_UNSET".to_string(),
        };
        assert!(cfg.key_from_env().is_err());
    }

    #[test]
    fn test_key_from_env_malformed() {
        let cfg = EncryptionConfig {
            key_env: "SEALBOX_TEST_KEY_MALFORMED".to_string(),
        };
        std::env::set_var("SEALBOX_TEST_KEY_MALFORMED", "not-a-hex-key");

        assert!(cfg.key_from_env().is_err());

        std::env::remove_var("SEALBOX_TEST_KEY_MALFORMED");
    }
}
