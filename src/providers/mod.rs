//! Encrypted storage for OAuth identity-provider configurations.
//!
//! This module backs the admin panel's provider registry: OAuth client
//! secrets are encrypted with AES-256-GCM before they touch SQLite and are
//! decrypted transparently on read.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       ProviderStore                      │
//! │  - CRUD operations                       │
//! │  - Transparent encryption/decryption     │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!    (encrypt)            (decrypt)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       SecretCodec                        │
//! │  - AES-256-GCM                           │
//! │  - Unique nonce per envelope             │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       SQLite Database                    │
//! │  - Encrypted secrets at rest             │
//! │  - ACID guarantees                       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use sealbox::providers::{Provider, ProviderStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! // Initialize store with the master key from env
//! let key = std::env::var("SEALBOX_ENCRYPTION_KEY")?;
//! let store = ProviderStore::new("sealbox.db", &key)?;
//!
//! // Register a provider
//! let provider = Provider {
//!     display_name: "GitHub".to_string(),
//!     issuer_url: "https://github.com/login/oauth".to_string(),
//!     client_id: "Iv1.8a61f9b3a7aba766".to_string(),
//!     client_secret: "1791af...redacted".to_string(),
//!     scopes: vec!["read:user".to_string(), "user:email".to_string()],
//!     enabled: true,
//! };
//! store.upsert("github", &provider)?;
//!
//! // Retrieve it (client secret decrypted)
//! if let Some(provider) = store.get("github")? {
//!     println!("Client id: {}", provider.client_id);
//! }
//!
//! // List for the admin panel; unreadable secrets come back as None
//! for summary in store.list()? {
//!     println!("{}: {}", summary.slug, summary.display_name);
//! }
//!
//! // Remove a provider
//! store.delete("github")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! - Client secrets are encrypted at rest with AES-256-GCM
//! - Each envelope has a unique nonce (never reused)
//! - Master key is 64 lowercase hex chars (32 bytes), held in memory only
//! - Authenticated encryption: tampering is detected on read
//! - Strict reads (`get`) fail on unreadable secrets; listings degrade to a
//!   placeholder instead

use serde::{Deserialize, Serialize};

mod encryption;
mod storage;

pub use storage::{ProviderStore, ProviderSummary};

// Re-export codec types for callers that encrypt outside the store
pub use encryption::{generate_key, validate_key, CryptoError, SecretCodec};

/// Configuration for one OAuth identity provider.
///
/// The client secret is plaintext in memory and encrypted by the store
/// before persisting. Never log or serialize this type into responses
/// without masking the secret.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Provider {
    /// Human-readable name shown in the admin panel
    pub display_name: String,

    /// OAuth authorization server base URL
    pub issuer_url: String,

    /// OAuth client identifier (not secret)
    pub client_id: String,

    /// OAuth client secret (encrypted at rest)
    pub client_secret: String,

    /// Scopes requested during the authorization flow
    pub scopes: Vec<String>,

    /// Disabled providers are kept but hidden from login options
    pub enabled: bool,
}
