//! Encrypted identity-provider storage using SQLite.
//!
//! Stores OAuth provider configurations for the admin panel. Client secrets
//! are encrypted at rest using AES-256-GCM.

use super::{Provider, SecretCodec};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Encrypted provider registry backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE providers (
///     id TEXT PRIMARY KEY,          -- UUID v4
///     slug TEXT NOT NULL UNIQUE,    -- e.g. "github"
///     display_name TEXT NOT NULL,
///     issuer_url TEXT NOT NULL,
///     client_id TEXT NOT NULL,
///     client_secret TEXT NOT NULL,  -- Encrypted envelope
///     scopes TEXT NOT NULL,         -- JSON array
///     enabled INTEGER NOT NULL,
///     created_at TEXT NOT NULL,     -- ISO 8601 timestamp
///     updated_at TEXT NOT NULL      -- ISO 8601 timestamp
/// );
/// ```
///
/// # Security
/// - Client secrets pass through [`SecretCodec`] on every write and read
/// - Master key is held in memory only (from env var), never persisted
/// - Database file is protected by filesystem permissions
/// - SQLite ACID guarantees prevent partial updates
///
/// # Thread Safety
/// - Connection is wrapped in Mutex for safe concurrent access
/// - The codec itself is immutable and safe to share
pub struct ProviderStore {
    conn: Mutex<Connection>,
    codec: SecretCodec,
}

impl ProviderStore {
    /// Creates or opens a provider store.
    ///
    /// The master key is validated here, before any row is touched, so a
    /// malformed key fails at startup rather than on first use.
    ///
    /// # Arguments
    /// * `db_path` - Path to SQLite database file (`:memory:` for tests)
    /// * `key_hex` - 64-character lowercase hex master key
    pub fn new<P: AsRef<Path>>(db_path: P, key_hex: &str) -> Result<Self> {
        let codec = SecretCodec::from_hex(key_hex).context("Invalid encryption key")?;

        let conn = Connection::open(db_path).context("Failed to open database")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS providers (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                issuer_url TEXT NOT NULL,
                client_id TEXT NOT NULL,
                client_secret TEXT NOT NULL,
                scopes TEXT NOT NULL,
                enabled INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to create providers table")?;

        Ok(Self {
            conn: Mutex::new(conn),
            codec,
        })
    }

    /// Stores a provider configuration under a slug.
    ///
    /// If the slug already exists the configuration is replaced (upsert);
    /// the original row id and created_at are kept.
    pub fn upsert(&self, slug: &str, provider: &Provider) -> Result<()> {
        let secret_envelope = self
            .codec
            .encrypt(&provider.client_secret)
            .context("Failed to encrypt client secret")?;

        let scopes =
            serde_json::to_string(&provider.scopes).context("Failed to serialize scopes")?;

        let now = Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();

        self.conn
            .lock()
            .unwrap()
            .execute(
                r#"
                INSERT INTO providers (
                    id, slug, display_name, issuer_url,
                    client_id, client_secret, scopes, enabled,
                    created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(slug) DO UPDATE SET
                    display_name = excluded.display_name,
                    issuer_url = excluded.issuer_url,
                    client_id = excluded.client_id,
                    client_secret = excluded.client_secret,
                    scopes = excluded.scopes,
                    enabled = excluded.enabled,
                    updated_at = excluded.updated_at
                "#,
                params![
                    id,
                    slug,
                    provider.display_name,
                    provider.issuer_url,
                    provider.client_id,
                    secret_envelope,
                    scopes,
                    provider.enabled,
                    now,
                    now,
                ],
            )
            .context("Failed to store provider")?;

        debug!(slug, "stored identity provider");
        Ok(())
    }

    /// Retrieves a provider by slug, decrypting the client secret.
    ///
    /// This is the strict read path: an unreadable secret (tampered row or
    /// changed master key) is an error. Use [`list`](Self::list) where
    /// degraded output is acceptable.
    ///
    /// # Returns
    /// * `Ok(Some(Provider))` - Provider found and secret decrypted
    /// * `Ok(None)` - No provider under this slug
    /// * `Err` - Decryption or database failure
    pub fn get(&self, slug: &str) -> Result<Option<Provider>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT display_name, issuer_url, client_id,
                       client_secret, scopes, enabled
                FROM providers
                WHERE slug = ?1
                "#,
            )
            .context("Failed to prepare query")?;

        let mut rows = stmt
            .query(params![slug])
            .context("Failed to execute query")?;

        if let Some(row) = rows.next().context("Failed to read row")? {
            let secret_envelope: String = row.get(3)?;
            let client_secret = self
                .codec
                .decrypt(&secret_envelope)
                .context("Failed to decrypt client secret")?;

            let scopes_json: String = row.get(4)?;
            let scopes =
                serde_json::from_str(&scopes_json).context("Failed to parse scopes")?;

            Ok(Some(Provider {
                display_name: row.get(0)?,
                issuer_url: row.get(1)?,
                client_id: row.get(2)?,
                client_secret,
                scopes,
                enabled: row.get(5)?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Lists all providers for the admin panel.
    ///
    /// This is the degraded read path: client secrets go through
    /// [`SecretCodec::safe_decrypt`], so a record whose envelope no longer
    /// decrypts shows up with `client_secret: None` instead of failing the
    /// whole listing.
    pub fn list(&self) -> Result<Vec<ProviderSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT slug, display_name, issuer_url, client_id,
                       client_secret, enabled, updated_at
                FROM providers
                ORDER BY slug
                "#,
            )
            .context("Failed to prepare query")?;

        let mut rows = stmt.query([]).context("Failed to execute query")?;

        let mut summaries = Vec::new();
        while let Some(row) = rows.next().context("Failed to read row")? {
            let slug: String = row.get(0)?;

            let secret_envelope: String = row.get(4)?;
            let client_secret = self.codec.safe_decrypt(&secret_envelope);
            if client_secret.is_none() {
                warn!(slug = %slug, "stored client secret is unreadable; was the master key rotated?");
            }

            let updated_at: String = row.get(6)?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .context("Failed to parse updated_at timestamp")?;

            summaries.push(ProviderSummary {
                slug,
                display_name: row.get(1)?,
                issuer_url: row.get(2)?,
                client_id: row.get(3)?,
                client_secret,
                enabled: row.get(5)?,
                updated_at,
            });
        }

        Ok(summaries)
    }

    /// Deletes a provider by slug.
    ///
    /// # Returns
    /// * `Ok(true)` - Provider deleted
    /// * `Ok(false)` - No provider under this slug
    pub fn delete(&self, slug: &str) -> Result<bool> {
        let rows_affected = self
            .conn
            .lock()
            .unwrap()
            .execute("DELETE FROM providers WHERE slug = ?1", params![slug])
            .context("Failed to delete provider")?;

        if rows_affected > 0 {
            debug!(slug, "deleted identity provider");
        }
        Ok(rows_affected > 0)
    }
}

/// One row of the admin panel's provider listing.
///
/// `client_secret` is `None` when the stored envelope could not be
/// decrypted; the UI renders a placeholder for it.
#[derive(Clone, Debug, Serialize)]
pub struct ProviderSummary {
    pub slug: String,
    pub display_name: String,
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}
