//! Credential-at-rest encryption keyed by `SECRET_KEY` (spec §6
//! Configuration: "absent → credential store disabled"). AES-256-GCM via
//! the `aes-gcm` crate — no example repo in the pack handles encryption,
//! so this is an enrichment dependency rather than one inherited from the
//! teacher (see DESIGN.md).

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key};
use async_trait::async_trait;
use mygitpanel_core::models::{Credential, SecretString};
use mygitpanel_core::store::CredentialStore;
use mygitpanel_core::{CoreError, CoreResult};
use rusqlite::OptionalExtension;
use tokio_util::sync::CancellationToken;

use crate::conversions::{parse_rfc3339, to_rfc3339};
use crate::SqliteStore;

fn cipher_disabled_error() -> CoreError {
    CoreError::Config("credential store disabled: SECRET_KEY not set".to_string())
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn get(&self, service: &str, _cancel: &CancellationToken) -> CoreResult<Option<Credential>> {
        let Some(secret_key) = self.secret_key else {
            return Err(cipher_disabled_error());
        };
        let service_owned = service.to_string();

        let row = self
            .pool
            .with_reader(move |conn| {
                conn.query_row(
                    "SELECT nonce_hex, ciphertext_hex, updated_at FROM credentials WHERE service = ?1",
                    [&service_owned],
                    |row| {
                        Ok((
                            row.get::<_, String>("nonce_hex")?,
                            row.get::<_, String>("ciphertext_hex")?,
                            row.get::<_, String>("updated_at")?,
                        ))
                    },
                )
                .optional()
            })
            .await?;

        let Some((nonce_hex, ciphertext_hex, updated_at)) = row else {
            return Ok(None);
        };

        let nonce_bytes = hex::decode(&nonce_hex).map_err(CoreError::store)?;
        let ciphertext = hex::decode(&ciphertext_hex).map_err(CoreError::store)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&secret_key));
        let plaintext = cipher
            .decrypt(nonce_bytes.as_slice().into(), ciphertext.as_slice())
            .map_err(|_| CoreError::Store("credential decryption failed".to_string()))?;
        let value = String::from_utf8(plaintext).map_err(CoreError::store)?;

        Ok(Some(Credential {
            service: service.to_string(),
            value: SecretString::new(value),
            updated_at: parse_rfc3339(&updated_at).map_err(CoreError::store)?,
        }))
    }

    async fn set(&self, service: &str, value: SecretString, _cancel: &CancellationToken) -> CoreResult<()> {
        let Some(secret_key) = self.secret_key else {
            return Err(cipher_disabled_error());
        };

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&secret_key));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, value.expose().as_bytes())
            .map_err(|_| CoreError::Store("credential encryption failed".to_string()))?;

        let service = service.to_string();
        let nonce_hex = hex::encode(nonce);
        let ciphertext_hex = hex::encode(ciphertext);
        let updated_at = to_rfc3339(chrono::Utc::now());

        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO credentials (service, nonce_hex, ciphertext_hex, updated_at) \
                     VALUES (?1, ?2, ?3, ?4) \
                     ON CONFLICT(service) DO UPDATE SET \
                        nonce_hex = excluded.nonce_hex, \
                        ciphertext_hex = excluded.ciphertext_hex, \
                        updated_at = excluded.updated_at",
                    rusqlite::params![service, nonce_hex, ciphertext_hex, updated_at],
                )?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips_the_plaintext_value() {
        let store = SqliteStore::open_in_memory(Some([7u8; 32])).unwrap();
        let cancel = CancellationToken::new();

        store
            .set("github", SecretString::new("ghp_example"), &cancel)
            .await
            .unwrap();

        let credential = store.get("github", &cancel).await.unwrap().unwrap();
        assert_eq!(credential.value.expose(), "ghp_example");
    }

    #[tokio::test]
    async fn operations_fail_fast_without_a_configured_secret_key() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        let cancel = CancellationToken::new();
        let err = store
            .set("github", SecretString::new("ghp_example"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
