//! Delegated credentials at rest and the per-session proxy ticket cache.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;
use crate::types::ApplicationSession;

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;

/// AES-256-GCM sealing of delegated credentials stored in the session.
///
/// Sealed values are `base64(nonce || ciphertext)`; every seal uses a fresh
/// random nonce.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher {
    /// Creates a cipher from a hex-encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the hex is invalid or the key is not 32 bytes.
    pub fn from_hex_key(key_hex: &str) -> Result<Self, Error> {
        let key = hex::decode(key_hex.trim()).map_err(|e| Error::InvalidKey(e.to_string()))?;
        Self::from_key(&key)
    }

    /// Creates a cipher from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is not 32 bytes.
    pub fn from_key(key: &[u8]) -> Result<Self, Error> {
        if key.len() != KEY_SIZE {
            return Err(Error::InvalidKey(format!(
                "expected {KEY_SIZE} bytes, got {}",
                key.len()
            )));
        }
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Generates a random hex-encoded key for initial setup.
    #[must_use]
    pub fn generate_key() -> String {
        let key: [u8; KEY_SIZE] = rand::rng().random();
        hex::encode(key)
    }

    /// Seals a credential for storage in the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] if encryption fails.
    pub fn encrypt(&self, credential: &SecretString) -> Result<String, Error> {
        let nonce: [u8; NONCE_SIZE] = rand::rng().random();
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                credential.expose_secret().as_bytes(),
            )
            .map_err(|e| Error::Credential(format!("encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    /// Opens a credential sealed by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] if the value is not valid base64, is too
    /// short, fails authentication or is not UTF-8.
    pub fn decrypt(&self, sealed: &str) -> Result<SecretString, Error> {
        let bytes = STANDARD
            .decode(sealed)
            .map_err(|e| Error::Credential(format!("invalid encoding: {e}")))?;
        if bytes.len() < NONCE_SIZE {
            return Err(Error::Credential("sealed value too short".into()));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| Error::Credential(format!("decryption failed: {e}")))?;
        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| Error::Credential("credential is not UTF-8".into()))?;
        Ok(plaintext.into())
    }
}

/// Whether a cached credential may be presented again.
///
/// Backends that cache proxy tickets accept the same ticket on every
/// reconnect; others need a fresh one-time ticket each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Reuse,
    AlwaysRefresh,
}

impl CachePolicy {
    #[must_use]
    pub fn from_caching(enabled: bool) -> Self {
        if enabled {
            Self::Reuse
        } else {
            Self::AlwaysRefresh
        }
    }
}

/// Delegated credential slot of an [`ApplicationSession`].
pub struct CredentialCache<'a> {
    cipher: &'a CredentialCipher,
    policy: CachePolicy,
}

impl<'a> CredentialCache<'a> {
    #[must_use]
    pub fn new(cipher: &'a CredentialCipher, policy: CachePolicy) -> Self {
        Self { cipher, policy }
    }

    /// The cached credential, if the policy allows reuse and it can be opened.
    ///
    /// A value that no longer decrypts is treated as stale.
    #[must_use]
    pub fn cached(&self, session: &ApplicationSession) -> Option<SecretString> {
        if self.policy == CachePolicy::AlwaysRefresh {
            return None;
        }
        let sealed = session.credential.as_deref()?;
        match self.cipher.decrypt(sealed) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id,
                    error = %e,
                    "Discarding unreadable cached credential"
                );
                None
            }
        }
    }

    /// Seals `credential` into the session, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] if sealing fails.
    pub fn store(
        &self,
        session: &mut ApplicationSession,
        credential: &SecretString,
    ) -> Result<(), Error> {
        session.credential = Some(self.cipher.encrypt(credential)?);
        Ok(())
    }
}
