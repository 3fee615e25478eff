//! Token sealing: HMAC-SHA256 signing with optional AES-256-GCM encryption.
//!
//! The codec produces opaque strings safe to hand to a transport layer. The
//! same sealing is used for the client-visible token (plaintext = record id)
//! and for the persisted `data` column (plaintext = serialized values), so
//! both are authenticated with the token name bound into the MAC.
//!
//! Token layout: `base64url(payload) . unix_ts . base64url(mac)` where the
//! MAC covers the token name, the encoded payload, and the timestamp. The
//! timestamp bounds the signing window: tokens older than the codec's
//! maximum age fail verification.

use std::time::Duration;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Default signing window: 30 days.
const DEFAULT_MAX_TOKEN_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// Secret key material for the codec.
///
/// The signing key is always present; the encryption key is optional and
/// turns sealed payloads into AES-256-GCM ciphertexts. Both are derived
/// from caller-supplied secrets via SHA-256, so secrets of any non-zero
/// length are accepted.
#[derive(Clone)]
pub struct Key {
    signing: [u8; 32],
    encryption: Option<[u8; 32]>,
}

impl Key {
    /// Create a signing-only key from secret material.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(Error::InvalidKey);
        }
        Ok(Self {
            signing: derive(secret),
            encryption: None,
        })
    }

    /// Create a key that signs and encrypts.
    pub fn with_encryption(
        secret: impl AsRef<[u8]>,
        enc_secret: impl AsRef<[u8]>,
    ) -> Result<Self> {
        let enc_secret = enc_secret.as_ref();
        if enc_secret.is_empty() {
            return Err(Error::InvalidKey);
        }
        let mut key = Self::new(secret)?;
        key.encryption = Some(derive(enc_secret));
        Ok(key)
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("encryption", &self.encryption.is_some())
            .finish_non_exhaustive()
    }
}

/// Derive a fixed-size key from arbitrary secret material.
fn derive(material: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(material);
    digest.into()
}

/// Seals and opens the small values exchanged with clients.
///
/// Sealing always uses the first key; opening tries every configured key in
/// order, so older keys can remain readable after a new one is prepended.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    keys: Vec<Key>,
    max_token_age: Duration,
}

impl TokenCodec {
    /// Create a codec from one or more keys. Fails on an empty key list.
    pub fn new(keys: Vec<Key>) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::InvalidKey);
        }
        Ok(Self {
            keys,
            max_token_age: DEFAULT_MAX_TOKEN_AGE,
        })
    }

    /// Set the maximum accepted token age (the signing window).
    pub fn with_max_token_age(mut self, max_age: Duration) -> Self {
        self.max_token_age = max_age;
        self
    }

    /// Seal a payload under the given token name.
    pub fn seal(&self, name: &str, plaintext: &[u8]) -> Result<String> {
        let key = &self.keys[0];

        let payload = match &key.encryption {
            Some(enc_key) => encrypt(enc_key, plaintext)?,
            None => plaintext.to_vec(),
        };

        let encoded = URL_SAFE_NO_PAD.encode(&payload);
        let ts = Utc::now().timestamp();
        let mac = sign(&key.signing, name, &encoded, ts)?;

        Ok(format!("{}.{}.{}", encoded, ts, URL_SAFE_NO_PAD.encode(mac)))
    }

    /// Open a sealed token, returning the original payload.
    ///
    /// Any structural, signature, signing-window, or decryption mismatch
    /// yields [`Error::Tampered`]. Callers treat that identically to "no
    /// session"; it carries no detail on purpose.
    pub fn open(&self, name: &str, token: &str) -> Result<Vec<u8>> {
        let mut parts = token.splitn(3, '.');
        let (encoded, ts_str, sig_str) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return Err(Error::Tampered),
        };

        let ts: i64 = ts_str.parse().map_err(|_| Error::Tampered)?;
        let age = Utc::now().timestamp().saturating_sub(ts);
        if age < 0 || age as u64 > self.max_token_age.as_secs() {
            return Err(Error::Tampered);
        }

        let sig = URL_SAFE_NO_PAD.decode(sig_str).map_err(|_| Error::Tampered)?;
        let payload = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| Error::Tampered)?;

        for key in &self.keys {
            let mut mac = <HmacSha256 as Mac>::new_from_slice(&key.signing)
                .map_err(|e| Error::Crypto(e.to_string()))?;
            update_mac(&mut mac, name, encoded, ts);
            if mac.verify_slice(&sig).is_err() {
                continue;
            }

            return match &key.encryption {
                Some(enc_key) => decrypt(enc_key, &payload),
                None => Ok(payload),
            };
        }

        Err(Error::Tampered)
    }
}

fn sign(signing: &[u8; 32], name: &str, encoded: &str, ts: i64) -> Result<Vec<u8>> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(signing).map_err(|e| Error::Crypto(e.to_string()))?;
    update_mac(&mut mac, name, encoded, ts);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn update_mac(mac: &mut HmacSha256, name: &str, encoded: &str, ts: i64) {
    mac.update(name.as_bytes());
    mac.update(b"|");
    mac.update(encoded.as_bytes());
    mac.update(b"|");
    mac.update(ts.to_string().as_bytes());
}

/// Encrypt with AES-256-GCM; output is `nonce || ciphertext`.
fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| Error::Crypto(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| Error::Crypto(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn decrypt(key: &[u8; 32], payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() < NONCE_LEN {
        return Err(Error::Tampered);
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| Error::Crypto(e.to_string()))?;
    let nonce = Nonce::from_slice(&payload[..NONCE_LEN]);
    cipher
        .decrypt(nonce, &payload[NONCE_LEN..])
        .map_err(|_| Error::Tampered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(vec![Key::new(secret).unwrap()]).unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let codec = codec("secret");
        let token = codec.seal("session", b"record-id-123").unwrap();
        let opened = codec.open("session", &token).unwrap();
        assert_eq!(opened, b"record-id-123");
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(Key::new(""), Err(Error::InvalidKey)));
        assert!(matches!(TokenCodec::new(vec![]), Err(Error::InvalidKey)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = codec("secret");
        let token = codec.seal("session", b"record-id-123").unwrap();

        let junked = format!("{}junk", token);
        assert!(matches!(codec.open("session", &junked), Err(Error::Tampered)));

        let truncated = &token[..token.len() - 4];
        assert!(matches!(codec.open("session", truncated), Err(Error::Tampered)));

        assert!(matches!(codec.open("session", "garbage"), Err(Error::Tampered)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = codec("secret-a").seal("session", b"id").unwrap();
        assert!(matches!(
            codec("secret-b").open("session", &token),
            Err(Error::Tampered)
        ));
    }

    #[test]
    fn test_wrong_name_rejected() {
        let codec = codec("secret");
        let token = codec.seal("session-a", b"id").unwrap();
        assert!(matches!(codec.open("session-b", &token), Err(Error::Tampered)));
    }

    #[test]
    fn test_signing_window_expiry() {
        let codec = codec("secret").with_max_token_age(Duration::from_secs(0));
        let token = codec.seal("session", b"id").unwrap();

        // Fresh token is inside the (zero-second) window.
        assert!(codec.open("session", &token).is_ok());

        std::thread::sleep(Duration::from_millis(1100));
        assert!(matches!(codec.open("session", &token), Err(Error::Tampered)));
    }

    #[test]
    fn test_encrypted_roundtrip() {
        let key = Key::with_encryption("sign-secret", "enc-secret").unwrap();
        let codec = TokenCodec::new(vec![key]).unwrap();

        let token = codec.seal("session", b"sensitive-payload").unwrap();
        assert!(!token.contains("sensitive"));

        let opened = codec.open("session", &token).unwrap();
        assert_eq!(opened, b"sensitive-payload");
    }

    #[test]
    fn test_encrypted_payload_not_plaintext() {
        let key = Key::with_encryption("sign-secret", "enc-secret").unwrap();
        let codec = TokenCodec::new(vec![key]).unwrap();

        let token = codec.seal("session", b"record-id-123").unwrap();
        let encoded = token.split('.').next().unwrap();
        let payload = URL_SAFE_NO_PAD.decode(encoded).unwrap();
        assert_ne!(payload, b"record-id-123");
    }

    #[test]
    fn test_multi_key_decode() {
        let old = Key::new("old-secret").unwrap();
        let new = Key::new("new-secret").unwrap();

        let old_codec = TokenCodec::new(vec![old.clone()]).unwrap();
        let token = old_codec.seal("session", b"id").unwrap();

        // A codec with the new key prepended still opens old tokens.
        let rotated = TokenCodec::new(vec![new, old]).unwrap();
        assert_eq!(rotated.open("session", &token).unwrap(), b"id");
    }
}
