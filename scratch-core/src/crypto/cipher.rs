//! XChaCha20-Poly1305 ticket cipher

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, CoreResult};
use crate::types::TicketContent;

/// XChaCha20-Poly1305 key size (32 bytes)
pub const KEY_SIZE: usize = 32;

/// XChaCha20-Poly1305 nonce size (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size
const TAG_SIZE: usize = 16;

/// Server-side ticket encryption key, wiped on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Build from raw bytes; must be exactly [`KEY_SIZE`] long
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CoreError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Build from a 64-character hex string
    pub fn from_hex(hex_str: &str) -> CoreResult<Self> {
        let mut bytes = hex::decode(hex_str.trim())
            .map_err(|e| CoreError::InvalidKey(format!("hex decode: {}", e)))?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    /// Random key from the OS RNG
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Authenticated cipher for ticket content
///
/// Wire format: `base64(nonce || ciphertext || tag)`.
#[derive(Clone)]
pub struct TicketCipher {
    aead: XChaCha20Poly1305,
}

impl TicketCipher {
    /// Create a cipher bound to `key`
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            aead: XChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
        }
    }

    /// Encrypt arbitrary bytes
    pub fn encrypt(&self, plaintext: &[u8]) -> CoreResult<String> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .aead
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|e| CoreError::Encryption(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    /// Decrypt and authenticate
    pub fn decrypt(&self, sealed: &str) -> CoreResult<Vec<u8>> {
        let raw = BASE64
            .decode(sealed.trim())
            .map_err(|e| CoreError::Decryption(format!("base64: {}", e)))?;
        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CoreError::Decryption(format!(
                "ciphertext too short: {} bytes",
                raw.len()
            )));
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_SIZE);
        self.aead
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CoreError::Decryption("authentication failed".to_string()))
    }

    /// Seal ticket content
    pub fn seal(&self, content: &TicketContent) -> CoreResult<String> {
        let mut plaintext = serde_json::to_vec(content)?;
        let sealed = self.encrypt(&plaintext);
        plaintext.zeroize();
        sealed
    }

    /// Open sealed ticket content
    pub fn open(&self, sealed: &str) -> CoreResult<TicketContent> {
        let plaintext = self.decrypt(sealed)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| CoreError::Decryption(format!("content decode: {}", e)))
    }
}

impl std::fmt::Debug for TicketCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketCipher").finish_non_exhaustive()
    }
}
