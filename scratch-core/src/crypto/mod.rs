//! Ticket content encryption
//!
//! Ticket outcomes are sealed with XChaCha20-Poly1305 under a server key
//! supplied at process start. Each seal uses a fresh random 24-byte nonce,
//! so sealing the same outcome twice yields different ciphertexts.

mod cipher;

pub use cipher::{EncryptionKey, TicketCipher, KEY_SIZE, NONCE_SIZE};
