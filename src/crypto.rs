use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::RngCore;
use thiserror::Error;

use crate::models::EncryptedBlob;

const NONCE_LEN: usize = 12;
const MIN_GENERATED_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid Argon2 params: {0}")]
    Params(String),
    #[error("Key derivation failed: {0}")]
    Kdf(String),
    #[error("Encryption failed")]
    Encrypt,
    #[error("Decryption failed. Wrong password?")]
    Decrypt,
    #[error("Invalid base64 field: {0}")]
    Encoding(#[from] base64::DecodeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

pub fn derive_key_with_params(
    passphrase: &str,
    salt: &[u8],
    params: KdfParams,
) -> Result<[u8; 32], CryptoError> {
    let params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(32))
        .map_err(|e| CryptoError::Params(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::Kdf(e.to_string()))?;
    Ok(key)
}

pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

pub fn encrypt_with_key(key: &[u8; 32], plaintext: &[u8]) -> Result<EncryptedBlob, CryptoError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce_bytes: [u8; NONCE_LEN] = random_bytes();

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CryptoError::Encrypt)?;

    Ok(EncryptedBlob {
        nonce: base64::engine::general_purpose::STANDARD.encode(nonce_bytes),
        data: base64::engine::general_purpose::STANDARD.encode(ciphertext),
    })
}

pub fn decrypt_with_key(key: &[u8; 32], blob: &EncryptedBlob) -> Result<Vec<u8>, CryptoError> {
    let nonce_bytes = base64::engine::general_purpose::STANDARD.decode(&blob.nonce)?;
    let ciphertext = base64::engine::general_purpose::STANDARD.decode(&blob.data)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(CryptoError::Decrypt);
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| CryptoError::Decrypt)
}

/// Random password with at least one upper, lower, digit and special character.
pub fn generate_password(len: usize) -> String {
    let target_len = len.max(MIN_GENERATED_LEN);
    let upper = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    let lower = b"abcdefghijkmnopqrstuvwxyz";
    let digits = b"23456789";
    let special = b"!@#$%^&*()-_=+[]{};:,.?";
    let classes: [&[u8]; 4] = [upper, lower, digits, special];

    let mut rng = OsRng;
    let mut chars: Vec<char> = classes
        .iter()
        .filter_map(|set| set.choose(&mut rng))
        .map(|b| *b as char)
        .collect();

    let all: Vec<u8> = classes.concat();
    while chars.len() < target_len {
        if let Some(b) = all.choose(&mut rng) {
            chars.push(*b as char);
        }
    }
    chars.shuffle(&mut rng);
    chars.into_iter().collect()
}
