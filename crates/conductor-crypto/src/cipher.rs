//! AES-256-GCM credential encryption.
//!
//! Ciphertexts are laid out as `nonce || ciphertext || tag` with a fresh
//! 12-byte nonce drawn from the OS RNG on every call.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of a GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// A 32-byte AES-256 master key. Zeroized on drop.
#[derive(Clone)]
pub struct MasterKey(Zeroizing<[u8; KEY_SIZE]>);

impl MasterKey {
    /// Build a key from raw bytes, rejecting anything that is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::invalid_key(format!("expected {} bytes, got {}", KEY_SIZE, bytes.len()))
        })?;
        Ok(Self(Zeroizing::new(array)))
    }

    /// Decode a standard base64 key.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| CryptoError::invalid_key(format!("not valid base64: {}", e)))?,
        );
        Self::from_slice(&decoded)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.as_ref())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// Generate a fresh random master key.
pub fn generate_key() -> Result<MasterKey> {
    let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
    OsRng
        .try_fill_bytes(bytes.as_mut())
        .map_err(|e| CryptoError::Rng(e.to_string()))?;
    Ok(MasterKey(bytes))
}

/// Authenticated cipher bound to a single master key.
#[derive(Clone)]
pub struct Cipher {
    aead: Aes256Gcm,
}

impl Cipher {
    pub fn new(key: &MasterKey) -> Self {
        Self {
            aead: Aes256Gcm::new(key.as_bytes().into()),
        }
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        if plaintext.is_empty() {
            return Err(CryptoError::EmptyInput);
        }

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| CryptoError::Rng(e.to_string()))?;

        let sealed = self
            .aead
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt a blob produced by [`Cipher::encrypt`].
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(CryptoError::InvalidCiphertext);
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_SIZE);
        self.aead
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::InvalidCiphertext)
    }

    /// Encrypt a string and encode the result as standard base64.
    /// Empty input maps to empty output.
    pub fn encrypt_string(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        Ok(STANDARD.encode(self.encrypt(plaintext.as_bytes())?))
    }

    /// Inverse of [`Cipher::encrypt_string`].
    pub fn decrypt_string(&self, encoded: &str) -> Result<String> {
        if encoded.is_empty() {
            return Ok(String::new());
        }
        let raw = STANDARD
            .decode(encoded)
            .map_err(|_| CryptoError::InvalidCiphertext)?;
        let plain = self.decrypt(&raw)?;
        String::from_utf8(plain.to_vec()).map_err(|_| CryptoError::InvalidCiphertext)
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_key() -> MasterKey {
        MasterKey::from_base64("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=").unwrap()
    }

    #[test]
    fn test_round_trip_with_zero_key() {
        let cipher = Cipher::new(&zero_key());
        let sealed = cipher.encrypt(b"ghp_secret").unwrap();
        assert_ne!(&sealed[NONCE_SIZE..], b"ghp_secret");
        assert_eq!(cipher.decrypt(&sealed).unwrap().as_slice(), b"ghp_secret");
    }

    #[test]
    fn test_wrong_key_is_invalid_ciphertext() {
        let sealed = Cipher::new(&zero_key()).encrypt(b"ghp_secret").unwrap();

        let mut other = [0u8; KEY_SIZE];
        other[31] = 1;
        let other = Cipher::new(&MasterKey::from_slice(&other).unwrap());

        assert!(matches!(other.decrypt(&sealed), Err(CryptoError::InvalidCiphertext)));
    }

    #[test]
    fn test_nonces_differ_between_calls() {
        let cipher = Cipher::new(&zero_key());
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a, b);
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
    }

    #[test]
    fn test_empty_input_rejected() {
        let cipher = Cipher::new(&zero_key());
        assert!(matches!(cipher.encrypt(b""), Err(CryptoError::EmptyInput)));
    }

    #[test]
    fn test_short_and_tampered_ciphertext() {
        let cipher = Cipher::new(&zero_key());
        assert!(matches!(cipher.decrypt(&[1, 2, 3]), Err(CryptoError::InvalidCiphertext)));

        let mut sealed = cipher.encrypt(b"payload").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x80;
        assert!(matches!(cipher.decrypt(&sealed), Err(CryptoError::InvalidCiphertext)));
    }

    #[test]
    fn test_string_helpers() {
        let cipher = Cipher::new(&generate_key().unwrap());
        assert_eq!(cipher.encrypt_string("").unwrap(), "");
        assert_eq!(cipher.decrypt_string("").unwrap(), "");

        let encoded = cipher.encrypt_string("xoxb-token").unwrap();
        assert_ne!(encoded, "xoxb-token");
        assert_eq!(cipher.decrypt_string(&encoded).unwrap(), "xoxb-token");
        assert!(matches!(
            cipher.decrypt_string("%%%not-base64"),
            Err(CryptoError::InvalidCiphertext)
        ));
    }

    #[test]
    fn test_key_length_validation() {
        assert!(matches!(MasterKey::from_slice(&[0u8; 16]), Err(CryptoError::InvalidKey { .. })));
        assert!(matches!(MasterKey::from_base64("AAAA"), Err(CryptoError::InvalidKey { .. })));
        assert!(matches!(MasterKey::from_base64("not base64!"), Err(CryptoError::InvalidKey { .. })));

        let key = generate_key().unwrap();
        let again = MasterKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key.as_bytes(), again.as_bytes());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = generate_key().unwrap();
        assert_eq!(format!("{:?}", key), "MasterKey(<redacted>)");
    }
}
