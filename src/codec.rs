//! Authenticated (and optionally encrypted) token codec.
//!
//! A [`SecureCookie`] turns any serializable value into a self-authenticating
//! token and back. Values are serialized with MessagePack, optionally sealed
//! with AES-GCM, and signed with HMAC-SHA256 together with a name tag and a
//! creation timestamp:
//!
//! ```text
//! token = base64url( "<unix-ts>|<base64url(payload)>|" ++ hmac(name|<unix-ts>|<base64url(payload)>) )
//! ```
//!
//! A [`CodecChain`] holds several codecs for key rotation: it encodes with the
//! first one and accepts tokens produced by any of them.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

/// Tokens older than this many seconds are rejected by default (30 days).
pub const DEFAULT_MAX_AGE: i64 = 86400 * 30;

/// Longest accepted token by default, in bytes.
pub const DEFAULT_MAX_LENGTH: usize = 4096;

const NONCE_LEN: usize = 12;

/// Errors raised while building codecs or encoding/decoding tokens.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("hash key is not set")]
    HashKeyNotSet,

    #[error("block key must be 16 or 32 bytes, got {0}")]
    InvalidBlockKey(usize),

    #[error("no codecs configured")]
    NoCodecs,

    #[error("failed to serialize value: {0}")]
    Encode(String),

    #[error("failed to deserialize value: {0}")]
    Decode(String),

    #[error("failed to encrypt value")]
    Encrypt,

    #[error("failed to decrypt value")]
    Decrypt,

    #[error("token is not valid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not verify")]
    InvalidMac,

    #[error("token timestamp has expired")]
    Expired,

    #[error("token is {0} bytes, longer than the limit")]
    TooLong(usize),

    #[error("no codec could decode the token: {0:?}")]
    NoMatch(Vec<CodecError>),
}

#[derive(Clone)]
enum BlockCipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl BlockCipher {
    fn new(key: &[u8]) -> Result<Self, CodecError> {
        let invalid = |_| CodecError::InvalidBlockKey(key.len());
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key).map(Self::Aes128).map_err(invalid),
            32 => Aes256Gcm::new_from_slice(key).map(Self::Aes256).map_err(invalid),
            len => Err(CodecError::InvalidBlockKey(len)),
        }
    }

    /// Returns `nonce || ciphertext`.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = match self {
            Self::Aes128(cipher) => cipher.encrypt(&nonce, plaintext),
            Self::Aes256(cipher) => cipher.encrypt(&nonce, plaintext),
        }
        .map_err(|_| CodecError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CodecError> {
        if sealed.len() < NONCE_LEN {
            return Err(CodecError::Decrypt);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce);
        match self {
            Self::Aes128(cipher) => cipher.decrypt(nonce, ciphertext),
            Self::Aes256(cipher) => cipher.decrypt(nonce, ciphertext),
        }
        .map_err(|_| CodecError::Decrypt)
    }
}

/// A single signer/verifier, optionally encrypting.
#[derive(Clone)]
pub struct SecureCookie {
    hash_key: Vec<u8>,
    cipher: Option<BlockCipher>,
    max_age: i64,
    max_length: usize,
}

impl fmt::Debug for SecureCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureCookie")
            .field("encrypted", &self.cipher.is_some())
            .field("max_age", &self.max_age)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl SecureCookie {
    /// Creates a codec that signs with `hash_key` and, if `block_key` is
    /// given, also encrypts with AES-GCM.
    pub fn new(hash_key: &[u8], block_key: Option<&[u8]>) -> Result<Self, CodecError> {
        if hash_key.is_empty() {
            return Err(CodecError::HashKeyNotSet);
        }
        let cipher = block_key.map(BlockCipher::new).transpose()?;
        Ok(Self {
            hash_key: hash_key.to_vec(),
            cipher,
            max_age: DEFAULT_MAX_AGE,
            max_length: DEFAULT_MAX_LENGTH,
        })
    }

    /// Maximum token age in seconds; `0` disables the check.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.set_max_age(seconds);
        self
    }

    pub fn set_max_age(&mut self, seconds: i64) {
        self.max_age = seconds;
    }

    /// Maximum token length in bytes; `0` disables the check.
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.set_max_length(length);
        self
    }

    pub fn set_max_length(&mut self, length: usize) {
        self.max_length = length;
    }

    pub fn encode<T>(&self, name: &str, value: &T) -> Result<String, CodecError>
    where
        T: Serialize + ?Sized,
    {
        let mut payload = rmp_serde::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))?;
        if let Some(cipher) = &self.cipher {
            payload = cipher.encrypt(&payload)?;
        }
        let payload = URL_SAFE_NO_PAD.encode(payload);
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();

        let mac = self.sign(name, timestamp.as_bytes(), payload.as_bytes())?;
        let mut token = Vec::with_capacity(timestamp.len() + payload.len() + 2 + mac.len());
        token.extend_from_slice(timestamp.as_bytes());
        token.push(b'|');
        token.extend_from_slice(payload.as_bytes());
        token.push(b'|');
        token.extend_from_slice(&mac);

        let token = URL_SAFE_NO_PAD.encode(token);
        if self.max_length != 0 && token.len() > self.max_length {
            return Err(CodecError::TooLong(token.len()));
        }
        Ok(token)
    }

    pub fn decode<T>(&self, name: &str, token: &str) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        if self.max_length != 0 && token.len() > self.max_length {
            return Err(CodecError::TooLong(token.len()));
        }
        let raw = URL_SAFE_NO_PAD.decode(token)?;

        // The MAC is raw bytes and may itself contain `|`.
        let mut parts = raw.splitn(3, |b| *b == b'|');
        let (Some(timestamp), Some(payload), Some(mac)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CodecError::Malformed);
        };
        self.verify(name, timestamp, payload, mac)?;

        let issued_at: i64 = std::str::from_utf8(timestamp)
            .ok()
            .and_then(|t| t.parse().ok())
            .ok_or(CodecError::Malformed)?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        if self.max_age != 0 && issued_at < now - self.max_age {
            return Err(CodecError::Expired);
        }

        let mut payload = URL_SAFE_NO_PAD.decode(payload)?;
        if let Some(cipher) = &self.cipher {
            payload = cipher.decrypt(&payload)?;
        }
        rmp_serde::from_slice(&payload).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn mac(&self, name: &str, timestamp: &[u8], payload: &[u8]) -> Result<HmacSha256, CodecError> {
        // `KeyInit` is in scope for the ciphers, so name the trait.
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.hash_key)
            .map_err(|_| CodecError::HashKeyNotSet)?;
        mac.update(name.as_bytes());
        mac.update(b"|");
        mac.update(timestamp);
        mac.update(b"|");
        mac.update(payload);
        Ok(mac)
    }

    fn sign(&self, name: &str, timestamp: &[u8], payload: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(self
            .mac(name, timestamp, payload)?
            .finalize()
            .into_bytes()
            .to_vec())
    }

    fn verify(
        &self,
        name: &str,
        timestamp: &[u8],
        payload: &[u8],
        tag: &[u8],
    ) -> Result<(), CodecError> {
        self.mac(name, timestamp, payload)?
            .verify_slice(tag)
            .map_err(|_| CodecError::InvalidMac)
    }
}

/// Ordered codecs: the head encodes, every member may decode.
///
/// Rotate keys by prepending a new pair and keeping the old ones until tokens
/// issued under them have aged out.
#[derive(Debug, Clone)]
pub struct CodecChain {
    codecs: Vec<SecureCookie>,
}

impl CodecChain {
    pub fn new(codecs: Vec<SecureCookie>) -> Self {
        Self { codecs }
    }

    /// Builds one codec per pair of keys: hash key, then block key.
    ///
    /// An empty block key (or a trailing hash key without a partner) yields a
    /// codec that signs without encrypting.
    pub fn from_key_pairs<I>(keys: I) -> Result<Self, CodecError>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let keys: Vec<I::Item> = keys.into_iter().collect();
        let codecs = keys
            .chunks(2)
            .map(|pair| {
                let block_key: Option<&[u8]> = pair
                    .get(1)
                    .map(|key| key.as_ref())
                    .filter(|key| !key.is_empty());
                SecureCookie::new(pair[0].as_ref(), block_key)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { codecs })
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub fn set_max_age(&mut self, seconds: i64) {
        for codec in &mut self.codecs {
            codec.set_max_age(seconds);
        }
    }

    pub fn set_max_length(&mut self, length: usize) {
        for codec in &mut self.codecs {
            codec.set_max_length(length);
        }
    }

    pub fn encode<T>(&self, name: &str, value: &T) -> Result<String, CodecError>
    where
        T: Serialize + ?Sized,
    {
        self.codecs
            .first()
            .ok_or(CodecError::NoCodecs)?
            .encode(name, value)
    }

    pub fn decode<T>(&self, name: &str, token: &str) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        if self.codecs.is_empty() {
            return Err(CodecError::NoCodecs);
        }
        let mut errors = Vec::with_capacity(self.codecs.len());
        for codec in &self.codecs {
            match codec.decode(name, token) {
                Ok(value) => return Ok(value),
                Err(e) => errors.push(e),
            }
        }
        Err(CodecError::NoMatch(errors))
    }
}
