//! Signing identity for the bot wallet.
//!
//! Turns the configured secret string into an Ed25519 key pair and the
//! derived Sui address. Accepted encodings, tried in order:
//!
//! 1. Bech32 `suiprivkey1…` (scheme flag + 32-byte secret)
//! 2. `0x` + 64 hex chars
//! 3. 64 hex chars
//! 4. 44-char base64 (32-byte secret, or flag + secret)
//! 5. Anything else is treated as hex with a `0x` prefix added if missing
//!
//! The secret is never logged and never appears in `Debug` output.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signer, SigningKey};
use secrecy::{ExposeSecret, SecretString};

use crate::types::SwapError;

/// Human-readable part of Bech32 private keys.
const BECH32_HRP: &str = "suiprivkey";

/// Signature scheme flag for Ed25519.
const ED25519_FLAG: u8 = 0x00;

/// Intent prefix for transaction data: (scope, version, app_id).
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

const SECRET_KEY_LEN: usize = 32;

type Blake2b256 = Blake2b<U32>;

/// Ed25519 key pair plus its Sui address. Created once, never rotated.
pub struct SigningIdentity {
    key: SigningKey,
    address: String,
}

impl SigningIdentity {
    /// Derive an identity from a secret in any accepted encoding.
    pub fn load(secret: &SecretString) -> Result<Self, SwapError> {
        let bytes = decode_secret(secret.expose_secret().trim())?;
        Ok(Self::from_secret_bytes(&bytes))
    }

    fn from_secret_bytes(bytes: &[u8; SECRET_KEY_LEN]) -> Self {
        let key = SigningKey::from_bytes(bytes);
        let address = derive_address(&key.verifying_key().to_bytes());
        Self { key, address }
    }

    /// `0x`-prefixed, 64 hex char Sui address.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    /// Sign BCS transaction bytes under the transaction intent.
    ///
    /// Returns the base64 serialized signature `flag ‖ sig ‖ pubkey`.
    pub fn sign_transaction(&self, tx_bytes: &[u8]) -> String {
        let mut intent_msg = Vec::with_capacity(TRANSACTION_INTENT.len() + tx_bytes.len());
        intent_msg.extend_from_slice(&TRANSACTION_INTENT);
        intent_msg.extend_from_slice(tx_bytes);
        let digest = Blake2b256::digest(&intent_msg);

        let signature = self.key.sign(digest.as_slice());

        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(&self.public_key());
        BASE64.encode(serialized)
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// `0x` ‖ hex(blake2b-256(flag ‖ pubkey)).
pub fn derive_address(public_key: &[u8; 32]) -> String {
    let mut hasher = Blake2b256::new();
    hasher.update([ED25519_FLAG]);
    hasher.update(public_key);
    format!("0x{}", hex::encode(hasher.finalize()))
}

fn decode_secret(secret: &str) -> Result<[u8; SECRET_KEY_LEN], SwapError> {
    if secret.starts_with(BECH32_HRP) {
        return decode_bech32(secret);
    }

    if secret.len() == 66 && secret.starts_with("0x") {
        return decode_hex(&secret[2..]);
    }

    if secret.len() == 64 && secret.chars().all(|c| c.is_ascii_hexdigit()) {
        return decode_hex(secret);
    }

    if secret.len() == 44 {
        return decode_base64(secret);
    }

    decode_hex(secret.strip_prefix("0x").unwrap_or(secret))
}

fn decode_bech32(secret: &str) -> Result<[u8; SECRET_KEY_LEN], SwapError> {
    let (hrp, data) = bech32::decode(secret)
        .map_err(|e| SwapError::InvalidKeyFormat(format!("bech32: {e}")))?;
    if hrp.as_str() != BECH32_HRP {
        return Err(SwapError::InvalidKeyFormat(format!(
            "unexpected bech32 prefix '{hrp}'"
        )));
    }
    match data.split_first() {
        Some((&ED25519_FLAG, key)) => to_key_bytes(key),
        Some((flag, _)) => Err(SwapError::InvalidKeyFormat(format!(
            "unsupported key scheme flag 0x{flag:02x}"
        ))),
        None => Err(SwapError::InvalidKeyFormat("empty bech32 payload".into())),
    }
}

fn decode_hex(s: &str) -> Result<[u8; SECRET_KEY_LEN], SwapError> {
    let bytes = hex::decode(s).map_err(|e| SwapError::InvalidKeyFormat(format!("hex: {e}")))?;
    to_key_bytes(&bytes)
}

fn decode_base64(s: &str) -> Result<[u8; SECRET_KEY_LEN], SwapError> {
    let bytes = BASE64
        .decode(s)
        .map_err(|e| SwapError::InvalidKeyFormat(format!("base64: {e}")))?;
    match bytes.len() {
        SECRET_KEY_LEN => to_key_bytes(&bytes),
        33 if bytes[0] == ED25519_FLAG => to_key_bytes(&bytes[1..]),
        33 => Err(SwapError::InvalidKeyFormat(format!(
            "unsupported key scheme flag 0x{:02x}",
            bytes[0]
        ))),
        n => Err(SwapError::InvalidKeyFormat(format!(
            "base64 secret decodes to {n} bytes"
        ))),
    }
}

fn to_key_bytes(bytes: &[u8]) -> Result<[u8; SECRET_KEY_LEN], SwapError> {
    <[u8; SECRET_KEY_LEN]>::try_from(bytes).map_err(|_| {
        SwapError::InvalidKeyFormat(format!(
            "expected {SECRET_KEY_LEN} secret bytes, got {}",
            bytes.len()
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
