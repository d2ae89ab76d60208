//! Key management and transaction signing.
//!
//! # Security
//! - The operator key is loaded ONLY from the environment
//! - Keys are never logged or serialized; `Debug` is redacted
//! - Signatures are canonical (nodes reject high-bit r/s values)

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use ripemd::Ripemd160;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, SecretKey, SECP256K1};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::chain::serialize::{Pack, Packer};
use crate::chain::types::{ChainError, ChainResult};

/// Environment variable name for the operator private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "EOS_PRIVATE_KEY";

const LEGACY_PUBLIC_PREFIX: &str = "EOS";
const K1_PUBLIC_PREFIX: &str = "PUB_K1_";
const K1_PRIVATE_PREFIX: &str = "PVT_K1_";
const K1_SIGNATURE_PREFIX: &str = "SIG_K1_";
const WIF_VERSION: u8 = 0x80;

fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// First four bytes of `ripemd160(data || suffix)`.
fn k1_checksum(data: &[u8], suffix: &[u8]) -> [u8; 4] {
    let mut buf = data.to_vec();
    buf.extend_from_slice(suffix);
    let hash = ripemd160(&buf);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Base58 decode and split off a 4-byte checksum.
fn decode_checked(encoded: &str, payload_len: usize) -> ChainResult<(Vec<u8>, [u8; 4])> {
    let raw = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| ChainError::Key(format!("Invalid base58: {}", e)))?;
    if raw.len() != payload_len + 4 {
        return Err(ChainError::Key(format!(
            "Expected {} bytes, got {}",
            payload_len + 4,
            raw.len()
        )));
    }
    let (payload, checksum) = raw.split_at(payload_len);
    Ok((payload.to_vec(), [checksum[0], checksum[1], checksum[2], checksum[3]]))
}

/// A K1 (secp256k1) private key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(SecretKey);

impl PrivateKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(secret) = SecretKey::from_slice(&bytes) {
                return Self(secret);
            }
        }
    }

    /// Parse a legacy WIF key (`5…`) or a `PVT_K1_…` key.
    pub fn from_string(s: &str) -> ChainResult<Self> {
        let s = s.trim();
        let secret_bytes = if let Some(body) = s.strip_prefix(K1_PRIVATE_PREFIX) {
            let (payload, checksum) = decode_checked(body, 32)?;
            if k1_checksum(&payload, b"K1") != checksum {
                return Err(ChainError::Key("Private key checksum mismatch".to_string()));
            }
            payload
        } else {
            let (payload, checksum) = decode_checked(s, 33)?;
            if payload[0] != WIF_VERSION {
                return Err(ChainError::Key("Invalid WIF version byte".to_string()));
            }
            let hash = sha256(&sha256(&payload));
            if hash[..4] != checksum {
                return Err(ChainError::Key("Private key checksum mismatch".to_string()));
            }
            payload[1..].to_vec()
        };

        SecretKey::from_slice(&secret_bytes)
            .map(Self)
            .map_err(|e| ChainError::Key(format!("Invalid private key: {}", e)))
    }

    /// Legacy WIF encoding, the format wallets import.
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(37);
        payload.push(WIF_VERSION);
        payload.extend_from_slice(&self.0.secret_bytes());
        let hash = sha256(&sha256(&payload));
        payload.extend_from_slice(&hash[..4]);
        bs58::encode(payload).into_string()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(secp256k1::PublicKey::from_secret_key(SECP256K1, &self.0))
    }

    /// Sign a 32-byte digest, retrying with fresh nonce data until the
    /// signature is canonical.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Signature {
        let message = Message::from_digest(*digest);
        let mut attempt: u32 = 0;
        loop {
            let signature = if attempt == 0 {
                SECP256K1.sign_ecdsa_recoverable(&message, &self.0)
            } else {
                let mut noncedata = [0u8; 32];
                noncedata[..4].copy_from_slice(&attempt.to_le_bytes());
                SECP256K1.sign_ecdsa_recoverable_with_noncedata(&message, &self.0, &noncedata)
            };
            let signature = Signature::from_recoverable(&signature);
            if signature.is_canonical() {
                return signature;
            }
            attempt += 1;
        }
    }
}

impl FromStr for PrivateKey {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A K1 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(secp256k1::PublicKey);

impl PublicKey {
    pub fn to_bytes(&self) -> [u8; 33] {
        self.0.serialize()
    }
}

impl FromStr for PublicKey {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bytes = if let Some(body) = s.strip_prefix(K1_PUBLIC_PREFIX) {
            let (payload, checksum) = decode_checked(body, 33)?;
            if k1_checksum(&payload, b"K1") != checksum {
                return Err(ChainError::Key("Public key checksum mismatch".to_string()));
            }
            payload
        } else if let Some(body) = s.strip_prefix(LEGACY_PUBLIC_PREFIX) {
            let (payload, checksum) = decode_checked(body, 33)?;
            if k1_checksum(&payload, b"") != checksum {
                return Err(ChainError::Key("Public key checksum mismatch".to_string()));
            }
            payload
        } else {
            return Err(ChainError::Key(format!("Unrecognized public key format: {}", s)));
        };

        secp256k1::PublicKey::from_slice(&bytes)
            .map(Self)
            .map_err(|e| ChainError::Key(format!("Invalid public key: {}", e)))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        let mut data = bytes.to_vec();
        data.extend_from_slice(&k1_checksum(&bytes, b""));
        write!(f, "{}{}", LEGACY_PUBLIC_PREFIX, bs58::encode(data).into_string())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Pack for PublicKey {
    fn pack(&self, p: &mut Packer) {
        // Variant index 0 = K1.
        p.varuint32(0);
        p.raw(&self.to_bytes());
    }
}

/// A compact recoverable K1 signature: `[27 + 4 + recid, r(32), s(32)]`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 65]);

impl Signature {
    fn from_recoverable(signature: &RecoverableSignature) -> Self {
        let (recovery_id, compact) = signature.serialize_compact();
        let mut bytes = [0u8; 65];
        bytes[0] = 27 + 4 + recovery_id.to_i32() as u8;
        bytes[1..].copy_from_slice(&compact);
        Self(bytes)
    }

    /// Neither r nor s may have the high bit set or a redundant leading zero.
    pub fn is_canonical(&self) -> bool {
        let b = &self.0;
        (b[1] & 0x80) == 0
            && !(b[1] == 0 && (b[2] & 0x80) == 0)
            && (b[33] & 0x80) == 0
            && !(b[33] == 0 && (b[34] & 0x80) == 0)
    }

    /// Recover the signing public key for a digest.
    pub fn recover(&self, digest: &[u8; 32]) -> ChainResult<PublicKey> {
        let recovery_id = RecoveryId::from_i32(self.0[0] as i32 - 31)
            .map_err(|e| ChainError::Key(format!("Invalid recovery id: {}", e)))?;
        let signature = RecoverableSignature::from_compact(&self.0[1..], recovery_id)
            .map_err(|e| ChainError::Key(format!("Invalid signature: {}", e)))?;
        SECP256K1
            .recover_ecdsa(&Message::from_digest(*digest), &signature)
            .map(PublicKey)
            .map_err(|e| ChainError::Key(format!("Recovery failed: {}", e)))
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut data = self.0.to_vec();
        data.extend_from_slice(&k1_checksum(&self.0, b"K1"));
        write!(f, "{}{}", K1_SIGNATURE_PREFIX, bs58::encode(data).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

/// A freshly generated key pair handed to a new account owner.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let private_key = PrivateKey::generate();
        let public_key = private_key.public_key();
        Self { private_key, public_key }
    }
}

/// The set of keys a transaction is signed with.
///
/// The process-wide set holds only the operator key. Co-signed flows build a
/// new set with [`SignerSet::with_key`]; the original is left untouched.
#[derive(Debug, Clone)]
pub struct SignerSet {
    keys: Vec<PrivateKey>,
}

impl SignerSet {
    pub fn new(primary: PrivateKey) -> Self {
        tracing::info!(public_key = %primary.public_key(), "Signer initialized");
        Self { keys: vec![primary] }
    }

    /// Load the operator key from `EOS_PRIVATE_KEY`.
    pub fn from_env() -> ChainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            ChainError::Key(format!("Environment variable {} not set", PRIVATE_KEY_ENV_VAR))
        })?;
        Ok(Self::new(private_key.parse()?))
    }

    /// A copy of this set extended with `key`. Duplicate keys are ignored.
    pub fn with_key(&self, key: PrivateKey) -> Self {
        let mut keys = self.keys.clone();
        if !keys.contains(&key) {
            keys.push(key);
        }
        Self { keys }
    }

    pub fn public_keys(&self) -> Vec<PublicKey> {
        self.keys.iter().map(PrivateKey::public_key).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sign a digest with every key in the set.
    pub fn sign(&self, digest: &[u8; 32]) -> Vec<Signature> {
        self.keys.iter().map(|key| key.sign_digest(digest)).collect()
    }
}
