//! Transaction building, packing and signing.
//!
//! # Responsibilities
//! - Derive the TAPOS header from a reference block
//! - Pack header and actions into the binary wire format
//! - Compute the signing digest and the transaction id

use chrono::NaiveDateTime;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::chain::action::Action;
use crate::chain::keys::SignerSet;
use crate::chain::serialize::{Pack, Packer};
use crate::chain::types::{Block, ChainError, ChainResult};

/// Submission options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactOptions {
    /// How far behind head the TAPOS reference block is taken.
    pub blocks_behind: u32,
    /// Lifetime of the transaction past the reference block time.
    pub expire_seconds: u32,
}

impl Default for TransactOptions {
    fn default() -> Self {
        Self {
            blocks_behind: 3,
            expire_seconds: 30,
        }
    }
}

/// Transaction header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHeader {
    pub expiration: u32,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_net_usage_words: u32,
    pub max_cpu_usage_ms: u8,
    pub delay_sec: u32,
}

impl TransactionHeader {
    /// Header referencing `block`, expiring `expire_seconds` after its timestamp.
    pub fn from_reference(block: &Block, expire_seconds: u32) -> ChainResult<Self> {
        let block_time = parse_block_time(&block.timestamp)?;
        Ok(Self {
            expiration: block_time.saturating_add(expire_seconds),
            ref_block_num: (block.block_num & 0xffff) as u16,
            ref_block_prefix: block.ref_block_prefix,
            max_net_usage_words: 0,
            max_cpu_usage_ms: 0,
            delay_sec: 0,
        })
    }
}

impl Pack for TransactionHeader {
    fn pack(&self, p: &mut Packer) {
        p.u32(self.expiration);
        p.u16(self.ref_block_num);
        p.u32(self.ref_block_prefix);
        p.varuint32(self.max_net_usage_words);
        p.u8(self.max_cpu_usage_ms);
        p.varuint32(self.delay_sec);
    }
}

/// Block timestamps look like `2024-01-01T00:00:00.500`, always UTC.
/// Rounded to the nearest second.
fn parse_block_time(timestamp: &str) -> ChainResult<u32> {
    let trimmed = timestamp.trim_end_matches('Z');
    let parsed = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| ChainError::InvalidResponse(format!("Bad block timestamp '{}': {}", timestamp, e)))?;
    let millis = parsed.and_utc().timestamp_millis();
    u32::try_from((millis + 500) / 1000)
        .map_err(|_| ChainError::InvalidResponse(format!("Block timestamp out of range: {}", timestamp)))
}

/// An unsigned transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub header: TransactionHeader,
    pub actions: Vec<Action>,
}

impl Transaction {
    pub fn new(header: TransactionHeader, actions: Vec<Action>) -> ChainResult<Self> {
        if actions.is_empty() {
            return Err(ChainError::EmptyTransaction);
        }
        Ok(Self { header, actions })
    }

    /// Transaction id: hex sha256 of the packed transaction.
    pub fn id(&self) -> String {
        hex::encode(Sha256::digest(self.packed()))
    }

    /// `sha256(chain_id || packed_trx || 32 zero bytes)`; no context-free data
    /// is ever attached.
    pub fn signing_digest(&self, chain_id: &[u8; 32]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(chain_id);
        hasher.update(self.packed());
        hasher.update([0u8; 32]);
        hasher.finalize().into()
    }

    /// Sign with every key in `signer` and produce the push body.
    pub fn sign(&self, chain_id: &[u8; 32], signer: &SignerSet) -> PackedTransaction {
        let digest = self.signing_digest(chain_id);
        PackedTransaction {
            signatures: signer.sign(&digest).iter().map(ToString::to_string).collect(),
            compression: 0,
            packed_context_free_data: String::new(),
            packed_trx: hex::encode(self.packed()),
        }
    }
}

impl Pack for Transaction {
    fn pack(&self, p: &mut Packer) {
        self.header.pack(p);
        // context_free_actions
        p.varuint32(0);
        self.actions.pack(p);
        // transaction_extensions
        p.varuint32(0);
    }
}

/// Body of `/v1/chain/push_transaction`.
#[derive(Debug, Clone, Serialize)]
pub struct PackedTransaction {
    pub signatures: Vec<String>,
    pub compression: u8,
    pub packed_context_free_data: String,
    pub packed_trx: String,
}

/// Decode a hex chain id.
pub fn parse_chain_id(chain_id: &str) -> ChainResult<[u8; 32]> {
    let bytes = hex::decode(chain_id)
        .map_err(|e| ChainError::InvalidResponse(format!("Bad chain id: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| ChainError::InvalidResponse("Chain id must be 32 bytes".to_string()))
}
