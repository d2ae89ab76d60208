//! Chain-specific types and error definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::chain::serialize::{Pack, Packer};

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC connection or request failed before the node answered.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node answered and rejected the request. The node's message is kept verbatim.
    #[error("{0}")]
    Rejected(String),

    /// The node answered with a body we could not interpret.
    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    /// Invalid key material or signing failure.
    #[error("Key error: {0}")]
    Key(String),

    /// Not a valid EOSIO account/action name.
    #[error("Invalid name '{0}'")]
    InvalidName(String),

    /// Not a valid asset string such as `0.0001 EOS`.
    #[error("Invalid asset '{0}'")]
    InvalidAsset(String),

    /// Action payload could not be encoded.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A transaction must carry at least one action.
    #[error("Transaction has no actions")]
    EmptyTransaction,
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

const NAME_CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// An EOSIO name: up to 13 characters of `.12345a-z` packed into a `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Name(pub u64);

impl Name {
    pub const EOSIO: Name = Name(0x5530_ea00_0000_0000);
    pub const ACTIVE: Name = Name(0x3232_eda8_0000_0000);

    /// Raw 64-bit value.
    pub fn value(&self) -> u64 {
        self.0
    }

    fn symbol(c: u8) -> Option<u64> {
        match c {
            b'a'..=b'z' => Some((c - b'a') as u64 + 6),
            b'1'..=b'5' => Some((c - b'1') as u64 + 1),
            b'.' => Some(0),
            _ => None,
        }
    }
}

impl FromStr for Name {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() > 13 {
            return Err(ChainError::InvalidName(s.to_string()));
        }

        let mut value = 0u64;
        for (i, &c) in bytes.iter().enumerate() {
            let sym = Self::symbol(c).ok_or_else(|| ChainError::InvalidName(s.to_string()))?;
            if i < 12 {
                value |= (sym & 0x1f) << (64 - 5 * (i + 1));
            } else {
                // The 13th character only has 4 bits left.
                if sym > 0x0f {
                    return Err(ChainError::InvalidName(s.to_string()));
                }
                value |= sym;
            }
        }

        let name = Name(value);
        // Trailing dots are not representable.
        if name.to_string() != s {
            return Err(ChainError::InvalidName(s.to_string()));
        }
        Ok(name)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [b'.'; 13];
        let mut tmp = self.0;
        for i in 0..13 {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            out[12 - i] = NAME_CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }
        let len = out.iter().rposition(|&c| c != b'.').map_or(0, |p| p + 1);
        // Charmap is pure ASCII.
        f.write_str(std::str::from_utf8(&out[..len]).map_err(|_| fmt::Error)?)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Pack for Name {
    fn pack(&self, p: &mut Packer) {
        p.u64(self.0);
    }
}

/// A token quantity, e.g. `0.0001 EOS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub amount: i64,
    pub precision: u8,
    pub code: String,
}

impl Asset {
    fn symbol_value(&self) -> u64 {
        let mut value = self.precision as u64;
        for (i, c) in self.code.bytes().enumerate() {
            value |= (c as u64) << (8 * (i + 1));
        }
        value
    }
}

impl FromStr for Asset {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChainError::InvalidAsset(s.to_string());
        let (amount_str, code) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let code = code.trim();
        if code.is_empty() || code.len() > 7 || !code.bytes().all(|c| c.is_ascii_uppercase()) {
            return Err(invalid());
        }

        let (int_part, frac_part) = amount_str.split_once('.').unwrap_or((amount_str, ""));
        let precision = u8::try_from(frac_part.len()).map_err(|_| invalid())?;
        if precision > 18 || !frac_part.bytes().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let amount: i64 = format!("{}{}", int_part, frac_part).parse().map_err(|_| invalid())?;

        Ok(Asset { amount, precision, code: code.to_string() })
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        if self.precision == 0 {
            return write!(f, "{}{} {}", sign, abs, self.code);
        }
        let scale = 10u64.pow(self.precision as u32);
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            abs / scale,
            abs % scale,
            self.code,
            width = self.precision as usize
        )
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Pack for Asset {
    fn pack(&self, p: &mut Packer) {
        p.i64(self.amount);
        p.u64(self.symbol_value());
    }
}

/// Subset of `/v1/chain/get_info`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainInfo {
    pub chain_id: String,
    pub head_block_num: u32,
    #[serde(default)]
    pub head_block_time: String,
    #[serde(default)]
    pub last_irreversible_block_num: u32,
    #[serde(default)]
    pub server_version_string: Option<String>,
}

/// Subset of `/v1/chain/get_block`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Block {
    pub block_num: u32,
    pub timestamp: String,
    pub ref_block_prefix: u32,
    #[serde(default)]
    pub transactions: Vec<TransactionReceipt>,
}

impl Block {
    /// Whether any receipt in this block carries the given transaction id.
    pub fn contains(&self, transaction_id: &str) -> bool {
        self.transactions
            .iter()
            .any(|receipt| receipt.trx.id() == transaction_id)
    }
}

/// A transaction receipt inside a block.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionReceipt {
    #[serde(default)]
    pub status: Option<String>,
    pub trx: ReceiptTrx,
}

/// Deferred transactions appear as a bare id, input transactions as an object.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ReceiptTrx {
    Id(String),
    Packed { id: String },
}

impl ReceiptTrx {
    pub fn id(&self) -> &str {
        match self {
            ReceiptTrx::Id(id) => id,
            ReceiptTrx::Packed { id } => id,
        }
    }
}

/// Body of `/v1/chain/get_table_rows`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableRowsRequest {
    pub json: bool,
    pub code: String,
    pub scope: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<String>,
    pub limit: u32,
    pub reverse: bool,
    pub show_payer: bool,
}

/// Response of `/v1/chain/get_table_rows`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TableRows {
    #[serde(default)]
    pub rows: Vec<Value>,
    #[serde(default)]
    pub more: Value,
}

/// A transaction accepted by the node.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedTransaction {
    pub transaction_id: String,
    /// Full node response, passed through to callers.
    pub raw: Value,
}
