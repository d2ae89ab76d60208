//! Fee estimation types.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::chain::types::ChainError;

pub const CERTIFICATE_BYTES: u64 = 124;
pub const SIGNER_CREATE_BYTES: u64 = 3048;
pub const INSTITUTION_CREATE_BYTES: u64 = 143;
pub const SIGNER_ADD_BYTES: u64 = 9;
pub const PARTICIPANT_ADD_BYTES: u64 = 8;
/// Allowance for variable-length strings in a batch.
pub const STRING_OVERHEAD_BYTES: u64 = 20;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The rammarket row did not have the expected shape.
    #[error("Unexpected rammarket row: {0}")]
    Market(String),

    #[error("Price feed error: {0}")]
    Feed(String),
}

pub type PricingResult<T> = Result<T, PricingError>;

/// Operation counts to estimate. Every count is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceRequest {
    #[serde(alias = "signerCreate", default)]
    pub signer_create: Option<u64>,
    #[serde(alias = "institutionCreate", default)]
    pub institution_create: Option<u64>,
    #[serde(alias = "signerAdd", default)]
    pub signer_add: Option<u64>,
    #[serde(alias = "participantAdd", default)]
    pub participant_add: Option<u64>,
}

/// Byte cost per operation group for one estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationBytes {
    pub certificate: u64,
    pub signer_create: u64,
    pub institution_create: u64,
    pub signer_add: u64,
    pub participant_add: u64,
    pub overhead: u64,
}

impl OperationBytes {
    pub fn from_request(request: &PriceRequest) -> PricingResult<Self> {
        fn count(value: Option<u64>, field: &str) -> PricingResult<u64> {
            value.ok_or_else(|| PricingError::Validation(format!("Valid {} has not been provided.", field)))
        }
        fn cost(units: u64, per_unit: u64, field: &str) -> PricingResult<u64> {
            units
                .checked_mul(per_unit)
                .ok_or_else(|| PricingError::Validation(format!("{} is too large.", field)))
        }

        let bytes = Self {
            certificate: CERTIFICATE_BYTES,
            signer_create: cost(count(request.signer_create, "signer_create")?, SIGNER_CREATE_BYTES, "signer_create")?,
            institution_create: cost(
                count(request.institution_create, "institution_create")?,
                INSTITUTION_CREATE_BYTES,
                "institution_create",
            )?,
            signer_add: cost(count(request.signer_add, "signer_add")?, SIGNER_ADD_BYTES, "signer_add")?,
            participant_add: cost(
                count(request.participant_add, "participant_add")?,
                PARTICIPANT_ADD_BYTES,
                "participant_add",
            )?,
            overhead: STRING_OVERHEAD_BYTES,
        };
        if bytes.checked_total().is_none() {
            return Err(PricingError::Validation("Requested operation counts are too large.".to_string()));
        }
        Ok(bytes)
    }

    fn checked_total(&self) -> Option<u64> {
        [
            self.signer_create,
            self.institution_create,
            self.signer_add,
            self.participant_add,
            self.overhead,
        ]
        .into_iter()
        .try_fold(self.certificate, u64::checked_add)
    }

    /// Saturates; [`OperationBytes::from_request`] already rejects overflowing sums.
    pub fn total(&self) -> u64 {
        self.checked_total().unwrap_or(u64::MAX)
    }
}

/// EOS figures, fixed-point with four decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EosBreakdown {
    pub total_estimate: String,
    pub certificate: String,
    pub create_signer: String,
    pub create_institution: String,
    pub add_signer: String,
    pub add_participant: String,
}

/// Fiat figures rounded to four decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatBreakdown {
    pub total_estimate: f64,
    pub certificate: f64,
    pub create_signer: f64,
    pub create_institution: f64,
    pub add_signer: f64,
    pub add_participant: f64,
}

/// Serialized as `{totalBytes, eosPrice, <currency>Price}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceEstimate {
    pub total_bytes: u64,
    pub eos_price: EosBreakdown,
    pub fiat_currency: String,
    pub fiat_price: FiatBreakdown,
}

impl Serialize for PriceEstimate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("totalBytes", &self.total_bytes)?;
        map.serialize_entry("eosPrice", &self.eos_price)?;
        map.serialize_entry(&format!("{}Price", self.fiat_currency.to_lowercase()), &self.fiat_price)?;
        map.end()
    }
}
