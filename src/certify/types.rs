//! Request shapes and errors for the certification contract.
//!
//! Requests accept both the institution and the corporate spelling of every
//! field; the builder decides which one the contract wants.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::chain::types::ChainError;
pub use crate::config::schema::EntityKind;

impl EntityKind {
    /// Lower-case noun used in messages and as the entity table name.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Institution => "institution",
            EntityKind::Corporate => "corporate",
        }
    }

    /// Table holding entity rows, scoped by the contract account.
    pub fn entity_table(&self) -> &'static str {
        self.label()
    }

    /// Request field carrying the owning entity id.
    pub fn owner_param(&self) -> &'static str {
        match self {
            EntityKind::Institution => "institutionId",
            EntityKind::Corporate => "corporateId",
        }
    }

    /// Request field carrying the entity display name.
    pub fn name_param(&self) -> &'static str {
        match self {
            EntityKind::Institution => "institutionName",
            EntityKind::Corporate => "corporateName",
        }
    }

    /// Contract parameter carrying the owning entity id.
    pub fn owner_field(&self) -> &'static str {
        match self {
            EntityKind::Institution => "institutionid",
            EntityKind::Corporate => "corporateid",
        }
    }

    pub fn title_field(&self) -> &'static str {
        match self {
            EntityKind::Institution => "certificatename",
            EntityKind::Corporate => "certtemplate",
        }
    }

    pub fn members_field(&self) -> &'static str {
        match self {
            EntityKind::Institution => "participants",
            EntityKind::Corporate => "assignees",
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    /// A field is missing or malformed. Raised before any network call.
    #[error("{0}")]
    Validation(String),

    /// A composite step needs a group that was not supplied.
    #[error("{0}")]
    MissingDependency(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

/// Ids arrive as JSON numbers, numeric strings, or query-string values.
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not a valid id", s))),
    }
}

/// A certificate member: an account name (institution) or a numeric id (corporate).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MemberRef {
    Id(u64),
    Name(String),
}

/// A signer entry: a bare account name or `{name, issigned}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SignerInput {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        issigned: bool,
    },
}

impl SignerInput {
    pub fn name(&self) -> &str {
        match self {
            SignerInput::Name(name) | SignerInput::Full { name, .. } => name,
        }
    }

    pub fn issigned(&self) -> bool {
        match self {
            SignerInput::Name(_) => false,
            SignerInput::Full { issigned, .. } => *issigned,
        }
    }
}

/// `/createinstitution`, `/createcorporate` and the entity group of `/createmultiple`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEntityRequest {
    #[serde(
        rename = "institutionId",
        alias = "corporateId",
        default,
        deserialize_with = "flexible_id"
    )]
    pub id: Option<u64>,
    #[serde(rename = "institutionName", alias = "corporateName", default)]
    pub name: Option<String>,
}

/// `/createcertificate` and the certificate group of `/createmultiple`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCertificateRequest {
    #[serde(rename = "certificateId", default, deserialize_with = "flexible_id")]
    pub certificate_id: Option<u64>,
    #[serde(
        rename = "institutionId",
        alias = "corporateId",
        default,
        deserialize_with = "flexible_id"
    )]
    pub owner_id: Option<u64>,
    #[serde(rename = "certificateName", alias = "template", default)]
    pub title: Option<String>,
    #[serde(rename = "participants", alias = "assignees", default)]
    pub members: Option<Vec<MemberRef>>,
}

/// `/deletecertificate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificateRef {
    #[serde(rename = "certificateId", default, deserialize_with = "flexible_id")]
    pub certificate_id: Option<u64>,
    #[serde(
        rename = "institutionId",
        alias = "corporateId",
        default,
        deserialize_with = "flexible_id"
    )]
    pub owner_id: Option<u64>,
}

/// `/addsigner`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddSignersRequest {
    #[serde(rename = "certificateId", default, deserialize_with = "flexible_id")]
    pub certificate_id: Option<u64>,
    #[serde(
        rename = "institutionId",
        alias = "corporateId",
        default,
        deserialize_with = "flexible_id"
    )]
    pub owner_id: Option<u64>,
    #[serde(default)]
    pub signers: Option<Vec<SignerInput>>,
}

/// `/signcertificate`. The signer's private key only ever lives in this request.
#[derive(Clone, Default, Deserialize)]
pub struct SignCertificateRequest {
    #[serde(default)]
    pub signer: Option<String>,
    #[serde(rename = "certificateId", default, deserialize_with = "flexible_id")]
    pub certificate_id: Option<u64>,
    #[serde(
        rename = "institutionId",
        alias = "corporateId",
        default,
        deserialize_with = "flexible_id"
    )]
    pub owner_id: Option<u64>,
    #[serde(rename = "signerPrivate", default)]
    pub signer_private: Option<String>,
}

impl std::fmt::Debug for SignCertificateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignCertificateRequest")
            .field("signer", &self.signer)
            .field("certificate_id", &self.certificate_id)
            .field("owner_id", &self.owner_id)
            .field("signer_private", &self.signer_private.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// `/createaccount` and `/createaccountandconfirm`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(rename = "accountName", default)]
    pub account_name: Option<String>,
}

/// `/createmultiple`: any subset of the three groups, applied in order
/// entity, certificate, signers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMultipleRequest {
    #[serde(alias = "corporate", default)]
    pub institution: Option<CreateEntityRequest>,
    #[serde(default)]
    pub certificate: Option<CreateCertificateRequest>,
    #[serde(default)]
    pub signers: Option<Vec<SignerInput>>,
}
