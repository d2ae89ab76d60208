//! Action payloads for the certification contract.
//!
//! Parameter names depend on the contract variant, so the JSON side is
//! serialized by hand. Binary layout is identical for both variants apart from
//! the member element type.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::certify::types::EntityKind;
use crate::chain::serialize::{Pack, Packer};
use crate::chain::types::Name;

/// `createinst` / `createcorp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateEntity {
    pub id: u64,
    pub name: String,
}

impl Pack for CreateEntity {
    fn pack(&self, p: &mut Packer) {
        p.u64(self.id);
        p.string(&self.name);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Members {
    /// `vector<name>` participants.
    Names(Vec<Name>),
    /// `vector<uint64>` assignees.
    Ids(Vec<u64>),
}

impl Members {
    pub fn len(&self) -> usize {
        match self {
            Members::Names(v) => v.len(),
            Members::Ids(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for Members {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Members::Names(v) => v.serialize(serializer),
            Members::Ids(v) => v.serialize(serializer),
        }
    }
}

impl Pack for Members {
    fn pack(&self, p: &mut Packer) {
        match self {
            Members::Names(v) => v.pack(p),
            Members::Ids(v) => v.pack(p),
        }
    }
}

/// `createcert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCert {
    pub kind: EntityKind,
    pub id: u64,
    pub owner_id: u64,
    pub title: String,
    pub members: Members,
}

impl Serialize for CreateCert {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("createcert", 4)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field(self.kind.owner_field(), &self.owner_id)?;
        s.serialize_field(self.kind.title_field(), &self.title)?;
        s.serialize_field(self.kind.members_field(), &self.members)?;
        s.end()
    }
}

impl Pack for CreateCert {
    fn pack(&self, p: &mut Packer) {
        p.u64(self.id);
        p.u64(self.owner_id);
        p.string(&self.title);
        self.members.pack(p);
    }
}

/// `deletecert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCert {
    pub kind: EntityKind,
    pub id: u64,
    pub owner_id: u64,
}

impl Serialize for DeleteCert {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("deletecert", 2)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field(self.kind.owner_field(), &self.owner_id)?;
        s.end()
    }
}

impl Pack for DeleteCert {
    fn pack(&self, p: &mut Packer) {
        p.u64(self.id);
        p.u64(self.owner_id);
    }
}

/// The contract's `signer` struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertSigner {
    pub name: Name,
    pub issigned: bool,
}

impl Pack for CertSigner {
    fn pack(&self, p: &mut Packer) {
        self.name.pack(p);
        p.bool(self.issigned);
    }
}

/// `addsigner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSigner {
    pub kind: EntityKind,
    pub id: u64,
    pub owner_id: u64,
    pub signers: Vec<CertSigner>,
}

impl Serialize for AddSigner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("addsigner", 3)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field(self.kind.owner_field(), &self.owner_id)?;
        s.serialize_field("signers", &self.signers)?;
        s.end()
    }
}

impl Pack for AddSigner {
    fn pack(&self, p: &mut Packer) {
        p.u64(self.id);
        p.u64(self.owner_id);
        self.signers.pack(p);
    }
}

/// `signcert`. The contract spells the signer parameter `signerr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignCert {
    pub kind: EntityKind,
    pub id: u64,
    pub owner_id: u64,
    pub signer: Name,
}

impl Serialize for SignCert {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("signcert", 3)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field(self.kind.owner_field(), &self.owner_id)?;
        s.serialize_field("signerr", &self.signer)?;
        s.end()
    }
}

impl Pack for SignCert {
    fn pack(&self, p: &mut Packer) {
        p.u64(self.id);
        p.u64(self.owner_id);
        self.signer.pack(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_createcert_json_follows_kind() {
        let cert = CreateCert {
            kind: EntityKind::Corporate,
            id: 1,
            owner_id: 2,
            title: "tpl".to_string(),
            members: Members::Ids(vec![5, 6]),
        };
        assert_eq!(
            serde_json::to_value(&cert).unwrap(),
            json!({"id": 1, "corporateid": 2, "certtemplate": "tpl", "assignees": [5, 6]})
        );

        let cert = CreateCert {
            kind: EntityKind::Institution,
            members: Members::Names(vec!["alice".parse().unwrap()]),
            ..cert
        };
        assert_eq!(
            serde_json::to_value(&cert).unwrap(),
            json!({"id": 1, "institutionid": 2, "certificatename": "tpl", "participants": ["alice"]})
        );
    }

    #[test]
    fn test_deletecert_packing() {
        let del = DeleteCert { kind: EntityKind::Institution, id: 1, owner_id: 2 };
        assert_eq!(hex::encode(del.packed()), "01000000000000000200000000000000");
    }

    #[test]
    fn test_signer_packing() {
        let signer = CertSigner { name: Name::EOSIO, issigned: true };
        assert_eq!(hex::encode(signer.packed()), "0000000000ea305501");
    }

    #[test]
    fn test_signcert_json() {
        let sign = SignCert { kind: EntityKind::Institution, id: 3, owner_id: 4, signer: Name::EOSIO };
        assert_eq!(
            serde_json::to_value(&sign).unwrap(),
            json!({"id": 3, "institutionid": 4, "signerr": "eosio"})
        );
    }
}
