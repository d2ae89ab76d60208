//! Contract actions: the unit of invocation inside a transaction.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::chain::serialize::{Pack, Packer};
use crate::chain::types::{ChainError, ChainResult, Name};

/// The closed set of actions this service ever submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionName {
    CreateInst,
    CreateCert,
    DeleteCert,
    AddSigner,
    SignCert,
    CreateCorp,
    AddAmount,
    NewAccount,
    BuyRamBytes,
    DelegateBw,
}

impl ActionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::CreateInst => "createinst",
            ActionName::CreateCert => "createcert",
            ActionName::DeleteCert => "deletecert",
            ActionName::AddSigner => "addsigner",
            ActionName::SignCert => "signcert",
            ActionName::CreateCorp => "createcorp",
            ActionName::AddAmount => "addamount",
            ActionName::NewAccount => "newaccount",
            ActionName::BuyRamBytes => "buyrambytes",
            ActionName::DelegateBw => "delegatebw",
        }
    }

    /// On-chain name value.
    pub fn name(&self) -> Name {
        // Every literal above is a valid name.
        self.as_str().parse().unwrap_or_default()
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// An `(actor, permission)` pair that must authorize an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl PermissionLevel {
    pub fn active(actor: Name) -> Self {
        Self { actor, permission: Name::ACTIVE }
    }
}

impl Pack for PermissionLevel {
    fn pack(&self, p: &mut Packer) {
        self.actor.pack(p);
        self.permission.pack(p);
    }
}

/// One contract invocation.
///
/// `data` keeps the JSON parameters (contract field names) for callers and
/// logs; `packed_data` is the binary encoding that is actually signed.
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub account: Name,
    pub name: ActionName,
    pub authorization: Vec<PermissionLevel>,
    pub data: Value,
    #[serde(skip)]
    packed_data: Vec<u8>,
}

impl Action {
    /// Build an action from a typed payload.
    pub fn new<P>(
        account: Name,
        name: ActionName,
        authorization: Vec<PermissionLevel>,
        payload: &P,
    ) -> ChainResult<Self>
    where
        P: Serialize + Pack,
    {
        if authorization.is_empty() {
            return Err(ChainError::Encoding(format!("{} has no authorization", name)));
        }
        let data = serde_json::to_value(payload)
            .map_err(|e| ChainError::Encoding(format!("{}: {}", name, e)))?;
        Ok(Self {
            account,
            name,
            authorization,
            data,
            packed_data: payload.packed(),
        })
    }

    pub fn packed_data(&self) -> &[u8] {
        &self.packed_data
    }
}

impl Pack for Action {
    fn pack(&self, p: &mut Packer) {
        self.account.pack(p);
        self.name.name().pack(p);
        self.authorization.pack(p);
        p.bytes(&self.packed_data);
    }
}
