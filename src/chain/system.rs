//! Payloads for the `eosio` system contract actions used at account creation.

use serde::Serialize;

use crate::chain::keys::PublicKey;
use crate::chain::serialize::{Pack, Packer};
use crate::chain::types::{Asset, Name};

#[derive(Debug, Clone, Serialize)]
pub struct KeyWeight {
    pub key: PublicKey,
    pub weight: u16,
}

impl Pack for KeyWeight {
    fn pack(&self, p: &mut Packer) {
        self.key.pack(p);
        p.u16(self.weight);
    }
}

/// A permission authority. Only single-key authorities are ever produced here,
/// so `accounts` and `waits` are always empty.
#[derive(Debug, Clone, Serialize)]
pub struct Authority {
    pub threshold: u32,
    pub keys: Vec<KeyWeight>,
    pub accounts: Vec<()>,
    pub waits: Vec<()>,
}

impl Authority {
    pub fn single_key(key: PublicKey) -> Self {
        Self {
            threshold: 1,
            keys: vec![KeyWeight { key, weight: 1 }],
            accounts: Vec::new(),
            waits: Vec::new(),
        }
    }
}

impl Pack for Authority {
    fn pack(&self, p: &mut Packer) {
        p.u32(self.threshold);
        self.keys.pack(p);
        p.varuint32(0);
        p.varuint32(0);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub creator: Name,
    pub name: Name,
    pub owner: Authority,
    pub active: Authority,
}

impl Pack for NewAccount {
    fn pack(&self, p: &mut Packer) {
        self.creator.pack(p);
        self.name.pack(p);
        self.owner.pack(p);
        self.active.pack(p);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuyRamBytes {
    pub payer: Name,
    pub receiver: Name,
    pub bytes: u32,
}

impl Pack for BuyRamBytes {
    fn pack(&self, p: &mut Packer) {
        self.payer.pack(p);
        self.receiver.pack(p);
        p.u32(self.bytes);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DelegateBw {
    pub from: Name,
    pub receiver: Name,
    pub stake_net_quantity: Asset,
    pub stake_cpu_quantity: Asset,
    pub transfer: bool,
}

impl Pack for DelegateBw {
    fn pack(&self, p: &mut Packer) {
        self.from.pack(p);
        self.receiver.pack(p);
        self.stake_net_quantity.pack(p);
        self.stake_cpu_quantity.pack(p);
        p.bool(self.transfer);
    }
}
