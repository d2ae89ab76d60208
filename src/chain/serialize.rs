//! EOSIO binary ABI encoding.
//!
//! Integers are little-endian, lengths are `varuint32` (LEB128), strings and
//! byte blobs are length-prefixed, vectors are a length followed by elements.

/// Append-only encoder.
#[derive(Debug, Default)]
pub struct Packer {
    buf: Vec<u8>,
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn varuint32(&mut self, mut v: u32) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
    }

    /// Raw bytes without a length prefix.
    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Length-prefixed bytes.
    pub fn bytes(&mut self, bytes: &[u8]) {
        self.varuint32(bytes.len() as u32);
        self.raw(bytes);
    }

    pub fn string(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Types with a binary ABI encoding.
pub trait Pack {
    fn pack(&self, p: &mut Packer);

    fn packed(&self) -> Vec<u8> {
        let mut p = Packer::new();
        self.pack(&mut p);
        p.into_bytes()
    }
}

impl Pack for u16 {
    fn pack(&self, p: &mut Packer) {
        p.u16(*self);
    }
}

impl Pack for u32 {
    fn pack(&self, p: &mut Packer) {
        p.u32(*self);
    }
}

impl Pack for u64 {
    fn pack(&self, p: &mut Packer) {
        p.u64(*self);
    }
}

impl Pack for bool {
    fn pack(&self, p: &mut Packer) {
        p.bool(*self);
    }
}

impl Pack for String {
    fn pack(&self, p: &mut Packer) {
        p.string(self);
    }
}

impl<T: Pack> Pack for Vec<T> {
    fn pack(&self, p: &mut Packer) {
        p.varuint32(self.len() as u32);
        for item in self {
            item.pack(p);
        }
    }
}
