use std::fmt;

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};

// 20-byte buf, used for account-style addresses derived from pubkeys
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Arbitrary)]
pub struct Buf20(pub [u8; 20]);

impl Buf20 {
    pub fn zero() -> Self {
        Self([0; 20])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 20]> for Buf20 {
    fn from(value: [u8; 20]) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Buf20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

// 32-byte buf, useful for hashes and schnorr pubkeys
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Arbitrary)]
pub struct Buf32(pub [u8; 32]);

impl Buf32 {
    pub fn zero() -> Self {
        Self([0; 32])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Buf32 {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Buf32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Buf32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

// 64-byte buf, useful for schnorr signatures
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Arbitrary)]
pub struct Buf64(pub [u8; 64]);

impl Buf64 {
    pub fn zero() -> Self {
        Self([0; 64])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 64]> for Buf64 {
    fn from(value: [u8; 64]) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Buf64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

macro_rules! inst_borsh {
    ($ty:ident, $len:expr) => {
        impl BorshSerialize for $ty {
            fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
                writer.write_all(&self.0)
            }
        }

        impl BorshDeserialize for $ty {
            fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
                let mut array = [0u8; $len];
                reader.read_exact(&mut array)?;
                Ok(Self(array))
            }
        }
    };
}

inst_borsh!(Buf20, 20);
inst_borsh!(Buf32, 32);
inst_borsh!(Buf64, 64);
