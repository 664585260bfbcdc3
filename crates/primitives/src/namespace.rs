use std::fmt;

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Length in bytes of a DA namespace identifier.
pub const NAMESPACE_ID_LEN: usize = 8;

/// Opaque 8-byte identifier scoping which data published on a shared DA
/// network belongs to this rollup.  Fixed at DALC construction and never
/// mutated afterwards.
#[derive(
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Arbitrary,
    BorshDeserialize,
    BorshSerialize,
    Deserialize,
    Serialize,
)]
pub struct NamespaceId(pub [u8; NAMESPACE_ID_LEN]);

impl NamespaceId {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; NAMESPACE_ID_LEN]> for NamespaceId {
    fn from(value: [u8; NAMESPACE_ID_LEN]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for NamespaceId {
    type Error = NamespaceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; NAMESPACE_ID_LEN] = value
            .try_into()
            .map_err(|_| NamespaceError::InvalidLength(value.len()))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NamespaceError {
    #[error("namespace must be {NAMESPACE_ID_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        let ns = NamespaceId::try_from([1u8, 2, 3, 4, 5, 6, 7, 8].as_slice()).unwrap();
        assert_eq!(ns, NamespaceId::from([1, 2, 3, 4, 5, 6, 7, 8]));
    }

    #[test]
    fn test_from_slice_bad_len() {
        assert!(NamespaceId::try_from([1u8, 2, 3].as_slice()).is_err());
    }
}
