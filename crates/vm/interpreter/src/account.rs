use bytes::Bytes;
use ethereum_types::U256;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountInfo {
    pub balance: U256,
    pub bytecode: Bytes,
    pub nonce: u64,
}

impl AccountInfo {
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.bytecode.is_empty()
    }

    pub fn has_code(&self) -> bool {
        !self.bytecode.is_empty()
    }
}

/// Storage values live in their shortest big-endian form, the representation
/// the zkEVM state tree hashes: zero is the empty byte string, everything
/// else drops leading zero bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageSlot {
    pub original_value: Bytes,
    pub current_value: Bytes,
}

impl StorageSlot {
    pub fn original_word(&self) -> U256 {
        bytes_to_word(&self.original_value)
    }

    pub fn current_word(&self) -> U256 {
        bytes_to_word(&self.current_value)
    }
}

/// Shortest big-endian encoding of a word. Zero encodes as empty.
pub fn word_to_shortest_be(value: U256) -> Bytes {
    if value.is_zero() {
        return Bytes::new();
    }
    let mut buffer = [0u8; 32];
    value.to_big_endian(&mut buffer);
    let first_nonzero = buffer.iter().position(|byte| *byte != 0).unwrap_or(31);
    Bytes::copy_from_slice(buffer.get(first_nonzero..).unwrap_or(&[]))
}

/// A zero-length value reads back as zero.
pub fn bytes_to_word(value: &Bytes) -> U256 {
    if value.is_empty() {
        U256::zero()
    } else {
        U256::from_big_endian(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub info: AccountInfo,
    pub storage: HashMap<ethereum_types::H256, StorageSlot>,
}

impl Account {
    pub fn new(
        balance: U256,
        bytecode: Bytes,
        nonce: u64,
        storage: HashMap<ethereum_types::H256, StorageSlot>,
    ) -> Self {
        Self {
            info: AccountInfo {
                balance,
                bytecode,
                nonce,
            },
            storage,
        }
    }

    pub fn has_code(&self) -> bool {
        self.info.has_code()
    }
}

impl From<AccountInfo> for Account {
    fn from(info: AccountInfo) -> Self {
        Self {
            info,
            storage: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_encodes_as_the_empty_string() {
        assert!(word_to_shortest_be(U256::zero()).is_empty());
        assert_eq!(bytes_to_word(&Bytes::new()), U256::zero());
    }

    #[test]
    fn leading_zero_bytes_are_dropped() {
        assert_eq!(word_to_shortest_be(U256::one()).as_ref(), &[0x01]);
        assert_eq!(
            word_to_shortest_be(U256::from(0x0100)).as_ref(),
            &[0x01, 0x00]
        );
    }

    #[test]
    fn shortest_be_roundtrips() {
        for value in [
            U256::zero(),
            U256::one(),
            U256::from(0xdeadbeefu64),
            U256::MAX,
        ] {
            assert_eq!(bytes_to_word(&word_to_shortest_be(value)), value);
        }
    }
}
