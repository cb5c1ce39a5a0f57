use bytes::Bytes;
use ethereum_types::{Address, H256};

/// A log record emitted by one of the LOG0..LOG4 opcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}
