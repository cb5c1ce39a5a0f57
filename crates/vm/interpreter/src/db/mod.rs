use crate::account::{Account, AccountInfo, StorageSlot};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use std::collections::HashMap;

pub mod cache;
pub use cache::CacheDB;

/// The state-tree collaborator behind the interpreter. Storage values cross
/// this boundary in their shortest big-endian form (zero is the empty byte
/// string); these calls are the frame's suspension points.
pub trait Database: std::fmt::Debug + Send + Sync {
    fn get_account_info(&self, address: Address) -> AccountInfo;
    /// Shortest-big-endian value of a storage slot, empty when unset.
    fn get_storage_value(&self, address: Address, key: H256) -> Bytes;
    /// Hash of the batch containing the given block; the zkEVM's BLOCKHASH
    /// source.
    fn get_batch_hash(&self, block_number: U256) -> Option<H256>;
    /// Linear Poseidon hash of contract bytecode, as computed by the state
    /// tree. Never Keccak-256.
    fn code_hash(&self, code: &Bytes) -> H256;
}

/// In-memory database used by tests and examples.
#[derive(Debug, Default)]
pub struct Db {
    pub accounts: HashMap<Address, Account>,
    pub batch_hashes: HashMap<U256, H256>,
}

impl Db {
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            batch_hashes: HashMap::new(),
        }
    }

    /// Add accounts to the database.
    pub fn add_accounts(&mut self, accounts: Vec<(Address, Account)>) {
        self.accounts.extend(accounts);
    }

    /// Add batch hashes to the database.
    pub fn add_batch_hashes(&mut self, batch_hashes: Vec<(U256, H256)>) {
        self.batch_hashes.extend(batch_hashes);
    }

    /// Builder method with accounts [for testing only].
    pub fn with_accounts(mut self, accounts: HashMap<Address, Account>) -> Self {
        self.accounts = accounts;
        self
    }
}

impl Database for Db {
    fn get_account_info(&self, address: Address) -> AccountInfo {
        self.accounts
            .get(&address)
            .map(|account| account.info.clone())
            .unwrap_or_default()
    }

    fn get_storage_value(&self, address: Address, key: H256) -> Bytes {
        self.accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key))
            .map(|slot| slot.original_value.clone())
            .unwrap_or_default()
    }

    fn get_batch_hash(&self, block_number: U256) -> Option<H256> {
        self.batch_hashes.get(&block_number).cloned()
    }

    fn code_hash(&self, code: &Bytes) -> H256 {
        // Test stand-in for the state tree's linear Poseidon routine; the
        // production collaborator supplies the arithmetization-friendly
        // hash. Still distinct from Keccak so tests catch a mixup.
        let mut hash = H256::zero();
        for (index, byte) in code.iter().enumerate() {
            let position = index % 32;
            if let Some(slot) = hash.0.get_mut(position) {
                *slot = slot.wrapping_mul(31).wrapping_add(*byte);
            }
        }
        hash
    }
}

/// Convenience used by handler code that reads slots through the journal.
pub fn storage_slot_from_db(db: &dyn Database, address: Address, key: H256) -> StorageSlot {
    let value = db.get_storage_value(address, key);
    StorageSlot {
        original_value: value.clone(),
        current_value: value,
    }
}
