use ethereum_types::{Address, U256};

/// Transaction- and block-level context, immutable for the whole
/// transaction. Per-frame context lives on `CallFrame`.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    /// Sender of the transaction that originated this execution.
    pub origin: Address,
    pub refunded_gas: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
    pub block_number: U256,
    pub coinbase: Address,
    pub timestamp: U256,
    pub difficulty: U256,
    pub block_gas_limit: U256,
    pub chain_id: U256,
    pub base_fee_per_gas: U256,
}

impl Environment {
    pub fn default_from_address(origin: Address) -> Self {
        Self {
            origin,
            refunded_gas: U256::zero(),
            gas_limit: U256::MAX,
            gas_price: Default::default(),
            block_number: Default::default(),
            coinbase: Default::default(),
            timestamp: Default::default(),
            difficulty: Default::default(),
            block_gas_limit: U256::from(30_000_000),
            chain_id: U256::one(),
            base_fee_per_gas: Default::default(),
        }
    }
}
