use serde::{Deserialize, Serialize};

/// Chain parameter view consumed by the gas accountant. Loading from disk is
/// a collaborator concern; the interpreter only reads this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub gas_prices: GasPrices,
}

/// Dynamic gas schedule values, including the EIP-2929 access costs and the
/// precompile prices the calling contracts are charged with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasPrices {
    pub exp_byte: u64,
    pub sha256: u64,
    pub sha256_word: u64,
    pub p256_verify: u64,
    pub cold_sload: u64,
    pub cold_account_access: u64,
    pub warm_storage_read: u64,
    pub sstore_set: u64,
    pub sstore_reset: u64,
    /// EIP-3529 refund for clearing a slot.
    pub sstore_clears_refund: u64,
    pub call_stipend: u64,
    pub call_value: u64,
    pub new_account: u64,
}

impl Default for GasPrices {
    fn default() -> Self {
        Self {
            exp_byte: 50,
            sha256: 60,
            sha256_word: 12,
            p256_verify: 3450,
            cold_sload: 2100,
            cold_account_access: 2600,
            warm_storage_read: 100,
            sstore_set: 20000,
            sstore_reset: 2900,
            sstore_clears_refund: 4800,
            call_stipend: 2300,
            call_value: 9000,
            new_account: 25000,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            gas_prices: GasPrices::default(),
        }
    }
}

impl ChainConfig {
    /// Stringly parameter lookup for collaborators that address the schedule
    /// by `(group, name)` pairs. Handlers use the typed fields directly.
    pub fn param(&self, group: &str, name: &str) -> Option<u64> {
        match group {
            "gasPrices" => match name {
                "expByte" => Some(self.gas_prices.exp_byte),
                "sha256" => Some(self.gas_prices.sha256),
                "sha256Word" => Some(self.gas_prices.sha256_word),
                "p256verify" => Some(self.gas_prices.p256_verify),
                "coldSload" => Some(self.gas_prices.cold_sload),
                "coldAccountAccess" => Some(self.gas_prices.cold_account_access),
                "warmStorageRead" => Some(self.gas_prices.warm_storage_read),
                "sstoreSet" => Some(self.gas_prices.sstore_set),
                "sstoreReset" => Some(self.gas_prices.sstore_reset),
                "sstoreClearsRefund" => Some(self.gas_prices.sstore_clears_refund),
                "callStipend" => Some(self.gas_prices.call_stipend),
                "callValue" => Some(self.gas_prices.call_value),
                "newAccount" => Some(self.gas_prices.new_account),
                _ => None,
            },
            "chain" => match name {
                "chainId" => Some(self.chain_id),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_lookup_covers_the_schedule() {
        let config = ChainConfig::default();
        assert_eq!(config.param("gasPrices", "expByte"), Some(50));
        assert_eq!(config.param("gasPrices", "sha256"), Some(60));
        assert_eq!(config.param("gasPrices", "sha256Word"), Some(12));
        assert_eq!(config.param("gasPrices", "p256verify"), Some(3450));
        assert_eq!(config.param("chain", "chainId"), Some(1));
        assert_eq!(config.param("gasPrices", "unknown"), None);
        assert_eq!(config.param("unknown", "expByte"), None);
    }

    #[test]
    fn config_roundtrips_through_serde() {
        let config = ChainConfig::default();
        let encoded = serde_json::to_string(&config);
        assert!(encoded.is_ok());
    }
}
