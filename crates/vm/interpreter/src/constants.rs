use ethereum_types::U256;

pub const WORD_SIZE: usize = 32;

pub const STACK_LIMIT: usize = 1024;
pub const RETURN_SUBSTACK_LIMIT: usize = 1023;

/// Deepest message-call nesting before the call family starts failing with a
/// zero status word.
pub const CALL_DEPTH_LIMIT: usize = 1024;

pub const MEMORY_EXPANSION_QUOTIENT: usize = 512;

pub const SUCCESS_FOR_CALL: U256 = U256([1, 0, 0, 0]);
pub const REVERT_FOR_CALL: U256 = U256([0, 0, 0, 0]);

pub const MAX_CODE_SIZE: usize = 0x6000;

/// EIP-3541: new code may not start with 0xEF.
pub const INVALID_CONTRACT_PREFIX: u8 = 0xEF;

pub const CODE_DEPOSIT_COST: U256 = U256([200, 0, 0, 0]);
pub const CREATE_BASE_COST: U256 = U256([32000, 0, 0, 0]);

/// Gas kept back from a forwarded call, one 64th of the remainder
/// (EIP-150).
pub const CALL_GAS_RETENTION_DIVISOR: U256 = U256([64, 0, 0, 0]);

/// BLOCKHASH (batch hash) lookups reach at most this far back.
pub const LAST_AVAILABLE_BLOCK_LIMIT: U256 = U256([256, 0, 0, 0]);
