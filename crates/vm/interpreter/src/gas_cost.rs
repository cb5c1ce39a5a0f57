//! Gas costs of the interpreter's instructions. Static costs are consts;
//! dynamic costs are functions of the operands and the chain-config
//! schedule.
use crate::{
    call_frame::CallFrame,
    config::GasPrices,
    constants::{CREATE_BASE_COST, WORD_SIZE},
    errors::OutOfGasError,
};
use ethereum_types::U256;

pub const ADD: U256 = U256([3, 0, 0, 0]);
pub const MUL: U256 = U256([5, 0, 0, 0]);
pub const SUB: U256 = U256([3, 0, 0, 0]);
pub const DIV: U256 = U256([5, 0, 0, 0]);
pub const SDIV: U256 = U256([5, 0, 0, 0]);
pub const MOD: U256 = U256([5, 0, 0, 0]);
pub const SMOD: U256 = U256([5, 0, 0, 0]);
pub const ADDMOD: U256 = U256([8, 0, 0, 0]);
pub const MULMOD: U256 = U256([8, 0, 0, 0]);
pub const EXP_STATIC: U256 = U256([10, 0, 0, 0]);
pub const SIGNEXTEND: U256 = U256([5, 0, 0, 0]);
pub const LT: U256 = U256([3, 0, 0, 0]);
pub const GT: U256 = U256([3, 0, 0, 0]);
pub const SLT: U256 = U256([3, 0, 0, 0]);
pub const SGT: U256 = U256([3, 0, 0, 0]);
pub const EQ: U256 = U256([3, 0, 0, 0]);
pub const ISZERO: U256 = U256([3, 0, 0, 0]);
pub const AND: U256 = U256([3, 0, 0, 0]);
pub const OR: U256 = U256([3, 0, 0, 0]);
pub const XOR: U256 = U256([3, 0, 0, 0]);
pub const NOT: U256 = U256([3, 0, 0, 0]);
pub const BYTE: U256 = U256([3, 0, 0, 0]);
pub const SHL: U256 = U256([3, 0, 0, 0]);
pub const SHR: U256 = U256([3, 0, 0, 0]);
pub const SAR: U256 = U256([3, 0, 0, 0]);
pub const SHA3_STATIC: U256 = U256([30, 0, 0, 0]);
pub const SHA3_DYNAMIC_BASE: U256 = U256([6, 0, 0, 0]);
pub const ADDRESS: U256 = U256([2, 0, 0, 0]);
pub const ORIGIN: U256 = U256([2, 0, 0, 0]);
pub const CALLER: U256 = U256([2, 0, 0, 0]);
pub const CALLVALUE: U256 = U256([2, 0, 0, 0]);
pub const CALLDATALOAD: U256 = U256([3, 0, 0, 0]);
pub const CALLDATASIZE: U256 = U256([2, 0, 0, 0]);
pub const CALLDATACOPY_STATIC: U256 = U256([3, 0, 0, 0]);
pub const CALLDATACOPY_DYNAMIC_BASE: U256 = U256([3, 0, 0, 0]);
pub const CODESIZE: U256 = U256([2, 0, 0, 0]);
pub const CODECOPY_STATIC: U256 = U256([3, 0, 0, 0]);
pub const CODECOPY_DYNAMIC_BASE: U256 = U256([3, 0, 0, 0]);
pub const GASPRICE: U256 = U256([2, 0, 0, 0]);
pub const EXTCODECOPY_DYNAMIC_BASE: U256 = U256([3, 0, 0, 0]);
pub const RETURNDATASIZE: U256 = U256([2, 0, 0, 0]);
pub const RETURNDATACOPY_STATIC: U256 = U256([3, 0, 0, 0]);
pub const RETURNDATACOPY_DYNAMIC_BASE: U256 = U256([3, 0, 0, 0]);
pub const BLOCKHASH: U256 = U256([20, 0, 0, 0]);
pub const COINBASE: U256 = U256([2, 0, 0, 0]);
pub const TIMESTAMP: U256 = U256([2, 0, 0, 0]);
pub const NUMBER: U256 = U256([2, 0, 0, 0]);
pub const DIFFICULTY: U256 = U256([2, 0, 0, 0]);
pub const GASLIMIT: U256 = U256([2, 0, 0, 0]);
pub const CHAINID: U256 = U256([2, 0, 0, 0]);
pub const SELFBALANCE: U256 = U256([5, 0, 0, 0]);
pub const BASEFEE: U256 = U256([2, 0, 0, 0]);
pub const POP: U256 = U256([2, 0, 0, 0]);
pub const MLOAD_STATIC: U256 = U256([3, 0, 0, 0]);
pub const MSTORE_STATIC: U256 = U256([3, 0, 0, 0]);
pub const MSTORE8_STATIC: U256 = U256([3, 0, 0, 0]);
pub const SLOAD_STATIC: U256 = U256([0, 0, 0, 0]);
pub const JUMP: U256 = U256([8, 0, 0, 0]);
pub const JUMPI: U256 = U256([10, 0, 0, 0]);
pub const PC: U256 = U256([2, 0, 0, 0]);
pub const MSIZE: U256 = U256([2, 0, 0, 0]);
pub const GAS: U256 = U256([2, 0, 0, 0]);
pub const JUMPDEST: U256 = U256([1, 0, 0, 0]);
pub const BEGINSUB: U256 = U256([2, 0, 0, 0]);
pub const JUMPSUB: U256 = U256([10, 0, 0, 0]);
pub const RETURNSUB: U256 = U256([5, 0, 0, 0]);
pub const PUSHN: U256 = U256([3, 0, 0, 0]);
pub const DUPN: U256 = U256([3, 0, 0, 0]);
pub const SWAPN: U256 = U256([3, 0, 0, 0]);
pub const LOGN_STATIC: U256 = U256([375, 0, 0, 0]);
pub const LOGN_DYNAMIC_BASE: U256 = U256([375, 0, 0, 0]);
pub const LOGN_DYNAMIC_BYTE_BASE: U256 = U256([8, 0, 0, 0]);
pub const CALL_STATIC: U256 = U256([0, 0, 0, 0]);
pub const INIT_CODE_WORD_COST: U256 = U256([2, 0, 0, 0]);
pub const KECCAK_WORD_COST: U256 = U256([6, 0, 0, 0]);
pub const SELFDESTRUCT_STATIC: U256 = U256([5000, 0, 0, 0]);

fn minimum_word_size(size: usize) -> usize {
    size.div_ceil(WORD_SIZE)
}

/// EXP charges per byte of the exponent on top of its static cost; the byte
/// price comes from the chain config (`gasPrices.expByte`).
pub fn exp(exponent: U256, prices: &GasPrices) -> Result<U256, OutOfGasError> {
    let exponent_byte_size = exponent
        .bits()
        .checked_add(7)
        .ok_or(OutOfGasError::ArithmeticOperationOverflow)?
        / 8;
    let exponent_byte_size_cost = U256::from(prices.exp_byte)
        .checked_mul(exponent_byte_size.into())
        .ok_or(OutOfGasError::GasCostOverflow)?;
    EXP_STATIC
        .checked_add(exponent_byte_size_cost)
        .ok_or(OutOfGasError::GasCostOverflow)
}

pub fn sha3(
    current_call_frame: &CallFrame,
    size: usize,
    offset: usize,
) -> Result<U256, OutOfGasError> {
    let memory_expansion_cost = current_call_frame.memory.expansion_cost(
        offset
            .checked_add(size)
            .ok_or(OutOfGasError::ArithmeticOperationOverflow)?,
    )?;
    let minimum_word_size_cost = SHA3_DYNAMIC_BASE
        .checked_mul(minimum_word_size(size).into())
        .ok_or(OutOfGasError::GasCostOverflow)?;
    SHA3_STATIC
        .checked_add(minimum_word_size_cost)
        .ok_or(OutOfGasError::GasCostOverflow)?
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGasError::GasCostOverflow)
}

fn copy_with_words(
    static_cost: U256,
    dynamic_base: U256,
    current_call_frame: &CallFrame,
    size: usize,
    dest_offset: usize,
) -> Result<U256, OutOfGasError> {
    let memory_expansion_cost = current_call_frame.memory.expansion_cost(
        dest_offset
            .checked_add(size)
            .ok_or(OutOfGasError::ArithmeticOperationOverflow)?,
    )?;
    let minimum_word_size_cost = dynamic_base
        .checked_mul(minimum_word_size(size).into())
        .ok_or(OutOfGasError::GasCostOverflow)?;
    static_cost
        .checked_add(minimum_word_size_cost)
        .ok_or(OutOfGasError::GasCostOverflow)?
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGasError::GasCostOverflow)
}

pub fn calldatacopy(
    current_call_frame: &CallFrame,
    size: usize,
    dest_offset: usize,
) -> Result<U256, OutOfGasError> {
    copy_with_words(
        CALLDATACOPY_STATIC,
        CALLDATACOPY_DYNAMIC_BASE,
        current_call_frame,
        size,
        dest_offset,
    )
}

pub fn codecopy(
    current_call_frame: &CallFrame,
    size: usize,
    dest_offset: usize,
) -> Result<U256, OutOfGasError> {
    copy_with_words(
        CODECOPY_STATIC,
        CODECOPY_DYNAMIC_BASE,
        current_call_frame,
        size,
        dest_offset,
    )
}

pub fn returndatacopy(
    current_call_frame: &CallFrame,
    size: usize,
    dest_offset: usize,
) -> Result<U256, OutOfGasError> {
    copy_with_words(
        RETURNDATACOPY_STATIC,
        RETURNDATACOPY_DYNAMIC_BASE,
        current_call_frame,
        size,
        dest_offset,
    )
}

/// EXTCODECOPY has no static cost of its own; the address access charge is
/// added by the caller.
pub fn extcodecopy(
    current_call_frame: &CallFrame,
    size: usize,
    dest_offset: usize,
) -> Result<U256, OutOfGasError> {
    copy_with_words(
        U256::zero(),
        EXTCODECOPY_DYNAMIC_BASE,
        current_call_frame,
        size,
        dest_offset,
    )
}

/// EIP-2929 account access charge.
pub fn address_access(address_was_cold: bool, prices: &GasPrices) -> U256 {
    if address_was_cold {
        U256::from(prices.cold_account_access)
    } else {
        U256::from(prices.warm_storage_read)
    }
}

/// EIP-2929 storage slot access charge.
pub fn storage_access(slot_was_cold: bool, prices: &GasPrices) -> U256 {
    if slot_was_cold {
        U256::from(prices.cold_sload)
    } else {
        U256::from(prices.warm_storage_read)
    }
}

/// EIP-2200/3529 SSTORE pricing given the slot's original and current words.
pub fn sstore(
    original: U256,
    current: U256,
    new: U256,
    slot_was_cold: bool,
    prices: &GasPrices,
) -> Result<U256, OutOfGasError> {
    let base = if new == current {
        U256::from(prices.warm_storage_read)
    } else if current == original {
        if original.is_zero() {
            U256::from(prices.sstore_set)
        } else {
            U256::from(prices.sstore_reset)
        }
    } else {
        U256::from(prices.warm_storage_read)
    };
    let cold_surcharge = if slot_was_cold {
        U256::from(prices.cold_sload)
    } else {
        U256::zero()
    };
    base.checked_add(cold_surcharge)
        .ok_or(OutOfGasError::GasCostOverflow)
}

pub fn log(
    current_call_frame: &CallFrame,
    size: usize,
    offset: usize,
    number_of_topics: usize,
) -> Result<U256, OutOfGasError> {
    let memory_expansion_cost = current_call_frame.memory.expansion_cost(
        offset
            .checked_add(size)
            .ok_or(OutOfGasError::ArithmeticOperationOverflow)?,
    )?;
    let topics_cost = LOGN_DYNAMIC_BASE
        .checked_mul(number_of_topics.into())
        .ok_or(OutOfGasError::GasCostOverflow)?;
    let bytes_cost = LOGN_DYNAMIC_BYTE_BASE
        .checked_mul(size.into())
        .ok_or(OutOfGasError::GasCostOverflow)?;
    LOGN_STATIC
        .checked_add(topics_cost)
        .ok_or(OutOfGasError::GasCostOverflow)?
        .checked_add(bytes_cost)
        .ok_or(OutOfGasError::GasCostOverflow)?
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGasError::GasCostOverflow)
}

/// Call-family charge before gas forwarding: memory growth, access charge,
/// value surcharge and the new-account surcharge for value-bearing calls to
/// empty accounts.
pub fn call(
    memory_expansion_cost: U256,
    address_was_cold: bool,
    account_is_empty: bool,
    value_to_transfer: U256,
    prices: &GasPrices,
) -> Result<U256, OutOfGasError> {
    let mut cost = memory_expansion_cost
        .checked_add(address_access(address_was_cold, prices))
        .ok_or(OutOfGasError::GasCostOverflow)?;
    if !value_to_transfer.is_zero() {
        cost = cost
            .checked_add(U256::from(prices.call_value))
            .ok_or(OutOfGasError::GasCostOverflow)?;
        if account_is_empty {
            cost = cost
                .checked_add(U256::from(prices.new_account))
                .ok_or(OutOfGasError::GasCostOverflow)?;
        }
    }
    Ok(cost)
}

/// CALLCODE / DELEGATECALL / STATICCALL: access plus memory growth; the
/// value surcharge applies only to CALLCODE with a nonzero value.
pub fn call_without_account_creation(
    memory_expansion_cost: U256,
    address_was_cold: bool,
    value_to_transfer: U256,
    prices: &GasPrices,
) -> Result<U256, OutOfGasError> {
    let mut cost = memory_expansion_cost
        .checked_add(address_access(address_was_cold, prices))
        .ok_or(OutOfGasError::GasCostOverflow)?;
    if !value_to_transfer.is_zero() {
        cost = cost
            .checked_add(U256::from(prices.call_value))
            .ok_or(OutOfGasError::GasCostOverflow)?;
    }
    Ok(cost)
}

pub fn create(
    current_call_frame: &CallFrame,
    code_offset_in_memory: usize,
    code_size_in_memory: usize,
    hashes_init_code: bool,
) -> Result<U256, OutOfGasError> {
    let memory_expansion_cost = current_call_frame.memory.expansion_cost(
        code_offset_in_memory
            .checked_add(code_size_in_memory)
            .ok_or(OutOfGasError::ArithmeticOperationOverflow)?,
    )?;
    let init_code_cost = INIT_CODE_WORD_COST
        .checked_mul(minimum_word_size(code_size_in_memory).into())
        .ok_or(OutOfGasError::GasCostOverflow)?;
    let mut cost = CREATE_BASE_COST
        .checked_add(init_code_cost)
        .ok_or(OutOfGasError::GasCostOverflow)?
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGasError::GasCostOverflow)?;
    // CREATE2 also hashes the init code to derive the address.
    if hashes_init_code {
        let hash_cost = KECCAK_WORD_COST
            .checked_mul(minimum_word_size(code_size_in_memory).into())
            .ok_or(OutOfGasError::GasCostOverflow)?;
        cost = cost
            .checked_add(hash_cost)
            .ok_or(OutOfGasError::GasCostOverflow)?;
    }
    Ok(cost)
}

pub fn selfdestruct(
    address_was_cold: bool,
    account_is_empty: bool,
    balance_to_transfer: U256,
    prices: &GasPrices,
) -> Result<U256, OutOfGasError> {
    let mut cost = SELFDESTRUCT_STATIC;
    if address_was_cold {
        cost = cost
            .checked_add(U256::from(prices.cold_account_access))
            .ok_or(OutOfGasError::GasCostOverflow)?;
    }
    if account_is_empty && !balance_to_transfer.is_zero() {
        cost = cost
            .checked_add(U256::from(prices.new_account))
            .ok_or(OutOfGasError::GasCostOverflow)?;
    }
    Ok(cost)
}
