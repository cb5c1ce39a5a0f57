use crate::{db::CacheDB, log::Log};
use bytes::Bytes;
use ethereum_types::U256;
use thiserror::Error;

/// Errors that halt the current frame.
///
/// Everything except `RevertOpcode` and `Internal` is a trap: all remaining
/// gas of the frame is consumed and its output is cleared before the caller
/// observes a zero status word.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Stack overflow")]
    StackOverflow,
    #[error("Invalid jump destination")]
    InvalidJump,
    #[error("Invalid subroutine destination")]
    InvalidJumpsub,
    #[error("Walked into a BEGINSUB")]
    InvalidBeginsub,
    #[error("RETURNSUB with empty return substack")]
    InvalidReturnsub,
    #[error("Invalid opcode")]
    InvalidOpcode,
    #[error("State change attempted inside a static context")]
    StaticStateChange,
    #[error("Operand does not fit the addressable range")]
    OutOfRange,
    #[error("Revert opcode")]
    RevertOpcode,
    #[error("Out of gas: {0}")]
    OutOfGas(#[from] OutOfGasError),
    #[error("Internal error: {0}")]
    Internal(#[from] InternalError),
}

impl VMError {
    /// Internal errors denote broken interpreter invariants and are never
    /// translated into a revert observed by the caller frame.
    pub fn is_internal(&self) -> bool {
        matches!(self, VMError::Internal(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutOfGasError {
    #[error("Gas limit of the frame exceeded")]
    MaxGasLimitExceeded,
    #[error("Gas cost computation overflowed")]
    GasCostOverflow,
    #[error("Consumed gas tracking overflowed")]
    ConsumedGasOverflow,
    #[error("Arithmetic operation overflowed while computing gas")]
    ArithmeticOperationOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("Arithmetic operation overflowed")]
    ArithmeticOperationOverflow,
    #[error("Arithmetic operation underflowed")]
    ArithmeticOperationUnderflow,
    #[error("Program counter overflowed")]
    PCOverflowed,
    #[error("Could not access the current call frame")]
    CouldNotAccessLastCallframe,
    #[error("Could not compute a contract address")]
    CouldNotComputeCreateAddress,
    #[error("Message gas was not reserved before a call-family handler")]
    MessageGasNotReserved,
    #[error("Account was expected to be cached")]
    AccountNotFound,
    #[error("Slicing out of the expected bounds")]
    SlicingError,
}

/// Outcome of a single opcode handler.
pub enum OpcodeSuccess {
    Continue,
    Result(ResultReason),
}

/// Non-erroneous frame terminations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultReason {
    Stop,
    Return,
    SelfDestruct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResult {
    Success,
    Revert(VMError),
}

/// What a finished frame hands back to its caller (or the dispatcher, for
/// the root frame).
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub result: TxResult,
    pub new_state: CacheDB,
    pub gas_used: U256,
    pub gas_refunded: U256,
    pub output: Bytes,
    pub logs: Vec<Log>,
    pub created_address: Option<ethereum_types::Address>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        matches!(self.result, TxResult::Success)
    }
}
