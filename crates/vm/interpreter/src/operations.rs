use crate::{errors::VMError, opcodes::Opcode};
use bytes::Bytes;
use ethereum_types::U256;

/// Higher-level instruction list used to assemble test bytecode.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Operation {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    Sdiv,
    Mod,
    SMod,
    Addmod,
    Mulmod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Sha3,
    Address,
    Balance,
    Origin,
    Caller,
    Callvalue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    Codesize,
    Codecopy,
    Gasprice,
    ExtcodeSize,
    ExtcodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtcodeHash,
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    Difficulty,
    Gaslimit,
    Chainid,
    SelfBalance,
    Basefee,
    Pop,
    Mload,
    Mstore,
    Mstore8,
    Sload,
    Sstore,
    Jump,
    Jumpi,
    PC,
    Msize,
    Gas,
    Jumpdest,
    BeginSub,
    JumpSub,
    ReturnSub,
    Push((u8, U256)),
    Dup(u8),
    Swap(u8),
    Log(u8),
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    Invalid,
    SelfDestruct,
}

impl Operation {
    pub fn opcode(&self) -> Result<Opcode, VMError> {
        let opcode = match self {
            Operation::Stop => Opcode::STOP,
            Operation::Add => Opcode::ADD,
            Operation::Mul => Opcode::MUL,
            Operation::Sub => Opcode::SUB,
            Operation::Div => Opcode::DIV,
            Operation::Sdiv => Opcode::SDIV,
            Operation::Mod => Opcode::MOD,
            Operation::SMod => Opcode::SMOD,
            Operation::Addmod => Opcode::ADDMOD,
            Operation::Mulmod => Opcode::MULMOD,
            Operation::Exp => Opcode::EXP,
            Operation::SignExtend => Opcode::SIGNEXTEND,
            Operation::Lt => Opcode::LT,
            Operation::Gt => Opcode::GT,
            Operation::Slt => Opcode::SLT,
            Operation::Sgt => Opcode::SGT,
            Operation::Eq => Opcode::EQ,
            Operation::IsZero => Opcode::ISZERO,
            Operation::And => Opcode::AND,
            Operation::Or => Opcode::OR,
            Operation::Xor => Opcode::XOR,
            Operation::Not => Opcode::NOT,
            Operation::Byte => Opcode::BYTE,
            Operation::Shl => Opcode::SHL,
            Operation::Shr => Opcode::SHR,
            Operation::Sar => Opcode::SAR,
            Operation::Sha3 => Opcode::SHA3,
            Operation::Address => Opcode::ADDRESS,
            Operation::Balance => Opcode::BALANCE,
            Operation::Origin => Opcode::ORIGIN,
            Operation::Caller => Opcode::CALLER,
            Operation::Callvalue => Opcode::CALLVALUE,
            Operation::CallDataLoad => Opcode::CALLDATALOAD,
            Operation::CallDataSize => Opcode::CALLDATASIZE,
            Operation::CallDataCopy => Opcode::CALLDATACOPY,
            Operation::Codesize => Opcode::CODESIZE,
            Operation::Codecopy => Opcode::CODECOPY,
            Operation::Gasprice => Opcode::GASPRICE,
            Operation::ExtcodeSize => Opcode::EXTCODESIZE,
            Operation::ExtcodeCopy => Opcode::EXTCODECOPY,
            Operation::ReturnDataSize => Opcode::RETURNDATASIZE,
            Operation::ReturnDataCopy => Opcode::RETURNDATACOPY,
            Operation::ExtcodeHash => Opcode::EXTCODEHASH,
            Operation::BlockHash => Opcode::BLOCKHASH,
            Operation::Coinbase => Opcode::COINBASE,
            Operation::Timestamp => Opcode::TIMESTAMP,
            Operation::Number => Opcode::NUMBER,
            Operation::Difficulty => Opcode::DIFFICULTY,
            Operation::Gaslimit => Opcode::GASLIMIT,
            Operation::Chainid => Opcode::CHAINID,
            Operation::SelfBalance => Opcode::SELFBALANCE,
            Operation::Basefee => Opcode::BASEFEE,
            Operation::Pop => Opcode::POP,
            Operation::Mload => Opcode::MLOAD,
            Operation::Mstore => Opcode::MSTORE,
            Operation::Mstore8 => Opcode::MSTORE8,
            Operation::Sload => Opcode::SLOAD,
            Operation::Sstore => Opcode::SSTORE,
            Operation::Jump => Opcode::JUMP,
            Operation::Jumpi => Opcode::JUMPI,
            Operation::PC => Opcode::PC,
            Operation::Msize => Opcode::MSIZE,
            Operation::Gas => Opcode::GAS,
            Operation::Jumpdest => Opcode::JUMPDEST,
            Operation::BeginSub => Opcode::BEGINSUB,
            Operation::JumpSub => Opcode::JUMPSUB,
            Operation::ReturnSub => Opcode::RETURNSUB,
            Operation::Push((n_bytes, _)) => {
                let offset = n_bytes.checked_sub(1).ok_or(VMError::OutOfRange)?;
                let byte = u8::from(Opcode::PUSH1)
                    .checked_add(offset)
                    .ok_or(VMError::OutOfRange)?;
                Opcode::from(byte)
            }
            Operation::Dup(n) => {
                let offset = n.checked_sub(1).ok_or(VMError::OutOfRange)?;
                let byte = u8::from(Opcode::DUP1)
                    .checked_add(offset)
                    .ok_or(VMError::OutOfRange)?;
                Opcode::from(byte)
            }
            Operation::Swap(n) => {
                let offset = n.checked_sub(1).ok_or(VMError::OutOfRange)?;
                let byte = u8::from(Opcode::SWAP1)
                    .checked_add(offset)
                    .ok_or(VMError::OutOfRange)?;
                Opcode::from(byte)
            }
            Operation::Log(n) => {
                let byte = u8::from(Opcode::LOG0)
                    .checked_add(*n)
                    .ok_or(VMError::OutOfRange)?;
                Opcode::from(byte)
            }
            Operation::Create => Opcode::CREATE,
            Operation::Call => Opcode::CALL,
            Operation::CallCode => Opcode::CALLCODE,
            Operation::Return => Opcode::RETURN,
            Operation::DelegateCall => Opcode::DELEGATECALL,
            Operation::Create2 => Opcode::CREATE2,
            Operation::StaticCall => Opcode::STATICCALL,
            Operation::Revert => Opcode::REVERT,
            Operation::Invalid => Opcode::INVALID,
            Operation::SelfDestruct => Opcode::SELFDESTRUCT,
        };
        Ok(opcode)
    }

    pub fn to_bytecode(&self) -> Result<Bytes, VMError> {
        let opcode_byte = u8::from(self.opcode()?);
        let bytecode = match self {
            Operation::Push((n_bytes, value)) => {
                let n_bytes = usize::from(*n_bytes);
                if !(1..=32).contains(&n_bytes) {
                    return Err(VMError::OutOfRange);
                }
                let mut word_buffer = [0u8; 32];
                value.to_big_endian(&mut word_buffer);
                let immediate = word_buffer
                    .get(32usize.saturating_sub(n_bytes)..)
                    .ok_or(VMError::OutOfRange)?;
                let mut assembled = Vec::with_capacity(n_bytes.saturating_add(1));
                assembled.push(opcode_byte);
                assembled.extend_from_slice(immediate);
                Bytes::from(assembled)
            }
            _ => Bytes::copy_from_slice(&[opcode_byte]),
        };
        Ok(bytecode)
    }
}
