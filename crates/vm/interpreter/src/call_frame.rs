use crate::{
    constants::{RETURN_SUBSTACK_LIMIT, STACK_LIMIT},
    errors::{InternalError, VMError},
    log::Log,
    memory::Memory,
    opcodes::Opcode,
    vcounters::VirtualCounterManager,
    vm::JumpTargets,
};
use bytes::Bytes;
use ethereum_types::{Address, U256};
use std::sync::Arc;

/// Bounded LIFO of 256-bit words, limit 1024.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    pub stack: Vec<U256>,
}

impl Stack {
    pub fn pop(&mut self) -> Result<U256, VMError> {
        self.stack.pop().ok_or(VMError::StackUnderflow)
    }

    /// Pops `n` words, returned top-first.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<U256>, VMError> {
        if self.stack.len() < n {
            return Err(VMError::StackUnderflow);
        }
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(self.stack.pop().ok_or(VMError::StackUnderflow)?);
        }
        Ok(values)
    }

    pub fn push(&mut self, value: U256) -> Result<(), VMError> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(VMError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&U256, VMError> {
        self.stack.get(index).ok_or(VMError::StackUnderflow)
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), VMError> {
        if a >= self.stack.len() || b >= self.stack.len() {
            return Err(VMError::StackUnderflow);
        }
        self.stack.swap(a, b);
        Ok(())
    }
}

/// Return-address stack for EIP-2315 subroutines, limit 1023.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnSubstack {
    stack: Vec<usize>,
}

impl ReturnSubstack {
    pub fn push(&mut self, pc: usize) -> Result<(), VMError> {
        if self.stack.len() >= RETURN_SUBSTACK_LIMIT {
            return Err(VMError::OutOfRange);
        }
        self.stack.push(pc);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<usize, VMError> {
        self.stack.pop().ok_or(VMError::InvalidReturnsub)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// A call frame is the context in which the interpreter is currently
/// executing: one per message call or contract creation, destroyed when the
/// frame halts or traps.
#[derive(Debug, Clone, Default)]
pub struct CallFrame {
    /// Max gas the frame can use.
    pub gas_limit: U256,
    /// Gas used so far in this context.
    pub gas_used: U256,
    /// Program counter.
    pub pc: usize,
    /// Account that sent the message.
    pub msg_sender: Address,
    /// Recipient of the message.
    pub to: Address,
    /// Account whose code runs. Usually `to`, but not for CALLCODE or
    /// DELEGATECALL.
    pub code_address: Address,
    /// Bytecode being executed.
    pub bytecode: Bytes,
    /// Wei sent along with the message.
    pub msg_value: U256,
    pub stack: Stack,
    pub memory: Memory,
    pub return_substack: ReturnSubstack,
    /// Data sent along with the message. Empty while running init code.
    pub calldata: Bytes,
    /// Return data of THIS context.
    pub output: Bytes,
    /// Return data of the most recent sub-context.
    pub sub_return_data: Bytes,
    /// Static contexts cannot change observable state.
    pub is_static: bool,
    /// Frame spawned by CREATE or CREATE2.
    pub is_create: bool,
    /// Root frame of a deployment transaction.
    pub is_deploy: bool,
    /// Nonce of the executing contract account.
    pub nonce: u64,
    pub logs: Vec<Log>,
    /// Call stack depth of this frame.
    pub depth: usize,
    /// Valid JUMPDEST / BEGINSUB positions, shared across frames running the
    /// same code buffer.
    pub jump_targets: Arc<JumpTargets>,
    /// Virtual counter deltas of this frame, merged into the transaction
    /// accumulator when the frame ends.
    pub counters: VirtualCounterManager,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msg_sender: Address,
        to: Address,
        code_address: Address,
        bytecode: Bytes,
        msg_value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: U256,
        depth: usize,
        jump_targets: Arc<JumpTargets>,
    ) -> Self {
        Self {
            gas_limit,
            msg_sender,
            to,
            code_address,
            bytecode,
            msg_value,
            calldata,
            is_static,
            depth,
            jump_targets,
            ..Default::default()
        }
    }

    /// Fetches the opcode under the program counter; running past the end of
    /// code executes as STOP.
    pub fn next_opcode(&self) -> Opcode {
        self.bytecode
            .get(self.pc)
            .copied()
            .map(Opcode::from)
            .unwrap_or(Opcode::STOP)
    }

    pub fn increment_pc_by(&mut self, count: usize) -> Result<(), VMError> {
        self.pc = self
            .pc
            .checked_add(count)
            .ok_or(VMError::Internal(InternalError::PCOverflowed))?;
        Ok(())
    }

    pub fn increment_pc(&mut self) -> Result<(), VMError> {
        self.increment_pc_by(1)
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Validity check shared by JUMP and JUMPI.
    pub fn jump(&mut self, destination: U256) -> bool {
        let Ok(destination) = usize::try_from(destination) else {
            return false;
        };
        if destination > self.bytecode.len() || !self.jump_targets.is_jumpdest(destination) {
            return false;
        }
        self.pc = destination;
        true
    }
}
