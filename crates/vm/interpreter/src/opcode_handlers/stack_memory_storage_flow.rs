use crate::{
    call_frame::CallFrame,
    constants::WORD_SIZE,
    errors::{InternalError, OpcodeSuccess, VMError},
    gas_cost,
    vcounters::CounterId,
    vm::{record_counter, VM},
};
use ethereum_types::{H256, U256};

// Stack, Memory, Storage and Flow Operations (15)
// Opcodes: POP, MLOAD, MSTORE, MSTORE8, SLOAD, SSTORE, JUMP, JUMPI, PC,
// MSIZE, GAS, JUMPDEST, BEGINSUB, JUMPSUB, RETURNSUB

impl VM {
    // POP operation
    pub fn op_pop(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpPop);
        self.increase_consumed_gas(current_call_frame, gas_cost::POP)?;
        current_call_frame.stack.pop()?;
        Ok(OpcodeSuccess::Continue)
    }

    // MLOAD operation
    pub fn op_mload(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpMload);

        let offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let memory_expansion_cost = current_call_frame.memory.expansion_cost(
            offset
                .checked_add(WORD_SIZE)
                .ok_or(VMError::OutOfRange)?,
        )?;
        let gas_cost = gas_cost::MLOAD_STATIC
            .checked_add(memory_expansion_cost)
            .ok_or(VMError::Internal(InternalError::ArithmeticOperationOverflow))?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        let value = current_call_frame.memory.load(offset)?;
        current_call_frame.stack.push(value)?;

        Ok(OpcodeSuccess::Continue)
    }

    // MSTORE operation
    pub fn op_mstore(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpMstore);

        let offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let memory_expansion_cost = current_call_frame.memory.expansion_cost(
            offset
                .checked_add(WORD_SIZE)
                .ok_or(VMError::OutOfRange)?,
        )?;
        let gas_cost = gas_cost::MSTORE_STATIC
            .checked_add(memory_expansion_cost)
            .ok_or(VMError::Internal(InternalError::ArithmeticOperationOverflow))?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        let value = current_call_frame.stack.pop()?;
        let mut value_bytes = [0u8; WORD_SIZE];
        value.to_big_endian(&mut value_bytes);

        current_call_frame.memory.store_bytes(offset, &value_bytes)?;

        Ok(OpcodeSuccess::Continue)
    }

    // MSTORE8 operation
    pub fn op_mstore8(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpMstore8);

        let offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let memory_expansion_cost = current_call_frame
            .memory
            .expansion_cost(offset.checked_add(1).ok_or(VMError::OutOfRange)?)?;
        let gas_cost = gas_cost::MSTORE8_STATIC
            .checked_add(memory_expansion_cost)
            .ok_or(VMError::Internal(InternalError::ArithmeticOperationOverflow))?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        let value = current_call_frame.stack.pop()?;
        let mut value_bytes = [0u8; WORD_SIZE];
        value.to_big_endian(&mut value_bytes);
        let last_byte = value_bytes
            .last()
            .ok_or(VMError::Internal(InternalError::SlicingError))?;

        current_call_frame.memory.store_bytes(offset, &[*last_byte])?;

        Ok(OpcodeSuccess::Continue)
    }

    // SLOAD operation
    pub fn op_sload(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpSload);

        let key = current_call_frame.stack.pop()?;
        let mut key_bytes = [0u8; WORD_SIZE];
        key.to_big_endian(&mut key_bytes);
        let key = H256::from(key_bytes);

        let address = current_call_frame.to;
        let (storage_slot, slot_was_cold) = self.access_storage_slot(address, key)?;

        self.increase_consumed_gas(
            current_call_frame,
            gas_cost::storage_access(slot_was_cold, &self.config.gas_prices),
        )?;

        // An empty stored value reads back as zero.
        current_call_frame.stack.push(storage_slot.current_word())?;

        Ok(OpcodeSuccess::Continue)
    }

    // SSTORE operation
    pub fn op_sstore(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        if current_call_frame.is_static {
            return Err(VMError::StaticStateChange);
        }

        record_counter(current_call_frame, CounterId::OpSstore);

        let key = current_call_frame.stack.pop()?;
        let value = current_call_frame.stack.pop()?;

        let mut key_bytes = [0u8; WORD_SIZE];
        key.to_big_endian(&mut key_bytes);
        let key = H256::from(key_bytes);

        let address = current_call_frame.to;
        let (storage_slot, slot_was_cold) = self.access_storage_slot(address, key)?;
        let original = storage_slot.original_word();
        let current = storage_slot.current_word();

        let gas_cost = gas_cost::sstore(
            original,
            current,
            value,
            slot_was_cold,
            &self.config.gas_prices,
        )?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        // Clearing a slot earns the EIP-3529 refund.
        if !current.is_zero() && value.is_zero() {
            self.env.refunded_gas = self
                .env
                .refunded_gas
                .checked_add(U256::from(self.config.gas_prices.sstore_clears_refund))
                .ok_or(VMError::Internal(InternalError::ArithmeticOperationOverflow))?;
        }

        // The journal keeps the shortest big-endian form the state tree
        // hashes.
        self.update_account_storage(address, key, value)?;

        Ok(OpcodeSuccess::Continue)
    }

    // JUMP operation
    pub fn op_jump(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpJump);
        self.increase_consumed_gas(current_call_frame, gas_cost::JUMP)?;

        let jump_address = current_call_frame.stack.pop()?;
        if !current_call_frame.jump(jump_address) {
            return Err(VMError::InvalidJump);
        }

        Ok(OpcodeSuccess::Continue)
    }

    // JUMPI operation
    pub fn op_jumpi(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpJumpi);
        self.increase_consumed_gas(current_call_frame, gas_cost::JUMPI)?;

        let jump_address = current_call_frame.stack.pop()?;
        let condition = current_call_frame.stack.pop()?;

        if !condition.is_zero() && !current_call_frame.jump(jump_address) {
            return Err(VMError::InvalidJump);
        }

        Ok(OpcodeSuccess::Continue)
    }

    // PC operation
    pub fn op_pc(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpPc);
        self.increase_consumed_gas(current_call_frame, gas_cost::PC)?;

        // The counter already moved past the opcode byte.
        current_call_frame.stack.push(U256::from(
            current_call_frame
                .pc
                .checked_sub(1)
                .ok_or(VMError::Internal(
                    InternalError::ArithmeticOperationUnderflow,
                ))?,
        ))?;

        Ok(OpcodeSuccess::Continue)
    }

    // MSIZE operation
    pub fn op_msize(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpMsize);
        self.increase_consumed_gas(current_call_frame, gas_cost::MSIZE)?;

        current_call_frame
            .stack
            .push(current_call_frame.memory.size())?;

        Ok(OpcodeSuccess::Continue)
    }

    // GAS operation
    pub fn op_gas(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpGas);
        self.increase_consumed_gas(current_call_frame, gas_cost::GAS)?;

        let remaining_gas = current_call_frame
            .gas_limit
            .checked_sub(current_call_frame.gas_used)
            .ok_or(VMError::Internal(
                InternalError::ArithmeticOperationUnderflow,
            ))?;
        current_call_frame.stack.push(remaining_gas)?;

        Ok(OpcodeSuccess::Continue)
    }

    // JUMPDEST operation
    pub fn op_jumpdest(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpJumpdest);
        self.increase_consumed_gas(current_call_frame, gas_cost::JUMPDEST)?;
        Ok(OpcodeSuccess::Continue)
    }

    // BEGINSUB operation
    pub fn op_beginsub(
        &mut self,
        _current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        // Subroutine entry markers are only reachable through JUMPSUB;
        // walking into one is an error.
        Err(VMError::InvalidBeginsub)
    }

    // JUMPSUB operation
    pub fn op_jumpsub(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpJumpsub);
        self.increase_consumed_gas(current_call_frame, gas_cost::JUMPSUB)?;

        let destination = current_call_frame.stack.pop()?;
        let Ok(destination) = usize::try_from(destination) else {
            return Err(VMError::InvalidJumpsub);
        };
        if destination >= current_call_frame.bytecode.len()
            || !current_call_frame.jump_targets.is_beginsub(destination)
        {
            return Err(VMError::InvalidJumpsub);
        }

        // The advanced counter is the return address; execution resumes one
        // past the BEGINSUB marker.
        let return_pc = current_call_frame.pc;
        current_call_frame.return_substack.push(return_pc)?;
        current_call_frame.pc = destination
            .checked_add(1)
            .ok_or(VMError::Internal(InternalError::PCOverflowed))?;

        Ok(OpcodeSuccess::Continue)
    }

    // RETURNSUB operation
    pub fn op_returnsub(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpReturnsub);
        self.increase_consumed_gas(current_call_frame, gas_cost::RETURNSUB)?;

        let return_pc = current_call_frame.return_substack.pop()?;
        current_call_frame.pc = return_pc;

        Ok(OpcodeSuccess::Continue)
    }
}
