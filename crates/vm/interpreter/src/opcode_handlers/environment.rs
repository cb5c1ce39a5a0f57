use crate::{
    call_frame::CallFrame,
    constants::WORD_SIZE,
    errors::{InternalError, OpcodeSuccess, VMError},
    gas_cost,
    vcounters::{CounterId, CounterMetrics},
    vm::{address_to_word, frame_metrics, record_counter, word_to_address, VM},
};
use bytes::Bytes;
use ethereum_types::U256;

// Environmental Information (16)
// Opcodes: ADDRESS, BALANCE, ORIGIN, CALLER, CALLVALUE, CALLDATALOAD, CALLDATASIZE,
// CALLDATACOPY, CODESIZE, CODECOPY, GASPRICE, EXTCODESIZE, EXTCODECOPY,
// RETURNDATASIZE, RETURNDATACOPY, EXTCODEHASH

impl VM {
    // ADDRESS operation
    pub fn op_address(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpAddress);
        self.increase_consumed_gas(current_call_frame, gas_cost::ADDRESS)?;

        current_call_frame
            .stack
            .push(address_to_word(current_call_frame.to))?;

        Ok(OpcodeSuccess::Continue)
    }

    // BALANCE operation
    pub fn op_balance(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpBalance);

        let address = word_to_address(current_call_frame.stack.pop()?);
        let (account_info, address_was_cold) = self.access_account(address);

        self.increase_consumed_gas(
            current_call_frame,
            gas_cost::address_access(address_was_cold, &self.config.gas_prices),
        )?;

        current_call_frame.stack.push(account_info.balance)?;

        Ok(OpcodeSuccess::Continue)
    }

    // ORIGIN operation
    pub fn op_origin(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpOrigin);
        self.increase_consumed_gas(current_call_frame, gas_cost::ORIGIN)?;

        current_call_frame
            .stack
            .push(address_to_word(self.env.origin))?;

        Ok(OpcodeSuccess::Continue)
    }

    // CALLER operation
    pub fn op_caller(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpCaller);
        self.increase_consumed_gas(current_call_frame, gas_cost::CALLER)?;

        current_call_frame
            .stack
            .push(address_to_word(current_call_frame.msg_sender))?;

        Ok(OpcodeSuccess::Continue)
    }

    // CALLVALUE operation
    pub fn op_callvalue(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpCallvalue);
        self.increase_consumed_gas(current_call_frame, gas_cost::CALLVALUE)?;

        current_call_frame
            .stack
            .push(current_call_frame.msg_value)?;

        Ok(OpcodeSuccess::Continue)
    }

    // CALLDATALOAD operation
    pub fn op_calldataload(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpCalldataload);
        self.increase_consumed_gas(current_call_frame, gas_cost::CALLDATALOAD)?;

        let offset = usize::try_from(current_call_frame.stack.pop()?).unwrap_or(usize::MAX);

        // An offset at or past the end produces an empty slice, which gets a
        // single zero byte appended before the word-sized right pad.
        let calldata_len = current_call_frame.calldata.len();
        let slice_end = offset.saturating_add(WORD_SIZE).min(calldata_len);
        let mut data: Vec<u8> = current_call_frame
            .calldata
            .get(offset.min(calldata_len)..slice_end)
            .unwrap_or(&[])
            .to_vec();
        if data.is_empty() {
            data.push(0);
        }
        data.resize(WORD_SIZE, 0);

        current_call_frame
            .stack
            .push(U256::from_big_endian(&data))?;

        Ok(OpcodeSuccess::Continue)
    }

    // CALLDATASIZE operation
    pub fn op_calldatasize(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpCalldatasize);
        self.increase_consumed_gas(current_call_frame, gas_cost::CALLDATASIZE)?;

        current_call_frame
            .stack
            .push(U256::from(current_call_frame.calldata.len()))?;

        Ok(OpcodeSuccess::Continue)
    }

    // CALLDATACOPY operation
    pub fn op_calldatacopy(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let dest_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let calldata_offset = usize::try_from(current_call_frame.stack.pop()?).unwrap_or(usize::MAX);
        let size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;

        let metrics = CounterMetrics {
            input_size: Some(size),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame
            .counters
            .record(CounterId::OpCalldatacopy, metrics);

        let gas_cost = gas_cost::calldatacopy(current_call_frame, size, dest_offset)?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        if size == 0 {
            return Ok(OpcodeSuccess::Continue);
        }

        let data = zero_padded_slice(&current_call_frame.calldata, calldata_offset, size);
        current_call_frame.memory.store_bytes(dest_offset, &data)?;

        Ok(OpcodeSuccess::Continue)
    }

    // CODESIZE operation
    pub fn op_codesize(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpCodesize);
        self.increase_consumed_gas(current_call_frame, gas_cost::CODESIZE)?;

        current_call_frame
            .stack
            .push(U256::from(current_call_frame.bytecode.len()))?;

        Ok(OpcodeSuccess::Continue)
    }

    // CODECOPY operation
    pub fn op_codecopy(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let dest_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let code_offset = usize::try_from(current_call_frame.stack.pop()?).unwrap_or(usize::MAX);
        let size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;

        let metrics = CounterMetrics {
            input_size: Some(size),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame
            .counters
            .record(CounterId::OpCodecopy, metrics);

        let gas_cost = gas_cost::codecopy(current_call_frame, size, dest_offset)?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        if size == 0 {
            return Ok(OpcodeSuccess::Continue);
        }

        let data = zero_padded_slice(&current_call_frame.bytecode, code_offset, size);
        current_call_frame.memory.store_bytes(dest_offset, &data)?;

        Ok(OpcodeSuccess::Continue)
    }

    // GASPRICE operation
    pub fn op_gasprice(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpGasprice);
        self.increase_consumed_gas(current_call_frame, gas_cost::GASPRICE)?;

        current_call_frame.stack.push(self.env.gas_price)?;

        Ok(OpcodeSuccess::Continue)
    }

    // EXTCODESIZE operation
    pub fn op_extcodesize(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpExtcodesize);

        let address = word_to_address(current_call_frame.stack.pop()?);
        let (account_info, address_was_cold) = self.access_account(address);

        self.increase_consumed_gas(
            current_call_frame,
            gas_cost::address_access(address_was_cold, &self.config.gas_prices),
        )?;

        current_call_frame
            .stack
            .push(U256::from(account_info.bytecode.len()))?;

        Ok(OpcodeSuccess::Continue)
    }

    // EXTCODECOPY operation
    pub fn op_extcodecopy(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let address = word_to_address(current_call_frame.stack.pop()?);
        let dest_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let code_offset = usize::try_from(current_call_frame.stack.pop()?).unwrap_or(usize::MAX);
        let size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;

        let metrics = CounterMetrics {
            input_size: Some(size),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame
            .counters
            .record(CounterId::OpExtcodecopy, metrics);

        let (account_info, address_was_cold) = self.access_account(address);

        let copy_cost = gas_cost::extcodecopy(current_call_frame, size, dest_offset)?;
        let access_cost = gas_cost::address_access(address_was_cold, &self.config.gas_prices);
        self.increase_consumed_gas(
            current_call_frame,
            copy_cost
                .checked_add(access_cost)
                .ok_or(VMError::Internal(InternalError::ArithmeticOperationOverflow))?,
        )?;

        if size == 0 {
            return Ok(OpcodeSuccess::Continue);
        }

        let data = zero_padded_slice(&account_info.bytecode, code_offset, size);
        current_call_frame.memory.store_bytes(dest_offset, &data)?;

        Ok(OpcodeSuccess::Continue)
    }

    // RETURNDATASIZE operation
    pub fn op_returndatasize(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpReturndatasize);
        self.increase_consumed_gas(current_call_frame, gas_cost::RETURNDATASIZE)?;

        current_call_frame
            .stack
            .push(U256::from(current_call_frame.sub_return_data.len()))?;

        Ok(OpcodeSuccess::Continue)
    }

    // RETURNDATACOPY operation
    pub fn op_returndatacopy(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let dest_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let returndata_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;

        let metrics = CounterMetrics {
            input_size: Some(size),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame
            .counters
            .record(CounterId::OpReturndatacopy, metrics);

        let gas_cost = gas_cost::returndatacopy(current_call_frame, size, dest_offset)?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        // Reading past the end of the sub-context's return data traps,
        // unlike the zero-padded copies.
        let copy_end = returndata_offset
            .checked_add(size)
            .ok_or(VMError::OutOfRange)?;
        if copy_end > current_call_frame.sub_return_data.len() {
            return Err(VMError::OutOfRange);
        }

        if size == 0 {
            return Ok(OpcodeSuccess::Continue);
        }

        let data = current_call_frame
            .sub_return_data
            .get(returndata_offset..copy_end)
            .ok_or(VMError::Internal(InternalError::SlicingError))?
            .to_vec();
        current_call_frame.memory.store_bytes(dest_offset, &data)?;

        Ok(OpcodeSuccess::Continue)
    }

    // EXTCODEHASH operation
    pub fn op_extcodehash(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpExtcodehash);

        let address = word_to_address(current_call_frame.stack.pop()?);
        let (account_info, address_was_cold) = self.access_account(address);

        self.increase_consumed_gas(
            current_call_frame,
            gas_cost::address_access(address_was_cold, &self.config.gas_prices),
        )?;

        // Codeless accounts hash to zero; everything else gets the state
        // tree's linear Poseidon bytecode hash, not Keccak.
        if account_info.bytecode.is_empty() {
            current_call_frame.stack.push(U256::zero())?;
        } else {
            let code_hash = self.db.code_hash(&account_info.bytecode);
            current_call_frame
                .stack
                .push(U256::from_big_endian(code_hash.as_bytes()))?;
        }

        Ok(OpcodeSuccess::Continue)
    }
}

/// Reads `size` bytes starting at `offset`, extending with zeros past the
/// end of the source.
fn zero_padded_slice(source: &Bytes, offset: usize, size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    let source_len = source.len();
    if offset < source_len {
        let copy_end = offset.saturating_add(size).min(source_len);
        if let (Some(source_slice), Some(dest_slice)) = (
            source.get(offset..copy_end),
            data.get_mut(..copy_end.saturating_sub(offset)),
        ) {
            dest_slice.copy_from_slice(source_slice);
        }
    }
    data
}
