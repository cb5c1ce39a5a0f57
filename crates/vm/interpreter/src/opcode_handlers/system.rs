use crate::{
    call_frame::CallFrame,
    errors::{OpcodeSuccess, ResultReason, VMError},
    gas_cost,
    vcounters::{CounterId, CounterMetrics},
    vm::{frame_metrics, word_to_address, VM},
};
use ethereum_types::U256;

// System Operations (10)
// Opcodes: CREATE, CALL, CALLCODE, RETURN, DELEGATECALL, CREATE2, STATICCALL,
// REVERT, INVALID, SELFDESTRUCT

impl VM {
    // CALL operation
    pub fn op_call(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let gas_for_call = current_call_frame.stack.pop()?;
        let callee = word_to_address(current_call_frame.stack.pop()?);
        let value_to_transfer = current_call_frame.stack.pop()?;

        if current_call_frame.is_static && !value_to_transfer.is_zero() {
            return Err(VMError::StaticStateChange);
        }

        let args_start_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let args_size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let return_data_start_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let return_data_size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;

        let (account_info, address_was_cold) = self.access_account(callee);

        self.record_message_call_counters(
            current_call_frame,
            CounterId::OpCall,
            account_info.bytecode.len(),
            false,
        );

        let memory_expansion_cost = call_memory_expansion_cost(
            current_call_frame,
            args_start_offset,
            args_size,
            return_data_start_offset,
            return_data_size,
        )?;
        self.increase_consumed_gas(
            current_call_frame,
            gas_cost::call(
                memory_expansion_cost,
                address_was_cold,
                account_info.is_empty(),
                value_to_transfer,
                &self.config.gas_prices,
            )?,
        )?;

        // The new sender is the current contract; recipient and code account
        // coincide, unlike CALLCODE or DELEGATECALL.
        let msg_sender = current_call_frame.to;
        let to = callee;
        let is_static = current_call_frame.is_static;

        self.generic_call(
            current_call_frame,
            gas_for_call,
            value_to_transfer,
            msg_sender,
            to,
            callee,
            true,
            is_static,
            args_start_offset,
            args_size,
            return_data_start_offset,
            return_data_size,
        )
    }

    // CALLCODE operation
    pub fn op_callcode(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let gas_for_call = current_call_frame.stack.pop()?;
        let code_address = word_to_address(current_call_frame.stack.pop()?);
        let value_to_transfer = current_call_frame.stack.pop()?;

        if current_call_frame.is_static && !value_to_transfer.is_zero() {
            return Err(VMError::StaticStateChange);
        }

        let args_start_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let args_size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let return_data_start_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let return_data_size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;

        let (account_info, address_was_cold) = self.access_account(code_address);

        self.record_message_call_counters(
            current_call_frame,
            CounterId::OpCallcode,
            account_info.bytecode.len(),
            false,
        );

        let memory_expansion_cost = call_memory_expansion_cost(
            current_call_frame,
            args_start_offset,
            args_size,
            return_data_start_offset,
            return_data_size,
        )?;
        self.increase_consumed_gas(
            current_call_frame,
            gas_cost::call_without_account_creation(
                memory_expansion_cost,
                address_was_cold,
                value_to_transfer,
                &self.config.gas_prices,
            )?,
        )?;

        // Sender and recipient are the same account; only the executed code
        // comes from somewhere else.
        let msg_sender = current_call_frame.to;
        let to = current_call_frame.to;
        let is_static = current_call_frame.is_static;

        self.generic_call(
            current_call_frame,
            gas_for_call,
            value_to_transfer,
            msg_sender,
            to,
            code_address,
            true,
            is_static,
            args_start_offset,
            args_size,
            return_data_start_offset,
            return_data_size,
        )
    }

    // DELEGATECALL operation
    pub fn op_delegatecall(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let gas_for_call = current_call_frame.stack.pop()?;
        let code_address = word_to_address(current_call_frame.stack.pop()?);
        let args_start_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let args_size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let return_data_start_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let return_data_size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;

        let (account_info, address_was_cold) = self.access_account(code_address);

        self.record_message_call_counters(
            current_call_frame,
            CounterId::OpDelegatecall,
            account_info.bytecode.len(),
            false,
        );

        let memory_expansion_cost = call_memory_expansion_cost(
            current_call_frame,
            args_start_offset,
            args_size,
            return_data_start_offset,
            return_data_size,
        )?;
        self.increase_consumed_gas(
            current_call_frame,
            gas_cost::call_without_account_creation(
                memory_expansion_cost,
                address_was_cold,
                U256::zero(),
                &self.config.gas_prices,
            )?,
        )?;

        // The borrowed code runs with the caller's sender, recipient and
        // value.
        let msg_sender = current_call_frame.msg_sender;
        let value = current_call_frame.msg_value;
        let to = current_call_frame.to;
        let is_static = current_call_frame.is_static;

        self.generic_call(
            current_call_frame,
            gas_for_call,
            value,
            msg_sender,
            to,
            code_address,
            false,
            is_static,
            args_start_offset,
            args_size,
            return_data_start_offset,
            return_data_size,
        )
    }

    // STATICCALL operation
    pub fn op_staticcall(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let gas_for_call = current_call_frame.stack.pop()?;
        let code_address = word_to_address(current_call_frame.stack.pop()?);
        let args_start_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let args_size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let return_data_start_offset: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let return_data_size: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;

        let (account_info, address_was_cold) = self.access_account(code_address);

        self.record_message_call_counters(
            current_call_frame,
            CounterId::OpStaticcall,
            account_info.bytecode.len(),
            false,
        );

        let memory_expansion_cost = call_memory_expansion_cost(
            current_call_frame,
            args_start_offset,
            args_size,
            return_data_start_offset,
            return_data_size,
        )?;
        self.increase_consumed_gas(
            current_call_frame,
            gas_cost::call_without_account_creation(
                memory_expansion_cost,
                address_was_cold,
                U256::zero(),
                &self.config.gas_prices,
            )?,
        )?;

        // The sub-context carries no value and propagates the static flag.
        let value = U256::zero();
        let msg_sender = current_call_frame.to;
        let to = code_address;

        self.generic_call(
            current_call_frame,
            gas_for_call,
            value,
            msg_sender,
            to,
            code_address,
            false,
            true,
            args_start_offset,
            args_size,
            return_data_start_offset,
            return_data_size,
        )
    }

    // CREATE operation
    pub fn op_create(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        if current_call_frame.is_static {
            return Err(VMError::StaticStateChange);
        }

        let value_in_wei_to_send = current_call_frame.stack.pop()?;
        let code_offset_in_memory: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let code_size_in_memory: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;

        self.record_message_call_counters(
            current_call_frame,
            CounterId::OpCreate,
            code_size_in_memory,
            false,
        );

        let gas_cost = gas_cost::create(
            current_call_frame,
            code_offset_in_memory,
            code_size_in_memory,
            false,
        )?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        self.create(
            value_in_wei_to_send,
            code_offset_in_memory,
            code_size_in_memory,
            None,
            current_call_frame,
        )
    }

    // CREATE2 operation
    pub fn op_create2(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        if current_call_frame.is_static {
            return Err(VMError::StaticStateChange);
        }

        let value_in_wei_to_send = current_call_frame.stack.pop()?;
        let code_offset_in_memory: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let code_size_in_memory: usize = current_call_frame
            .stack
            .pop()?
            .try_into()
            .map_err(|_| VMError::OutOfRange)?;
        let salt = current_call_frame.stack.pop()?;

        self.record_message_call_counters(
            current_call_frame,
            CounterId::OpCreate2,
            code_size_in_memory,
            true,
        );

        let gas_cost = gas_cost::create(
            current_call_frame,
            code_offset_in_memory,
            code_size_in_memory,
            true,
        )?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        self.create(
            value_in_wei_to_send,
            code_offset_in_memory,
            code_size_in_memory,
            Some(salt),
            current_call_frame,
        )
    }

    // RETURN operation
    pub fn op_return(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let offset: usize = current_call_frame
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
            return_len: Some(size),
            depth: Some(current_call_frame.depth),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame
            .counters
            .record(CounterId::OpReturn, metrics);

        let gas_cost = current_call_frame.memory.expansion_cost(
            offset.checked_add(size).ok_or(VMError::OutOfRange)?,
        )?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        current_call_frame.output = current_call_frame.memory.load_range(offset, size)?.into();

        Ok(OpcodeSuccess::Result(ResultReason::Return))
    }

    // REVERT operation
    pub fn op_revert(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let offset: usize = current_call_frame
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
            return_len: Some(size),
            depth: Some(current_call_frame.depth),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame
            .counters
            .record(CounterId::OpRevert, metrics);

        let gas_cost = current_call_frame.memory.expansion_cost(
            offset.checked_add(size).ok_or(VMError::OutOfRange)?,
        )?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        // State reversal happens in the dispatch loop; the output survives.
        current_call_frame.output = current_call_frame.memory.load_range(offset, size)?.into();

        Err(VMError::RevertOpcode)
    }

    /// INVALID operation. Consumes all gas, no return data.
    pub fn op_invalid(&mut self) -> Result<OpcodeSuccess, VMError> {
        Err(VMError::InvalidOpcode)
    }

    // SELFDESTRUCT operation
    pub fn op_selfdestruct(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        // Observable state change, so a static context may not run it.
        if current_call_frame.is_static {
            return Err(VMError::StaticStateChange);
        }

        let beneficiary_address = word_to_address(current_call_frame.stack.pop()?);

        let metrics = CounterMetrics {
            depth: Some(current_call_frame.depth),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame
            .counters
            .record(CounterId::OpSelfdestruct, metrics);

        let (beneficiary_info, beneficiary_was_cold) = self.access_account(beneficiary_address);
        let (current_account_info, _) = self.access_account(current_call_frame.to);
        let balance_to_transfer = current_account_info.balance;

        self.increase_consumed_gas(
            current_call_frame,
            gas_cost::selfdestruct(
                beneficiary_was_cold,
                beneficiary_info.is_empty(),
                balance_to_transfer,
                &self.config.gas_prices,
            )?,
        )?;

        // The whole balance moves now; the account itself is deleted at
        // transaction end via the accrued substate.
        self.decrease_account_balance(current_call_frame.to, balance_to_transfer)?;
        if beneficiary_address != current_call_frame.to {
            self.increase_account_balance(beneficiary_address, balance_to_transfer)?;
        }

        self.accrued_substate
            .selfdestruct_set
            .insert(current_call_frame.to);

        Ok(OpcodeSuccess::Result(ResultReason::SelfDestruct))
    }

    /// Call/create opcodes contribute two counters: their own and the
    /// shared contract-call one carrying the code length.
    fn record_message_call_counters(
        &mut self,
        current_call_frame: &mut CallFrame,
        id: CounterId,
        bytecode_len: usize,
        is_create2: bool,
    ) {
        let is_create_op = matches!(id, CounterId::OpCreate | CounterId::OpCreate2);
        let own_metrics = CounterMetrics {
            bytecode_len: Some(bytecode_len),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame.counters.record(id, own_metrics);

        let process_metrics = CounterMetrics {
            bytecode_len: Some(bytecode_len),
            is_create: is_create_op,
            is_deploy: false,
            is_create2,
            ..Default::default()
        };
        current_call_frame
            .counters
            .record(CounterId::ProcessContractCall, process_metrics);
    }
}

/// Memory has to cover both the argument window and the return window; the
/// charge is for whichever reaches further.
fn call_memory_expansion_cost(
    current_call_frame: &CallFrame,
    args_start_offset: usize,
    args_size: usize,
    return_data_start_offset: usize,
    return_data_size: usize,
) -> Result<U256, VMError> {
    let args_end = args_start_offset
        .checked_add(args_size)
        .ok_or(VMError::OutOfRange)?;
    let return_data_end = return_data_start_offset
        .checked_add(return_data_size)
        .ok_or(VMError::OutOfRange)?;
    let cost = current_call_frame
        .memory
        .expansion_cost(args_end.max(return_data_end))
        .map_err(VMError::OutOfGas)?;
    Ok(cost)
}
