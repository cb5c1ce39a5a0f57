use crate::{
    call_frame::CallFrame,
    errors::{OpcodeSuccess, VMError},
    gas_cost,
    vcounters::CounterId,
    vm::{record_counter, VM},
};

// Duplication Operations (16)
// Opcodes: DUP1 ... DUP16, one body indexed by the duplication depth

impl VM {
    // DUPn operation
    pub fn op_dup(
        &mut self,
        current_call_frame: &mut CallFrame,
        depth: usize,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpDup);
        self.increase_consumed_gas(current_call_frame, gas_cost::DUPN)?;

        let stack_len = current_call_frame.stack.len();
        let source_index = stack_len
            .checked_sub(depth)
            .ok_or(VMError::StackUnderflow)?;
        let value = *current_call_frame.stack.get(source_index)?;
        current_call_frame.stack.push(value)?;

        Ok(OpcodeSuccess::Continue)
    }
}
