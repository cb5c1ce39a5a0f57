use crate::{
    call_frame::CallFrame,
    errors::{OpcodeSuccess, VMError},
    gas_cost,
    vcounters::CounterId,
    vm::{record_counter, VM},
};

// Exchange Operations (16)
// Opcodes: SWAP1 ... SWAP16, one body indexed by the exchange depth

impl VM {
    // SWAPn operation
    pub fn op_swap(
        &mut self,
        current_call_frame: &mut CallFrame,
        depth: usize,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpSwap);
        self.increase_consumed_gas(current_call_frame, gas_cost::SWAPN)?;

        let stack_len = current_call_frame.stack.len();
        let top_index = stack_len.checked_sub(1).ok_or(VMError::StackUnderflow)?;
        let swapped_index = top_index
            .checked_sub(depth)
            .ok_or(VMError::StackUnderflow)?;
        current_call_frame.stack.swap(top_index, swapped_index)?;

        Ok(OpcodeSuccess::Continue)
    }
}
