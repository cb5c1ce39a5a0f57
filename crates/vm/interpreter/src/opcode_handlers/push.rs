use crate::{
    call_frame::CallFrame,
    errors::{OpcodeSuccess, VMError},
    gas_cost,
    vcounters::{CounterId, CounterMetrics},
    vm::{frame_metrics, VM},
};
use ethereum_types::U256;

// Push Operations (32)
// Opcodes: PUSH1 ... PUSH32, one body indexed by the immediate size

impl VM {
    // PUSHn operation
    pub fn op_push(
        &mut self,
        current_call_frame: &mut CallFrame,
        n_bytes: usize,
    ) -> Result<OpcodeSuccess, VMError> {
        let metrics = CounterMetrics {
            push_bytes: Some(n_bytes),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame.counters.record(CounterId::OpPush, metrics);
        self.increase_consumed_gas(current_call_frame, gas_cost::PUSHN)?;

        // An immediate truncated by the end of code is padded with zeros.
        let pc_offset = current_call_frame.pc();
        let read_end = pc_offset
            .saturating_add(n_bytes)
            .min(current_call_frame.bytecode.len());
        let mut value_bytes = current_call_frame
            .bytecode
            .get(pc_offset.min(current_call_frame.bytecode.len())..read_end)
            .unwrap_or(&[])
            .to_vec();
        value_bytes.resize(n_bytes, 0);

        current_call_frame
            .stack
            .push(U256::from_big_endian(&value_bytes))?;
        current_call_frame.increment_pc_by(n_bytes)?;

        Ok(OpcodeSuccess::Continue)
    }
}
