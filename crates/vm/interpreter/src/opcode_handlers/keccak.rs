use crate::{
    call_frame::CallFrame,
    errors::{OpcodeSuccess, VMError},
    gas_cost,
    vcounters::{CounterId, CounterMetrics},
    vm::{frame_metrics, VM},
};
use ethereum_types::U256;
use sha3::{Digest, Keccak256};

// KECCAK256 (1)
// Opcodes: SHA3

impl VM {
    // SHA3 operation
    pub fn op_sha3(
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

        // The hashed length is popped before the counter is recorded.
        let metrics = CounterMetrics {
            input_size: Some(size),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame.counters.record(CounterId::OpSha3, metrics);

        let gas_cost = gas_cost::sha3(current_call_frame, size, offset)?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        let value_bytes = current_call_frame.memory.load_range(offset, size)?;

        let mut hasher = Keccak256::new();
        hasher.update(value_bytes);
        current_call_frame
            .stack
            .push(U256::from_big_endian(&hasher.finalize()))?;

        Ok(OpcodeSuccess::Continue)
    }
}
