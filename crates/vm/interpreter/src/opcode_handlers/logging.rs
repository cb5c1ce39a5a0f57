use crate::{
    call_frame::CallFrame,
    constants::WORD_SIZE,
    errors::{OpcodeSuccess, VMError},
    gas_cost,
    log::Log,
    vcounters::{CounterId, CounterMetrics},
    vm::{frame_metrics, VM},
};
use ethereum_types::H256;

// Logging Operations (5)
// Opcodes: LOG0 ... LOG4, one body indexed by the topic count

impl VM {
    // LOGn operation
    pub fn op_log(
        &mut self,
        current_call_frame: &mut CallFrame,
        number_of_topics: usize,
    ) -> Result<OpcodeSuccess, VMError> {
        if current_call_frame.is_static {
            return Err(VMError::StaticStateChange);
        }

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

        let mut topics = Vec::with_capacity(number_of_topics);
        for _ in 0..number_of_topics {
            let topic_word = current_call_frame.stack.pop()?;
            let mut topic_bytes = [0u8; WORD_SIZE];
            topic_word.to_big_endian(&mut topic_bytes);
            topics.push(H256::from(topic_bytes));
        }

        let metrics = CounterMetrics {
            input_size: Some(size),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame.counters.record(CounterId::OpLog, metrics);

        let gas_cost = gas_cost::log(current_call_frame, size, offset, number_of_topics)?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        let data = current_call_frame.memory.load_range(offset, size)?;
        let log = Log {
            address: current_call_frame.to,
            topics,
            data: data.into(),
        };
        current_call_frame.logs.push(log);

        Ok(OpcodeSuccess::Continue)
    }
}
