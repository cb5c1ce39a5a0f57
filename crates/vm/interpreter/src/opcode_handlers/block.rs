use crate::{
    call_frame::CallFrame,
    constants::LAST_AVAILABLE_BLOCK_LIMIT,
    errors::{OpcodeSuccess, VMError},
    gas_cost,
    vcounters::CounterId,
    vm::{address_to_word, record_counter, VM},
};
use ethereum_types::U256;

// Block Information (9)
// Opcodes: BLOCKHASH, COINBASE, TIMESTAMP, NUMBER, DIFFICULTY, GASLIMIT,
// CHAINID, SELFBALANCE, BASEFEE

impl VM {
    // BLOCKHASH operation
    pub fn op_blockhash(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpBlockhash);
        self.increase_consumed_gas(current_call_frame, gas_cost::BLOCKHASH)?;

        let block_number = current_call_frame.stack.pop()?;

        // Outside the 256-block window the answer is zero.
        if block_number
            < self
                .env
                .block_number
                .saturating_sub(LAST_AVAILABLE_BLOCK_LIMIT)
            || block_number >= self.env.block_number
        {
            current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeSuccess::Continue);
        }

        // The zkEVM answers BLOCKHASH with the hash of the batch holding the
        // block.
        if let Some(batch_hash) = self.db.get_batch_hash(block_number) {
            current_call_frame
                .stack
                .push(U256::from_big_endian(batch_hash.as_bytes()))?;
        } else {
            current_call_frame.stack.push(U256::zero())?;
        }

        Ok(OpcodeSuccess::Continue)
    }

    // COINBASE operation
    pub fn op_coinbase(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpCoinbase);
        self.increase_consumed_gas(current_call_frame, gas_cost::COINBASE)?;

        current_call_frame
            .stack
            .push(address_to_word(self.env.coinbase))?;

        Ok(OpcodeSuccess::Continue)
    }

    // TIMESTAMP operation
    pub fn op_timestamp(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpTimestamp);
        self.increase_consumed_gas(current_call_frame, gas_cost::TIMESTAMP)?;

        current_call_frame.stack.push(self.env.timestamp)?;

        Ok(OpcodeSuccess::Continue)
    }

    // NUMBER operation
    pub fn op_number(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpNumber);
        self.increase_consumed_gas(current_call_frame, gas_cost::NUMBER)?;

        current_call_frame.stack.push(self.env.block_number)?;

        Ok(OpcodeSuccess::Continue)
    }

    // DIFFICULTY operation
    pub fn op_difficulty(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpDifficulty);
        self.increase_consumed_gas(current_call_frame, gas_cost::DIFFICULTY)?;

        current_call_frame.stack.push(self.env.difficulty)?;

        Ok(OpcodeSuccess::Continue)
    }

    // GASLIMIT operation
    pub fn op_gaslimit(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpGaslimit);
        self.increase_consumed_gas(current_call_frame, gas_cost::GASLIMIT)?;

        current_call_frame.stack.push(self.env.block_gas_limit)?;

        Ok(OpcodeSuccess::Continue)
    }

    // CHAINID operation
    pub fn op_chainid(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpChainid);
        self.increase_consumed_gas(current_call_frame, gas_cost::CHAINID)?;

        current_call_frame.stack.push(self.env.chain_id)?;

        Ok(OpcodeSuccess::Continue)
    }

    // SELFBALANCE operation
    pub fn op_selfbalance(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpSelfbalance);
        self.increase_consumed_gas(current_call_frame, gas_cost::SELFBALANCE)?;

        let balance = self.get_account(current_call_frame.to).info.balance;
        current_call_frame.stack.push(balance)?;

        Ok(OpcodeSuccess::Continue)
    }

    // BASEFEE operation
    pub fn op_basefee(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpBasefee);
        self.increase_consumed_gas(current_call_frame, gas_cost::BASEFEE)?;

        current_call_frame.stack.push(self.env.base_fee_per_gas)?;

        Ok(OpcodeSuccess::Continue)
    }
}
