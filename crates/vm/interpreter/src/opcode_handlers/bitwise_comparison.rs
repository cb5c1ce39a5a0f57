use crate::{
    call_frame::CallFrame,
    constants::WORD_SIZE,
    errors::{OpcodeSuccess, VMError},
    gas_cost,
    vcounters::CounterId,
    vm::{record_counter, VM},
};
use ethereum_types::U256;

// Comparison and Bitwise Logic Operations (14)
// Opcodes: LT, GT, SLT, SGT, EQ, ISZERO, AND, OR, XOR, NOT, BYTE, SHL, SHR, SAR

impl VM {
    // LT operation
    pub fn op_lt(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpLt);
        self.increase_consumed_gas(current_call_frame, gas_cost::LT)?;

        let lho = current_call_frame.stack.pop()?;
        let rho = current_call_frame.stack.pop()?;
        let result = if lho < rho { U256::one() } else { U256::zero() };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeSuccess::Continue)
    }

    // GT operation
    pub fn op_gt(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpGt);
        self.increase_consumed_gas(current_call_frame, gas_cost::GT)?;

        let lho = current_call_frame.stack.pop()?;
        let rho = current_call_frame.stack.pop()?;
        let result = if lho > rho { U256::one() } else { U256::zero() };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeSuccess::Continue)
    }

    // SLT operation (signed less than)
    pub fn op_slt(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpSlt);
        self.increase_consumed_gas(current_call_frame, gas_cost::SLT)?;

        let lho = current_call_frame.stack.pop()?;
        let rho = current_call_frame.stack.pop()?;
        let lho_is_negative = lho.bit(255);
        let rho_is_negative = rho.bit(255);
        let result = if lho_is_negative == rho_is_negative {
            // Same sign: the two's-complement bit patterns order like the
            // unsigned ones.
            if lho < rho {
                U256::one()
            } else {
                U256::zero()
            }
        } else if lho_is_negative {
            U256::one()
        } else {
            U256::zero()
        };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeSuccess::Continue)
    }

    // SGT operation (signed greater than)
    pub fn op_sgt(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpSgt);
        self.increase_consumed_gas(current_call_frame, gas_cost::SGT)?;

        let lho = current_call_frame.stack.pop()?;
        let rho = current_call_frame.stack.pop()?;
        let lho_is_negative = lho.bit(255);
        let rho_is_negative = rho.bit(255);
        let result = if lho_is_negative == rho_is_negative {
            if lho > rho {
                U256::one()
            } else {
                U256::zero()
            }
        } else if rho_is_negative {
            U256::one()
        } else {
            U256::zero()
        };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeSuccess::Continue)
    }

    // EQ operation
    pub fn op_eq(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpEq);
        self.increase_consumed_gas(current_call_frame, gas_cost::EQ)?;

        let lho = current_call_frame.stack.pop()?;
        let rho = current_call_frame.stack.pop()?;
        let result = if lho == rho {
            U256::one()
        } else {
            U256::zero()
        };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeSuccess::Continue)
    }

    // ISZERO operation
    pub fn op_iszero(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpIszero);
        self.increase_consumed_gas(current_call_frame, gas_cost::ISZERO)?;

        let operand = current_call_frame.stack.pop()?;
        let result = if operand.is_zero() {
            U256::one()
        } else {
            U256::zero()
        };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeSuccess::Continue)
    }

    // AND operation
    pub fn op_and(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpAnd);
        self.increase_consumed_gas(current_call_frame, gas_cost::AND)?;

        let a = current_call_frame.stack.pop()?;
        let b = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(a & b)?;

        Ok(OpcodeSuccess::Continue)
    }

    // OR operation
    pub fn op_or(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpOr);
        self.increase_consumed_gas(current_call_frame, gas_cost::OR)?;

        let a = current_call_frame.stack.pop()?;
        let b = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(a | b)?;

        Ok(OpcodeSuccess::Continue)
    }

    // XOR operation
    pub fn op_xor(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpXor);
        self.increase_consumed_gas(current_call_frame, gas_cost::XOR)?;

        let a = current_call_frame.stack.pop()?;
        let b = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(a ^ b)?;

        Ok(OpcodeSuccess::Continue)
    }

    // NOT operation
    pub fn op_not(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpNot);
        self.increase_consumed_gas(current_call_frame, gas_cost::NOT)?;

        let a = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(!a)?;

        Ok(OpcodeSuccess::Continue)
    }

    // BYTE operation
    pub fn op_byte(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpByte);
        self.increase_consumed_gas(current_call_frame, gas_cost::BYTE)?;

        let position = current_call_frame.stack.pop()?;
        let word = current_call_frame.stack.pop()?;
        let byte_index = usize::try_from(position).unwrap_or(usize::MAX);

        // Byte 0 is the most significant end; U256::byte counts from the
        // least significant one.
        if let Some(flipped_index) = WORD_SIZE.checked_sub(1).and_then(|last| {
            if byte_index <= last {
                last.checked_sub(byte_index)
            } else {
                None
            }
        }) {
            current_call_frame
                .stack
                .push(U256::from(word.byte(flipped_index)))?;
        } else {
            current_call_frame.stack.push(U256::zero())?;
        }

        Ok(OpcodeSuccess::Continue)
    }

    // SHL operation (shift left)
    pub fn op_shl(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpShl);
        self.increase_consumed_gas(current_call_frame, gas_cost::SHL)?;

        let shift = current_call_frame.stack.pop()?;
        let value = current_call_frame.stack.pop()?;
        if shift < U256::from(256) {
            let shift_amount = usize::try_from(shift).unwrap_or(usize::MAX);
            current_call_frame.stack.push(value << shift_amount)?;
        } else {
            current_call_frame.stack.push(U256::zero())?;
        }

        Ok(OpcodeSuccess::Continue)
    }

    // SHR operation (logical shift right)
    pub fn op_shr(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpShr);
        self.increase_consumed_gas(current_call_frame, gas_cost::SHR)?;

        let shift = current_call_frame.stack.pop()?;
        let value = current_call_frame.stack.pop()?;
        if shift < U256::from(256) {
            let shift_amount = usize::try_from(shift).unwrap_or(usize::MAX);
            current_call_frame.stack.push(value >> shift_amount)?;
        } else {
            current_call_frame.stack.push(U256::zero())?;
        }

        Ok(OpcodeSuccess::Continue)
    }

    // SAR operation (arithmetic shift right)
    pub fn op_sar(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpSar);
        self.increase_consumed_gas(current_call_frame, gas_cost::SAR)?;

        let shift = current_call_frame.stack.pop()?;
        let value = current_call_frame.stack.pop()?;
        let result = if shift < U256::from(256) {
            let shift_amount = usize::try_from(shift).unwrap_or(usize::MAX);
            arithmetic_shift_right(value, shift_amount)
        } else if value.bit(255) {
            U256::MAX
        } else {
            U256::zero()
        };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeSuccess::Continue)
    }
}

/// Shift right propagating the sign bit. The shift amount is below 256.
fn arithmetic_shift_right(value: U256, shift: usize) -> U256 {
    if !value.bit(255) || shift == 0 {
        return value >> shift;
    }
    let shifted = value >> shift;
    let mask = match 256usize.checked_sub(shift) {
        Some(kept_bits) if kept_bits < 256 => U256::MAX << kept_bits,
        _ => U256::zero(),
    };
    shifted | mask
}
