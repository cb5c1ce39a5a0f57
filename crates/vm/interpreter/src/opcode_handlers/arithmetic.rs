use crate::{
    call_frame::CallFrame,
    errors::{InternalError, OpcodeSuccess, ResultReason, VMError},
    gas_cost,
    vcounters::{CounterId, CounterMetrics},
    vm::{frame_metrics, record_counter, VM},
};
use ethereum_types::{U256, U512};

// Stop and Arithmetic Operations (12)
// Opcodes: STOP, ADD, MUL, SUB, DIV, SDIV, MOD, SMOD, ADDMOD, MULMOD, EXP, SIGNEXTEND

impl VM {
    // STOP operation
    pub fn op_stop(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let metrics = CounterMetrics {
            depth: Some(current_call_frame.depth),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame.counters.record(CounterId::OpStop, metrics);
        Ok(OpcodeSuccess::Result(ResultReason::Stop))
    }

    // ADD operation
    pub fn op_add(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpAdd);
        self.increase_consumed_gas(current_call_frame, gas_cost::ADD)?;

        let augend = current_call_frame.stack.pop()?;
        let addend = current_call_frame.stack.pop()?;
        let sum = augend.overflowing_add(addend).0;
        current_call_frame.stack.push(sum)?;

        Ok(OpcodeSuccess::Continue)
    }

    // MUL operation
    pub fn op_mul(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpMul);
        self.increase_consumed_gas(current_call_frame, gas_cost::MUL)?;

        let multiplicand = current_call_frame.stack.pop()?;
        let multiplier = current_call_frame.stack.pop()?;
        let product = multiplicand.overflowing_mul(multiplier).0;
        current_call_frame.stack.push(product)?;

        Ok(OpcodeSuccess::Continue)
    }

    // SUB operation
    pub fn op_sub(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpSub);
        self.increase_consumed_gas(current_call_frame, gas_cost::SUB)?;

        let minuend = current_call_frame.stack.pop()?;
        let subtrahend = current_call_frame.stack.pop()?;
        let difference = minuend.overflowing_sub(subtrahend).0;
        current_call_frame.stack.push(difference)?;

        Ok(OpcodeSuccess::Continue)
    }

    // DIV operation
    pub fn op_div(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpDiv);
        self.increase_consumed_gas(current_call_frame, gas_cost::DIV)?;

        let dividend = current_call_frame.stack.pop()?;
        let divisor = current_call_frame.stack.pop()?;
        let quotient = if divisor.is_zero() {
            U256::zero()
        } else {
            dividend
                .checked_div(divisor)
                .ok_or(VMError::Internal(InternalError::ArithmeticOperationOverflow))?
        };
        current_call_frame.stack.push(quotient)?;

        Ok(OpcodeSuccess::Continue)
    }

    // SDIV operation
    pub fn op_sdiv(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpSdiv);
        self.increase_consumed_gas(current_call_frame, gas_cost::SDIV)?;

        let dividend = current_call_frame.stack.pop()?;
        let divisor = current_call_frame.stack.pop()?;
        if divisor.is_zero() {
            current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeSuccess::Continue);
        }

        let dividend_is_negative = is_negative(dividend);
        let divisor_is_negative = is_negative(divisor);
        let unsigned_dividend = if dividend_is_negative {
            negate(dividend)
        } else {
            dividend
        };
        let unsigned_divisor = if divisor_is_negative {
            negate(divisor)
        } else {
            divisor
        };

        // MIN_I256 / -1 falls out of the two's-complement negation: the
        // unsigned quotient re-negates to MIN_I256 itself.
        let quotient = unsigned_dividend
            .checked_div(unsigned_divisor)
            .unwrap_or_default();
        let quotient_is_negative = dividend_is_negative ^ divisor_is_negative;
        let quotient = if quotient_is_negative && !quotient.is_zero() {
            negate(quotient)
        } else {
            quotient
        };

        current_call_frame.stack.push(quotient)?;
        Ok(OpcodeSuccess::Continue)
    }

    // MOD operation
    pub fn op_mod(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpMod);
        self.increase_consumed_gas(current_call_frame, gas_cost::MOD)?;

        let dividend = current_call_frame.stack.pop()?;
        let divisor = current_call_frame.stack.pop()?;
        let remainder = if divisor.is_zero() {
            U256::zero()
        } else {
            dividend.checked_rem(divisor).unwrap_or_default()
        };
        current_call_frame.stack.push(remainder)?;

        Ok(OpcodeSuccess::Continue)
    }

    // SMOD operation
    pub fn op_smod(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpSmod);
        self.increase_consumed_gas(current_call_frame, gas_cost::SMOD)?;

        let dividend = current_call_frame.stack.pop()?;
        let divisor = current_call_frame.stack.pop()?;
        if divisor.is_zero() {
            current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeSuccess::Continue);
        }

        let dividend_is_negative = is_negative(dividend);
        let unsigned_dividend = if dividend_is_negative {
            negate(dividend)
        } else {
            dividend
        };
        let unsigned_divisor = if is_negative(divisor) {
            negate(divisor)
        } else {
            divisor
        };

        // The result takes the sign of the dividend.
        let remainder = unsigned_dividend
            .checked_rem(unsigned_divisor)
            .unwrap_or_default();
        let remainder = if dividend_is_negative && !remainder.is_zero() {
            negate(remainder)
        } else {
            remainder
        };

        current_call_frame.stack.push(remainder)?;
        Ok(OpcodeSuccess::Continue)
    }

    // ADDMOD operation
    pub fn op_addmod(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpAddmod);
        self.increase_consumed_gas(current_call_frame, gas_cost::ADDMOD)?;

        let augend = U512::from(current_call_frame.stack.pop()?);
        let addend = U512::from(current_call_frame.stack.pop()?);
        let divisor = U512::from(current_call_frame.stack.pop()?);
        if divisor.is_zero() {
            current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeSuccess::Continue);
        }

        let sum = augend
            .checked_add(addend)
            .ok_or(VMError::Internal(InternalError::ArithmeticOperationOverflow))?;
        let remainder = sum.checked_rem(divisor).unwrap_or_default();
        current_call_frame.stack.push(u512_to_u256(remainder)?)?;

        Ok(OpcodeSuccess::Continue)
    }

    // MULMOD operation
    pub fn op_mulmod(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpMulmod);
        self.increase_consumed_gas(current_call_frame, gas_cost::MULMOD)?;

        let multiplicand = U512::from(current_call_frame.stack.pop()?);
        let multiplier = U512::from(current_call_frame.stack.pop()?);
        let divisor = U512::from(current_call_frame.stack.pop()?);
        if divisor.is_zero() {
            current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeSuccess::Continue);
        }

        let product = multiplicand
            .checked_mul(multiplier)
            .ok_or(VMError::Internal(InternalError::ArithmeticOperationOverflow))?;
        let remainder = product.checked_rem(divisor).unwrap_or_default();
        current_call_frame.stack.push(u512_to_u256(remainder)?)?;

        Ok(OpcodeSuccess::Continue)
    }

    // EXP operation
    pub fn op_exp(&mut self, current_call_frame: &mut CallFrame) -> Result<OpcodeSuccess, VMError> {
        let base = current_call_frame.stack.pop()?;
        let exponent = current_call_frame.stack.pop()?;

        // The exponent length is recorded before any trivial-exponent
        // shortcut can return.
        let exponent_bytes = exponent
            .bits()
            .checked_add(7)
            .ok_or(VMError::Internal(InternalError::ArithmeticOperationOverflow))?
            / 8;
        let metrics = CounterMetrics {
            exponent_bytes: Some(exponent_bytes),
            ..frame_metrics(current_call_frame)
        };
        current_call_frame.counters.record(CounterId::OpExp, metrics);

        let gas_cost = gas_cost::exp(exponent, &self.config.gas_prices)?;
        self.increase_consumed_gas(current_call_frame, gas_cost)?;

        let power = base.overflowing_pow(exponent).0;
        current_call_frame.stack.push(power)?;

        Ok(OpcodeSuccess::Continue)
    }

    // SIGNEXTEND operation
    pub fn op_signextend(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        record_counter(current_call_frame, CounterId::OpSignextend);
        self.increase_consumed_gas(current_call_frame, gas_cost::SIGNEXTEND)?;

        let byte_size = current_call_frame.stack.pop()?;
        let value_to_extend = current_call_frame.stack.pop()?;

        // Positions of 31 and beyond already span the full word.
        if byte_size >= U256::from(31) {
            current_call_frame.stack.push(value_to_extend)?;
            return Ok(OpcodeSuccess::Continue);
        }

        let bits_per_byte = U256::from(8);
        let sign_bit_position_on_byte = U256::from(7);
        let sign_bit_index = bits_per_byte
            .checked_mul(byte_size)
            .and_then(|bits| bits.checked_add(sign_bit_position_on_byte))
            .ok_or(VMError::Internal(InternalError::ArithmeticOperationOverflow))?;
        let sign_bit_index = usize::try_from(sign_bit_index)
            .map_err(|_| VMError::Internal(InternalError::ArithmeticOperationOverflow))?;

        let is_negative = value_to_extend.bit(sign_bit_index);
        let sign_bit_mask = (U256::one() << sign_bit_index)
            .checked_sub(U256::one())
            .ok_or(VMError::Internal(
                InternalError::ArithmeticOperationUnderflow,
            ))?;
        let result = if is_negative {
            value_to_extend | !sign_bit_mask
        } else {
            value_to_extend & sign_bit_mask
        };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeSuccess::Continue)
    }
}

/// The most significant bit flags a negative two's-complement word.
fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Two's-complement negation.
fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn u512_to_u256(value: U512) -> Result<U256, VMError> {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    let low = bytes
        .get(32..)
        .ok_or(VMError::Internal(InternalError::SlicingError))?;
    Ok(U256::from_big_endian(low))
}
