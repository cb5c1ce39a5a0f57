use crate::{
    constants::{MEMORY_EXPANSION_QUOTIENT, WORD_SIZE},
    errors::{InternalError, OutOfGasError, VMError},
};
use ethereum_types::U256;

/// Byte-addressable frame memory. Logically infinite and zero on first read;
/// the backing buffer only ever grows, in 32-byte steps, so `size()` doubles
/// as the MSIZE high-water mark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    data: Vec<u8>,
}

impl From<Vec<u8>> for Memory {
    fn from(data: Vec<u8>) -> Self {
        Memory { data }
    }
}

impl Memory {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    fn resize(&mut self, offset: usize) -> Result<(), VMError> {
        let rounded = offset
            .checked_next_multiple_of(WORD_SIZE)
            .ok_or(VMError::Internal(
                InternalError::ArithmeticOperationOverflow,
            ))?;
        if rounded > self.data.len() {
            self.data.resize(rounded, 0);
        }
        Ok(())
    }

    pub fn load(&mut self, offset: usize) -> Result<U256, VMError> {
        let end = offset
            .checked_add(WORD_SIZE)
            .ok_or(VMError::OutOfRange)?;
        self.resize(end)?;
        let value_bytes = self
            .data
            .get(offset..end)
            .ok_or(VMError::Internal(InternalError::SlicingError))?;
        Ok(U256::from_big_endian(value_bytes))
    }

    pub fn load_range(&mut self, offset: usize, size: usize) -> Result<Vec<u8>, VMError> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let end = offset.checked_add(size).ok_or(VMError::OutOfRange)?;
        self.resize(end)?;
        self.data
            .get(offset..end)
            .map(<[u8]>::to_vec)
            .ok_or(VMError::Internal(InternalError::SlicingError))
    }

    pub fn store_bytes(&mut self, offset: usize, value: &[u8]) -> Result<(), VMError> {
        if value.is_empty() {
            return Ok(());
        }
        let end = offset
            .checked_add(value.len())
            .ok_or(VMError::OutOfRange)?;
        self.resize(end)?;
        self.data
            .get_mut(offset..end)
            .ok_or(VMError::Internal(InternalError::SlicingError))?
            .copy_from_slice(value);
        Ok(())
    }

    pub fn copy(&mut self, src_offset: usize, dest_offset: usize, size: usize) -> Result<(), VMError> {
        if size == 0 {
            return Ok(());
        }
        let src_end = src_offset.checked_add(size).ok_or(VMError::OutOfRange)?;
        let dest_end = dest_offset.checked_add(size).ok_or(VMError::OutOfRange)?;
        self.resize(src_end.max(dest_end))?;

        let temp = self
            .data
            .get(src_offset..src_end)
            .ok_or(VMError::Internal(InternalError::SlicingError))?
            .to_vec();
        self.data
            .get_mut(dest_offset..dest_end)
            .ok_or(VMError::Internal(InternalError::SlicingError))?
            .copy_from_slice(&temp);
        Ok(())
    }

    pub fn size(&self) -> U256 {
        U256::from(self.data.len())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Gas cost of growing memory up to `memory_byte_size` bytes, zero when
    /// the buffer already covers it. Quadratic in the word count, quotient
    /// 512 per the Yellow Paper.
    pub fn expansion_cost(&self, memory_byte_size: usize) -> Result<U256, OutOfGasError> {
        if memory_byte_size <= self.data.len() {
            return Ok(U256::zero());
        }
        let new_memory_size_word = memory_byte_size.div_ceil(WORD_SIZE);
        let new_memory_cost = new_memory_size_word
            .checked_mul(new_memory_size_word)
            .map(|square| square / MEMORY_EXPANSION_QUOTIENT)
            .and_then(|cost| cost.checked_add(new_memory_size_word.checked_mul(3)?))
            .ok_or(OutOfGasError::GasCostOverflow)?;

        let last_memory_size_word = self.data.len().div_ceil(WORD_SIZE);
        let last_memory_cost = last_memory_size_word
            .checked_mul(last_memory_size_word)
            .map(|square| square / MEMORY_EXPANSION_QUOTIENT)
            .and_then(|cost| cost.checked_add(last_memory_size_word.checked_mul(3)?))
            .ok_or(OutOfGasError::GasCostOverflow)?;

        Ok(U256::from(
            new_memory_cost
                .checked_sub(last_memory_cost)
                .ok_or(OutOfGasError::ArithmeticOperationOverflow)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_zero_extended() {
        let mut memory = Memory::new();
        assert_eq!(memory.load(0).unwrap(), U256::zero());
        assert_eq!(memory.size(), U256::from(32));
    }

    #[test]
    fn size_rounds_to_word_multiples() {
        let mut memory = Memory::new();
        memory.store_bytes(33, &[0xff]).unwrap();
        assert_eq!(memory.size(), U256::from(64));
    }

    #[test]
    fn expansion_cost_is_linear_at_the_start() {
        let memory = Memory::new();
        assert_eq!(memory.expansion_cost(0).unwrap(), U256::zero());
        assert_eq!(memory.expansion_cost(32).unwrap(), U256::from(3));
        assert_eq!(memory.expansion_cost(64).unwrap(), U256::from(6));
    }

    #[test]
    fn expansion_cost_charges_only_the_delta() {
        let mut memory = Memory::new();
        memory.store_bytes(0, &[0u8; 32]).unwrap();
        assert_eq!(memory.expansion_cost(32).unwrap(), U256::zero());
        assert_eq!(memory.expansion_cost(64).unwrap(), U256::from(3));
    }

    #[test]
    fn copy_handles_overlapping_ranges() {
        let mut memory = Memory::new();
        memory.store_bytes(0, &[1, 2, 3, 4]).unwrap();
        memory.copy(0, 2, 4).unwrap();
        assert_eq!(memory.load_range(2, 4).unwrap(), vec![1, 2, 3, 4]);
    }
}
