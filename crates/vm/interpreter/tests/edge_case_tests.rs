#![allow(clippy::unwrap_used)]
#![allow(clippy::arithmetic_side_effects)]

use bytes::Bytes;
use ethereum_types::U256;
use zkevm_interpreter::{
    errors::{TxResult, VMError},
    utils::new_vm_with_bytecode,
    vcounters::CounterId,
};

#[test]
fn truncated_push_immediate_is_zero_padded() {
    // PUSH2 with a single trailing byte: the missing byte reads as zero.
    let mut vm = new_vm_with_bytecode(Bytes::copy_from_slice(&[0x61, 0xaa])).unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert!(report.is_success());
    assert_eq!(
        vm.current_call_frame_mut().unwrap().stack.pop().unwrap(),
        U256::from(0xaa00)
    );
}

#[test]
fn running_off_the_end_of_code_stops() {
    // A lone PUSH1 with its immediate; no explicit STOP anywhere.
    let mut vm = new_vm_with_bytecode(Bytes::copy_from_slice(&[0x60, 0x01])).unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert!(report.is_success());
    assert_eq!(vm.counters.count(CounterId::OpStop), 1);
}

#[test]
fn unknown_opcode_byte_traps_as_invalid() {
    // 0x0c is unassigned.
    let mut vm = new_vm_with_bytecode(Bytes::copy_from_slice(&[0x0c])).unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(report.result, TxResult::Revert(VMError::InvalidOpcode));
}

#[test]
fn huge_memory_offset_traps_out_of_range() {
    // PUSH32 (2^256 - 1) as the MLOAD offset.
    let mut code = vec![0x7f];
    code.extend_from_slice(&[0xff; 32]);
    code.push(0x51); // MLOAD
    let mut vm = new_vm_with_bytecode(Bytes::from(code)).unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.gas_limit = U256::from(100_000_000);
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(report.result, TxResult::Revert(VMError::OutOfRange));
}

#[test]
fn returndatacopy_past_the_end_traps() {
    // No sub-call has run, so any nonzero size is out of range.
    // PUSH1 4 (size), PUSH1 0 (offset), PUSH1 0 (dest), RETURNDATACOPY
    let mut vm = new_vm_with_bytecode(Bytes::copy_from_slice(&[
        0x60, 0x04, 0x60, 0x00, 0x60, 0x00, 0x3e,
    ]))
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(report.result, TxResult::Revert(VMError::OutOfRange));
}

#[test]
fn sar_by_zero_keeps_the_value() {
    // PUSH32 -1, PUSH1 0, SAR
    let mut code = vec![0x7f];
    code.extend_from_slice(&[0xff; 32]);
    code.extend_from_slice(&[0x60, 0x00, 0x1d, 0x00]);
    let mut vm = new_vm_with_bytecode(Bytes::from(code)).unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(
        vm.current_call_frame_mut().unwrap().stack.pop().unwrap(),
        U256::MAX
    );
}
