#![allow(clippy::indexing_slicing)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::arithmetic_side_effects)]

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use std::collections::HashMap;
use zkevm_interpreter::{
    account::Account,
    db::{cache, CacheDB, Db},
    errors::{ExecutionReport, TxResult, VMError},
    operations::Operation,
    utils::{new_vm_with_ops, new_vm_with_ops_addr_bal_db, new_vm_with_ops_db, ops_to_bytecode},
    vcounters::CounterId,
    vm::{word_to_address, VM},
};

fn run(vm: &mut VM) -> ExecutionReport {
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    vm.execute(&mut current_call_frame).unwrap()
}

fn top_of_stack(vm: &mut VM) -> U256 {
    vm.current_call_frame_mut().unwrap().stack.pop().unwrap()
}

fn callee_return_bytecode(return_value: U256) -> Bytes {
    let ops = vec![
        Operation::Push((32, return_value)), // value
        Operation::Push((1, U256::zero())),  // offset
        Operation::Mstore,
        Operation::Push((1, U256::from(32))), // size
        Operation::Push((1, U256::zero())),   // offset
        Operation::Return,
    ];
    ops_to_bytecode(&ops).unwrap()
}

#[test]
fn add_op() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::one())),
        Operation::Push((32, U256::zero())),
        Operation::Add,
        Operation::Stop,
    ])
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::one());
    assert_eq!(vm.current_call_frame_mut().unwrap().pc(), 68);
    // 3 gas for each PUSH, 3 for ADD, none for STOP.
    assert_eq!(
        vm.current_call_frame_mut().unwrap().gas_used,
        U256::from(9)
    );
}

#[test]
fn add_wraps_around_and_records_counters() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::MAX)),
        Operation::Push((1, U256::one())),
        Operation::Add,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::zero());
    assert_eq!(vm.counters.count(CounterId::OpPush), 2);
    assert_eq!(vm.counters.count(CounterId::OpAdd), 1);
}

#[test]
fn sub_op() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(3))),
        Operation::Push((1, U256::from(5))),
        Operation::Sub,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::from(2));
}

#[test]
fn sub_is_the_additive_inverse() {
    // u + (0 - u) == 0, for any u.
    let u = U256::from_dec_str("987654321987654321987654321").unwrap();
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, u)),
        Operation::Push((32, u)),
        Operation::Push((1, U256::zero())),
        Operation::Sub,
        Operation::Add,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn mul_identity_and_zero() {
    let u = U256::from(0xdeadbeefu64);
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, u)),
        Operation::Push((1, U256::one())),
        Operation::Mul,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), u);

    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, u)),
        Operation::Push((1, U256::zero())),
        Operation::Mul,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn div_by_zero_is_zero() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::from(7))),
        Operation::Div,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn div_op() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(2))),
        Operation::Push((1, U256::from(11))),
        Operation::Div,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::from(5));
}

#[test]
fn sdiv_negative_by_negative() {
    // -2 / -1 == 2 in two's complement.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::MAX)),     // -1
        Operation::Push((32, U256::MAX - 1)), // -2
        Operation::Sdiv,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::from(2));
}

#[test]
fn sdiv_overflow_fixed_point() {
    // MIN_I256 / -1 == MIN_I256 after the mod 2^256 reduction.
    let min_i256 = U256::one() << 255;
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::MAX)), // -1
        Operation::Push((32, min_i256)),
        Operation::Sdiv,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), min_i256);
}

#[test]
fn sdiv_by_zero_is_zero() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((32, U256::MAX)),
        Operation::Sdiv,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn mod_op_and_mod_by_zero() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(3))),
        Operation::Push((1, U256::from(10))),
        Operation::Mod,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::one());

    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::from(10))),
        Operation::Mod,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn smod_takes_the_dividend_sign() {
    // -10 smod 3 == -1.
    let minus_ten = U256::zero().overflowing_sub(U256::from(10)).0;
    let minus_one = U256::MAX;
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(3))),
        Operation::Push((32, minus_ten)),
        Operation::SMod,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), minus_one);
}

#[test]
fn addmod_and_mulmod_by_zero_are_zero() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::from(5))),
        Operation::Push((1, U256::from(5))),
        Operation::Addmod,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::zero());

    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::from(5))),
        Operation::Push((1, U256::from(5))),
        Operation::Mulmod,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn addmod_wide_intermediate() {
    // (MAX + MAX) % 7 without losing the 257th bit.
    let expected = {
        let max = U256::MAX;
        let remainder = max % U256::from(7);
        (remainder + remainder) % U256::from(7)
    };
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(7))),
        Operation::Push((32, U256::MAX)),
        Operation::Push((32, U256::MAX)),
        Operation::Addmod,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), expected);
}

#[test]
fn mulmod_wide_intermediate() {
    // (MAX * MAX) % (MAX - 1) == 1.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::MAX - 1)),
        Operation::Push((32, U256::MAX)),
        Operation::Push((32, U256::MAX)),
        Operation::Mulmod,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::one());
}

#[test]
fn exp_op() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(10))),
        Operation::Push((1, U256::from(2))),
        Operation::Exp,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::from(1024));
}

#[test]
fn exp_records_exponent_length_even_when_trivial() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())), // exponent
        Operation::Push((1, U256::from(3))),
        Operation::Exp,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    // base^0 == 1, yet the counter fires with the popped length.
    assert_eq!(top_of_stack(&mut vm), U256::one());
    assert_eq!(vm.counters.count(CounterId::OpExp), 1);
    let exp_record = vm
        .counters
        .records()
        .iter()
        .find(|record| record.id == CounterId::OpExp)
        .unwrap();
    assert_eq!(exp_record.metrics.exponent_bytes, Some(0));
}

#[test]
fn exp_of_zero_base() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(5))),
        Operation::Push((1, U256::zero())),
        Operation::Exp,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn signextend_boundaries() {
    // k = 0, v = 0xff sign-extends to -1.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(0xff))),
        Operation::Push((1, U256::zero())),
        Operation::SignExtend,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::MAX);

    // k = 0, v = 0x7f stays positive.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(0x7f))),
        Operation::Push((1, U256::zero())),
        Operation::SignExtend,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::from(0x7f));

    // k = 31 leaves any value unchanged.
    let value = U256::from_dec_str("123456789123456789123456789").unwrap();
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, value)),
        Operation::Push((1, U256::from(31))),
        Operation::SignExtend,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), value);
}

#[test]
fn signextend_is_idempotent() {
    let value = U256::from(0x8abc);
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, value)),
        Operation::Push((1, U256::one())),
        Operation::SignExtend,
        Operation::Push((1, U256::one())),
        Operation::SignExtend,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    let twice = top_of_stack(&mut vm);

    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, value)),
        Operation::Push((1, U256::one())),
        Operation::SignExtend,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    let once = top_of_stack(&mut vm);

    assert_eq!(once, twice);
}

#[test]
fn comparison_ops() {
    let minus_one = U256::MAX;

    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(2))),
        Operation::Push((1, U256::one())),
        Operation::Lt,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::one());

    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::from(2))),
        Operation::Gt,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::one());

    // Signed: -1 < 1.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::one())),
        Operation::Push((32, minus_one)),
        Operation::Slt,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::one());

    // Signed: 1 > -1.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, minus_one)),
        Operation::Push((1, U256::one())),
        Operation::Sgt,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::one());

    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(7))),
        Operation::Push((1, U256::from(7))),
        Operation::Eq,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::one());

    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::IsZero,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::one());
}

#[test]
fn bitwise_ops() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(0b1100))),
        Operation::Push((1, U256::from(0b1010))),
        Operation::And,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::from(0b1000));

    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(0b1100))),
        Operation::Push((1, U256::from(0b1010))),
        Operation::Or,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::from(0b1110));

    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(0b1100))),
        Operation::Push((1, U256::from(0b1010))),
        Operation::Xor,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::from(0b0110));

    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Not,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::MAX);
}

#[test]
fn byte_op() {
    // Byte 31 is the least significant one.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(0xab))),
        Operation::Push((1, U256::from(31))),
        Operation::Byte,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::from(0xab));

    // Past the word: zero.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::MAX)),
        Operation::Push((1, U256::from(32))),
        Operation::Byte,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn shl_matches_multiplication_by_power_of_two() {
    let value = U256::from(0x1234_5678u64);
    let shift = 13u64;

    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, value)),
        Operation::Push((1, U256::from(shift))),
        Operation::Shl,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    let shifted = top_of_stack(&mut vm);

    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, value)),
        Operation::Push((32, U256::one() << shift)),
        Operation::Mul,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    let multiplied = top_of_stack(&mut vm);

    assert_eq!(shifted, multiplied);
}

#[test]
fn shifts_of_256_or_more_clear_the_word() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::MAX)),
        Operation::Push((2, U256::from(256))),
        Operation::Shl,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::zero());

    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::MAX)),
        Operation::Push((2, U256::from(256))),
        Operation::Shr,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn sar_propagates_the_sign() {
    let min_i256 = U256::one() << 255;

    // -2^255 >> 1 (arithmetic) == 0xc0...0.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, min_i256)),
        Operation::Push((1, U256::one())),
        Operation::Sar,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    let expected = (U256::one() << 255) | (U256::one() << 254);
    assert_eq!(top_of_stack(&mut vm), expected);

    // Shift of 256 with the sign bit set saturates to all ones.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, min_i256)),
        Operation::Push((2, U256::from(256))),
        Operation::Sar,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::MAX);

    // Shift of 256 with the sign bit clear goes to zero.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::from(12345))),
        Operation::Push((2, U256::from(256))),
        Operation::Sar,
        Operation::Stop,
    ])
    .unwrap();
    run(&mut vm);
    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn push_advances_pc_by_size_plus_one() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((5, U256::from(0xffeeddccbbu64))),
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::from(0xffeeddccbbu64));
    // PUSH5 spans 6 bytes, STOP one more.
    assert_eq!(vm.current_call_frame_mut().unwrap().pc(), 7);
}

#[test]
fn dup_preserves_depth_plus_one() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(1))),
        Operation::Push((1, U256::from(2))),
        Operation::Push((1, U256::from(3))),
        Operation::Dup(3),
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    let frame = vm.current_call_frame_mut().unwrap();
    assert_eq!(frame.stack.len(), 4);
    assert_eq!(frame.stack.pop().unwrap(), U256::from(1));
}

#[test]
fn swap_exchanges_top_with_nth() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(1))),
        Operation::Push((1, U256::from(2))),
        Operation::Push((1, U256::from(3))),
        Operation::Swap(2),
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    let frame = vm.current_call_frame_mut().unwrap();
    assert_eq!(frame.stack.len(), 3);
    assert_eq!(frame.stack.pop().unwrap(), U256::from(1));
    assert_eq!(frame.stack.pop().unwrap(), U256::from(2));
    assert_eq!(frame.stack.pop().unwrap(), U256::from(3));
}

#[test]
fn stack_underflow_traps() {
    let mut vm = new_vm_with_ops(&[Operation::Add, Operation::Stop]).unwrap();

    let report = run(&mut vm);

    assert_eq!(report.result, TxResult::Revert(VMError::StackUnderflow));
    assert!(report.output.is_empty());
}

#[test]
fn stack_overflow_traps() {
    let mut ops = vec![Operation::Push((1, U256::one())); 1025];
    ops.push(Operation::Stop);
    let mut vm = new_vm_with_ops(&ops).unwrap();

    let report = run(&mut vm);

    assert_eq!(report.result, TxResult::Revert(VMError::StackOverflow));
}

#[test]
fn mstore_mload_roundtrip_and_msize() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::from(0xabcdefu64))),
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::zero())),
        Operation::Mload,
        Operation::Msize,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::from(32));
    assert_eq!(top_of_stack(&mut vm), U256::from(0xabcdefu64));
}

#[test]
fn mstore8_writes_one_byte() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(0xab))), // value
        Operation::Push((1, U256::zero())),     // offset
        Operation::Mstore8,
        Operation::Push((1, U256::zero())),
        Operation::Mload,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::from(0xab) << 248);
}

#[test]
fn memory_word_count_is_monotonic() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(0x42))),
        Operation::Push((2, U256::from(100))),
        Operation::Mstore,
        Operation::Msize,
        Operation::Push((1, U256::from(0x42))),
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Msize,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    let later = top_of_stack(&mut vm);
    top_of_stack(&mut vm); // value pushed by the earlier write path
    let earlier = top_of_stack(&mut vm);
    assert!(later >= earlier);
}

#[test]
fn pc_op_reports_the_opcode_position() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Pop,
        Operation::PC,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::from(3));
}

#[test]
fn jump_to_valid_jumpdest() {
    // 0: PUSH1 4, 2: JUMP, 3: STOP, 4: JUMPDEST, 5: PUSH1 1, 7: STOP
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(4))),
        Operation::Jump,
        Operation::Stop,
        Operation::Jumpdest,
        Operation::Push((1, U256::one())),
        Operation::Stop,
    ])
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::one());
}

#[test]
fn jump_to_non_jumpdest_traps() {
    // 0: PUSH1 3, 2: JUMP, 3: STOP — position 3 is not a JUMPDEST.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(3))),
        Operation::Jump,
        Operation::Stop,
    ])
    .unwrap();

    let report = run(&mut vm);

    assert_eq!(report.result, TxResult::Revert(VMError::InvalidJump));
}

#[test]
fn jump_into_push_data_traps() {
    // The 0x5b inside the PUSH immediate is not a valid destination.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(4))), // points into the next immediate
        Operation::Jump,
        Operation::Push((2, U256::from(0x5b5bu64))),
        Operation::Stop,
    ])
    .unwrap();

    let report = run(&mut vm);

    assert_eq!(report.result, TxResult::Revert(VMError::InvalidJump));
}

#[test]
fn jumpi_takes_the_branch_only_when_nonzero() {
    // Condition zero: fall through to pushing 7.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),   // condition
        Operation::Push((1, U256::from(7))),  // destination (bogus but unused)
        Operation::Jumpi,
        Operation::Push((1, U256::from(7))),
        Operation::Stop,
    ])
    .unwrap();
    let report = run(&mut vm);
    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::from(7));

    // Nonzero condition: jump over the push of 7.
    // 0: PUSH1 1, 2: PUSH1 7, 4: JUMPI, 5: PUSH1 7, 7: STOP, ... 7 is wrong
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::one())),    // condition
        Operation::Push((1, U256::from(8))),  // destination: JUMPDEST below
        Operation::Jumpi,
        Operation::Push((1, U256::from(7))),
        Operation::Stop,
        Operation::Jumpdest,
        Operation::Push((1, U256::from(9))),
        Operation::Stop,
    ])
    .unwrap();
    let report = run(&mut vm);
    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::from(9));
}

#[test]
fn jumpsub_and_returnsub_roundtrip() {
    // 0: PUSH1 5, 2: JUMPSUB, 3: PUSH1 1, 5: BEGINSUB... layout below.
    // 0: PUSH1 6, 2: JUMPSUB, 3: PUSH1 1, 5: STOP, 6: BEGINSUB, 7: RETURNSUB
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(6))),
        Operation::JumpSub,
        Operation::Push((1, U256::one())),
        Operation::Stop,
        Operation::BeginSub,
        Operation::ReturnSub,
    ])
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::one());
    assert_eq!(vm.counters.count(CounterId::OpJumpsub), 1);
    assert_eq!(vm.counters.count(CounterId::OpReturnsub), 1);
}

#[test]
fn jumpsub_to_non_beginsub_traps() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(3))),
        Operation::JumpSub,
        Operation::Stop,
    ])
    .unwrap();

    let report = run(&mut vm);

    assert_eq!(report.result, TxResult::Revert(VMError::InvalidJumpsub));
}

#[test]
fn walking_into_beginsub_traps() {
    let mut vm = new_vm_with_ops(&[Operation::BeginSub, Operation::Stop]).unwrap();

    let report = run(&mut vm);

    assert_eq!(report.result, TxResult::Revert(VMError::InvalidBeginsub));
}

#[test]
fn returnsub_with_empty_substack_traps() {
    let mut vm = new_vm_with_ops(&[Operation::ReturnSub, Operation::Stop]).unwrap();

    let report = run(&mut vm);

    assert_eq!(report.result, TxResult::Revert(VMError::InvalidReturnsub));
}

#[test]
fn calldataload_of_the_exact_end_is_zero() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(4))),
        Operation::CallDataLoad,
        Operation::Stop,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.calldata = Bytes::copy_from_slice(&[0x11, 0x22, 0x33, 0x44]);
    vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn calldataload_pads_on_the_right() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::CallDataLoad,
        Operation::Stop,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.calldata = Bytes::copy_from_slice(&[0xff]);
    vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(top_of_stack(&mut vm), U256::from(0xff) << 248);
}

#[test]
fn calldatacopy_zero_pads_past_the_end() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(8))),  // size
        Operation::Push((1, U256::zero())),   // calldata offset
        Operation::Push((1, U256::zero())),   // memory offset
        Operation::CallDataCopy,
        Operation::Push((1, U256::zero())),
        Operation::Mload,
        Operation::Stop,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.calldata = Bytes::copy_from_slice(&[0xaa, 0xbb]);
    vm.execute(&mut current_call_frame).unwrap();

    let expected = U256::from_big_endian(&{
        let mut word = [0u8; 32];
        word[0] = 0xaa;
        word[1] = 0xbb;
        word
    });
    assert_eq!(top_of_stack(&mut vm), expected);
}

#[test]
fn environment_queries() {
    let mut vm = new_vm_with_ops(&[
        Operation::Address,
        Operation::Caller,
        Operation::Origin,
        Operation::Callvalue,
        Operation::CallDataSize,
        Operation::Chainid,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::one()); // chain id
    assert_eq!(top_of_stack(&mut vm), U256::zero()); // calldata size
    assert_eq!(top_of_stack(&mut vm), U256::zero()); // call value
    assert_eq!(top_of_stack(&mut vm), U256::from(100)); // origin
    assert_eq!(top_of_stack(&mut vm), U256::from(100)); // caller
    assert_eq!(top_of_stack(&mut vm), U256::from(42)); // address
}

#[test]
fn codesize_and_codecopy() {
    let ops = vec![
        Operation::Codesize,
        Operation::Push((1, U256::one())),  // size
        Operation::Push((1, U256::zero())), // code offset
        Operation::Push((1, U256::zero())), // memory offset
        Operation::Codecopy,
        Operation::Push((1, U256::zero())),
        Operation::Mload,
        Operation::Stop,
    ];
    let bytecode_len = ops_to_bytecode(&ops).unwrap().len();
    let mut vm = new_vm_with_ops(&ops).unwrap();

    run(&mut vm);

    // First byte of the code is CODESIZE (0x38), left-aligned in the word.
    assert_eq!(top_of_stack(&mut vm), U256::from(0x38) << 248);
    assert_eq!(top_of_stack(&mut vm), U256::from(bytecode_len));
}

#[test]
fn sstore_then_sload() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(42))), // value
        Operation::Push((1, U256::one())),    // key
        Operation::Sstore,
        Operation::Push((1, U256::one())),
        Operation::Sload,
        Operation::Stop,
    ])
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::from(42));
}

#[test]
fn sstore_keeps_the_shortest_big_endian_form() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::one())),  // value 1
        Operation::Push((1, U256::zero())), // key 0
        Operation::Sstore,
        Operation::Push((1, U256::zero())), // value 0
        Operation::Push((1, U256::one())),  // key 1
        Operation::Sstore,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    let contract_address = Address::from_low_u64_be(42);
    let account = cache::get_account(&vm.cache, &contract_address).unwrap();

    let slot_zero = account.storage.get(&H256::zero()).unwrap();
    assert_eq!(slot_zero.current_value.as_ref(), &[0x01]);

    let slot_one = account.storage.get(&H256::from_low_u64_be(1)).unwrap();
    assert!(slot_one.current_value.is_empty());
}

#[test]
fn sstore_in_static_context_traps() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::one())),
        Operation::Sstore,
        Operation::Stop,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.is_static = true;
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(report.result, TxResult::Revert(VMError::StaticStateChange));
}

#[test]
fn sload_of_unset_slot_is_zero() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::from(99))),
        Operation::Sload,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn log_collects_topics_and_data() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::from(0x1122u64) << 240)),
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((32, U256::from(0xcafe))), // topic
        Operation::Push((1, U256::from(2))),       // size
        Operation::Push((1, U256::zero())),        // offset
        Operation::Log(1),
        Operation::Stop,
    ])
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    assert_eq!(report.logs.len(), 1);
    assert_eq!(report.logs[0].address, Address::from_low_u64_be(42));
    assert_eq!(report.logs[0].topics, vec![H256::from_low_u64_be(0xcafe)]);
    assert_eq!(report.logs[0].data.as_ref(), &[0x11, 0x22]);
}

#[test]
fn log_in_static_context_traps() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Log(0),
        Operation::Stop,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.is_static = true;
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(report.result, TxResult::Revert(VMError::StaticStateChange));
}

#[test]
fn sha3_of_empty_input() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())), // size
        Operation::Push((1, U256::zero())), // offset
        Operation::Sha3,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    // keccak256 of the empty string.
    let expected = U256::from_big_endian(
        &hex::decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
            .unwrap(),
    );
    assert_eq!(top_of_stack(&mut vm), expected);
}

#[test]
fn out_of_gas_trap_consumes_everything_but_keeps_counters() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::one())),
        Operation::Add,
        Operation::Stop,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.gas_limit = U256::from(7); // two pushes, then ADD is short
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert!(matches!(report.result, TxResult::Revert(VMError::OutOfGas(_))));
    assert_eq!(report.gas_used, U256::from(7));
    assert!(report.output.is_empty());
    // The ADD counter fired before the gas check failed.
    assert_eq!(vm.counters.count(CounterId::OpAdd), 1);
}

#[test]
fn revert_preserves_output_and_unused_gas() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((32, U256::from(0xee) << 248)),
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::one())),  // size
        Operation::Push((1, U256::zero())), // offset
        Operation::Revert,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.gas_limit = U256::from(100_000);
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(report.result, TxResult::Revert(VMError::RevertOpcode));
    assert_eq!(report.output.as_ref(), &[0xee]);
    // Far from the whole gas limit.
    assert!(report.gas_used < U256::from(1000));
}

#[test]
fn invalid_opcode_traps() {
    let mut vm = new_vm_with_ops(&[Operation::Invalid]).unwrap();

    let report = run(&mut vm);

    assert_eq!(report.result, TxResult::Revert(VMError::InvalidOpcode));
}

#[test]
fn call_writes_return_data_and_pushes_success() {
    let callee_address = Address::from_low_u64_be(0xAA);
    let callee_bytecode = callee_return_bytecode(U256::from(0xABCDEF));
    let mut db = Db::new();
    db.add_accounts(vec![(
        callee_address,
        Account::new(U256::zero(), callee_bytecode, 0, HashMap::new()),
    )]);

    let mut vm = new_vm_with_ops_db(
        &[
            Operation::Push((1, U256::from(32))),  // ret size
            Operation::Push((1, U256::zero())),    // ret offset
            Operation::Push((1, U256::zero())),    // args size
            Operation::Push((1, U256::zero())),    // args offset
            Operation::Push((1, U256::zero())),    // value
            Operation::Push((20, U256::from(0xAA))),
            Operation::Push((4, U256::from(1_000_000))),
            Operation::Call,
            Operation::Push((1, U256::zero())),
            Operation::Mload,
            Operation::Stop,
        ],
        db,
    )
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::from(0xABCDEF));
    assert_eq!(top_of_stack(&mut vm), U256::one()); // status word
    assert_eq!(vm.counters.count(CounterId::OpCall), 1);
    assert_eq!(vm.counters.count(CounterId::ProcessContractCall), 1);
}

#[test]
fn subcall_revert_surfaces_as_zero_status() {
    // Callee stores 0xff..ff at memory 0 and reverts with 4 bytes of it.
    let callee_ops = vec![
        Operation::Push((32, U256::MAX)),
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::from(4))),
        Operation::Push((1, U256::zero())),
        Operation::Revert,
    ];
    let callee_address = Address::from_low_u64_be(0xAA);
    let mut db = Db::new();
    db.add_accounts(vec![(
        callee_address,
        Account::new(
            U256::zero(),
            ops_to_bytecode(&callee_ops).unwrap(),
            0,
            HashMap::new(),
        ),
    )]);

    let mut vm = new_vm_with_ops_db(
        &[
            Operation::Push((1, U256::from(4))),   // ret size
            Operation::Push((1, U256::zero())),    // ret offset
            Operation::Push((1, U256::zero())),    // args size
            Operation::Push((1, U256::zero())),    // args offset
            Operation::Push((1, U256::zero())),    // value
            Operation::Push((20, U256::from(0xAA))),
            Operation::Push((4, U256::from(1_000_000))),
            Operation::Call,
            Operation::ReturnDataSize,
            Operation::Stop,
        ],
        db,
    )
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::from(4)); // return data size
    assert_eq!(top_of_stack(&mut vm), U256::zero()); // status word
}

#[test]
fn sstore_under_staticcall_gives_parent_zero_status() {
    // Callee attempts SSTORE; the sub-frame traps, the parent sees 0.
    let callee_ops = vec![
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::one())),
        Operation::Sstore,
        Operation::Stop,
    ];
    let callee_address = Address::from_low_u64_be(0xAA);
    let mut db = Db::new();
    db.add_accounts(vec![(
        callee_address,
        Account::new(
            U256::zero(),
            ops_to_bytecode(&callee_ops).unwrap(),
            0,
            HashMap::new(),
        ),
    )]);

    let mut vm = new_vm_with_ops_db(
        &[
            Operation::Push((1, U256::zero())),    // ret size
            Operation::Push((1, U256::zero())),    // ret offset
            Operation::Push((1, U256::zero())),    // args size
            Operation::Push((1, U256::zero())),    // args offset
            Operation::Push((20, U256::from(0xAA))),
            Operation::Push((4, U256::from(1_000_000))),
            Operation::StaticCall,
            Operation::Stop,
        ],
        db,
    )
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn value_bearing_call_inside_static_context_traps() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::one())), // value != 0
        Operation::Push((20, U256::from(0xAA))),
        Operation::Push((4, U256::from(1_000_000))),
        Operation::Call,
        Operation::Stop,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.is_static = true;
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(report.result, TxResult::Revert(VMError::StaticStateChange));
}

#[test]
fn call_transfers_value() {
    let callee_address = Address::from_low_u64_be(0xAA);
    let mut db = Db::new();
    db.add_accounts(vec![(
        callee_address,
        Account::new(U256::zero(), Bytes::new(), 0, HashMap::new()),
    )]);

    let mut vm = new_vm_with_ops_db(
        &[
            Operation::Push((1, U256::zero())),     // ret size
            Operation::Push((1, U256::zero())),     // ret offset
            Operation::Push((1, U256::zero())),     // args size
            Operation::Push((1, U256::zero())),     // args offset
            Operation::Push((1, U256::from(123))),  // value
            Operation::Push((20, U256::from(0xAA))),
            Operation::Push((4, U256::from(1_000_000))),
            Operation::Call,
            Operation::Stop,
        ],
        db,
    )
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::one());
    let callee = cache::get_account(&vm.cache, &callee_address).unwrap();
    assert_eq!(callee.info.balance, U256::from(123));
}

#[test]
fn call_beyond_depth_limit_fails_without_trapping() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((20, U256::from(0xAA))),
        Operation::Push((4, U256::from(1_000_000))),
        Operation::Call,
        Operation::Stop,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.depth = 1024;
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert!(report.is_success());
    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn delegatecall_preserves_caller_and_value() {
    // Callee code stores CALLER and CALLVALUE in memory and returns them.
    let callee_ops = vec![
        Operation::Caller,
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Callvalue,
        Operation::Push((1, U256::from(32))),
        Operation::Mstore,
        Operation::Push((1, U256::from(64))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ];
    let callee_address = Address::from_low_u64_be(0xAA);
    let mut db = Db::new();
    db.add_accounts(vec![(
        callee_address,
        Account::new(
            U256::zero(),
            ops_to_bytecode(&callee_ops).unwrap(),
            0,
            HashMap::new(),
        ),
    )]);

    let mut vm = new_vm_with_ops_db(
        &[
            Operation::Push((1, U256::from(64))),  // ret size
            Operation::Push((1, U256::zero())),    // ret offset
            Operation::Push((1, U256::zero())),    // args size
            Operation::Push((1, U256::zero())),    // args offset
            Operation::Push((20, U256::from(0xAA))),
            Operation::Push((4, U256::from(1_000_000))),
            Operation::DelegateCall,
            Operation::Push((1, U256::zero())),
            Operation::Mload,
            Operation::Stop,
        ],
        db,
    )
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    // The borrowed code observed the ORIGINAL caller (the tx sender), not
    // the delegating contract.
    assert_eq!(top_of_stack(&mut vm), U256::from(100));
}

#[test]
fn create_deploys_an_account_and_pushes_its_address() {
    // Empty init code returns empty runtime code; still a valid deployment.
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())), // size
        Operation::Push((1, U256::zero())), // offset
        Operation::Push((1, U256::zero())), // value
        Operation::Create,
        Operation::Stop,
    ])
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    let created_word = top_of_stack(&mut vm);
    assert_ne!(created_word, U256::zero());

    let created_address = word_to_address(created_word);
    let created = cache::get_account(&vm.cache, &created_address).unwrap();
    assert_eq!(created.info.nonce, 1);

    // The deployer's nonce moved.
    let deployer = cache::get_account(&vm.cache, &Address::from_low_u64_be(42)).unwrap();
    assert_eq!(deployer.info.nonce, 1);

    assert_eq!(vm.counters.count(CounterId::OpCreate), 1);
    assert_eq!(vm.counters.count(CounterId::ProcessContractCall), 1);
}

#[test]
fn create_in_static_context_traps() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Create,
        Operation::Stop,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.is_static = true;
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(report.result, TxResult::Revert(VMError::StaticStateChange));
}

#[test]
fn create2_address_is_salt_dependent() {
    let deployer = Address::from_low_u64_be(42);
    let init_code = Bytes::new();
    let address_one =
        VM::calculate_create2_address(deployer, &init_code, U256::from(1)).unwrap();
    let address_two =
        VM::calculate_create2_address(deployer, &init_code, U256::from(2)).unwrap();
    assert_ne!(address_one, address_two);
}

#[test]
fn selfdestruct_moves_balance_and_queues_deletion() {
    let beneficiary = Address::from_low_u64_be(0xBB);
    let contract_address = Address::from_low_u64_be(42);

    let mut vm = new_vm_with_ops(&[
        Operation::Push((20, U256::from(0xBB))),
        Operation::SelfDestruct,
    ])
    .unwrap();

    let report = run(&mut vm);

    assert!(report.is_success());
    let beneficiary_account = cache::get_account(&vm.cache, &beneficiary).unwrap();
    assert_eq!(beneficiary_account.info.balance, U256::MAX);
    let contract = cache::get_account(&vm.cache, &contract_address).unwrap();
    assert_eq!(contract.info.balance, U256::zero());
    assert!(vm.accrued_substate.selfdestruct_set.contains(&contract_address));
}

#[test]
fn selfdestruct_in_static_context_traps() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((20, U256::from(0xBB))),
        Operation::SelfDestruct,
    ])
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.is_static = true;
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert_eq!(report.result, TxResult::Revert(VMError::StaticStateChange));
}

#[test]
fn balance_and_selfbalance() {
    let mut vm = new_vm_with_ops(&[
        Operation::SelfBalance,
        Operation::Push((20, U256::from(42))),
        Operation::Balance,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::MAX); // BALANCE of self
    assert_eq!(top_of_stack(&mut vm), U256::MAX); // SELFBALANCE
}

#[test]
fn extcodesize_and_extcodecopy() {
    let remote_address = Address::from_low_u64_be(0xCC);
    let remote_code = Bytes::copy_from_slice(&[0x60, 0x01, 0x00]);
    let mut db = Db::new();
    db.add_accounts(vec![(
        remote_address,
        Account::new(U256::zero(), remote_code, 0, HashMap::new()),
    )]);

    let mut vm = new_vm_with_ops_db(
        &[
            Operation::Push((20, U256::from(0xCC))),
            Operation::ExtcodeSize,
            Operation::Push((1, U256::from(32))), // size (pads past the code)
            Operation::Push((1, U256::zero())),   // code offset
            Operation::Push((1, U256::zero())),   // memory offset
            Operation::Push((20, U256::from(0xCC))),
            Operation::ExtcodeCopy,
            Operation::Push((1, U256::zero())),
            Operation::Mload,
            Operation::Stop,
        ],
        db,
    )
    .unwrap();

    run(&mut vm);

    let word = top_of_stack(&mut vm);
    let mut expected = [0u8; 32];
    expected[0] = 0x60;
    expected[1] = 0x01;
    assert_eq!(word, U256::from_big_endian(&expected));
    assert_eq!(top_of_stack(&mut vm), U256::from(3)); // EXTCODESIZE
}

#[test]
fn extcodehash_of_codeless_account_is_zero() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((20, U256::from(0xDD))), // no such account
        Operation::ExtcodeHash,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::zero());
}

#[test]
fn extcodehash_uses_the_state_tree_hash() {
    let remote_address = Address::from_low_u64_be(0xCC);
    let remote_code = Bytes::copy_from_slice(&[0x60, 0x01, 0x00]);
    let mut db = Db::new();
    db.add_accounts(vec![(
        remote_address,
        Account::new(U256::zero(), remote_code.clone(), 0, HashMap::new()),
    )]);
    use zkevm_interpreter::db::Database;
    let expected = U256::from_big_endian(db.code_hash(&remote_code).as_bytes());

    let mut vm = new_vm_with_ops_db(
        &[
            Operation::Push((20, U256::from(0xCC))),
            Operation::ExtcodeHash,
            Operation::Stop,
        ],
        db,
    )
    .unwrap();

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), expected);
}

#[test]
fn blockhash_reads_batch_hashes_inside_the_window() {
    let batch_hash = H256::from_low_u64_be(0x1234);
    let mut db = Db::new();
    db.add_batch_hashes(vec![(U256::from(99), batch_hash)]);

    let mut vm = new_vm_with_ops_db(
        &[
            Operation::Push((1, U256::from(99))),
            Operation::BlockHash,
            Operation::Push((1, U256::from(2))), // in the window, no hash stored
            Operation::BlockHash,
            Operation::Stop,
        ],
        db,
    )
    .unwrap();
    vm.env.block_number = U256::from(100);

    run(&mut vm);

    assert_eq!(top_of_stack(&mut vm), U256::zero()); // unknown batch
    assert_eq!(
        top_of_stack(&mut vm),
        U256::from_big_endian(batch_hash.as_bytes())
    );
}

#[test]
fn counters_match_the_frame_environment() {
    let mut vm = new_vm_with_ops(&[
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::one())),
        Operation::Add,
        Operation::Stop,
    ])
    .unwrap();

    run(&mut vm);

    for record in vm.counters.records() {
        if record.id != CounterId::ProcessContractCall {
            assert!(!record.metrics.is_create);
            assert!(!record.metrics.is_deploy);
        }
    }
}

#[test]
fn deploy_transaction_runs_init_code() {
    use std::sync::Arc;
    use zkevm_interpreter::{config::ChainConfig, environment::Environment, vm::TxKind};

    // Init code: return one zero byte as the runtime code.
    let init_code = ops_to_bytecode(&[
        Operation::Push((1, U256::one())),  // size
        Operation::Push((1, U256::zero())), // offset
        Operation::Return,
    ])
    .unwrap();

    let sender = Address::from_low_u64_be(100);
    let mut db = Db::new();
    db.add_accounts(vec![(
        sender,
        Account::new(U256::MAX, Bytes::new(), 0, HashMap::new()),
    )]);

    let mut vm = VM::new(
        TxKind::Create,
        Environment::default_from_address(sender),
        U256::zero(),
        init_code,
        Arc::new(db),
        CacheDB::default(),
        ChainConfig::default(),
    )
    .unwrap();

    let mut current_call_frame = vm.call_frames.pop().unwrap();
    assert!(current_call_frame.is_deploy);
    let contract_address = current_call_frame.to;
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert!(report.is_success());
    let deployed = cache::get_account(&vm.cache, &contract_address).unwrap();
    assert_eq!(deployed.info.bytecode.as_ref(), &[0x00]);
}

#[test]
fn deploy_rejects_the_invalid_prefix() {
    use std::sync::Arc;
    use zkevm_interpreter::{config::ChainConfig, environment::Environment, vm::TxKind};

    // Init code returning 0xEF as the first byte of runtime code.
    let init_code = ops_to_bytecode(&[
        Operation::Push((32, U256::from(0xEF) << 248)),
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::one())),  // size
        Operation::Push((1, U256::zero())), // offset
        Operation::Return,
    ])
    .unwrap();

    let sender = Address::from_low_u64_be(100);
    let mut db = Db::new();
    db.add_accounts(vec![(
        sender,
        Account::new(U256::MAX, Bytes::new(), 0, HashMap::new()),
    )]);

    let mut vm = VM::new(
        TxKind::Create,
        Environment::default_from_address(sender),
        U256::zero(),
        init_code,
        Arc::new(db),
        CacheDB::default(),
        ChainConfig::default(),
    )
    .unwrap();

    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.gas_limit = U256::from(1_000_000);
    let report = vm.execute(&mut current_call_frame).unwrap();

    assert!(!report.is_success());
}

#[test]
fn gas_op_reports_whats_left() {
    let mut vm = new_vm_with_ops_addr_bal_db(
        ops_to_bytecode(&[Operation::Gas, Operation::Stop]).unwrap(),
        Address::from_low_u64_be(100),
        U256::MAX,
        Db::new(),
        CacheDB::default(),
    )
    .unwrap();
    let mut current_call_frame = vm.call_frames.pop().unwrap();
    current_call_frame.gas_limit = U256::from(100);
    vm.execute(&mut current_call_frame).unwrap();

    // GAS itself costs 2.
    assert_eq!(top_of_stack(&mut vm), U256::from(98));
}
