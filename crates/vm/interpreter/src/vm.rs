use crate::{
    account::{word_to_shortest_be, Account, AccountInfo, StorageSlot},
    call_frame::CallFrame,
    config::ChainConfig,
    constants::{
        CALL_DEPTH_LIMIT, CALL_GAS_RETENTION_DIVISOR, CODE_DEPOSIT_COST, INVALID_CONTRACT_PREFIX,
        MAX_CODE_SIZE, REVERT_FOR_CALL, SUCCESS_FOR_CALL, WORD_SIZE,
    },
    db::{
        cache::{self, remove_account},
        CacheDB, Database,
    },
    environment::Environment,
    errors::{
        ExecutionReport, InternalError, OpcodeSuccess, OutOfGasError, ResultReason, TxResult,
        VMError,
    },
    opcodes::Opcode,
    vcounters::{CounterId, CounterMetrics},
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use sha3::{Digest, Keccak256};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// What the transaction targets: an existing account or a fresh contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxKind {
    Call(Address),
    Create,
}

/// Information that is acted upon immediately following the transaction.
#[derive(Debug, Clone, Default)]
pub struct Substate {
    pub selfdestruct_set: HashSet<Address>,
    /// Accessed addresses are considered warm (EIP-2929).
    pub touched_accounts: HashSet<Address>,
    /// Accessed storage slots are considered warm (EIP-2929).
    pub touched_storage_slots: HashMap<Address, HashSet<H256>>,
    pub created_accounts: HashSet<Address>,
}

/// Valid JUMPDEST and BEGINSUB positions of one code buffer, computed once
/// and shared between every frame executing that code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpTargets {
    jumpdests: HashSet<usize>,
    beginsubs: HashSet<usize>,
}

impl JumpTargets {
    pub fn is_jumpdest(&self, position: usize) -> bool {
        self.jumpdests.contains(&position)
    }

    pub fn is_beginsub(&self, position: usize) -> bool {
        self.beginsubs.contains(&position)
    }
}

/// Scans a code buffer for jump targets, skipping PUSH immediates so that a
/// 0x5B or 0x5C byte inside push data does not count.
pub fn compute_jump_targets(code: &Bytes) -> Result<JumpTargets, VMError> {
    let mut targets = JumpTargets::default();
    let mut pc = 0;

    while let Some(&opcode_number) = code.get(pc) {
        let current_opcode = Opcode::from(opcode_number);

        if current_opcode == Opcode::JUMPDEST {
            targets.jumpdests.insert(pc);
        } else if current_opcode == Opcode::BEGINSUB {
            targets.beginsubs.insert(pc);
        } else if (Opcode::PUSH1..=Opcode::PUSH32).contains(&current_opcode) {
            let size_to_push =
                opcode_number
                    .checked_sub(u8::from(Opcode::PUSH1))
                    .ok_or(VMError::Internal(
                        InternalError::ArithmeticOperationUnderflow,
                    ))?;
            let skip_length = usize::from(size_to_push.checked_add(1).ok_or(VMError::Internal(
                InternalError::ArithmeticOperationOverflow,
            ))?);
            pc = pc.checked_add(skip_length).ok_or(VMError::Internal(
                InternalError::ArithmeticOperationOverflow,
            ))?;
        }

        pc = pc.checked_add(1).ok_or(VMError::Internal(
            InternalError::ArithmeticOperationOverflow,
        ))?;
    }

    Ok(targets)
}

pub fn address_to_word(address: Address) -> U256 {
    // This cannot lose information, an Address is 20 bytes and a word is 32
    let mut word = [0u8; 32];
    for (word_byte, address_byte) in word.iter_mut().skip(12).zip(address.as_bytes().iter()) {
        *word_byte = *address_byte;
    }
    U256::from_big_endian(&word)
}

pub fn word_to_address(word: U256) -> Address {
    let mut bytes = [0u8; WORD_SIZE];
    word.to_big_endian(&mut bytes);
    Address::from_slice(bytes.get(12..).unwrap_or(&[]))
}

pub struct VM {
    pub call_frames: Vec<CallFrame>,
    pub env: Environment,
    /// Information that is acted upon immediately following the
    /// transaction.
    pub accrued_substate: Substate,
    /// Mapping between addresses (160-bit identifiers) and account
    /// states, behind the state-tree collaborator.
    pub db: Arc<dyn Database>,
    pub cache: CacheDB,
    pub config: ChainConfig,
    pub tx_kind: TxKind,
    /// Transaction-wide virtual counter accumulator; frame deltas are merged
    /// here in frame-completion order.
    pub counters: crate::vcounters::VirtualCounterManager,
    /// Jump-target sets memoized by code hash, shared across frames.
    jump_target_cache: HashMap<H256, Arc<JumpTargets>>,
    /// Gas reserved by the dispatcher for the next call/create handler.
    /// Consumed exactly once per reservation.
    message_gas_limit: Option<U256>,
}

impl VM {
    pub fn new(
        to: TxKind,
        env: Environment,
        value: U256,
        calldata: Bytes,
        db: Arc<dyn Database>,
        mut cache: CacheDB,
        config: ChainConfig,
    ) -> Result<Self, VMError> {
        let mut default_touched_accounts =
            HashSet::from_iter([env.origin, env.coinbase].iter().cloned());

        match to {
            TxKind::Call(address_to) => {
                default_touched_accounts.insert(address_to);

                let recipient_account_info = db.get_account_info(address_to);
                cache::insert_account(
                    &mut cache,
                    address_to,
                    Account::from(recipient_account_info.clone()),
                );

                let mut jump_target_cache = HashMap::new();
                let targets = Arc::new(compute_jump_targets(&recipient_account_info.bytecode)?);
                jump_target_cache.insert(keccak(&recipient_account_info.bytecode), targets.clone());

                let mut initial_call_frame = CallFrame::new(
                    env.origin,
                    address_to,
                    address_to,
                    recipient_account_info.bytecode,
                    value,
                    calldata,
                    false,
                    env.gas_limit,
                    0,
                    targets,
                );
                initial_call_frame.nonce = recipient_account_info.nonce;

                Ok(Self {
                    call_frames: vec![initial_call_frame],
                    db,
                    env,
                    accrued_substate: Substate {
                        touched_accounts: default_touched_accounts,
                        ..Default::default()
                    },
                    cache,
                    config,
                    tx_kind: TxKind::Call(address_to),
                    counters: Default::default(),
                    jump_target_cache,
                    message_gas_limit: None,
                })
            }
            TxKind::Create => {
                let new_contract_address = VM::calculate_create_address(
                    env.origin,
                    db.get_account_info(env.origin).nonce,
                )?;

                default_touched_accounts.insert(new_contract_address);

                let created_contract = Account::new(value, Bytes::new(), 1, HashMap::new());
                cache::insert_account(&mut cache, new_contract_address, created_contract);

                // Deployment runs the calldata as init code.
                let init_code: Bytes = calldata;
                let mut jump_target_cache = HashMap::new();
                let targets = Arc::new(compute_jump_targets(&init_code)?);
                jump_target_cache.insert(keccak(&init_code), targets.clone());

                let mut initial_call_frame = CallFrame::new(
                    env.origin,
                    new_contract_address,
                    new_contract_address,
                    init_code,
                    value,
                    Bytes::new(),
                    false,
                    env.gas_limit,
                    0,
                    targets,
                );
                initial_call_frame.is_deploy = true;
                initial_call_frame.nonce = 1;

                Ok(Self {
                    call_frames: vec![initial_call_frame],
                    db,
                    env,
                    accrued_substate: Substate {
                        touched_accounts: default_touched_accounts,
                        created_accounts: HashSet::from([new_contract_address]),
                        ..Default::default()
                    },
                    cache,
                    config,
                    tx_kind: TxKind::Create,
                    counters: Default::default(),
                    jump_target_cache,
                    message_gas_limit: None,
                })
            }
        }
    }

    /// Runs one frame to completion. Sub-frames recurse through the
    /// call/create handlers; each one finishes before its caller resumes.
    pub fn execute(
        &mut self,
        current_call_frame: &mut CallFrame,
    ) -> Result<ExecutionReport, VMError> {
        // Backup of journal, substate and refunds in case this context
        // reverts.
        let (backup_cache, backup_substate, backup_refunded_gas) = (
            self.cache.clone(),
            self.accrued_substate.clone(),
            self.env.refunded_gas,
        );

        loop {
            let opcode = current_call_frame.next_opcode();
            current_call_frame.increment_pc()?;

            if opcode.is_message_call() {
                self.reserve_message_gas(current_call_frame)?;
            }

            let op_result: Result<OpcodeSuccess, VMError> = match opcode {
                Opcode::STOP => self.op_stop(current_call_frame),
                Opcode::ADD => self.op_add(current_call_frame),
                Opcode::MUL => self.op_mul(current_call_frame),
                Opcode::SUB => self.op_sub(current_call_frame),
                Opcode::DIV => self.op_div(current_call_frame),
                Opcode::SDIV => self.op_sdiv(current_call_frame),
                Opcode::MOD => self.op_mod(current_call_frame),
                Opcode::SMOD => self.op_smod(current_call_frame),
                Opcode::ADDMOD => self.op_addmod(current_call_frame),
                Opcode::MULMOD => self.op_mulmod(current_call_frame),
                Opcode::EXP => self.op_exp(current_call_frame),
                Opcode::SIGNEXTEND => self.op_signextend(current_call_frame),
                Opcode::LT => self.op_lt(current_call_frame),
                Opcode::GT => self.op_gt(current_call_frame),
                Opcode::SLT => self.op_slt(current_call_frame),
                Opcode::SGT => self.op_sgt(current_call_frame),
                Opcode::EQ => self.op_eq(current_call_frame),
                Opcode::ISZERO => self.op_iszero(current_call_frame),
                Opcode::AND => self.op_and(current_call_frame),
                Opcode::OR => self.op_or(current_call_frame),
                Opcode::XOR => self.op_xor(current_call_frame),
                Opcode::NOT => self.op_not(current_call_frame),
                Opcode::BYTE => self.op_byte(current_call_frame),
                Opcode::SHL => self.op_shl(current_call_frame),
                Opcode::SHR => self.op_shr(current_call_frame),
                Opcode::SAR => self.op_sar(current_call_frame),
                Opcode::SHA3 => self.op_sha3(current_call_frame),
                Opcode::ADDRESS => self.op_address(current_call_frame),
                Opcode::BALANCE => self.op_balance(current_call_frame),
                Opcode::ORIGIN => self.op_origin(current_call_frame),
                Opcode::CALLER => self.op_caller(current_call_frame),
                Opcode::CALLVALUE => self.op_callvalue(current_call_frame),
                Opcode::CALLDATALOAD => self.op_calldataload(current_call_frame),
                Opcode::CALLDATASIZE => self.op_calldatasize(current_call_frame),
                Opcode::CALLDATACOPY => self.op_calldatacopy(current_call_frame),
                Opcode::CODESIZE => self.op_codesize(current_call_frame),
                Opcode::CODECOPY => self.op_codecopy(current_call_frame),
                Opcode::GASPRICE => self.op_gasprice(current_call_frame),
                Opcode::EXTCODESIZE => self.op_extcodesize(current_call_frame),
                Opcode::EXTCODECOPY => self.op_extcodecopy(current_call_frame),
                Opcode::RETURNDATASIZE => self.op_returndatasize(current_call_frame),
                Opcode::RETURNDATACOPY => self.op_returndatacopy(current_call_frame),
                Opcode::EXTCODEHASH => self.op_extcodehash(current_call_frame),
                Opcode::BLOCKHASH => self.op_blockhash(current_call_frame),
                Opcode::COINBASE => self.op_coinbase(current_call_frame),
                Opcode::TIMESTAMP => self.op_timestamp(current_call_frame),
                Opcode::NUMBER => self.op_number(current_call_frame),
                Opcode::DIFFICULTY => self.op_difficulty(current_call_frame),
                Opcode::GASLIMIT => self.op_gaslimit(current_call_frame),
                Opcode::CHAINID => self.op_chainid(current_call_frame),
                Opcode::SELFBALANCE => self.op_selfbalance(current_call_frame),
                Opcode::BASEFEE => self.op_basefee(current_call_frame),
                Opcode::POP => self.op_pop(current_call_frame),
                Opcode::MLOAD => self.op_mload(current_call_frame),
                Opcode::MSTORE => self.op_mstore(current_call_frame),
                Opcode::MSTORE8 => self.op_mstore8(current_call_frame),
                Opcode::SLOAD => self.op_sload(current_call_frame),
                Opcode::SSTORE => self.op_sstore(current_call_frame),
                Opcode::JUMP => self.op_jump(current_call_frame),
                Opcode::JUMPI => self.op_jumpi(current_call_frame),
                Opcode::PC => self.op_pc(current_call_frame),
                Opcode::MSIZE => self.op_msize(current_call_frame),
                Opcode::GAS => self.op_gas(current_call_frame),
                Opcode::JUMPDEST => self.op_jumpdest(current_call_frame),
                Opcode::BEGINSUB => self.op_beginsub(current_call_frame),
                Opcode::JUMPSUB => self.op_jumpsub(current_call_frame),
                Opcode::RETURNSUB => self.op_returnsub(current_call_frame),
                // PUSHn
                op if (Opcode::PUSH1..=Opcode::PUSH32).contains(&op) => {
                    let n_bytes = get_n_value(op, Opcode::PUSH1)?;
                    self.op_push(current_call_frame, n_bytes)
                }
                // DUPn
                op if (Opcode::DUP1..=Opcode::DUP16).contains(&op) => {
                    let depth = get_n_value(op, Opcode::DUP1)?;
                    self.op_dup(current_call_frame, depth)
                }
                // SWAPn
                op if (Opcode::SWAP1..=Opcode::SWAP16).contains(&op) => {
                    let depth = get_n_value(op, Opcode::SWAP1)?;
                    self.op_swap(current_call_frame, depth)
                }
                // LOGn
                op if (Opcode::LOG0..=Opcode::LOG4).contains(&op) => {
                    let number_of_topics = get_number_of_topics(op)?;
                    self.op_log(current_call_frame, number_of_topics)
                }
                Opcode::CREATE => self.op_create(current_call_frame),
                Opcode::CALL => self.op_call(current_call_frame),
                Opcode::CALLCODE => self.op_callcode(current_call_frame),
                Opcode::RETURN => self.op_return(current_call_frame),
                Opcode::DELEGATECALL => self.op_delegatecall(current_call_frame),
                Opcode::CREATE2 => self.op_create2(current_call_frame),
                Opcode::STATICCALL => self.op_staticcall(current_call_frame),
                Opcode::REVERT => self.op_revert(current_call_frame),
                Opcode::INVALID => self.op_invalid(),
                Opcode::SELFDESTRUCT => self.op_selfdestruct(current_call_frame),
                _ => Err(VMError::InvalidOpcode),
            };

            match op_result {
                Ok(OpcodeSuccess::Continue) => {}
                Ok(OpcodeSuccess::Result(reason)) => {
                    tracing::debug!(
                        reason = ?reason,
                        location = %describe_location(opcode, current_call_frame),
                        "frame finished"
                    );
                    self.merge_frame_counters(current_call_frame);

                    // Frames running init code deposit their output as the
                    // new contract's bytecode, after validation.
                    if (current_call_frame.is_deploy || current_call_frame.is_create)
                        && reason != ResultReason::SelfDestruct
                    {
                        if let Err(error) = self.deposit_contract_code(current_call_frame) {
                            if error.is_internal() {
                                return Err(error);
                            }
                            current_call_frame.gas_used = current_call_frame.gas_limit;
                            current_call_frame.output = Bytes::new();
                            self.restore_state(backup_cache, backup_substate, backup_refunded_gas);
                            self.call_frames.push(current_call_frame.clone());

                            return Ok(ExecutionReport {
                                result: TxResult::Revert(error),
                                new_state: self.cache.clone(),
                                gas_used: current_call_frame.gas_used,
                                gas_refunded: self.env.refunded_gas,
                                output: Bytes::new(),
                                logs: current_call_frame.logs.clone(),
                                created_address: None,
                            });
                        }
                    }

                    self.call_frames.push(current_call_frame.clone());

                    return Ok(ExecutionReport {
                        result: TxResult::Success,
                        new_state: self.cache.clone(),
                        gas_used: current_call_frame.gas_used,
                        gas_refunded: self.env.refunded_gas,
                        output: current_call_frame.output.clone(),
                        logs: current_call_frame.logs.clone(),
                        created_address: None,
                    });
                }
                Err(error) => {
                    if error.is_internal() {
                        return Err(error);
                    }

                    tracing::debug!(
                        error = %error,
                        location = %describe_location(opcode, current_call_frame),
                        "frame halted"
                    );
                    self.merge_frame_counters(current_call_frame);

                    // Anything but REVERT is a trap: remaining gas is
                    // consumed and the output cleared.
                    if error != VMError::RevertOpcode {
                        current_call_frame.gas_used = current_call_frame.gas_limit;
                        current_call_frame.output = Bytes::new();
                    }

                    self.restore_state(backup_cache, backup_substate, backup_refunded_gas);
                    self.call_frames.push(current_call_frame.clone());

                    return Ok(ExecutionReport {
                        result: TxResult::Revert(error),
                        new_state: self.cache.clone(),
                        gas_used: current_call_frame.gas_used,
                        gas_refunded: self.env.refunded_gas,
                        output: current_call_frame.output.clone(),
                        logs: current_call_frame.logs.clone(),
                        created_address: None,
                    });
                }
            }
        }
    }

    fn merge_frame_counters(&mut self, current_call_frame: &mut CallFrame) {
        let deltas = std::mem::take(&mut current_call_frame.counters);
        self.counters.merge(deltas);
    }

    fn restore_state(
        &mut self,
        backup_cache: CacheDB,
        backup_substate: Substate,
        backup_refunded_gas: U256,
    ) {
        self.cache = backup_cache;
        self.accrued_substate = backup_substate;
        self.env.refunded_gas = backup_refunded_gas;
    }

    /// Validates and installs the code returned by an init-code frame:
    /// max-size and 0xEF-prefix checks, then the per-byte deposit charge.
    fn deposit_contract_code(&mut self, current_call_frame: &mut CallFrame) -> Result<(), VMError> {
        let contract_code = current_call_frame.output.clone();
        let code_length = contract_code.len();

        if code_length > MAX_CODE_SIZE {
            return Err(VMError::OutOfRange);
        }
        if contract_code.first() == Some(&INVALID_CONTRACT_PREFIX) {
            return Err(VMError::InvalidOpcode);
        }

        let code_deposit_cost = U256::from(code_length)
            .checked_mul(CODE_DEPOSIT_COST)
            .ok_or(VMError::Internal(
                InternalError::ArithmeticOperationOverflow,
            ))?;
        self.increase_consumed_gas(current_call_frame, code_deposit_cost)?;

        self.update_account_bytecode(current_call_frame.to, contract_code)?;
        Ok(())
    }

    /// Reserves the gas a call/create handler may forward: all the caller
    /// has left, minus one 64th (EIP-150). The handler takes the slot
    /// exactly once.
    fn reserve_message_gas(&mut self, current_call_frame: &mut CallFrame) -> Result<(), VMError> {
        let remaining_gas = current_call_frame
            .gas_limit
            .checked_sub(current_call_frame.gas_used)
            .unwrap_or_default();
        let retained = remaining_gas
            .checked_div(CALL_GAS_RETENTION_DIVISOR)
            .unwrap_or_default();
        self.message_gas_limit = Some(remaining_gas.saturating_sub(retained));
        Ok(())
    }

    /// Takes the reservation made by the dispatcher for this opcode.
    pub(crate) fn take_message_gas(&mut self) -> Result<U256, VMError> {
        self.message_gas_limit
            .take()
            .ok_or(VMError::Internal(InternalError::MessageGasNotReserved))
    }

    /// Memoized jump-target lookup, keyed by the code's content hash so
    /// frames running the same code share one scan.
    pub fn jump_targets_for(&mut self, code: &Bytes) -> Result<Arc<JumpTargets>, VMError> {
        let code_hash = keccak(code);
        if let Some(targets) = self.jump_target_cache.get(&code_hash) {
            return Ok(targets.clone());
        }
        let targets = Arc::new(compute_jump_targets(code)?);
        self.jump_target_cache.insert(code_hash, targets.clone());
        Ok(targets)
    }

    pub fn current_call_frame_mut(&mut self) -> Result<&mut CallFrame, VMError> {
        self.call_frames.last_mut().ok_or(VMError::Internal(
            InternalError::CouldNotAccessLastCallframe,
        ))
    }

    /// Message-call protocol shared by CALL, CALLCODE, DELEGATECALL and
    /// STATICCALL. The handler has already popped its operands, charged its
    /// access and memory costs and recorded its counters.
    #[allow(clippy::too_many_arguments)]
    pub fn generic_call(
        &mut self,
        current_call_frame: &mut CallFrame,
        gas_requested: U256,
        value: U256,
        msg_sender: Address,
        to: Address,
        code_address: Address,
        should_transfer_value: bool,
        is_static: bool,
        args_start_offset: usize,
        args_size: usize,
        return_data_start_offset: usize,
        return_data_size: usize,
    ) -> Result<OpcodeSuccess, VMError> {
        let reserved_gas = self.take_message_gas()?;

        let new_depth = current_call_frame
            .depth
            .checked_add(1)
            .ok_or(VMError::Internal(
                InternalError::ArithmeticOperationOverflow,
            ))?;
        if new_depth > CALL_DEPTH_LIMIT {
            current_call_frame.sub_return_data = Bytes::new();
            current_call_frame.stack.push(REVERT_FOR_CALL)?;
            return Ok(OpcodeSuccess::Continue);
        }

        let calldata = current_call_frame
            .memory
            .load_range(args_start_offset, args_size)?;

        let remaining_gas = current_call_frame
            .gas_limit
            .checked_sub(current_call_frame.gas_used)
            .unwrap_or_default();
        let max_forwardable = reserved_gas.min(
            remaining_gas.saturating_sub(
                remaining_gas
                    .checked_div(CALL_GAS_RETENTION_DIVISOR)
                    .unwrap_or_default(),
            ),
        );
        let mut gas_for_subcall = gas_requested.min(max_forwardable);
        // The stipend rides on top of the forwarded gas and is not billed
        // back to the caller.
        let mut stipend = U256::zero();
        if should_transfer_value && !value.is_zero() {
            stipend = U256::from(self.config.gas_prices.call_stipend);
            gas_for_subcall = gas_for_subcall
                .checked_add(stipend)
                .ok_or(OutOfGasError::GasCostOverflow)?;
        }

        // A sender short on funds fails the call without trapping the
        // caller.
        if should_transfer_value && self.get_account(msg_sender).info.balance < value {
            current_call_frame.sub_return_data = Bytes::new();
            current_call_frame.stack.push(REVERT_FOR_CALL)?;
            return Ok(OpcodeSuccess::Continue);
        }

        let recipient_account = self.get_account(code_address);
        let bytecode = recipient_account.info.bytecode.clone();
        let jump_targets = self.jump_targets_for(&bytecode)?;

        // Snapshot before the value moves, so a reverting sub-context undoes
        // the transfer as well.
        let (backup_cache, backup_substate, backup_refunded_gas) = (
            self.cache.clone(),
            self.accrued_substate.clone(),
            self.env.refunded_gas,
        );

        if should_transfer_value && !value.is_zero() {
            self.decrease_account_balance(msg_sender, value)?;
            self.increase_account_balance(to, value)?;
        }

        let mut sub_frame = CallFrame::new(
            msg_sender,
            to,
            code_address,
            bytecode,
            value,
            calldata.into(),
            is_static,
            gas_for_subcall,
            new_depth,
            jump_targets,
        );
        sub_frame.nonce = recipient_account.info.nonce;

        let report = self.execute(&mut sub_frame)?;

        if !report.is_success() {
            self.restore_state(backup_cache, backup_substate, backup_refunded_gas);
        }

        // The caller pays for what the sub-context consumed beyond the
        // stipend; on a revert the remainder of the forwarded gas is
        // implicitly returned.
        self.increase_consumed_gas(current_call_frame, report.gas_used.saturating_sub(stipend))?;
        current_call_frame.logs.extend(report.logs.clone());

        // Sub-call return data lands in caller memory only now, truncated to
        // the reserved window; the status word goes last.
        current_call_frame.sub_return_data = report.output.clone();
        let bytes_to_copy = return_data_size.min(report.output.len());
        let return_slice = report
            .output
            .get(..bytes_to_copy)
            .ok_or(VMError::Internal(InternalError::SlicingError))?;
        current_call_frame
            .memory
            .store_bytes(return_data_start_offset, return_slice)?;

        match report.result {
            TxResult::Success => current_call_frame.stack.push(SUCCESS_FOR_CALL)?,
            TxResult::Revert(_) => current_call_frame.stack.push(REVERT_FOR_CALL)?,
        }

        Ok(OpcodeSuccess::Continue)
    }

    /// Contract-creation protocol shared by CREATE and CREATE2.
    pub fn create(
        &mut self,
        value_in_wei_to_send: U256,
        code_offset_in_memory: usize,
        code_size_in_memory: usize,
        salt: Option<U256>,
        current_call_frame: &mut CallFrame,
    ) -> Result<OpcodeSuccess, VMError> {
        let reserved_gas = self.take_message_gas()?;

        let new_depth = current_call_frame
            .depth
            .checked_add(1)
            .ok_or(VMError::Internal(
                InternalError::ArithmeticOperationOverflow,
            ))?;
        if new_depth > CALL_DEPTH_LIMIT {
            current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeSuccess::Continue);
        }

        let init_code: Bytes = current_call_frame
            .memory
            .load_range(code_offset_in_memory, code_size_in_memory)?
            .into();

        let deployer_address = current_call_frame.to;
        let deployer_account = self.get_account(deployer_address);

        if deployer_account.info.balance < value_in_wei_to_send {
            current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeSuccess::Continue);
        }

        let new_address = match salt {
            Some(salt) => {
                VM::calculate_create2_address(deployer_address, &init_code, salt)?
            }
            None => {
                VM::calculate_create_address(deployer_address, deployer_account.info.nonce)?
            }
        };

        self.increment_account_nonce(deployer_address)?;

        // An occupied address fails the create with a zero word.
        let existing = self.get_account(new_address);
        if existing.has_code() || existing.info.nonce > 0 {
            current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeSuccess::Continue);
        }

        // The deployer's nonce bump survives a reverting init frame; the
        // account creation and value endowment do not.
        let (backup_cache, backup_substate, backup_refunded_gas) = (
            self.cache.clone(),
            self.accrued_substate.clone(),
            self.env.refunded_gas,
        );

        self.accrued_substate.created_accounts.insert(new_address);
        self.accrued_substate.touched_accounts.insert(new_address);

        self.decrease_account_balance(deployer_address, value_in_wei_to_send)?;
        let new_account = Account::new(
            existing
                .info
                .balance
                .checked_add(value_in_wei_to_send)
                .ok_or(VMError::Internal(
                    InternalError::ArithmeticOperationOverflow,
                ))?,
            Bytes::new(),
            1,
            HashMap::new(),
        );
        cache::insert_account(&mut self.cache, new_address, new_account);

        let jump_targets = self.jump_targets_for(&init_code)?;
        let mut sub_frame = CallFrame::new(
            deployer_address,
            new_address,
            new_address,
            init_code,
            value_in_wei_to_send,
            Bytes::new(),
            current_call_frame.is_static,
            reserved_gas,
            new_depth,
            jump_targets,
        );
        sub_frame.is_create = true;
        sub_frame.nonce = 1;

        let report = self.execute(&mut sub_frame)?;

        self.increase_consumed_gas(current_call_frame, report.gas_used)?;
        current_call_frame.logs.extend(report.logs.clone());

        if report.is_success() {
            // RETURNDATA after a successful create is empty.
            current_call_frame.sub_return_data = Bytes::new();
            current_call_frame
                .stack
                .push(address_to_word(new_address))?;
        } else {
            self.restore_state(backup_cache, backup_substate, backup_refunded_gas);
            remove_account(&mut self.cache, &new_address);
            current_call_frame.sub_return_data = report.output.clone();
            current_call_frame.stack.push(U256::zero())?;
        }

        Ok(OpcodeSuccess::Continue)
    }

    /// New-contract address for CREATE:
    ///
    /// address = keccak256(rlp([sender_address, sender_nonce]))[12:]
    pub fn calculate_create_address(
        sender_address: Address,
        sender_nonce: u64,
    ) -> Result<Address, VMError> {
        let encoded = encode_address_nonce_pair(sender_address, sender_nonce)?;
        let mut hasher = Keccak256::new();
        hasher.update(encoded);
        Ok(Address::from_slice(hasher.finalize().get(12..).ok_or(
            VMError::Internal(InternalError::CouldNotComputeCreateAddress),
        )?))
    }

    /// New-contract address for CREATE2:
    ///
    /// address = keccak256(0xff ++ sender_address ++ salt ++
    ///                     keccak256(initialization_code))[12:]
    pub fn calculate_create2_address(
        sender_address: Address,
        initialization_code: &Bytes,
        salt: U256,
    ) -> Result<Address, VMError> {
        let init_code_hash = keccak(initialization_code);
        let mut salt_bytes = [0; 32];
        salt.to_big_endian(&mut salt_bytes);

        let generated_address = Address::from_slice(
            keccak(
                [
                    &[0xff],
                    sender_address.as_bytes(),
                    &salt_bytes,
                    init_code_hash.as_bytes(),
                ]
                .concat(),
            )
            .as_bytes()
            .get(12..)
            .ok_or(VMError::Internal(
                InternalError::CouldNotComputeCreateAddress,
            ))?,
        );
        Ok(generated_address)
    }

    /// Increases gas consumption of the frame, trapping when its gas limit
    /// is reached.
    pub fn increase_consumed_gas(
        &mut self,
        current_call_frame: &mut CallFrame,
        gas: U256,
    ) -> Result<(), VMError> {
        let potential_consumed_gas = current_call_frame
            .gas_used
            .checked_add(gas)
            .ok_or(OutOfGasError::ConsumedGasOverflow)?;
        if potential_consumed_gas > current_call_frame.gas_limit {
            return Err(VMError::OutOfGas(OutOfGasError::MaxGasLimitExceeded));
        }

        current_call_frame.gas_used = potential_consumed_gas;

        Ok(())
    }

    /// Accesses an account's information.
    ///
    /// Accessed accounts land in the `touched_accounts` set and count as
    /// warm from then on (EIP-2929).
    pub fn access_account(&mut self, address: Address) -> (AccountInfo, bool) {
        let address_was_cold = self.accrued_substate.touched_accounts.insert(address);
        let account = match cache::get_account(&self.cache, &address) {
            Some(account) => account.info.clone(),
            None => self.db.get_account_info(address),
        };
        (account, address_was_cold)
    }

    /// Accesses an account's storage slot through the journal, warming it.
    pub fn access_storage_slot(
        &mut self,
        address: Address,
        key: H256,
    ) -> Result<(StorageSlot, bool), VMError> {
        let storage_slot_was_cold = self
            .accrued_substate
            .touched_storage_slots
            .entry(address)
            .or_default()
            .insert(key);
        let storage_slot = match cache::get_account(&self.cache, &address) {
            Some(account) => match account.storage.get(&key) {
                Some(storage_slot) => storage_slot.clone(),
                None => crate::db::storage_slot_from_db(self.db.as_ref(), address, key),
            },
            None => crate::db::storage_slot_from_db(self.db.as_ref(), address, key),
        };

        // Writing the slot through `get_account_mut` caches the account so
        // later SSTOREs see a consistent original value.
        let account = self.get_account_mut(address)?;
        account.storage.insert(key, storage_slot.clone());

        Ok((storage_slot, storage_slot_was_cold))
    }

    /// Journals a storage write. The value is kept in its shortest
    /// big-endian form, the representation the state tree hashes.
    pub fn update_account_storage(
        &mut self,
        address: Address,
        key: H256,
        new_value: U256,
    ) -> Result<(), VMError> {
        let account = self.get_account_mut(address)?;
        let original_value = account
            .storage
            .get(&key)
            .map(|slot| slot.original_value.clone())
            .unwrap_or_default();
        account.storage.insert(
            key,
            StorageSlot {
                original_value,
                current_value: word_to_shortest_be(new_value),
            },
        );
        Ok(())
    }

    pub fn increase_account_balance(
        &mut self,
        address: Address,
        increase: U256,
    ) -> Result<(), VMError> {
        let account = self.get_account_mut(address)?;
        account.info.balance = account
            .info
            .balance
            .checked_add(increase)
            .ok_or(VMError::Internal(
                InternalError::ArithmeticOperationOverflow,
            ))?;
        Ok(())
    }

    pub fn decrease_account_balance(
        &mut self,
        address: Address,
        decrease: U256,
    ) -> Result<(), VMError> {
        let account = self.get_account_mut(address)?;
        account.info.balance = account
            .info
            .balance
            .checked_sub(decrease)
            .ok_or(VMError::Internal(
                InternalError::ArithmeticOperationUnderflow,
            ))?;
        Ok(())
    }

    pub fn increment_account_nonce(&mut self, address: Address) -> Result<u64, VMError> {
        let account = self.get_account_mut(address)?;
        account.info.nonce = account.info.nonce.checked_add(1).ok_or(VMError::Internal(
            InternalError::ArithmeticOperationOverflow,
        ))?;
        Ok(account.info.nonce)
    }

    pub fn update_account_bytecode(
        &mut self,
        address: Address,
        new_bytecode: Bytes,
    ) -> Result<(), VMError> {
        let account = self.get_account_mut(address)?;
        account.info.bytecode = new_bytecode;
        Ok(())
    }

    pub fn get_account_mut(&mut self, address: Address) -> Result<&mut Account, VMError> {
        if !cache::is_account_cached(&self.cache, &address) {
            let account_info = self.db.get_account_info(address);
            cache::insert_account(&mut self.cache, address, Account::from(account_info));
        }
        cache::get_account_mut(&mut self.cache, &address)
            .ok_or(VMError::Internal(InternalError::AccountNotFound))
    }

    /// Gets an account, checking the journal first and caching on a miss.
    pub fn get_account(&mut self, address: Address) -> Account {
        match cache::get_account(&self.cache, &address) {
            Some(acc) => acc.clone(),
            None => {
                let account = Account::from(self.db.get_account_info(address));
                cache::insert_account(&mut self.cache, address, account.clone());
                account
            }
        }
    }
}

/// RLP of the `[address, nonce]` pair hashed for CREATE addresses. The
/// payload always fits a single-byte list header (20-byte address plus at
/// most 9 nonce bytes).
fn encode_address_nonce_pair(address: Address, nonce: u64) -> Result<Vec<u8>, VMError> {
    let mut payload: Vec<u8> = Vec::with_capacity(30);
    payload.push(0x94);
    payload.extend_from_slice(address.as_bytes());
    if nonce == 0 {
        payload.push(0x80);
    } else if nonce < 0x80 {
        payload.push(u8::try_from(nonce).map_err(|_| {
            VMError::Internal(InternalError::CouldNotComputeCreateAddress)
        })?);
    } else {
        let be_bytes = nonce.to_be_bytes();
        let first_nonzero = be_bytes.iter().position(|byte| *byte != 0).unwrap_or(7);
        let stripped = be_bytes.get(first_nonzero..).unwrap_or(&[]);
        let length_prefix = 0x80u8
            .checked_add(u8::try_from(stripped.len()).map_err(|_| {
                VMError::Internal(InternalError::CouldNotComputeCreateAddress)
            })?)
            .ok_or(VMError::Internal(
                InternalError::CouldNotComputeCreateAddress,
            ))?;
        payload.push(length_prefix);
        payload.extend_from_slice(stripped);
    }

    let mut encoded = Vec::with_capacity(payload.len().saturating_add(1));
    let list_prefix = 0xC0u8
        .checked_add(u8::try_from(payload.len()).map_err(|_| {
            VMError::Internal(InternalError::CouldNotComputeCreateAddress)
        })?)
        .ok_or(VMError::Internal(
            InternalError::CouldNotComputeCreateAddress,
        ))?;
    encoded.push(list_prefix);
    encoded.extend_from_slice(&payload);
    Ok(encoded)
}

/// Human-readable spot of the instruction that just ran; the program counter
/// has already advanced past the opcode byte.
pub fn describe_location(opcode: Opcode, current_call_frame: &CallFrame) -> String {
    format!(
        "opcode {:?} (0x{:02x}) at pc {} of {:#x}",
        opcode,
        u8::from(opcode),
        current_call_frame.pc().saturating_sub(1),
        current_call_frame.code_address,
    )
}

/// Family index for PUSH / DUP / SWAP bodies: 1-based distance from the
/// family's base opcode.
pub(crate) fn get_n_value(op: Opcode, base_opcode: Opcode) -> Result<usize, VMError> {
    let offset = usize::from(u8::from(op))
        .checked_sub(usize::from(u8::from(base_opcode)))
        .ok_or(VMError::InvalidOpcode)?
        .checked_add(1)
        .ok_or(VMError::InvalidOpcode)?;

    Ok(offset)
}

pub(crate) fn get_number_of_topics(op: Opcode) -> Result<usize, VMError> {
    let number_of_topics = u8::from(op)
        .checked_sub(u8::from(Opcode::LOG0))
        .ok_or(VMError::InvalidOpcode)?;

    Ok(usize::from(number_of_topics))
}

/// Convenience metrics bearing only the frame flags.
pub(crate) fn frame_metrics(current_call_frame: &CallFrame) -> CounterMetrics {
    CounterMetrics {
        is_create: current_call_frame.is_create,
        is_deploy: current_call_frame.is_deploy,
        ..Default::default()
    }
}

/// The common case: record the opcode's own counter with bare frame flags.
pub(crate) fn record_counter(current_call_frame: &mut CallFrame, id: CounterId) {
    let metrics = frame_metrics(current_call_frame);
    current_call_frame.counters.record(id, metrics);
}
