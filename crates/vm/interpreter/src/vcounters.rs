//! Virtual counters: the per-opcode side-stream the zk-prover consumes to
//! bound proving cost. Every executed opcode records exactly one counter;
//! the call/create family records a second one (`ProcessContractCall`).
//! Recording happens before the gas charge, so a counter survives an
//! out-of-gas trap of its own opcode.

/// Counter labels, one per opcode handler body. Families that share a
/// handler share a counter (`OpPush` covers PUSH1..PUSH32 and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum CounterId {
    OpStop = 0,
    OpAdd,
    OpMul,
    OpSub,
    OpDiv,
    OpSdiv,
    OpMod,
    OpSmod,
    OpAddmod,
    OpMulmod,
    OpExp,
    OpSignextend,
    OpLt,
    OpGt,
    OpSlt,
    OpSgt,
    OpEq,
    OpIszero,
    OpAnd,
    OpOr,
    OpXor,
    OpNot,
    OpByte,
    OpShl,
    OpShr,
    OpSar,
    OpSha3,
    OpAddress,
    OpBalance,
    OpOrigin,
    OpCaller,
    OpCallvalue,
    OpCalldataload,
    OpCalldatasize,
    OpCalldatacopy,
    OpCodesize,
    OpCodecopy,
    OpGasprice,
    OpExtcodesize,
    OpExtcodecopy,
    OpReturndatasize,
    OpReturndatacopy,
    OpExtcodehash,
    OpBlockhash,
    OpCoinbase,
    OpTimestamp,
    OpNumber,
    OpDifficulty,
    OpGaslimit,
    OpChainid,
    OpSelfbalance,
    OpBasefee,
    OpPop,
    OpMload,
    OpMstore,
    OpMstore8,
    OpSload,
    OpSstore,
    OpJump,
    OpJumpi,
    OpPc,
    OpMsize,
    OpGas,
    OpJumpdest,
    OpJumpsub,
    OpReturnsub,
    OpPush,
    OpDup,
    OpSwap,
    OpLog,
    OpCreate,
    OpCall,
    OpCallcode,
    OpReturn,
    OpDelegatecall,
    OpCreate2,
    OpStaticcall,
    OpRevert,
    OpSelfdestruct,
    ProcessContractCall,
}

impl CounterId {
    pub const COUNT: usize = 80;
}

impl From<CounterId> for usize {
    #[allow(clippy::as_conversions)]
    fn from(id: CounterId) -> Self {
        id as usize
    }
}

/// Deterministic per-record metrics; which fields are set depends on the
/// opcode. `is_create`/`is_deploy` always mirror the recording frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterMetrics {
    pub is_create: bool,
    pub is_deploy: bool,
    /// Bytes read from memory (SHA3, LOG, the *COPY family).
    pub input_size: Option<usize>,
    /// Immediate size of a PUSH.
    pub push_bytes: Option<usize>,
    /// Byte length of the popped EXP exponent.
    pub exponent_bytes: Option<usize>,
    /// Code length of the callee or init code (call/create family).
    pub bytecode_len: Option<usize>,
    /// Output length of RETURN / REVERT.
    pub return_len: Option<usize>,
    /// Call depth at a termination opcode.
    pub depth: Option<usize>,
    /// Set on `ProcessContractCall` records for CREATE2 frames.
    pub is_create2: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterRecord {
    pub id: CounterId,
    pub metrics: CounterMetrics,
}

/// Write-mostly accumulator: a fixed array of execution counts indexed by
/// `CounterId` plus the ordered record stream carrying the metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualCounterManager {
    counts: [u64; CounterId::COUNT],
    records: Vec<CounterRecord>,
}

impl Default for VirtualCounterManager {
    fn default() -> Self {
        Self {
            counts: [0; CounterId::COUNT],
            records: Vec::new(),
        }
    }
}

impl VirtualCounterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: CounterId, metrics: CounterMetrics) {
        if let Some(count) = self.counts.get_mut(usize::from(id)) {
            *count = count.saturating_add(1);
        }
        self.records.push(CounterRecord { id, metrics });
    }

    pub fn count(&self, id: CounterId) -> u64 {
        self.counts.get(usize::from(id)).copied().unwrap_or(0)
    }

    pub fn records(&self) -> &[CounterRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Folds a finished frame's deltas into this accumulator. Called once
    /// per frame, in frame-completion order.
    pub fn merge(&mut self, child: VirtualCounterManager) {
        for (total, delta) in self.counts.iter_mut().zip(child.counts.iter()) {
            *total = total.saturating_add(*delta);
        }
        self.records.extend(child.records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_counts_executions() {
        let mut counters = VirtualCounterManager::new();
        counters.record(CounterId::OpAdd, CounterMetrics::default());
        counters.record(CounterId::OpAdd, CounterMetrics::default());
        counters.record(CounterId::OpMul, CounterMetrics::default());

        assert_eq!(counters.count(CounterId::OpAdd), 2);
        assert_eq!(counters.count(CounterId::OpMul), 1);
        assert_eq!(counters.count(CounterId::OpSub), 0);
        assert_eq!(counters.records().len(), 3);
    }

    #[test]
    fn merging_adds_counts_and_appends_records_in_order() {
        let mut parent = VirtualCounterManager::new();
        parent.record(CounterId::OpCall, CounterMetrics::default());

        let mut child = VirtualCounterManager::new();
        child.record(CounterId::OpAdd, CounterMetrics::default());
        child.record(CounterId::OpCall, CounterMetrics::default());

        parent.merge(child);

        assert_eq!(parent.count(CounterId::OpCall), 2);
        assert_eq!(parent.count(CounterId::OpAdd), 1);
        let ids: Vec<CounterId> = parent.records().iter().map(|record| record.id).collect();
        assert_eq!(
            ids,
            vec![CounterId::OpCall, CounterId::OpAdd, CounterId::OpCall]
        );
    }
}
