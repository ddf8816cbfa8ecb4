//! Metering configuration: step costs and the per-round budget.
//!
//! The distilled spec leaves `getOpCodeSteps`/`getMaxStepsPerRound`/
//! `feePerStep` as host callbacks read once per round; this module supplies
//! the concrete, host-parametrized defaults behind them, mirroring
//! `fuel-vm`'s `ConsensusParameters`/gas-cost table (`src/interpreter/gas.rs`).

use std::collections::HashMap;

use crate::consts::{DEFAULT_EXT_FUN_STEPS, DEFAULT_OP_CODE_STEPS};
use crate::opcode::Opcode;

/// Per-round resource limits and fee schedule. A concrete [`crate::host::HostInterface`]
/// implementation typically owns one of these and answers its metering
/// callbacks from it, though nothing requires that; the trait methods are
/// the actual contract.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Limits {
    /// Steps charged to a round before it auto-yields.
    pub max_steps_per_round: u64,
    /// Fee, in the host's native unit, charged per step executed.
    pub fee_per_step: u64,
    /// Balance below which an AT is frozen and skipped; default is one step's fee.
    pub frozen_balance_threshold: u64,
    /// Overrides of [`Self::op_code_steps`] for specific opcodes, beyond the
    /// blanket 1-step/10-step (`EXT_FUN*`) default.
    pub op_code_step_overrides: HashMap<Opcode, u64>,
}

impl Limits {
    /// Steps charged for one execution of `opcode`: an override if present,
    /// else the blanket default (1, or 10 for the `EXT_FUN*` family).
    pub fn op_code_steps(&self, opcode: Opcode) -> u64 {
        self.op_code_step_overrides.get(&opcode).copied().unwrap_or_else(|| {
            if opcode.is_ext_fun() {
                DEFAULT_EXT_FUN_STEPS
            } else {
                DEFAULT_OP_CODE_STEPS
            }
        })
    }
}

impl Default for Limits {
    fn default() -> Self {
        let fee_per_step = 1;
        Self {
            max_steps_per_round: 500,
            fee_per_step,
            frozen_balance_threshold: fee_per_step,
            op_code_step_overrides: HashMap::new(),
        }
    }
}
