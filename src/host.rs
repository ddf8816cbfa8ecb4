//! The host callback surface. An embedder implements [`HostInterface`]
//! to supply chain data, the transaction feed, randomness, outbound actions,
//! timing math, and metering parameters; the executor and function-code
//! dispatcher never reach outside this trait.
//!
//! Modeled on `fuel-vm`'s `InterpreterStorage`: one trait, an associated
//! `Error` type, and plain data in and out, no sub-trait split, since the
//! callback surface here is no larger than `InterpreterStorage`'s own.

use crate::codec::Timestamp;
use crate::state::MachineState;

/// The four-byte identifier the host hands back for "no matching transaction".
pub const NO_TRANSACTION: [u8; 32] = [0u8; 32];

/// Everything an AT needs from its embedding environment.
///
/// Every method takes `&MachineState`/`&mut MachineState` so a host can read
/// registers or flags (e.g. `is_first_opcode_after_sleeping`) as part of
/// deciding how to answer, and several write their result directly into A or
/// B rather than returning it, mirroring the function codes that call them
/// 1:1.
pub trait HostInterface {
    /// Errors from the embedding ledger (I/O, corruption, etc). Propagated to
    /// the caller as [`crate::error::ExecutorError::Host`], never as a [`crate::error::Fault`].
    type Error: std::error::Error;

    // ---- clock / chain --------------------------------------------------

    fn current_block_height(&self) -> u32;

    /// The AT's current ledger balance, in the host's native unit. Required
    /// by the freezing check and the settle step that read it every round;
    /// see DESIGN.md.
    fn current_balance(&self, state: &MachineState) -> Result<u64, Self::Error>;

    fn at_creation_block_height(&self, state: &MachineState) -> u32 {
        state.creation_block_height()
    }

    fn previous_block_hash_into_a(&self, state: &mut MachineState) -> Result<(), Self::Error>;

    // ---- transaction feed ------------------------------------------------

    /// Sets A to the 32-byte id of the first transaction addressed to this AT
    /// strictly after `after`; all-zero if none.
    fn transaction_after_timestamp_into_a(
        &self,
        after: Timestamp,
        state: &mut MachineState,
    ) -> Result<(), Self::Error>;

    fn type_from_tx_in_a(&self, state: &MachineState) -> Result<i64, Self::Error>;

    fn amount_from_tx_in_a(&self, state: &MachineState) -> Result<i64, Self::Error>;

    fn timestamp_from_tx_in_a(&self, state: &MachineState) -> Result<Timestamp, Self::Error>;

    fn message_from_tx_in_a_into_b(&self, state: &mut MachineState) -> Result<(), Self::Error>;

    fn address_from_tx_in_a_into_b(&self, state: &mut MachineState) -> Result<(), Self::Error>;

    fn creator_address_into_b(&self, state: &mut MachineState) -> Result<(), Self::Error>;

    // ---- randomness -------------------------------------------------------

    /// Two-phase: on first call the implementation should put the AT to
    /// sleep for one block (the caller does this via the lifecycle opcodes
    /// before this is reached); on the resumed call, with
    /// `is_first_opcode_after_sleeping` true, returns a value derived from A
    /// and the new block hash.
    fn generate_random_using_tx_in_a(&self, state: &mut MachineState) -> Result<i64, Self::Error>;

    // ---- actions ------------------------------------------------------

    fn pay_amount_to_b(&self, amount: i64, state: &mut MachineState) -> Result<(), Self::Error>;

    fn message_a_to_b(&self, state: &mut MachineState) -> Result<(), Self::Error>;

    fn on_finished(&self, remaining_balance: u64, state: &mut MachineState) -> Result<(), Self::Error>;

    fn on_fatal_error(&self, state: &mut MachineState, err: crate::error::Fault) -> Result<(), Self::Error>;

    // ---- timing math ----------------------------------------------------

    fn add_minutes_to_timestamp(
        &self,
        ts: Timestamp,
        minutes: i64,
        state: &MachineState,
    ) -> Result<Timestamp, Self::Error>;

    // ---- metering -------------------------------------------------------

    fn max_steps_per_round(&self) -> u64;

    fn op_code_steps(&self, opcode: crate::opcode::Opcode) -> u64;

    fn fee_per_step(&self) -> u64;

    // ---- platform-specific function codes --------------------------------

    /// Called before a platform function code (`rawFunctionCode >= 0x0100`)
    /// executes, so the host can validate the declared `(param_count,
    /// returns_value)` shape against its own table.
    fn platform_specific_pre_execute_check(
        &self,
        param_count: u8,
        returns_value: bool,
        state: &MachineState,
        raw_func: u16,
    ) -> Result<bool, Self::Error>;

    /// Executes a platform function code that passed the pre-check,
    /// returning its result if it declared one.
    fn platform_specific_post_check_execute(
        &self,
        function_data: &[i64],
        state: &mut MachineState,
        raw_func: u16,
    ) -> Result<Option<i64>, Self::Error>;
}

/// A no-op [`HostInterface`] for unit-testing the executor and opcode
/// dispatcher without a real ledger, grounded on `fuel-vm`'s in-memory
/// `MemoryStorage` test backend.
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use super::*;
    use std::convert::Infallible;

    /// Answers every chain/tx query with zero/empty data. Platform function
    /// codes are rejected unless explicitly declared via
    /// [`NullHost::with_platform_code`], mirroring a real host's function-code
    /// registry.
    #[derive(Debug, Clone, Default)]
    pub struct NullHost {
        pub block_height: u32,
        pub max_steps_per_round: u64,
        pub fee_per_step: u64,
        pub balance: u64,
        declared_platform_codes: std::collections::HashMap<u16, (u8, bool)>,
    }

    impl NullHost {
        /// Declares a platform function code with the given `(arity, returns_value)` shape.
        pub fn with_platform_code(mut self, raw_func: u16, arity: u8, returns_value: bool) -> Self {
            self.declared_platform_codes.insert(raw_func, (arity, returns_value));
            self
        }
    }

    impl HostInterface for NullHost {
        type Error = Infallible;

        fn current_block_height(&self) -> u32 {
            self.block_height
        }

        fn current_balance(&self, _state: &MachineState) -> Result<u64, Self::Error> {
            Ok(self.balance)
        }

        fn previous_block_hash_into_a(&self, state: &mut MachineState) -> Result<(), Self::Error> {
            state.set_a_bytes([0u8; 32]);
            Ok(())
        }

        fn transaction_after_timestamp_into_a(
            &self,
            _after: Timestamp,
            state: &mut MachineState,
        ) -> Result<(), Self::Error> {
            state.set_a_bytes(NO_TRANSACTION);
            Ok(())
        }

        fn type_from_tx_in_a(&self, _state: &MachineState) -> Result<i64, Self::Error> {
            Ok(0)
        }

        fn amount_from_tx_in_a(&self, _state: &MachineState) -> Result<i64, Self::Error> {
            Ok(0)
        }

        fn timestamp_from_tx_in_a(&self, _state: &MachineState) -> Result<Timestamp, Self::Error> {
            Ok(Timestamp::pack(0, 0))
        }

        fn message_from_tx_in_a_into_b(&self, state: &mut MachineState) -> Result<(), Self::Error> {
            state.set_b_bytes([0u8; 32]);
            Ok(())
        }

        fn address_from_tx_in_a_into_b(&self, state: &mut MachineState) -> Result<(), Self::Error> {
            state.set_b_bytes([0u8; 32]);
            Ok(())
        }

        fn creator_address_into_b(&self, state: &mut MachineState) -> Result<(), Self::Error> {
            state.set_b_bytes([0u8; 32]);
            Ok(())
        }

        fn generate_random_using_tx_in_a(&self, state: &mut MachineState) -> Result<i64, Self::Error> {
            Ok(i64::from_be_bytes(state.get_a_bytes()[0..8].try_into().unwrap()))
        }

        fn pay_amount_to_b(&self, _amount: i64, _state: &mut MachineState) -> Result<(), Self::Error> {
            Ok(())
        }

        fn message_a_to_b(&self, _state: &mut MachineState) -> Result<(), Self::Error> {
            Ok(())
        }

        fn on_finished(&self, _remaining_balance: u64, _state: &mut MachineState) -> Result<(), Self::Error> {
            Ok(())
        }

        fn on_fatal_error(&self, _state: &mut MachineState, _err: crate::error::Fault) -> Result<(), Self::Error> {
            Ok(())
        }

        fn add_minutes_to_timestamp(
            &self,
            ts: Timestamp,
            minutes: i64,
            _state: &MachineState,
        ) -> Result<Timestamp, Self::Error> {
            let minute_seq = minutes.max(0) as u32;
            Ok(Timestamp::pack(ts.block_height(), ts.sequence().wrapping_add(minute_seq)))
        }

        fn max_steps_per_round(&self) -> u64 {
            if self.max_steps_per_round == 0 {
                1000
            } else {
                self.max_steps_per_round
            }
        }

        fn op_code_steps(&self, opcode: crate::opcode::Opcode) -> u64 {
            if opcode.is_ext_fun() {
                crate::consts::DEFAULT_EXT_FUN_STEPS
            } else {
                crate::consts::DEFAULT_OP_CODE_STEPS
            }
        }

        fn fee_per_step(&self) -> u64 {
            self.fee_per_step
        }

        fn platform_specific_pre_execute_check(
            &self,
            param_count: u8,
            returns_value: bool,
            _state: &MachineState,
            raw_func: u16,
        ) -> Result<bool, Self::Error> {
            Ok(self.declared_platform_codes.get(&raw_func) == Some(&(param_count, returns_value)))
        }

        fn platform_specific_post_check_execute(
            &self,
            _function_data: &[i64],
            _state: &mut MachineState,
            raw_func: u16,
        ) -> Result<Option<i64>, Self::Error> {
            let (_, returns_value) = self.declared_platform_codes.get(&raw_func).copied().unwrap_or((0, false));
            Ok(returns_value.then_some(0))
        }
    }
}
