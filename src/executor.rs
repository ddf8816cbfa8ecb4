//! The per-round driver: wake-up/freeze checks, the metered dispatch
//! loop, fault redirection, and settlement.

use crate::decode::decode;
use crate::error::{ExecutorError, Fault};
use crate::gas::Limits;
use crate::host::HostInterface;
use crate::interpreter;
use crate::state::MachineState;

/// What changed as a result of one [`run_round`] call: an ergonomic signal
/// so the host doesn't have to diff `RunState` before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The round did no work: already finished, still frozen, or still asleep.
    NoOp,
    /// At least one instruction executed and the round ended normally
    /// (ready for another round, sleeping, stopped, or freshly finished).
    Completed,
    /// At least one instruction executed and the round ended in an unhandled
    /// fault (`had_fatal_error` and `finished` are now both set).
    Faulted,
}

/// Runs one round for `state` against `host`, metered by `limits`.
pub fn run_round<H: HostInterface>(
    state: &mut MachineState,
    host: &H,
    limits: &Limits,
) -> Result<RoundOutcome, ExecutorError<H::Error>> {
    let _span = tracing::debug_span!(
        "round",
        creation_height = state.creation_block_height(),
        current_height = host.current_block_height(),
    )
    .entered();

    if state.is_finished() {
        return Ok(RoundOutcome::NoOp);
    }

    state.set_frozen_balance_threshold(limits.frozen_balance_threshold);
    let balance = host.current_balance(state).map_err(ExecutorError::Host)?;
    if balance < state.frozen_balance_threshold() {
        state.set_frozen();
        tracing::trace!(balance, threshold = state.frozen_balance_threshold(), "frozen");
        return Ok(RoundOutcome::NoOp);
    }
    if state.is_frozen() {
        state.set_ready();
    }

    if state.is_sleeping() {
        if host.current_block_height() < state.sleep_until_height() {
            return Ok(RoundOutcome::NoOp);
        }
        state.set_ready();
        state.set_first_opcode_after_sleeping(true);
    }

    state.set_ready();
    state.reset_steps_this_round();
    state.set_previous_balance(balance);

    let mut fault_reason: Option<Fault> = None;

    loop {
        let opcode = match decode(state.code(), state.pc()) {
            Ok(decoded) => decoded.opcode,
            Err(fault) => {
                fault_reason = Some(fault);
                state.set_had_fatal_error(true);
                state.set_finished();
                break;
            }
        };

        let cost = limits.op_code_steps(opcode);
        if state.steps_this_round() + cost > limits.max_steps_per_round {
            state.set_sleep_until_height(host.current_block_height().saturating_add(1));
            state.set_sleeping();
            break;
        }
        state.charge_steps(cost);
        tracing::trace!(?opcode, pc = state.pc(), steps = state.steps_this_round(), "dispatch");

        match interpreter::step(state, host) {
            Ok(_) => {
                if state.is_sleeping() || state.is_stopped() || state.is_finished() {
                    break;
                }
            }
            Err(fault) => {
                if let Some(handler) = state.on_error_address() {
                    state.set_had_fatal_error(false);
                    state.set_pc(handler);
                } else {
                    fault_reason = Some(fault);
                    state.set_had_fatal_error(true);
                    state.set_finished();
                    break;
                }
            }
        }
    }

    settle(state, host, limits, fault_reason)
}

fn settle<H: HostInterface>(
    state: &mut MachineState,
    host: &H,
    limits: &Limits,
    fault_reason: Option<Fault>,
) -> Result<RoundOutcome, ExecutorError<H::Error>> {
    let fee = state.steps_this_round().saturating_mul(limits.fee_per_step);
    let remaining = state.get_current_balance().saturating_sub(fee);

    if let Some(fault) = fault_reason {
        host.on_fatal_error(state, fault).map_err(ExecutorError::Host)?;
        return Ok(RoundOutcome::Faulted);
    }
    if state.is_finished() {
        host.on_finished(remaining, state).map_err(ExecutorError::Host)?;
    }
    Ok(RoundOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::test_helpers::NullHost;

    fn host(balance: u64) -> NullHost {
        NullHost {
            balance,
            max_steps_per_round: 100,
            fee_per_step: 1,
            ..Default::default()
        }
    }

    fn program(bytes: &[u8]) -> MachineState {
        MachineState::new(bytes.to_vec(), 64, 32, 32, 0)
    }

    #[test]
    fn below_threshold_balance_freezes_and_no_ops() {
        let mut m = program(&[0x28]); // FIN_IMD
        let limits = Limits::default();
        let h = host(0);
        let outcome = run_round(&mut m, &h, &limits).unwrap();
        assert_eq!(outcome, RoundOutcome::NoOp);
        assert!(m.is_frozen());
    }

    #[test]
    fn finished_program_runs_once_then_stays_finished() {
        let mut m = program(&[0x28]); // FIN_IMD
        let limits = Limits::default();
        let h = host(1000);
        assert_eq!(run_round(&mut m, &h, &limits).unwrap(), RoundOutcome::Completed);
        assert!(m.is_finished());
        assert_eq!(run_round(&mut m, &h, &limits).unwrap(), RoundOutcome::NoOp);
    }

    #[test]
    fn step_budget_exhaustion_auto_yields_to_next_block() {
        let mut code = vec![0x00u8; 5]; // five NOPs
        code.push(0x28); // FIN_IMD
        let mut m = program(&code);
        let mut limits = Limits::default();
        limits.max_steps_per_round = 3;
        let h = host(1000);
        let outcome = run_round(&mut m, &h, &limits).unwrap();
        assert_eq!(outcome, RoundOutcome::Completed);
        assert!(m.is_sleeping());
        assert_eq!(m.sleep_until_height(), h.current_block_height() + 1);
        assert_eq!(m.pc(), 3);
    }

    #[test]
    fn unhandled_fault_finishes_with_had_fatal_error() {
        let mut code = vec![0x07u8]; // DIV_DAT @0 /= @1, both zero -> div by zero
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        let mut m = program(&code);
        let limits = Limits::default();
        let h = host(1000);
        let outcome = run_round(&mut m, &h, &limits).unwrap();
        assert_eq!(outcome, RoundOutcome::Faulted);
        assert!(m.is_finished());
        assert!(m.had_fatal_error());
    }

    #[test]
    fn on_error_address_redirects_instead_of_finishing() {
        // ERR_ADR 14; DIV_DAT @0 /= @1 (faults); FIN_IMD at byte 14 (handler).
        let mut code = vec![0x30u8]; // ERR_ADR, occupies bytes 0..5
        code.extend_from_slice(&14i32.to_be_bytes());
        code.push(0x07); // DIV_DAT, occupies bytes 5..14
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.push(0x28); // FIN_IMD (handler, at byte 14)
        assert_eq!(code.len(), 15);
        let mut m = program(&code);
        let limits = Limits::default();
        let h = host(1000);
        let outcome = run_round(&mut m, &h, &limits).unwrap();
        assert_eq!(outcome, RoundOutcome::Completed);
        assert!(m.is_finished());
        assert!(!m.had_fatal_error());
    }
}
