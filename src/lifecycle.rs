//! Lifecycle opcode handlers: `FIN_IMD`, `STP_IMD`, `SLP_IMD`,
//! `SLP_DAT`, `SLP_VAL`, `FIZ_DAT`, `STZ_DAT`, `SET_PCS`, `ERR_ADR`.

use crate::consts::NO_ERROR_HANDLER;
use crate::error::Fault;
use crate::state::MachineState;

pub fn fin_imd(state: &mut MachineState) {
    state.set_finished();
}

/// `STP_IMD`: stop; the AT resumes, on its next round, at `on_stop_address`.
/// The jump is baked into `pc` now, since nothing in this round will observe
/// it before the round ends.
pub fn stp_imd(state: &mut MachineState) {
    state.set_pc(state.on_stop_address());
    state.set_stopped();
}

/// Sleep until `current_block_height + 1`.
pub fn slp_imd(state: &mut MachineState, current_block_height: u32) {
    state.set_sleep_until_height(current_block_height.saturating_add(1));
    state.set_sleeping();
}

/// Sleep until `current_block_height + n`.
pub fn slp_val(state: &mut MachineState, current_block_height: u32, n: i64) {
    let n = n.max(0) as u32;
    state.set_sleep_until_height(current_block_height.saturating_add(n));
    state.set_sleeping();
}

/// Sleep until the absolute block height stored at `$addr`.
pub fn slp_dat(state: &mut MachineState, addr: i32) -> Result<(), Fault> {
    let height = state.get_data_long(addr)?;
    state.set_sleep_until_height(height.max(0) as u32);
    state.set_sleeping();
    Ok(())
}

/// `FIZ_DAT $addr`: finish only if the addressed cell is zero.
pub fn fiz_dat(state: &mut MachineState, addr: i32) -> Result<(), Fault> {
    if state.get_data_long(addr)? == 0 {
        state.set_finished();
    }
    Ok(())
}

/// `STZ_DAT $addr`: stop (resuming at `on_stop_address`) only if the
/// addressed cell is zero.
pub fn stz_dat(state: &mut MachineState, addr: i32) -> Result<(), Fault> {
    if state.get_data_long(addr)? == 0 {
        state.set_pc(state.on_stop_address());
        state.set_stopped();
    }
    Ok(())
}

/// `SET_PCS`: record the resume point for a future `STZ_DAT` as the PC
/// immediately after this opcode's own encoding.
pub fn set_pcs(state: &mut MachineState, next_pc: u32) {
    state.set_on_stop_address(next_pc);
}

/// `ERR_ADR addr`: install (or, at the [`NO_ERROR_HANDLER`] sentinel, clear) the fault handler address.
///
/// `addr` is reinterpreted bit-for-bit as `u32` rather than range-checked:
/// the sentinel itself (`NO_ERROR_HANDLER` = `u32::MAX`) is only representable
/// as a `CODE_ADDR` operand by round-tripping through `-1i32`.
pub fn err_adr(state: &mut MachineState, addr: i32) -> Result<(), Fault> {
    let addr = addr as u32;
    if addr == NO_ERROR_HANDLER {
        state.set_on_error_address(None);
    } else {
        state.set_on_error_address(Some(addr));
    }
    Ok(())
}
