//! Arithmetic, bitwise, and increment opcode handlers.
//!
//! Integer overflow wraps silently (two's-complement 64-bit) for ADD/SUB/MUL/
//! INC/DEC; shift amounts `>= 64` yield `0`; DIV/MOD by zero fault.

use crate::error::Fault;
use crate::state::MachineState;

/// `@a = @a ⊙ $b` for a cell-cell binary op (`*_DAT`), writing back into `a`.
pub fn apply_binary_dat(
    state: &mut MachineState,
    a_addr: i32,
    b_addr: i32,
    op: impl FnOnce(i64, i64) -> Result<i64, Fault>,
) -> Result<(), Fault> {
    let a = state.get_data_long(a_addr)?;
    let b = state.get_data_long(b_addr)?;
    let result = op(a, b)?;
    state.put_data_long(a_addr, result)
}

/// `@a = @a ⊙ value` for a cell-immediate binary op (`*_VAL`).
pub fn apply_binary_val(
    state: &mut MachineState,
    a_addr: i32,
    value: i64,
    op: impl FnOnce(i64, i64) -> Result<i64, Fault>,
) -> Result<(), Fault> {
    let a = state.get_data_long(a_addr)?;
    let result = op(a, value)?;
    state.put_data_long(a_addr, result)
}

pub fn add(a: i64, b: i64) -> Result<i64, Fault> {
    Ok(a.wrapping_add(b))
}

pub fn sub(a: i64, b: i64) -> Result<i64, Fault> {
    Ok(a.wrapping_sub(b))
}

pub fn mul(a: i64, b: i64) -> Result<i64, Fault> {
    Ok(a.wrapping_mul(b))
}

pub fn div(a: i64, b: i64) -> Result<i64, Fault> {
    if b == 0 {
        return Err(Fault::IllegalOperation);
    }
    Ok(a.wrapping_div(b))
}

pub fn rem(a: i64, b: i64) -> Result<i64, Fault> {
    if b == 0 {
        return Err(Fault::IllegalOperation);
    }
    Ok(a.wrapping_rem(b))
}

pub fn bor(a: i64, b: i64) -> Result<i64, Fault> {
    Ok(a | b)
}

pub fn band(a: i64, b: i64) -> Result<i64, Fault> {
    Ok(a & b)
}

pub fn bxor(a: i64, b: i64) -> Result<i64, Fault> {
    Ok(a ^ b)
}

/// Logical (zero-fill) left shift; amounts `>= 64` yield `0`.
pub fn shl(a: i64, amount: i64) -> Result<i64, Fault> {
    Ok(shift_amount(amount).map(|n| ((a as u64) << n) as i64).unwrap_or(0))
}

/// Logical (zero-fill) right shift; amounts `>= 64` yield `0`.
pub fn shr(a: i64, amount: i64) -> Result<i64, Fault> {
    Ok(shift_amount(amount).map(|n| ((a as u64) >> n) as i64).unwrap_or(0))
}

fn shift_amount(amount: i64) -> Option<u32> {
    if !(0..64).contains(&amount) {
        None
    } else {
        Some(amount as u32)
    }
}

pub fn not_dat(state: &mut MachineState, addr: i32) -> Result<(), Fault> {
    let value = state.get_data_long(addr)?;
    state.put_data_long(addr, !value)
}

pub fn inc_dat(state: &mut MachineState, addr: i32) -> Result<(), Fault> {
    let value = state.get_data_long(addr)?;
    state.put_data_long(addr, value.wrapping_add(1))
}

pub fn dec_dat(state: &mut MachineState, addr: i32) -> Result<(), Fault> {
    let value = state.get_data_long(addr)?;
    state.put_data_long(addr, value.wrapping_sub(1))
}

pub fn set_dat(state: &mut MachineState, dest: i32, src: i32) -> Result<(), Fault> {
    let value = state.get_data_long(src)?;
    state.put_data_long(dest, value)
}

pub fn set_val(state: &mut MachineState, dest: i32, value: i64) -> Result<(), Fault> {
    state.put_data_long(dest, value)
}

pub fn clr_dat(state: &mut MachineState, addr: i32) -> Result<(), Fault> {
    state.put_data_long(addr, 0)
}
