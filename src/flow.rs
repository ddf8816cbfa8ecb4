//! Jump, call/return, and branch opcode handlers.
//!
//! Branch targets use `PC_pre` (the byte position of the branch opcode
//! itself, not the PC after decoding it) as their basis. Call/return
//! and absolute jump targets are validated to lie within the code segment;
//! an out-of-range target is [`Fault::InvalidAddress`].

use crate::error::Fault;
use crate::state::MachineState;

fn check_code_addr(target: i32, code_len: usize) -> Result<u32, Fault> {
    if target < 0 || target as usize >= code_len {
        return Err(Fault::InvalidAddress);
    }
    Ok(target as u32)
}

/// `JMP_ADR addr`: unconditional jump to an absolute code address.
pub fn jmp_adr(state: &MachineState, target: i32) -> Result<u32, Fault> {
    check_code_addr(target, state.code().len())
}

/// `JMP_SUB addr`: push the return PC (`return_pc`, already advanced past
/// this instruction) and jump to `addr`.
pub fn jmp_sub(state: &mut MachineState, target: i32, return_pc: u32) -> Result<u32, Fault> {
    let dest = check_code_addr(target, state.code().len())?;
    state.push_call(return_pc)?;
    Ok(dest)
}

/// `RET_SUB`: pop a return address off the call stack and jump to it.
pub fn ret_sub(state: &mut MachineState) -> Result<u32, Fault> {
    let dest = state.pop_call()?;
    check_code_addr(dest as i32, state.code().len())
}

/// Evaluates a branch: if `taken`, the new PC is `pc_pre + offset`
/// (bounds-checked); otherwise the new PC is `fallthrough_pc` (the normal
/// post-decode advance).
pub fn resolve_branch(
    state: &MachineState,
    pc_pre: u32,
    offset: i8,
    taken: bool,
    fallthrough_pc: u32,
) -> Result<u32, Fault> {
    if !taken {
        return Ok(fallthrough_pc);
    }
    let target = (pc_pre as i64)
        .checked_add(offset as i64)
        .ok_or(Fault::InvalidAddress)?;
    let target = i32::try_from(target).map_err(|_| Fault::InvalidAddress)?;
    check_code_addr(target, state.code().len())
}

/// Signed 64-bit comparison predicates used to decide whether a branch is taken.
pub mod cond {
    pub fn zero(a: i64) -> bool {
        a == 0
    }
    pub fn not_zero(a: i64) -> bool {
        a != 0
    }
    pub fn gt(a: i64, b: i64) -> bool {
        a > b
    }
    pub fn lt(a: i64, b: i64) -> bool {
        a < b
    }
    pub fn ge(a: i64, b: i64) -> bool {
        a >= b
    }
    pub fn le(a: i64, b: i64) -> bool {
        a <= b
    }
    pub fn eq(a: i64, b: i64) -> bool {
        a == b
    }
    pub fn ne(a: i64, b: i64) -> bool {
        a != b
    }
}
