//! Opcode dispatch: decodes one instruction and routes it to the
//! handler module that owns its semantics (`alu`, `indirect`, `stack`,
//! `flow`, `lifecycle`, or `function_code`), then advances `pc`.
//!
//! Mirrors `fuel-vm`'s `executors/instruction.rs`: one big `match` over the
//! opcode tag, pure handler functions underneath, no per-opcode trait object
//! or closure indirection.

use crate::decode::{decode, Decoded, Operand};
use crate::error::Fault;
use crate::function_code::{self, FunctionCode};
use crate::host::HostInterface;
use crate::opcode::Opcode;
use crate::state::MachineState;
use crate::{alu, flow, indirect, lifecycle, stack};

/// Decodes and executes exactly one instruction, leaving `pc` pointing at
/// whatever should run next (the normal fallthrough, a taken branch/jump
/// target, or a lifecycle stop redirect). Returns the step cost is the
/// caller's job to look up (via `host.op_code_steps`); this only executes.
pub fn step<H: HostInterface>(state: &mut MachineState, host: &H) -> Result<Opcode, Fault> {
    let pc_pre = state.pc();
    let decoded = decode(state.code(), pc_pre)?;
    let fallthrough = pc_pre
        .checked_add(decoded.len as u32)
        .ok_or(Fault::InvalidAddress)?;

    dispatch(state, host, pc_pre, fallthrough, &decoded)?;
    Ok(decoded.opcode)
}

fn dispatch<H: HostInterface>(
    state: &mut MachineState,
    host: &H,
    pc_pre: u32,
    fallthrough: u32,
    decoded: &Decoded,
) -> Result<(), Fault> {
    let ops = decoded.operands();

    match decoded.opcode {
        Opcode::NOP => {
            state.set_pc(fallthrough);
        }

        // ---- immediate / data move -----------------------------------
        Opcode::SET_VAL => {
            alu::set_val(state, ops[0].as_i32(), ops[1].as_i64())?;
            state.set_pc(fallthrough);
        }
        Opcode::SET_DAT => {
            alu::set_dat(state, ops[0].as_i32(), ops[1].as_i32())?;
            state.set_pc(fallthrough);
        }
        Opcode::CLR_DAT => {
            alu::clr_dat(state, ops[0].as_i32())?;
            state.set_pc(fallthrough);
        }

        // ---- arithmetic (cell-cell) -----------------------------------
        Opcode::ADD_DAT => {
            alu::apply_binary_dat(state, ops[0].as_i32(), ops[1].as_i32(), alu::add)?;
            state.set_pc(fallthrough);
        }
        Opcode::SUB_DAT => {
            alu::apply_binary_dat(state, ops[0].as_i32(), ops[1].as_i32(), alu::sub)?;
            state.set_pc(fallthrough);
        }
        Opcode::MUL_DAT => {
            alu::apply_binary_dat(state, ops[0].as_i32(), ops[1].as_i32(), alu::mul)?;
            state.set_pc(fallthrough);
        }
        Opcode::DIV_DAT => {
            alu::apply_binary_dat(state, ops[0].as_i32(), ops[1].as_i32(), alu::div)?;
            state.set_pc(fallthrough);
        }
        Opcode::MOD_DAT => {
            alu::apply_binary_dat(state, ops[0].as_i32(), ops[1].as_i32(), alu::rem)?;
            state.set_pc(fallthrough);
        }

        // ---- arithmetic (cell-immediate) -------------------------------
        Opcode::ADD_VAL => {
            alu::apply_binary_val(state, ops[0].as_i32(), ops[1].as_i64(), alu::add)?;
            state.set_pc(fallthrough);
        }
        Opcode::SUB_VAL => {
            alu::apply_binary_val(state, ops[0].as_i32(), ops[1].as_i64(), alu::sub)?;
            state.set_pc(fallthrough);
        }
        Opcode::MUL_VAL => {
            alu::apply_binary_val(state, ops[0].as_i32(), ops[1].as_i64(), alu::mul)?;
            state.set_pc(fallthrough);
        }
        Opcode::DIV_VAL => {
            alu::apply_binary_val(state, ops[0].as_i32(), ops[1].as_i64(), alu::div)?;
            state.set_pc(fallthrough);
        }
        Opcode::SHL_VAL => {
            alu::apply_binary_val(state, ops[0].as_i32(), ops[1].as_i64(), alu::shl)?;
            state.set_pc(fallthrough);
        }
        Opcode::SHR_VAL => {
            alu::apply_binary_val(state, ops[0].as_i32(), ops[1].as_i64(), alu::shr)?;
            state.set_pc(fallthrough);
        }

        // ---- bitwise ----------------------------------------------------
        Opcode::BOR_DAT => {
            alu::apply_binary_dat(state, ops[0].as_i32(), ops[1].as_i32(), alu::bor)?;
            state.set_pc(fallthrough);
        }
        Opcode::AND_DAT => {
            alu::apply_binary_dat(state, ops[0].as_i32(), ops[1].as_i32(), alu::band)?;
            state.set_pc(fallthrough);
        }
        Opcode::XOR_DAT => {
            alu::apply_binary_dat(state, ops[0].as_i32(), ops[1].as_i32(), alu::bxor)?;
            state.set_pc(fallthrough);
        }
        Opcode::NOT_DAT => {
            alu::not_dat(state, ops[0].as_i32())?;
            state.set_pc(fallthrough);
        }
        Opcode::SHL_DAT => {
            alu::apply_binary_dat(state, ops[0].as_i32(), ops[1].as_i32(), alu::shl)?;
            state.set_pc(fallthrough);
        }
        Opcode::SHR_DAT => {
            alu::apply_binary_dat(state, ops[0].as_i32(), ops[1].as_i32(), alu::shr)?;
            state.set_pc(fallthrough);
        }

        // ---- increment ----------------------------------------------------
        Opcode::INC_DAT => {
            alu::inc_dat(state, ops[0].as_i32())?;
            state.set_pc(fallthrough);
        }
        Opcode::DEC_DAT => {
            alu::dec_dat(state, ops[0].as_i32())?;
            state.set_pc(fallthrough);
        }

        // ---- indirect -----------------------------------------------------
        Opcode::SET_IND => {
            indirect::set_ind(state, ops[0].as_i32(), ops[1].as_i32())?;
            state.set_pc(fallthrough);
        }
        Opcode::SET_IDX => {
            indirect::set_idx(state, ops[0].as_i32(), ops[1].as_i32(), ops[2].as_i32())?;
            state.set_pc(fallthrough);
        }
        Opcode::IND_DAT => {
            indirect::ind_dat(state, ops[0].as_i32(), ops[1].as_i32())?;
            state.set_pc(fallthrough);
        }
        Opcode::IDX_DAT => {
            indirect::idx_dat(state, ops[0].as_i32(), ops[1].as_i32(), ops[2].as_i32())?;
            state.set_pc(fallthrough);
        }

        // ---- stack -----------------------------------------------------
        Opcode::PSH_DAT => {
            stack::psh_dat(state, ops[0].as_i32())?;
            state.set_pc(fallthrough);
        }
        Opcode::POP_DAT => {
            stack::pop_dat(state, ops[0].as_i32())?;
            state.set_pc(fallthrough);
        }

        // ---- call / jump -----------------------------------------------
        Opcode::JMP_SUB => {
            let target = flow::jmp_sub(state, ops[0].as_i32(), fallthrough)?;
            state.set_pc(target);
        }
        Opcode::RET_SUB => {
            let target = flow::ret_sub(state)?;
            state.set_pc(target);
        }
        Opcode::JMP_ADR => {
            let target = flow::jmp_adr(state, ops[0].as_i32())?;
            state.set_pc(target);
        }

        // ---- branches -----------------------------------------------------
        Opcode::BZR_DAT => {
            let a = state.get_data_long(ops[0].as_i32())?;
            let target = flow::resolve_branch(state, pc_pre, ops[1].as_offset(), flow::cond::zero(a), fallthrough)?;
            state.set_pc(target);
        }
        Opcode::BNZ_DAT => {
            let a = state.get_data_long(ops[0].as_i32())?;
            let target = flow::resolve_branch(state, pc_pre, ops[1].as_offset(), flow::cond::not_zero(a), fallthrough)?;
            state.set_pc(target);
        }
        Opcode::BGT_DAT => {
            let (a, b) = (state.get_data_long(ops[0].as_i32())?, state.get_data_long(ops[1].as_i32())?);
            let target = flow::resolve_branch(state, pc_pre, ops[2].as_offset(), flow::cond::gt(a, b), fallthrough)?;
            state.set_pc(target);
        }
        Opcode::BLT_DAT => {
            let (a, b) = (state.get_data_long(ops[0].as_i32())?, state.get_data_long(ops[1].as_i32())?);
            let target = flow::resolve_branch(state, pc_pre, ops[2].as_offset(), flow::cond::lt(a, b), fallthrough)?;
            state.set_pc(target);
        }
        Opcode::BGE_DAT => {
            let (a, b) = (state.get_data_long(ops[0].as_i32())?, state.get_data_long(ops[1].as_i32())?);
            let target = flow::resolve_branch(state, pc_pre, ops[2].as_offset(), flow::cond::ge(a, b), fallthrough)?;
            state.set_pc(target);
        }
        Opcode::BLE_DAT => {
            let (a, b) = (state.get_data_long(ops[0].as_i32())?, state.get_data_long(ops[1].as_i32())?);
            let target = flow::resolve_branch(state, pc_pre, ops[2].as_offset(), flow::cond::le(a, b), fallthrough)?;
            state.set_pc(target);
        }
        Opcode::BEQ_DAT => {
            let (a, b) = (state.get_data_long(ops[0].as_i32())?, state.get_data_long(ops[1].as_i32())?);
            let target = flow::resolve_branch(state, pc_pre, ops[2].as_offset(), flow::cond::eq(a, b), fallthrough)?;
            state.set_pc(target);
        }
        Opcode::BNE_DAT => {
            let (a, b) = (state.get_data_long(ops[0].as_i32())?, state.get_data_long(ops[1].as_i32())?);
            let target = flow::resolve_branch(state, pc_pre, ops[2].as_offset(), flow::cond::ne(a, b), fallthrough)?;
            state.set_pc(target);
        }

        // ---- lifecycle -----------------------------------------------------
        Opcode::FIN_IMD => {
            state.set_pc(fallthrough);
            lifecycle::fin_imd(state);
        }
        Opcode::STP_IMD => {
            state.set_pc(fallthrough);
            lifecycle::stp_imd(state);
        }
        Opcode::SLP_IMD => {
            state.set_pc(fallthrough);
            lifecycle::slp_imd(state, host.current_block_height());
        }
        Opcode::SLP_DAT => {
            state.set_pc(fallthrough);
            lifecycle::slp_dat(state, ops[0].as_i32())?;
        }
        Opcode::SLP_VAL => {
            state.set_pc(fallthrough);
            lifecycle::slp_val(state, host.current_block_height(), ops[0].as_i64());
        }
        Opcode::FIZ_DAT => {
            state.set_pc(fallthrough);
            lifecycle::fiz_dat(state, ops[0].as_i32())?;
        }
        Opcode::STZ_DAT => {
            state.set_pc(fallthrough);
            lifecycle::stz_dat(state, ops[0].as_i32())?;
        }
        Opcode::SET_PCS => {
            lifecycle::set_pcs(state, fallthrough);
            state.set_pc(fallthrough);
        }
        Opcode::ERR_ADR => {
            lifecycle::err_adr(state, ops[0].as_i32())?;
            state.set_pc(fallthrough);
        }

        // ---- ext-fun -----------------------------------------------------
        Opcode::EXT_FUN | Opcode::EXT_FUN_DAT | Opcode::EXT_FUN_DAT_2 | Opcode::EXT_FUN_VAL
        | Opcode::EXT_FUN_RET | Opcode::EXT_FUN_RET_DAT | Opcode::EXT_FUN_RET_DAT_2 => {
            dispatch_ext_fun(state, host, decoded)?;
            state.set_pc(fallthrough);
        }
    }
    Ok(())
}

fn dispatch_ext_fun<H: HostInterface>(state: &mut MachineState, host: &H, decoded: &Decoded) -> Result<(), Fault> {
    let ops = decoded.operands();
    let raw_func = ops[0].as_func();
    let (arity, returns) = decoded
        .opcode
        .ext_fun_shape()
        .expect("ext-fun opcode always declares a shape");
    let call_args = &ops[1..];
    debug_assert_eq!(call_args.len(), arity as usize);

    if function_code::is_core(raw_func) {
        let code = FunctionCode::from_raw(raw_func).ok_or(Fault::IllegalFunctionCode)?;
        if code.shape() != (arity, returns) {
            return Err(Fault::IllegalFunctionCode);
        }
        let args: Vec<i32> = call_args.iter().map(|op| op.as_i32()).collect();
        let result = function_code::execute(code, &args, state, host)?;
        apply_return(state, returns, result)
    } else {
        let function_data: Vec<i64> = call_args
            .iter()
            .map(|op| operand_as_i64(op, state))
            .collect::<Result<Vec<_>, _>>()?;
        let accepted = host
            .platform_specific_pre_execute_check(arity, returns, state, raw_func)
            .map_err(|_| Fault::IllegalFunctionCode)?;
        if !accepted {
            return Err(Fault::IllegalFunctionCode);
        }
        let result = host
            .platform_specific_post_check_execute(&function_data, state, raw_func)
            .map_err(|_| Fault::IllegalFunctionCode)?;
        apply_return(state, returns, result)
    }
}

/// Resolves an ext-fun call argument to the value a platform handler receives.
/// `Value` operands already carry the value; `CellIndex` operands name a data
/// cell and are dereferenced, so `EXT_FUN_DAT`/`EXT_FUN_DAT_2` deliver the same
/// kind of thing `EXT_FUN_VAL` does.
fn operand_as_i64(op: &Operand, state: &MachineState) -> Result<i64, Fault> {
    match *op {
        Operand::Value(v) => Ok(v),
        Operand::CellIndex(addr) => state.get_data_long(addr),
        Operand::CodeAddr(v) => Ok(v as i64),
        Operand::Offset(v) => Ok(v as i64),
        Operand::Func(v) => Ok(v as i64),
    }
}

fn apply_return(state: &mut MachineState, returns: bool, result: Option<i64>) -> Result<(), Fault> {
    match (returns, result) {
        (true, Some(value)) => state.push_user(value),
        (false, None) => Ok(()),
        // A handler's own return shape disagreeing with the opcode's declared
        // shape is an internal bug, not a runtime fault an AT can trigger:
        // `execute`/platform dispatch above already validated the shape.
        _ => unreachable!("function-code handler returned a shape mismatching its declaration"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::test_helpers::NullHost;

    fn program(bytes: &[u8]) -> MachineState {
        MachineState::new(bytes.to_vec(), 64, 32, 32, 0)
    }

    #[test]
    fn set_val_then_add_val_executes_in_sequence() {
        let mut code = vec![0x01u8]; // SET_VAL @0 = 10
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&10i64.to_be_bytes());
        code.push(0x09); // ADD_VAL @0 += 5
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&5i64.to_be_bytes());
        code.push(0x28); // FIN_IMD

        let mut m = program(&code);
        let host = NullHost::default();
        step(&mut m, &host).unwrap();
        step(&mut m, &host).unwrap();
        assert_eq!(m.get_data_long(0).unwrap(), 15);
        step(&mut m, &host).unwrap();
        assert!(m.is_finished());
    }

    #[test]
    fn untaken_branch_falls_through_to_next_instruction() {
        let mut code = vec![0x20u8]; // BZR_DAT @0, offset
        code.extend_from_slice(&0i32.to_be_bytes());
        code.push(0); // offset irrelevant, not taken
        code.push(0x28); // FIN_IMD at the fallthrough
        let mut m = program(&code);
        m.put_data_long(0, 7).unwrap(); // non-zero: branch not taken
        let host = NullHost::default();
        let op = step(&mut m, &host).unwrap();
        assert_eq!(op, Opcode::BZR_DAT);
        assert_eq!(m.pc(), 6);
    }

    #[test]
    fn stz_dat_redirects_pc_to_on_stop_address_when_zero() {
        let mut code = vec![0x2Fu8]; // SET_PCS (on_stop_address = pc after this = 1)
        code.push(0x2E); // STZ_DAT @0
        code.extend_from_slice(&0i32.to_be_bytes());
        code.push(0x28); // FIN_IMD, never reached if stop redirects to pc=1... adjust below
        let mut m = program(&code);
        m.put_data_long(0, 0).unwrap();
        let host = NullHost::default();
        step(&mut m, &host).unwrap(); // SET_PCS
        step(&mut m, &host).unwrap(); // STZ_DAT, cell is zero -> stop, pc redirected
        assert!(m.is_stopped());
        assert_eq!(m.pc(), m.on_stop_address());
    }

    #[test]
    fn unknown_core_function_code_is_illegal() {
        let mut code = vec![0x31u8]; // EXT_FUN FUNC=0x00AA, unmapped in the core range
        code.extend_from_slice(&0x00AAu16.to_be_bytes());
        let mut m = program(&code);
        let host = NullHost::default();
        assert!(matches!(step(&mut m, &host), Err(Fault::IllegalFunctionCode)));
    }

    #[test]
    fn ext_fun_ret_pushes_compare_result_onto_user_stack() {
        let mut code = vec![0x35u8]; // EXT_FUN_RET FUNC=UnsignedCompareAWithB
        code.extend_from_slice(&FunctionCode::UnsignedCompareAWithB.raw().to_be_bytes());
        let mut m = program(&code);
        let host = NullHost::default();
        step(&mut m, &host).unwrap();
        assert_eq!(m.pop_user().unwrap(), 0);
    }
}
