//! The write side of the compile/disassemble round-trip: turns a
//! mnemonic plus operands into bytecode, performing the encode-time
//! validations the executor itself never performs: compilation errors
//! surface only through the encoder/disassembler API and never reach the
//! executor.
//!
//! Pairs with [`crate::disassemble`]: [`assemble_text`] parses exactly the
//! token format [`crate::disassemble::disassemble_one`] produces, so
//! `disassemble_one(assemble_text(s)?) == s` for any well-formed `s`.

use crate::codec::{write_i32, write_i64, write_i8, write_u16};
use crate::error::CompileError;
use crate::function_code::{self, FunctionCode};
use crate::opcode::{Opcode, ParamKind};

/// One operand as supplied to the assembler, before it is narrowed to the
/// width its `ParamKind` slot declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmOperand {
    Value(i64),
    CellIndex(i32),
    CodeAddr(i32),
    /// A branch distance, still in full width; narrowed to `i8` (or
    /// rejected as [`CompileError::OffsetTooWide`]) during assembly.
    Offset(i32),
    Func(u16),
}

/// Assembles one instruction from its opcode and already-typed operands,
/// validating operand count, branch-offset width, and, for `EXT_FUN*`
/// opcodes, the function code's declared `(arity, returns_value)` shape
/// against what the opcode itself declares.
pub fn assemble_instruction(opcode: Opcode, operands: &[AsmOperand]) -> Result<Vec<u8>, CompileError> {
    let schema = opcode.param_schema();
    if operands.len() != schema.len() {
        return Err(CompileError::WrongArity);
    }

    if let Some((arity, returns)) = opcode.ext_fun_shape() {
        let AsmOperand::Func(raw) = operands[0] else {
            panic!("ext-fun opcode's first schema slot is always Func");
        };
        if function_code::is_core(raw) {
            let code = FunctionCode::from_raw(raw).ok_or(CompileError::UnknownFunctionCode)?;
            let (decl_arity, decl_returns) = code.shape();
            if decl_arity != arity {
                return Err(CompileError::WrongArity);
            }
            if decl_returns != returns {
                return Err(CompileError::WrongReturnShape);
            }
        }
        // Platform codes (>= 0x0100) are validated by the host at execute
        // time (`platform_specific_pre_execute_check`); the encoder has no
        // visibility into the host's function-code registry.
    }

    let mut out = vec![opcode.to_byte()];
    for (operand, kind) in operands.iter().zip(schema) {
        encode_operand(&mut out, *operand, *kind)?;
    }
    Ok(out)
}

fn encode_operand(out: &mut Vec<u8>, operand: AsmOperand, kind: ParamKind) -> Result<(), CompileError> {
    match (operand, kind) {
        (AsmOperand::Value(v), ParamKind::Value) => write_i64(out, v),
        (AsmOperand::CellIndex(v), ParamKind::CellIndex) => write_i32(out, v),
        (AsmOperand::CodeAddr(v), ParamKind::CodeAddr) => write_i32(out, v),
        (AsmOperand::Func(v), ParamKind::Func) => write_u16(out, v),
        (AsmOperand::Offset(v), ParamKind::Offset) => {
            let narrowed = i8::try_from(v).map_err(|_| CompileError::OffsetTooWide)?;
            write_i8(out, narrowed);
        }
        (operand, kind) => panic!("operand {operand:?} does not match schema slot {kind:?}"),
    }
    Ok(())
}

/// Parses one disassembled line back into bytes, the inverse of
/// [`crate::disassemble::disassemble_one`]'s text format: re-compiling
/// that string yields the same bytes.
pub fn assemble_text(line: &str) -> Result<Vec<u8>, CompileError> {
    let mut tokens = line.split_whitespace();
    let mnemonic = tokens.next().ok_or(CompileError::UnknownMnemonic)?;
    let opcode = Opcode::from_mnemonic(mnemonic)?;
    let schema = opcode.param_schema();

    let mut operands = Vec::with_capacity(schema.len());
    for (token, kind) in tokens.by_ref().zip(schema) {
        operands.push(parse_operand(token, *kind)?);
    }
    if tokens.next().is_some() {
        return Err(CompileError::WrongArity);
    }
    assemble_instruction(opcode, &operands)
}

fn parse_operand(token: &str, kind: ParamKind) -> Result<AsmOperand, CompileError> {
    match kind {
        ParamKind::Value => token
            .parse()
            .map(AsmOperand::Value)
            .map_err(|_| CompileError::UnknownMnemonic),
        ParamKind::CellIndex => token
            .trim_start_matches('@')
            .parse()
            .map(AsmOperand::CellIndex)
            .map_err(|_| CompileError::UnknownMnemonic),
        ParamKind::CodeAddr => {
            // Disassembly prints a `CodeAddr` via `{v:#x}`, which (like every
            // signed-integer `LowerHex` impl) renders the value's two's
            // complement bit pattern rather than a leading `-`; parse back the
            // same way, as an unsigned bit pattern, not a signed literal.
            let hex = token.trim_start_matches('#').trim_start_matches("0x");
            u32::from_str_radix(hex, 16)
                .map(|bits| AsmOperand::CodeAddr(bits as i32))
                .map_err(|_| CompileError::UnknownMnemonic)
        }
        ParamKind::Offset => token
            .parse()
            .map(AsmOperand::Offset)
            .map_err(|_| CompileError::OffsetTooWide),
        ParamKind::Func => {
            let hex = token.trim_start_matches("FUNC=0x");
            u16::from_str_radix(hex, 16)
                .map(AsmOperand::Func)
                .map_err(|_| CompileError::UnknownFunctionCode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disassemble::disassemble_one;

    #[test]
    fn assembles_a_simple_instruction() {
        let bytes = assemble_instruction(
            Opcode::ADD_VAL,
            &[AsmOperand::CellIndex(3), AsmOperand::Value(10)],
        )
        .unwrap();
        let mut expected = vec![0x09u8];
        expected.extend_from_slice(&3i32.to_be_bytes());
        expected.extend_from_slice(&10i64.to_be_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn wrong_operand_count_is_wrong_arity() {
        let err = assemble_instruction(Opcode::ADD_VAL, &[AsmOperand::CellIndex(3)]).unwrap_err();
        assert_eq!(err, CompileError::WrongArity);
    }

    #[test]
    fn branch_offset_out_of_i8_range_is_rejected() {
        let err = assemble_instruction(
            Opcode::BZR_DAT,
            &[AsmOperand::CellIndex(0), AsmOperand::Offset(200)],
        )
        .unwrap_err();
        assert_eq!(err, CompileError::OffsetTooWide);
    }

    #[test]
    fn ext_fun_opcode_function_code_arity_mismatch_is_wrong_arity() {
        // SET_B_IND (core function code, arity 1, no return) encoded under
        // EXT_FUN_RET (arity 0, returns).
        let err = assemble_instruction(
            Opcode::EXT_FUN_RET,
            &[AsmOperand::Func(FunctionCode::SetBInd.raw())],
        )
        .unwrap_err();
        assert_eq!(err, CompileError::WrongArity);
    }

    #[test]
    fn unknown_core_function_code_is_rejected_at_encode_time() {
        let err = assemble_instruction(Opcode::EXT_FUN, &[AsmOperand::Func(0x00AA)]).unwrap_err();
        assert_eq!(err, CompileError::UnknownFunctionCode);
    }

    #[test]
    fn platform_function_code_passes_encode_time_validation() {
        // >= 0x0100 is the host's table, not ours; the encoder only checks core codes.
        let bytes = assemble_instruction(Opcode::EXT_FUN_DAT, &[AsmOperand::Func(0x0501), AsmOperand::CellIndex(0)]).unwrap();
        assert_eq!(bytes[0], Opcode::EXT_FUN_DAT.to_byte());
    }

    #[test]
    fn disassemble_then_assemble_round_trips_bytes() {
        let mut code = vec![Opcode::ADD_VAL.to_byte()];
        code.extend_from_slice(&7i32.to_be_bytes());
        code.extend_from_slice(&(-4i64).to_be_bytes());

        let (line, len) = disassemble_one(&code, 0).unwrap();
        assert_eq!(len, code.len());
        let reassembled = assemble_text(&line).unwrap();
        assert_eq!(reassembled, code);
    }

    #[test]
    fn disassemble_then_assemble_round_trips_branch_and_func_forms() {
        let mut code = vec![Opcode::BNZ_DAT.to_byte()];
        code.extend_from_slice(&2i32.to_be_bytes());
        code.push((-5i8) as u8);
        let (line, _) = disassemble_one(&code, 0).unwrap();
        assert_eq!(assemble_text(&line).unwrap(), code);

        let mut code2 = vec![Opcode::EXT_FUN_RET.to_byte()];
        code2.extend_from_slice(&FunctionCode::UnsignedCompareAWithB.raw().to_be_bytes());
        let (line2, _) = disassemble_one(&code2, 0).unwrap();
        assert_eq!(assemble_text(&line2).unwrap(), code2);
    }
}
