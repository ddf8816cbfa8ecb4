//! The read side of the compile/disassemble round-trip property: turns
//! raw code bytes back into mnemonic text, the inverse of [`crate::opcode`]'s
//! encoder-facing `from_mnemonic`.

use crate::decode::{decode, Operand};
use crate::error::Fault;

/// Disassembles the single instruction at `pc`, returning its text form and
/// encoded length (so a caller can advance to the next instruction).
pub fn disassemble_one(code: &[u8], pc: u32) -> Result<(String, usize), Fault> {
    let decoded = decode(code, pc)?;
    let mut out = decoded.opcode.mnemonic().to_string();
    for operand in decoded.operands() {
        out.push(' ');
        out.push_str(&format_operand(*operand));
    }
    Ok((out, decoded.len))
}

/// Disassembles an entire code segment into one line per instruction.
/// Stops, rather than failing the whole program, at the first byte that
/// cannot be decoded as an instruction (e.g. trailing padding); a program's
/// code segment has no explicit end-of-instructions marker besides running
/// out of valid opcodes.
pub fn disassemble_program(code: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pc = 0u32;
    while (pc as usize) < code.len() {
        match disassemble_one(code, pc) {
            Ok((line, len)) => {
                lines.push(line);
                pc += len as u32;
            }
            Err(_) => break,
        }
    }
    lines
}

fn format_operand(operand: Operand) -> String {
    match operand {
        Operand::Value(v) => format!("{v}"),
        Operand::CellIndex(v) => format!("@{v}"),
        Operand::CodeAddr(v) => format!("#{v:#x}"),
        Operand::Offset(v) => format!("{v:+}"),
        Operand::Func(v) => format!("FUNC={v:#06x}"),
    }
}
