//! Operand decoding: turns the bytes following an opcode
//! tag into the fixed-size argument array its [`ParamKind`] schema declares.

use crate::codec::{read_i32, read_i64, read_i8, read_u16};
use crate::error::Fault;
use crate::opcode::{Opcode, ParamKind};

/// At most three operands are ever declared for one opcode (`SET_IDX`/
/// `IDX_DAT`, and the three-operand branches), a fixed-size array avoids an
/// allocation per decoded instruction on the hot path.
pub const MAX_OPERANDS: usize = 3;

/// One decoded operand, tagged by the kind that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Value(i64),
    CellIndex(i32),
    CodeAddr(i32),
    Offset(i8),
    Func(u16),
}

impl Operand {
    /// Unwraps a `CellIndex`/`CodeAddr` operand as `i32`; panics on mismatch
    /// (a dispatcher bug, since the schema fixes each slot's kind).
    pub fn as_i32(self) -> i32 {
        match self {
            Operand::CellIndex(v) | Operand::CodeAddr(v) => v,
            other => panic!("operand {other:?} is not an address/cell-index"),
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Operand::Value(v) => v,
            other => panic!("operand {other:?} is not a VALUE"),
        }
    }

    pub fn as_offset(self) -> i8 {
        match self {
            Operand::Offset(v) => v,
            other => panic!("operand {other:?} is not an OFFSET"),
        }
    }

    pub fn as_func(self) -> u16 {
        match self {
            Operand::Func(v) => v,
            other => panic!("operand {other:?} is not a FUNC"),
        }
    }
}

/// A decoded instruction: the opcode, its operands (schema-ordered), and the
/// total encoded length (tag byte included).
#[derive(Debug, Clone, Copy)]
pub struct Decoded {
    pub opcode: Opcode,
    pub operand_count: usize,
    pub operands: [Operand; MAX_OPERANDS],
    pub len: usize,
}

impl Decoded {
    pub fn operands(&self) -> &[Operand] {
        &self.operands[..self.operand_count]
    }
}

/// Decodes the instruction at `pc`: reads the tag byte, looks up its schema,
/// then reads each operand in order. Fails with [`Fault::CodeUnderflow`] if
/// the tag or any operand would run past the end of `code`. An unknown tag
/// byte fails with [`Fault::InvalidAddress`], since it cannot be resolved to
/// an opcode at all; the executor treats this identically to any other fatal
/// decode failure.
pub fn decode(code: &[u8], pc: u32) -> Result<Decoded, Fault> {
    let pc = pc as usize;
    let tag = *code.get(pc).ok_or(Fault::CodeUnderflow)?;
    let opcode = Opcode::from_byte(tag).ok_or(Fault::InvalidAddress)?;

    let mut operands = [Operand::Value(0); MAX_OPERANDS];
    let mut offset = pc + 1;
    for (slot, kind) in operands.iter_mut().zip(opcode.param_schema()) {
        *slot = decode_one(*kind, code, offset)?;
        offset += kind.width();
    }

    Ok(Decoded {
        opcode,
        operand_count: opcode.param_schema().len(),
        operands,
        len: opcode.encoded_len(),
    })
}

fn decode_one(kind: ParamKind, code: &[u8], offset: usize) -> Result<Operand, Fault> {
    Ok(match kind {
        ParamKind::Value => Operand::Value(read_i64(code, offset)?),
        ParamKind::CellIndex => Operand::CellIndex(read_i32(code, offset)?),
        ParamKind::CodeAddr => Operand::CodeAddr(read_i32(code, offset)?),
        ParamKind::Offset => Operand::Offset(read_i8(code, offset)?),
        ParamKind::Func => Operand::Func(read_u16(code, offset)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_two_cell_index_instruction() {
        let mut code = vec![0x04u8]; // ADD_DAT
        code.extend_from_slice(&3i32.to_be_bytes());
        code.extend_from_slice(&7i32.to_be_bytes());
        let decoded = decode(&code, 0).unwrap();
        assert_eq!(decoded.operands()[0].as_i32(), 3);
        assert_eq!(decoded.operands()[1].as_i32(), 7);
        assert_eq!(decoded.len, 9);
    }

    #[test]
    fn unknown_opcode_byte_faults() {
        let code = [0xFFu8];
        assert!(matches!(decode(&code, 0), Err(Fault::InvalidAddress)));
    }

    #[test]
    fn truncated_operand_is_code_underflow() {
        let code = [0x04u8, 0x00, 0x00]; // ADD_DAT with too few operand bytes
        assert!(matches!(decode(&code, 0), Err(Fault::CodeUnderflow)));
    }
}
