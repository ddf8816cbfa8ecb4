//! The opcode table: one entry per mnemonic, its parameter schema, and
//! the byte value it is assigned. Byte values are dense, starting at `0x00`,
//! grouped by instruction category, fixing the encoding so two
//! implementations built from this crate assign identical opcode numbers.

use crate::error::CompileError;

/// The shape of a single decoded parameter. Several of the named parameter
/// kinds (`DEST_ADDR`, `SRC_ADDR`, `INDIRECT_*`, `INDEX`,
/// `BLOCK_HEIGHT`) share one physical encoding, a 32-bit cell index, and so
/// collapse to [`ParamKind::CellIndex`] here; only their semantic role
/// differs, and that role is documented on each opcode instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// A signed 64-bit immediate (`VALUE`). Encoded as 8 bytes.
    Value,
    /// A 32-bit data-segment cell index. Encoded as 4 bytes.
    CellIndex,
    /// A 32-bit byte offset into the code segment (`CODE_ADDR`). Encoded as 4 bytes.
    CodeAddr,
    /// A signed 8-bit branch offset relative to the pre-opcode PC (`OFFSET`).
    Offset,
    /// A 16-bit function code (`FUNC`).
    Func,
}

impl ParamKind {
    /// Width in bytes of this parameter's encoding.
    pub const fn width(self) -> usize {
        match self {
            ParamKind::Value => 8,
            ParamKind::CellIndex => 4,
            ParamKind::CodeAddr => 4,
            ParamKind::Offset => 1,
            ParamKind::Func => 2,
        }
    }
}

macro_rules! opcode_table {
    ($( $byte:literal => $name:ident [$($param:ident),*] ),+ $(,)?) => {
        /// One tag per mnemonic in the bytecode ISA.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(u8)]
        pub enum Opcode {
            $( $name = $byte, )+
        }

        impl Opcode {
            /// Decodes an opcode tag byte, failing on unknown bytes.
            pub const fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $( $byte => Some(Self::$name), )+
                    _ => None,
                }
            }

            /// The opcode tag byte.
            pub const fn to_byte(self) -> u8 {
                self as u8
            }

            /// The mnemonic, as it appears in disassembly.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name), )+
                }
            }

            /// Looks up an opcode by its mnemonic (used by the encoder/disassembler).
            pub fn from_mnemonic(name: &str) -> Result<Self, CompileError> {
                match name {
                    $( stringify!($name) => Ok(Self::$name), )+
                    _ => Err(CompileError::UnknownMnemonic),
                }
            }

            /// The ordered parameter schema for this opcode.
            pub const fn param_schema(self) -> &'static [ParamKind] {
                match self {
                    $( Self::$name => &[$(ParamKind::$param),*], )+
                }
            }
        }
    };
}

opcode_table! {
    // Nop / immediate set
    0x00 => NOP [],
    0x01 => SET_VAL [CellIndex, Value],
    0x02 => SET_DAT [CellIndex, CellIndex],
    0x03 => CLR_DAT [CellIndex],

    // Arithmetic (data)
    0x04 => ADD_DAT [CellIndex, CellIndex],
    0x05 => SUB_DAT [CellIndex, CellIndex],
    0x06 => MUL_DAT [CellIndex, CellIndex],
    0x07 => DIV_DAT [CellIndex, CellIndex],
    0x08 => MOD_DAT [CellIndex, CellIndex],

    // Arithmetic (value)
    0x09 => ADD_VAL [CellIndex, Value],
    0x0A => SUB_VAL [CellIndex, Value],
    0x0B => MUL_VAL [CellIndex, Value],
    0x0C => DIV_VAL [CellIndex, Value],
    0x0D => SHL_VAL [CellIndex, Value],
    0x0E => SHR_VAL [CellIndex, Value],

    // Bitwise
    0x0F => BOR_DAT [CellIndex, CellIndex],
    0x10 => AND_DAT [CellIndex, CellIndex],
    0x11 => XOR_DAT [CellIndex, CellIndex],
    0x12 => NOT_DAT [CellIndex],
    0x13 => SHL_DAT [CellIndex, CellIndex],
    0x14 => SHR_DAT [CellIndex, CellIndex],

    // Increment
    0x15 => INC_DAT [CellIndex],
    0x16 => DEC_DAT [CellIndex],

    // Indirect
    0x17 => SET_IND [CellIndex, CellIndex],
    0x18 => SET_IDX [CellIndex, CellIndex, CellIndex],
    0x19 => IND_DAT [CellIndex, CellIndex],
    0x1A => IDX_DAT [CellIndex, CellIndex, CellIndex],

    // Stack
    0x1B => PSH_DAT [CellIndex],
    0x1C => POP_DAT [CellIndex],

    // Call / ret
    0x1D => JMP_SUB [CodeAddr],
    0x1E => RET_SUB [],

    // Jump
    0x1F => JMP_ADR [CodeAddr],

    // Branches
    0x20 => BZR_DAT [CellIndex, Offset],
    0x21 => BNZ_DAT [CellIndex, Offset],
    0x22 => BGT_DAT [CellIndex, CellIndex, Offset],
    0x23 => BLT_DAT [CellIndex, CellIndex, Offset],
    0x24 => BGE_DAT [CellIndex, CellIndex, Offset],
    0x25 => BLE_DAT [CellIndex, CellIndex, Offset],
    0x26 => BEQ_DAT [CellIndex, CellIndex, Offset],
    0x27 => BNE_DAT [CellIndex, CellIndex, Offset],

    // Lifecycle
    0x28 => FIN_IMD [],
    0x29 => STP_IMD [],
    0x2A => SLP_IMD [],
    0x2B => SLP_DAT [CellIndex],
    0x2C => SLP_VAL [Value],
    0x2D => FIZ_DAT [CellIndex],
    0x2E => STZ_DAT [CellIndex],
    0x2F => SET_PCS [],
    0x30 => ERR_ADR [CodeAddr],

    // Ext-fun
    0x31 => EXT_FUN [Func],
    0x32 => EXT_FUN_DAT [Func, CellIndex],
    0x33 => EXT_FUN_DAT_2 [Func, CellIndex, CellIndex],
    0x34 => EXT_FUN_VAL [Func, Value],
    0x35 => EXT_FUN_RET [Func],
    0x36 => EXT_FUN_RET_DAT [Func, CellIndex],
    0x37 => EXT_FUN_RET_DAT_2 [Func, CellIndex, CellIndex],
}

impl Opcode {
    /// Whether this opcode is one of the `EXT_FUN*` family: these cost
    /// 10 steps by default instead of 1, and are the only opcodes that
    /// dispatch through the function-code table.
    pub const fn is_ext_fun(self) -> bool {
        matches!(
            self,
            Opcode::EXT_FUN
                | Opcode::EXT_FUN_DAT
                | Opcode::EXT_FUN_DAT_2
                | Opcode::EXT_FUN_VAL
                | Opcode::EXT_FUN_RET
                | Opcode::EXT_FUN_RET_DAT
                | Opcode::EXT_FUN_RET_DAT_2
        )
    }

    /// The (arity, returns_value) shape an `EXT_FUN*` opcode declares for the
    /// function code it carries. `None` for non-`EXT_FUN` opcodes.
    pub const fn ext_fun_shape(self) -> Option<(u8, bool)> {
        match self {
            Opcode::EXT_FUN => Some((0, false)),
            Opcode::EXT_FUN_DAT => Some((1, false)),
            Opcode::EXT_FUN_DAT_2 => Some((2, false)),
            Opcode::EXT_FUN_VAL => Some((1, false)),
            Opcode::EXT_FUN_RET => Some((0, true)),
            Opcode::EXT_FUN_RET_DAT => Some((1, true)),
            Opcode::EXT_FUN_RET_DAT_2 => Some((2, true)),
            _ => None,
        }
    }

    /// Total encoded length of this opcode, including its 1-byte tag.
    pub fn encoded_len(self) -> usize {
        1 + self.param_schema().iter().map(|p| p.width()).sum::<usize>()
    }
}
