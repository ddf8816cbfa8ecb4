//! Fixed-width constants shared across the codec, segments, and opcode table.

/// Width in bytes of a data-segment cell and of an immediate `VALUE` operand.
pub const VALUE_SIZE: usize = 8;

/// Width in bytes of a code address / data address as encoded in the bytecode stream.
pub const ADDRESS_SIZE: usize = 4;

/// Width in bytes of the A and B scratch registers.
pub const REGISTER_SIZE: usize = 32;

/// Number of 64-bit limbs in a register.
pub const REGISTER_LIMBS: usize = REGISTER_SIZE / VALUE_SIZE;

/// Width in bytes of an encoded call-stack entry (a code address).
pub const CALL_STACK_ENTRY_SIZE: usize = ADDRESS_SIZE;

/// Width in bytes of an encoded user-stack entry (a 64-bit value).
pub const USER_STACK_ENTRY_SIZE: usize = VALUE_SIZE;

/// Default number of execution steps charged for most opcodes.
pub const DEFAULT_OP_CODE_STEPS: u64 = 1;

/// Default number of execution steps charged for the `EXT_FUN` family.
pub const DEFAULT_EXT_FUN_STEPS: u64 = 10;

/// Sentinel on-error address meaning "no handler installed".
///
/// A legally encoded instruction always occupies at least one trailing byte
/// after its opcode tag, so `u32::MAX` can never be a valid jump target and is
/// safe to use as the "cleared" convention (see DESIGN.md).
pub const NO_ERROR_HANDLER: u32 = u32::MAX;
