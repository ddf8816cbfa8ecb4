//! A deterministic, sandboxed bytecode interpreter for automated
//! transactions (AT): long-lived agents attached to a blockchain that wake
//! up per block, run a bounded slice of instructions against a host-owned
//! ledger, and persist their state as byte-identical snapshots across
//! independent implementations.

pub mod alu;
pub mod assemble;
pub mod bytecode;
pub mod codec;
pub mod consts;
pub mod decode;
pub mod disassemble;
pub mod error;
pub mod executor;
pub mod flow;
pub mod function_code;
pub mod gas;
pub mod host;
pub mod indirect;
pub mod interpreter;
pub mod lifecycle;
pub mod opcode;
pub mod serialize;
pub mod stack;
pub mod state;

pub mod prelude {
    pub use crate::assemble::{assemble_instruction, assemble_text, AsmOperand};
    pub use crate::bytecode::ProgramImage;
    pub use crate::error::{CompileError, ExecutorError, Fault};
    pub use crate::executor::{run_round, RoundOutcome};
    pub use crate::gas::Limits;
    pub use crate::host::HostInterface;
    pub use crate::opcode::Opcode;
    pub use crate::state::{MachineState, RunState};

    #[cfg(any(test, feature = "test-helpers"))]
    pub use crate::host::test_helpers::NullHost;
}
