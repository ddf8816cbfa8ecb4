//! Runtime and encode-time error taxonomy.

use thiserror::Error;

/// Runtime faults the executor can catch during a round.
///
/// `CompilationError` is a distinct, encode-time-only type ([`CompileError`])
/// and is never produced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Fault {
    /// Out-of-bounds data or code access.
    #[error("invalid address")]
    InvalidAddress,
    /// Divide or modulo by zero.
    #[error("illegal operation")]
    IllegalOperation,
    /// Push on a full stack, or pop on an empty one.
    #[error("stack bounds violated")]
    StackBounds,
    /// Unknown function code, wrong arity/return shape, or unrecognized platform code.
    #[error("illegal function code")]
    IllegalFunctionCode,
    /// The code segment underflowed while decoding an opcode or its parameters.
    #[error("code segment underflow")]
    CodeUnderflow,
}

/// Errors raised only by the encoder/disassembler, never by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CompileError {
    /// A mnemonic does not name a known opcode.
    #[error("unknown opcode mnemonic")]
    UnknownMnemonic,
    /// A function code used with an `EXT_FUN` variant is unknown.
    #[error("unknown function code")]
    UnknownFunctionCode,
    /// The opcode's parameter count does not match a declared function code's arity.
    #[error("wrong arity for function code")]
    WrongArity,
    /// The opcode's return shape does not match a declared function code's return flag.
    #[error("wrong return shape for function code")]
    WrongReturnShape,
    /// A branch offset does not fit in a signed byte ([-128, 127]).
    #[error("branch offset out of range")]
    OffsetTooWide,
    /// A segment size supplied at encode time is not a positive multiple of 8.
    #[error("segment size must be a positive multiple of 8")]
    InvalidSegmentSize,
}

/// Errors surfaced to the host when a round cannot complete at all, as opposed
/// to a [`Fault`] that the AT's own `on-error-address` might recover from.
#[derive(Debug, Error)]
pub enum ExecutorError<H> {
    /// A runtime fault escaped the round without an installed error handler.
    ///
    /// This is not itself an error condition for the host: the executor
    /// always settles the round and reports it through
    /// [`crate::executor::RoundOutcome::Faulted`]. This variant exists for
    /// callers that want `?`-based composition instead of matching on
    /// `RoundOutcome`.
    #[error("unhandled fault: {0}")]
    Unhandled(#[source] Fault),
    /// The host interface itself returned an error (e.g. ledger I/O failed).
    #[error("host interface error: {0}")]
    Host(#[source] H),
}
