//! The machine state model: segments, registers, PC, flags,
//! checkpoints and counters, plus the public accessor contract used by the
//! opcode and function-code dispatchers.

use crate::codec::cell_to_checked_offset;
use crate::consts::{NO_ERROR_HANDLER, REGISTER_LIMBS, VALUE_SIZE};
use crate::error::Fault;

/// The mutually exclusive "why the AT isn't currently progressing" states
///. Expressed as an enum rather than four independent booleans so the
/// "at most one is latched" invariant holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunState {
    /// Neither sleeping, stopped, finished, nor frozen.
    Ready,
    /// Suspended until the host drives the executor at a block height
    /// `>= sleep_until_height`.
    Sleeping,
    /// Suspended until the next round, which resumes at `on_stop_address`.
    Stopped,
    /// Terminal. No further rounds will execute this AT.
    Finished,
    /// Balance below `frozen_balance_threshold`; skipped until refunded.
    Frozen,
}

impl Default for RunState {
    fn default() -> Self {
        Self::Ready
    }
}

/// The full per-AT machine state: four fixed-size segments, registers, PC,
/// run state, checkpoints, and counters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineState {
    /// Executable bytes. Fixed at creation; read-only during execution.
    pub(crate) code: Vec<u8>,
    /// Random-access 64-bit cells, stored as a flat byte buffer.
    pub(crate) data: Vec<u8>,
    /// Call-stack bytes: 32-bit code addresses, growing downward from the high end.
    pub(crate) call_stack: Vec<u8>,
    /// User-stack bytes: 64-bit values, growing downward from the high end.
    pub(crate) user_stack: Vec<u8>,
    /// Byte offset of the current top-of-call-stack entry (equals `call_stack.len()` when empty).
    pub(crate) call_sp: u32,
    /// Byte offset of the current top-of-user-stack entry (equals `user_stack.len()` when empty).
    pub(crate) user_sp: u32,

    /// 32-byte register A, viewed as four 64-bit cells (A1 least significant).
    pub(crate) a: [u64; REGISTER_LIMBS],
    /// 32-byte register B, viewed as four 64-bit cells (B1 least significant).
    pub(crate) b: [u64; REGISTER_LIMBS],

    /// Program counter: offset of the byte immediately before the opcode being decoded.
    pub(crate) pc: u32,

    pub(crate) run_state: RunState,
    pub(crate) had_fatal_error: bool,
    pub(crate) is_first_opcode_after_sleeping: bool,

    pub(crate) on_stop_address: u32,
    pub(crate) on_error_address: u32,
    pub(crate) sleep_until_height: u32,

    pub(crate) steps_this_round: u64,
    pub(crate) previous_balance: u64,
    pub(crate) frozen_balance_threshold: u64,
    pub(crate) creation_block_height: u32,
}

impl MachineState {
    /// Creates a fresh AT: the given code image, empty data/stacks of the
    /// requested sizes, cleared flags, and the given creation block height.
    ///
    /// All three non-code segment sizes must be positive multiples of 8; this
    /// mirrors the invariant enforced on the bytecode image header.
    pub fn new(
        code: Vec<u8>,
        data_len: usize,
        call_stack_len: usize,
        user_stack_len: usize,
        creation_block_height: u32,
    ) -> Self {
        assert!(data_len % VALUE_SIZE == 0, "data segment must be a multiple of 8");
        assert!(call_stack_len % 8 == 0, "call stack must be a multiple of 8");
        assert!(user_stack_len % 8 == 0, "user stack must be a multiple of 8");

        Self {
            code,
            data: vec![0u8; data_len],
            call_stack: vec![0u8; call_stack_len],
            user_stack: vec![0u8; user_stack_len],
            call_sp: call_stack_len as u32,
            user_sp: user_stack_len as u32,
            a: [0; REGISTER_LIMBS],
            b: [0; REGISTER_LIMBS],
            pc: 0,
            run_state: RunState::Ready,
            had_fatal_error: false,
            is_first_opcode_after_sleeping: false,
            on_stop_address: 0,
            on_error_address: NO_ERROR_HANDLER,
            sleep_until_height: 0,
            steps_this_round: 0,
            previous_balance: 0,
            frozen_balance_threshold: 0,
            creation_block_height,
        }
    }

    /// Builds an AT from already-materialized segment bytes, as
    /// opposed to [`Self::new`]'s zero-filled data/stacks. `data.len()`,
    /// `call_stack.len()`, and `user_stack.len()` must each be a positive
    /// multiple of 8, the same invariant `new` enforces.
    pub fn from_segments(
        code: Vec<u8>,
        data: Vec<u8>,
        call_stack: Vec<u8>,
        user_stack: Vec<u8>,
        creation_block_height: u32,
    ) -> Self {
        assert!(!data.is_empty() && data.len() % VALUE_SIZE == 0, "data segment must be a positive multiple of 8");
        assert!(!call_stack.is_empty() && call_stack.len() % 8 == 0, "call stack must be a positive multiple of 8");
        assert!(!user_stack.is_empty() && user_stack.len() % 8 == 0, "user stack must be a positive multiple of 8");

        let call_sp = call_stack.len() as u32;
        let user_sp = user_stack.len() as u32;
        Self {
            code,
            data,
            call_stack,
            user_stack,
            call_sp,
            user_sp,
            a: [0; REGISTER_LIMBS],
            b: [0; REGISTER_LIMBS],
            pc: 0,
            run_state: RunState::Ready,
            had_fatal_error: false,
            is_first_opcode_after_sleeping: false,
            on_stop_address: 0,
            on_error_address: NO_ERROR_HANDLER,
            sleep_until_height: 0,
            steps_this_round: 0,
            previous_balance: 0,
            frozen_balance_threshold: 0,
            creation_block_height,
        }
    }

    // ---- code segment -------------------------------------------------

    /// The executable code segment.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// The program counter.
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    pub(crate) fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    // ---- run state & flags ---------------------------------------------

    /// The current [`RunState`].
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    pub const fn is_sleeping(&self) -> bool {
        matches!(self.run_state, RunState::Sleeping)
    }

    pub const fn is_stopped(&self) -> bool {
        matches!(self.run_state, RunState::Stopped)
    }

    pub const fn is_finished(&self) -> bool {
        matches!(self.run_state, RunState::Finished)
    }

    pub const fn is_frozen(&self) -> bool {
        matches!(self.run_state, RunState::Frozen)
    }

    pub const fn had_fatal_error(&self) -> bool {
        self.had_fatal_error
    }

    pub const fn is_first_opcode_after_sleeping(&self) -> bool {
        self.is_first_opcode_after_sleeping
    }

    /// Consumes the "just woke up" flag, returning its prior value. Function
    /// codes that implement two-phase syscalls call this once.
    pub fn consume_first_opcode_after_sleeping(&mut self) -> bool {
        std::mem::replace(&mut self.is_first_opcode_after_sleeping, false)
    }

    pub fn set_sleeping(&mut self) {
        self.run_state = RunState::Sleeping;
    }

    pub fn set_stopped(&mut self) {
        self.run_state = RunState::Stopped;
    }

    pub fn set_finished(&mut self) {
        self.run_state = RunState::Finished;
    }

    pub fn set_frozen(&mut self) {
        self.run_state = RunState::Frozen;
    }

    /// Clears the latched run state back to [`RunState::Ready`]. Used by the
    /// executor at round start and on wake-up.
    pub(crate) fn set_ready(&mut self) {
        self.run_state = RunState::Ready;
    }

    pub(crate) fn set_had_fatal_error(&mut self, value: bool) {
        self.had_fatal_error = value;
    }

    pub(crate) fn set_first_opcode_after_sleeping(&mut self, value: bool) {
        self.is_first_opcode_after_sleeping = value;
    }

    // ---- checkpoints -----------------------------------------------------

    pub const fn on_stop_address(&self) -> u32 {
        self.on_stop_address
    }

    pub fn set_on_stop_address(&mut self, address: u32) {
        self.on_stop_address = address;
    }

    /// `None` means no handler is installed (the [`crate::consts::NO_ERROR_HANDLER`] sentinel).
    pub fn on_error_address(&self) -> Option<u32> {
        (self.on_error_address != NO_ERROR_HANDLER).then_some(self.on_error_address)
    }

    pub fn set_on_error_address(&mut self, address: Option<u32>) {
        self.on_error_address = address.unwrap_or(NO_ERROR_HANDLER);
    }

    pub const fn sleep_until_height(&self) -> u32 {
        self.sleep_until_height
    }

    pub fn set_sleep_until_height(&mut self, height: u32) {
        self.sleep_until_height = height;
    }

    // ---- counters ----------------------------------------------------

    pub const fn steps_this_round(&self) -> u64 {
        self.steps_this_round
    }

    pub(crate) fn reset_steps_this_round(&mut self) {
        self.steps_this_round = 0;
    }

    pub(crate) fn charge_steps(&mut self, steps: u64) {
        self.steps_this_round += steps;
    }

    /// Balance recorded at the start of the current round.
    pub const fn get_current_balance(&self) -> u64 {
        self.previous_balance
    }

    pub(crate) fn set_previous_balance(&mut self, balance: u64) {
        self.previous_balance = balance;
    }

    pub const fn frozen_balance_threshold(&self) -> u64 {
        self.frozen_balance_threshold
    }

    pub fn set_frozen_balance_threshold(&mut self, threshold: u64) {
        self.frozen_balance_threshold = threshold;
    }

    pub const fn creation_block_height(&self) -> u32 {
        self.creation_block_height
    }

    // ---- registers -----------------------------------------------------

    pub const fn get_a_1(&self) -> u64 {
        self.a[0]
    }
    pub const fn get_a_2(&self) -> u64 {
        self.a[1]
    }
    pub const fn get_a_3(&self) -> u64 {
        self.a[2]
    }
    pub const fn get_a_4(&self) -> u64 {
        self.a[3]
    }
    pub fn set_a_1(&mut self, v: u64) {
        self.a[0] = v;
    }
    pub fn set_a_2(&mut self, v: u64) {
        self.a[1] = v;
    }
    pub fn set_a_3(&mut self, v: u64) {
        self.a[2] = v;
    }
    pub fn set_a_4(&mut self, v: u64) {
        self.a[3] = v;
    }

    pub const fn get_b_1(&self) -> u64 {
        self.b[0]
    }
    pub const fn get_b_2(&self) -> u64 {
        self.b[1]
    }
    pub const fn get_b_3(&self) -> u64 {
        self.b[2]
    }
    pub const fn get_b_4(&self) -> u64 {
        self.b[3]
    }
    pub fn set_b_1(&mut self, v: u64) {
        self.b[0] = v;
    }
    pub fn set_b_2(&mut self, v: u64) {
        self.b[1] = v;
    }
    pub fn set_b_3(&mut self, v: u64) {
        self.b[2] = v;
    }
    pub fn set_b_4(&mut self, v: u64) {
        self.b[3] = v;
    }

    /// Register A as 32 big-endian bytes (limb A1 first, matching its role as
    /// the least-significant limb; see DESIGN.md for the chosen limb order).
    pub fn get_a_bytes(&self) -> [u8; 32] {
        limbs_to_bytes(&self.a)
    }

    /// Register B as 32 big-endian bytes.
    pub fn get_b_bytes(&self) -> [u8; 32] {
        limbs_to_bytes(&self.b)
    }

    pub fn set_a_bytes(&mut self, bytes: [u8; 32]) {
        self.a = bytes_to_limbs(bytes);
    }

    pub fn set_b_bytes(&mut self, bytes: [u8; 32]) {
        self.b = bytes_to_limbs(bytes);
    }

    pub fn swap_a_and_b(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
    }

    // ---- data segment ----------------------------------------------------

    /// Reads the 64-bit cell at `address` (a cell index, not a byte offset).
    pub fn get_data_long(&self, address: i32) -> Result<i64, Fault> {
        let offset = cell_to_checked_offset(address, self.data.len())?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.data[offset..offset + 8]);
        Ok(i64::from_be_bytes(buf))
    }

    /// Writes the 64-bit cell at `address`.
    pub fn put_data_long(&mut self, address: i32, value: i64) -> Result<(), Fault> {
        let offset = cell_to_checked_offset(address, self.data.len())?;
        self.data[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Loads the 32 bytes starting at `address` (a cell index) into the given buffer.
    pub fn get_data_block(&self, address: i32) -> Result<[u8; 32], Fault> {
        let mut out = [0u8; 32];
        for (limb, slot) in out.chunks_mut(8).enumerate() {
            let value = self.get_data_long(address + limb as i32)?;
            slot.copy_from_slice(&value.to_be_bytes());
        }
        Ok(out)
    }

    /// Stores 32 bytes starting at `address` (a cell index).
    pub fn put_data_block(&mut self, address: i32, bytes: [u8; 32]) -> Result<(), Fault> {
        for (limb, chunk) in bytes.chunks(8).enumerate() {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            self.put_data_long(address + limb as i32, i64::from_be_bytes(buf))?;
        }
        Ok(())
    }

    // ---- user stack (64-bit values) --------------------------------------

    pub fn push_user(&mut self, value: i64) -> Result<(), Fault> {
        if self.user_sp < 8 {
            return Err(Fault::StackBounds);
        }
        let new_sp = self.user_sp - 8;
        self.user_stack[new_sp as usize..new_sp as usize + 8].copy_from_slice(&value.to_be_bytes());
        self.user_sp = new_sp;
        Ok(())
    }

    pub fn pop_user(&mut self) -> Result<i64, Fault> {
        if self.user_sp as usize + 8 > self.user_stack.len() {
            return Err(Fault::StackBounds);
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.user_stack[self.user_sp as usize..self.user_sp as usize + 8]);
        self.user_sp += 8;
        Ok(i64::from_be_bytes(buf))
    }

    // ---- call stack (32-bit code addresses) ------------------------------

    pub fn push_call(&mut self, address: u32) -> Result<(), Fault> {
        if self.call_sp < 4 {
            return Err(Fault::StackBounds);
        }
        let new_sp = self.call_sp - 4;
        self.call_stack[new_sp as usize..new_sp as usize + 4].copy_from_slice(&address.to_be_bytes());
        self.call_sp = new_sp;
        Ok(())
    }

    pub fn pop_call(&mut self) -> Result<u32, Fault> {
        if self.call_sp as usize + 4 > self.call_stack.len() {
            return Err(Fault::StackBounds);
        }
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.call_stack[self.call_sp as usize..self.call_sp as usize + 4]);
        self.call_sp += 4;
        Ok(u32::from_be_bytes(buf))
    }
}

fn limbs_to_bytes(limbs: &[u64; REGISTER_LIMBS]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, limb) in limbs.iter().enumerate() {
        out[i * 8..i * 8 + 8].copy_from_slice(&limb.to_be_bytes());
    }
    out
}

fn bytes_to_limbs(bytes: [u8; 32]) -> [u64; REGISTER_LIMBS] {
    let mut out = [0u64; REGISTER_LIMBS];
    for (i, chunk) in bytes.chunks(8).enumerate() {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        out[i] = u64::from_be_bytes(buf);
    }
    out
}
