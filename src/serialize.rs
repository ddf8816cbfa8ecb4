//! Canonical snapshot serialization: a fixed header (segment
//! sizes and stack pointers, PC, flags, checkpoints, counters, A/B
//! registers) followed by the data segment, user-stack, and call-stack bytes
//! in that order. The code segment is never part of a snapshot: it is
//! fixed at creation and assumed already loaded into the `MachineState`
//! being deserialized into.
//!
//! All integers are big-endian, matching every other wire format in this
//! crate. The byte layout is normative: two implementations
//! running the same code with the same host responses must produce
//! byte-identical snapshots after the same number of rounds.

use crate::error::Fault;
use crate::state::{MachineState, RunState};

const HAD_FATAL_ERROR_BIT: u8 = 0b0000_0001;
const FIRST_OPCODE_AFTER_SLEEPING_BIT: u8 = 0b0000_0010;

fn run_state_tag(state: RunState) -> u8 {
    match state {
        RunState::Ready => 0,
        RunState::Sleeping => 1,
        RunState::Stopped => 2,
        RunState::Finished => 3,
        RunState::Frozen => 4,
    }
}

fn run_state_from_tag(tag: u8) -> Result<RunState, Fault> {
    Ok(match tag {
        0 => RunState::Ready,
        1 => RunState::Sleeping,
        2 => RunState::Stopped,
        3 => RunState::Finished,
        4 => RunState::Frozen,
        _ => return Err(Fault::InvalidAddress),
    })
}

impl MachineState {
    /// Serializes the per-round observable state (everything but the code
    /// segment) into the canonical big-endian snapshot layout.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.data.len() + self.user_stack.len() + self.call_stack.len());

        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.call_stack.len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.user_stack.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.call_sp.to_be_bytes());
        out.extend_from_slice(&self.user_sp.to_be_bytes());

        out.extend_from_slice(&self.pc.to_be_bytes());

        out.push(run_state_tag(self.run_state));
        let mut flags = 0u8;
        if self.had_fatal_error {
            flags |= HAD_FATAL_ERROR_BIT;
        }
        if self.is_first_opcode_after_sleeping {
            flags |= FIRST_OPCODE_AFTER_SLEEPING_BIT;
        }
        out.push(flags);

        out.extend_from_slice(&self.on_stop_address.to_be_bytes());
        out.extend_from_slice(&self.on_error_address.to_be_bytes());
        out.extend_from_slice(&self.sleep_until_height.to_be_bytes());

        out.extend_from_slice(&self.steps_this_round.to_be_bytes());
        out.extend_from_slice(&self.previous_balance.to_be_bytes());
        out.extend_from_slice(&self.frozen_balance_threshold.to_be_bytes());
        out.extend_from_slice(&self.creation_block_height.to_be_bytes());

        out.extend_from_slice(&self.get_a_bytes());
        out.extend_from_slice(&self.get_b_bytes());

        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.user_stack);
        out.extend_from_slice(&self.call_stack);

        out
    }

    /// Restores every field [`Self::serialize`] wrote, in place. The data,
    /// user-stack, and call-stack segment sizes recorded in the snapshot
    /// must match this `MachineState`'s own (the code segment, and thus the
    /// AT identity, is assumed unchanged); a mismatch is rejected rather than
    /// silently resized, since that would otherwise corrupt addressing.
    pub fn deserialize_into(&mut self, bytes: &[u8]) -> Result<(), Fault> {
        let mut cursor = Cursor::new(bytes);

        let data_len = cursor.read_u32()? as usize;
        let call_stack_len = cursor.read_u32()? as usize;
        let user_stack_len = cursor.read_u32()? as usize;
        if data_len != self.data.len() || call_stack_len != self.call_stack.len() || user_stack_len != self.user_stack.len() {
            return Err(Fault::InvalidAddress);
        }

        let call_sp = cursor.read_u32()?;
        let user_sp = cursor.read_u32()?;
        let pc = cursor.read_u32()?;

        let run_state = run_state_from_tag(cursor.read_u8()?)?;
        let flags = cursor.read_u8()?;

        let on_stop_address = cursor.read_u32()?;
        let on_error_address = cursor.read_u32()?;
        let sleep_until_height = cursor.read_u32()?;

        let steps_this_round = cursor.read_u64()?;
        let previous_balance = cursor.read_u64()?;
        let frozen_balance_threshold = cursor.read_u64()?;
        let creation_block_height = cursor.read_u32()?;

        let a_bytes = cursor.read_array::<32>()?;
        let b_bytes = cursor.read_array::<32>()?;

        let data = cursor.read_vec(data_len)?;
        let user_stack = cursor.read_vec(user_stack_len)?;
        let call_stack = cursor.read_vec(call_stack_len)?;

        self.call_sp = call_sp;
        self.user_sp = user_sp;
        self.pc = pc;
        self.run_state = run_state;
        self.had_fatal_error = flags & HAD_FATAL_ERROR_BIT != 0;
        self.is_first_opcode_after_sleeping = flags & FIRST_OPCODE_AFTER_SLEEPING_BIT != 0;
        self.on_stop_address = on_stop_address;
        self.on_error_address = on_error_address;
        self.sleep_until_height = sleep_until_height;
        self.steps_this_round = steps_this_round;
        self.previous_balance = previous_balance;
        self.frozen_balance_threshold = frozen_balance_threshold;
        self.creation_block_height = creation_block_height;
        self.set_a_bytes(a_bytes);
        self.set_b_bytes(b_bytes);
        self.data = data;
        self.user_stack = user_stack;
        self.call_stack = call_stack;

        Ok(())
    }
}

/// A minimal forward-only byte cursor for the fixed snapshot layout.
struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Fault> {
        let slice = self.bytes.get(self.offset..self.offset + len).ok_or(Fault::CodeUnderflow)?;
        self.offset += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, Fault> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, Fault> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64, Fault> {
        let bytes = self.take(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Fault> {
        let bytes = self.take(N)?;
        Ok(bytes.try_into().unwrap())
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, Fault> {
        Ok(self.take(len)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_round_trips_every_observable_field() {
        let mut m = MachineState::new(vec![0x28], 16, 8, 8, 7);
        m.put_data_long(0, -9).unwrap();
        m.push_user(42).unwrap();
        m.push_call(3).unwrap();
        m.set_a_bytes([9u8; 32]);
        m.set_on_error_address(Some(5));
        m.set_had_fatal_error(true);

        let snapshot = m.serialize();

        let mut restored = MachineState::new(vec![0x28], 16, 8, 8, 0);
        restored.deserialize_into(&snapshot).unwrap();

        assert_eq!(restored.get_data_long(0).unwrap(), -9);
        assert_eq!(restored.get_a_bytes(), [9u8; 32]);
        assert_eq!(restored.on_error_address(), Some(5));
        assert!(restored.had_fatal_error());
        assert_eq!(restored.creation_block_height(), 7);
        assert_eq!(restored.pop_call().unwrap(), 3);
        assert_eq!(restored.pop_user().unwrap(), 42);
    }

    #[test]
    fn mismatched_segment_size_is_rejected() {
        let m = MachineState::new(vec![0x28], 16, 8, 8, 0);
        let snapshot = m.serialize();

        let mut other = MachineState::new(vec![0x28], 24, 8, 8, 0);
        assert!(other.deserialize_into(&snapshot).is_err());
    }
}
