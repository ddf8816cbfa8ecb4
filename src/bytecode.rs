//! The program image format: `header || code || data || call_stack ||
//! user_stack`, the input a host parses once at AT creation to build the
//! initial [`MachineState`].

use crate::codec::{read_u32, write_i32};
use crate::error::CompileError;
use crate::state::MachineState;

/// Width of the fixed header: a version tag followed by the four segment sizes.
const HEADER_LEN: usize = 5 * 4;

/// The current, and so far only, image format version this crate emits/accepts.
pub const CURRENT_VERSION: u32 = 1;

/// A parsed program image, ready to become a fresh [`MachineState`].
#[derive(Debug, Clone)]
pub struct ProgramImage {
    pub version: u32,
    pub code: Vec<u8>,
    pub data: Vec<u8>,
    pub call_stack: Vec<u8>,
    pub user_stack: Vec<u8>,
}

impl ProgramImage {
    /// Parses `header || code || data || call_stack || user_stack`.
    ///
    /// The header's code-segment size is unconstrained (instructions are
    /// variable-width); the data/call-stack/user-stack sizes must each be a
    /// positive multiple of 8, matching the cell/entry-alignment invariant
    /// also enforced by [`MachineState::new`].
    pub fn parse(bytes: &[u8]) -> Result<Self, CompileError> {
        if bytes.len() < HEADER_LEN {
            return Err(CompileError::InvalidSegmentSize);
        }
        let version = read_u32(bytes, 0).map_err(|_| CompileError::InvalidSegmentSize)?;
        let code_len = read_u32(bytes, 4).map_err(|_| CompileError::InvalidSegmentSize)? as usize;
        let data_len = read_u32(bytes, 8).map_err(|_| CompileError::InvalidSegmentSize)? as usize;
        let call_stack_len = read_u32(bytes, 12).map_err(|_| CompileError::InvalidSegmentSize)? as usize;
        let user_stack_len = read_u32(bytes, 16).map_err(|_| CompileError::InvalidSegmentSize)? as usize;

        for len in [data_len, call_stack_len, user_stack_len] {
            if len == 0 || len % 8 != 0 {
                return Err(CompileError::InvalidSegmentSize);
            }
        }

        let mut offset = HEADER_LEN;
        let code = take(bytes, &mut offset, code_len)?;
        let data = take(bytes, &mut offset, data_len)?;
        let call_stack = take(bytes, &mut offset, call_stack_len)?;
        let user_stack = take(bytes, &mut offset, user_stack_len)?;

        Ok(Self {
            version,
            code,
            data,
            call_stack,
            user_stack,
        })
    }

    /// Builds the initial [`MachineState`] for a freshly created AT.
    pub fn into_machine(self, creation_block_height: u32) -> MachineState {
        MachineState::from_segments(
            self.code,
            self.data,
            self.call_stack,
            self.user_stack,
            creation_block_height,
        )
    }

    /// Serializes back into the `header || code || data || call_stack ||
    /// user_stack` layout (the encoder side of the image format, used by
    /// tests and tooling rather than the executor).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.code.len() + self.data.len() + self.call_stack.len() + self.user_stack.len());
        write_i32(&mut out, self.version as i32);
        write_i32(&mut out, self.code.len() as i32);
        write_i32(&mut out, self.data.len() as i32);
        write_i32(&mut out, self.call_stack.len() as i32);
        write_i32(&mut out, self.user_stack.len() as i32);
        out.extend_from_slice(&self.code);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.call_stack);
        out.extend_from_slice(&self.user_stack);
        out
    }
}

fn take(bytes: &[u8], offset: &mut usize, len: usize) -> Result<Vec<u8>, CompileError> {
    let end = offset.checked_add(len).ok_or(CompileError::InvalidSegmentSize)?;
    let slice = bytes.get(*offset..end).ok_or(CompileError::InvalidSegmentSize)?;
    *offset = end;
    Ok(slice.to_vec())
}
