//! Binary encoding of instructions
//!
//! `[opcode:8][operand:32 LE]`, no header, no terminator. A program is just the
//! concatenation of its records, so a well formed program is always a multiple of
//! [`INSTR_SIZE`] bytes long.

use thiserror::Error;

use super::{INSTR_SIZE, Instr, Instruction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {opcode} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("truncated instruction at offset {offset}: {remaining} of 5 bytes present")]
    Truncated { offset: usize, remaining: usize },
}

pub fn encode(instruction: &Instruction) -> [u8; INSTR_SIZE] {
    let operand = instruction.operand.to_le_bytes();
    [
        instruction.instr.opcode(),
        operand[0],
        operand[1],
        operand[2],
        operand[3],
    ]
}

/// Decode the record starting at `offset`.
///
/// The opcode is checked before the length, so an unknown opcode in a short tail is still
/// reported as an unknown opcode.
pub fn decode(bytes: &[u8], offset: usize) -> Result<Instruction, DecodeError> {
    let truncated = DecodeError::Truncated {
        offset,
        remaining: bytes.len().saturating_sub(offset),
    };

    let opcode = *bytes.get(offset).ok_or(truncated)?;
    let instr =
        Instr::try_from(opcode).map_err(|_| DecodeError::UnknownOpcode { opcode, offset })?;

    let record = bytes
        .get(offset..offset + INSTR_SIZE)
        .ok_or(truncated)?;
    let operand = u32::from_le_bytes([record[1], record[2], record[3], record[4]]);

    Ok(Instruction { instr, operand })
}

/// Iterate over the records of `bytes` in order, yielding `(offset, instruction)`.
///
/// Iteration ends after the first decoding error.
pub fn instructions(bytes: &[u8]) -> Instructions<'_> {
    Instructions {
        bytes,
        offset: 0,
        failed: false,
    }
}

#[derive(Debug, Clone)]
pub struct Instructions<'b> {
    bytes: &'b [u8],
    offset: usize,
    failed: bool,
}

impl Iterator for Instructions<'_> {
    type Item = Result<(usize, Instruction), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }

        let offset = self.offset;
        match decode(self.bytes, offset) {
            Ok(instruction) => {
                self.offset += INSTR_SIZE;
                Some(Ok((offset, instruction)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
