//! Instruction set of the quad accumulator machine
//!
//! Both the assembler and the VM link against this crate, so the opcode table only
//! exists once. Every instruction is a fixed 5 byte record: one opcode byte followed by
//! a little-endian `u32` operand.

pub mod encoding;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

pub use encoding::{DecodeError, Instructions, decode, encode, instructions};

/// Size in bytes of one encoded instruction.
pub const INSTR_SIZE: usize = 5;

#[repr(u8)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    TryFromPrimitive,
    IntoPrimitive,
    EnumString,
    IntoStaticStr,
    Display,
    EnumIter,
)]
#[allow(non_camel_case_types)]
pub enum Instr {
    // ac <- operand
    LOAD_CONST = 0xE1,

    // Memory
    READ_MEM = 0xD1,
    WRITE_MEM = 0x12,

    // ac <- reverse_bits(ac)
    BIT_REVERSE = 0x3A,
}

impl Instr {
    /// Mnemonic as written in assembly source.
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn opcode(self) -> u8 {
        self.into()
    }
}

/// A single decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub instr: Instr,
    pub operand: u32,
}

impl Instruction {
    pub fn new(instr: Instr, operand: u32) -> Self {
        Self { instr, operand }
    }

    /// Append the 5 byte encoding of this instruction to `buffer`.
    pub fn encode_into(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&encode(self));
    }
}

/// Reverse the order of all 32 bits of `value` (bit 0 <-> bit 31).
pub fn bit_reverse(mut value: u32) -> u32 {
    let mut result = 0u32;
    for _ in 0..32 {
        result = (result << 1) | (value & 1);
        value >>= 1;
    }
    result
}
