//! Core of the quad VM
//! The VM is a single accumulator machine which executes fixed size instructions
//! straight through from the first byte to the last. There are no jumps, so the
//! instruction pointer only ever moves forward by one record.

use std::collections::BTreeMap;

use log::{debug, trace};
use quad_isa::{DecodeError, INSTR_SIZE, Instr, Instruction, bit_reverse, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::disasm;

/// Number of memory cells shown by `dump_ctx`
const DUMP_CELLS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("memory size must be a positive number")]
    InvalidMemorySize,

    #[error("unknown opcode {opcode} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("truncated instruction at offset {offset}: {remaining} of 5 bytes present")]
    TruncatedInstruction { offset: usize, remaining: usize },

    #[error("write to address {address} outside of memory of size {memory_size}")]
    WriteOutOfRange { address: u32, memory_size: usize },

    #[error("cannot allocate memory of size {memory_size}")]
    MemoryAllocation { memory_size: usize },
}

impl From<DecodeError> for VmError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::UnknownOpcode { opcode, offset } => {
                VmError::UnknownOpcode { opcode, offset }
            }
            DecodeError::Truncated { offset, remaining } => {
                VmError::TruncatedInstruction { offset, remaining }
            }
        }
    }
}

/// What happens when `WRITE_MEM` targets an address past the end of memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Keep the value off to the side. Later reads of that address see it, but it never
    /// shows up in the result.
    #[default]
    Extend,
    /// Fail with [`VmError::WriteOutOfRange`].
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub memory_size: usize,
    pub write_policy: WritePolicy,
}

impl Config {
    pub fn new(memory_size: usize) -> Result<Self, VmError> {
        if memory_size == 0 {
            return Err(VmError::InvalidMemorySize);
        }

        Ok(Self {
            memory_size,
            write_policy: WritePolicy::default(),
        })
    }

    pub fn with_write_policy(mut self, write_policy: WritePolicy) -> Self {
        self.write_policy = write_policy;
        self
    }
}

/// Registers and memory of one execution run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub ac: u32, // accumulator
    pub memory: Vec<u32>,

    // Cells written past the end of `memory`
    pub spill: BTreeMap<u32, u32>,
}

impl State {
    pub fn new(memory_size: usize) -> Result<Self, VmError> {
        let mut memory = Vec::new();
        memory
            .try_reserve_exact(memory_size)
            .map_err(|_| VmError::MemoryAllocation { memory_size })?;
        memory.resize(memory_size, 0);

        Ok(Self {
            ac: 0,
            memory,
            spill: BTreeMap::new(),
        })
    }

    /// Read a memory cell. Addresses that were never written read as 0.
    pub fn read(&self, address: u32) -> u32 {
        match self.memory.get(address as usize) {
            Some(value) => *value,
            None => self.spill.get(&address).copied().unwrap_or(0),
        }
    }

    pub fn write(&mut self, address: u32, value: u32, policy: WritePolicy) -> Result<(), VmError> {
        if let Some(cell) = self.memory.get_mut(address as usize) {
            *cell = value;
            return Ok(());
        }

        match policy {
            WritePolicy::Extend => {
                self.spill.insert(address, value);
                Ok(())
            }
            WritePolicy::Strict => Err(VmError::WriteOutOfRange {
                address,
                memory_size: self.memory.len(),
            }),
        }
    }
}

/// Execute a single instruction against `state`, returning the state that follows it.
pub fn execute(
    mut state: State,
    instruction: Instruction,
    policy: WritePolicy,
) -> Result<State, VmError> {
    let operand = instruction.operand;

    match instruction.instr {
        Instr::LOAD_CONST => {
            // LOAD_CONST <value> - load immediate value into ac
            state.ac = operand;
        }
        Instr::READ_MEM => {
            // READ_MEM <address> - load memory cell into ac
            state.ac = state.read(operand);
        }
        Instr::WRITE_MEM => {
            // WRITE_MEM <address> - store ac into memory cell
            state.write(operand, state.ac, policy)?;
        }
        Instr::BIT_REVERSE => {
            // BIT_REVERSE - reverse all 32 bits of ac, operand is ignored
            state.ac = bit_reverse(state.ac);
        }
    }

    Ok(state)
}

/// Final memory contents of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub memory: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct VM {
    pub ip: usize, // instruction pointer, byte offset into `program`
    pub program: Vec<u8>,
    pub config: Config,

    state: State,
}

impl VM {
    pub fn new(config: Config) -> Result<Self, VmError> {
        Ok(Self {
            ip: 0,
            program: Vec::new(),
            config,
            state: State::new(config.memory_size)?,
        })
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn load(&mut self, code: &[u8]) {
        self.program.extend_from_slice(code);
    }

    pub fn is_halted(&self) -> bool {
        self.ip >= self.program.len()
    }

    fn fetch_decode(&self) -> Result<Instruction, VmError> {
        let instruction = decode(&self.program, self.ip)?;
        trace!(
            "fetch_decode: {:08X}: {}",
            self.ip,
            disasm::disasm_instruction(&instruction)
        );
        Ok(instruction)
    }

    pub fn cycle(&mut self) -> Result<(), VmError> {
        let instruction = self.fetch_decode()?;

        let state = std::mem::take(&mut self.state);
        self.state = execute(state, instruction, self.config.write_policy)?;
        self.ip += INSTR_SIZE;

        self.dump_ctx();
        Ok(())
    }

    pub fn dump_ctx(&self) {
        let shown = self.state.memory.len().min(DUMP_CELLS);
        trace!(
            "ip: {:08X}\tac: {:08X}\tmemory[..{}]: {:?}\tspill: {}",
            self.ip,
            self.state.ac,
            shown,
            &self.state.memory[..shown],
            self.state.spill.len()
        );
    }

    /// Run until the end of the program and return the final memory contents.
    pub fn run(mut self) -> Result<ExecutionResult, VmError> {
        debug!(
            "vm: running {} bytes with {} memory cells",
            self.program.len(),
            self.config.memory_size
        );

        while !self.is_halted() {
            self.cycle()?;
        }

        debug!("vm: halted at {:08X}", self.ip);

        let mut memory = self.state.memory;
        memory.truncate(self.config.memory_size);
        Ok(ExecutionResult { memory })
    }

    pub fn run_with(config: Config, code: &[u8]) -> Result<ExecutionResult, VmError> {
        let mut vm = VM::new(config)?;
        vm.load(code);
        vm.run()
    }
}

/// Run `program` with a fresh machine of `memory_size` cells.
pub fn run(program: &[u8], memory_size: usize) -> Result<ExecutionResult, VmError> {
    VM::run_with(Config::new(memory_size)?, program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn program(instructions: &[(Instr, u32)]) -> Vec<u8> {
        let mut code = Vec::new();
        for &(instr, operand) in instructions {
            Instruction::new(instr, operand).encode_into(&mut code);
        }
        code
    }

    #[test]
    fn test_machine_initialization() {
        let vm = VM::new(Config::new(4).unwrap()).unwrap();
        assert_eq!(vm.ip, 0);
        assert_eq!(vm.state().ac, 0);
        assert_eq!(vm.state().memory, vec![0; 4]);
        assert!(vm.is_halted());
    }

    #[test]
    fn zero_memory_size_is_rejected() {
        assert_eq!(Config::new(0), Err(VmError::InvalidMemorySize));
        assert_eq!(run(&[], 0), Err(VmError::InvalidMemorySize));
    }

    #[test]
    fn oversized_memory_fails_to_allocate() {
        assert_eq!(
            run(&[], usize::MAX / 2),
            Err(VmError::MemoryAllocation {
                memory_size: usize::MAX / 2
            })
        );
        assert!(State::new(usize::MAX).is_err());
    }

    #[test]
    fn load_const_sets_ac() {
        let state = execute(
            State::new(1).unwrap(),
            Instruction::new(Instr::LOAD_CONST, 0xDEAD_BEEF),
            WritePolicy::Extend,
        )
        .unwrap();
        assert_eq!(state.ac, 0xDEAD_BEEF);
    }

    #[test]
    fn read_mem_loads_cell() {
        let mut state = State::new(3).unwrap();
        state.memory[2] = 99;

        let state = execute(
            state,
            Instruction::new(Instr::READ_MEM, 2),
            WritePolicy::Extend,
        )
        .unwrap();
        assert_eq!(state.ac, 99);
    }

    #[test]
    fn out_of_range_read_is_zero() {
        let mut state = State::new(2).unwrap();
        state.ac = 17;

        let state = execute(
            state,
            Instruction::new(Instr::READ_MEM, u32::MAX),
            WritePolicy::Strict,
        )
        .unwrap();
        assert_eq!(state.ac, 0);
    }

    #[test]
    fn bit_reverse_ignores_operand() {
        let mut state = State::new(1).unwrap();
        state.ac = 1;

        let state = execute(
            state,
            Instruction::new(Instr::BIT_REVERSE, 12345),
            WritePolicy::Extend,
        )
        .unwrap();
        assert_eq!(state.ac, 0x8000_0000);
    }

    #[test]
    fn extended_writes_are_readable_but_not_reported() {
        let code = program(&[
            (Instr::LOAD_CONST, 9),
            (Instr::WRITE_MEM, 1000),
            (Instr::LOAD_CONST, 0),
            (Instr::READ_MEM, 1000),
            (Instr::WRITE_MEM, 0),
        ]);

        let result = run(&code, 2).unwrap();
        assert_eq!(result.memory, vec![9, 0]);
    }

    #[test]
    fn strict_writes_fail_out_of_range() {
        let code = program(&[(Instr::LOAD_CONST, 9), (Instr::WRITE_MEM, 2)]);
        let config = Config::new(2)
            .unwrap()
            .with_write_policy(WritePolicy::Strict);

        assert_eq!(
            VM::run_with(config, &code),
            Err(VmError::WriteOutOfRange {
                address: 2,
                memory_size: 2
            })
        );
    }

    #[test]
    fn strict_writes_in_range_succeed() {
        let code = program(&[(Instr::LOAD_CONST, 9), (Instr::WRITE_MEM, 1)]);
        let config = Config::new(2)
            .unwrap()
            .with_write_policy(WritePolicy::Strict);

        assert_eq!(VM::run_with(config, &code).unwrap().memory, vec![0, 9]);
    }

    #[test]
    fn unknown_opcode_halts_without_result() {
        let mut code = program(&[(Instr::LOAD_CONST, 1), (Instr::WRITE_MEM, 0)]);
        code.extend_from_slice(&[0xFF, 0, 0, 0, 0]);

        let err = run(&code, 4).unwrap_err();
        assert_eq!(
            err,
            VmError::UnknownOpcode {
                opcode: 255,
                offset: 10
            }
        );
        assert_eq!(err.to_string(), "unknown opcode 255 at offset 10");
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut code = program(&[(Instr::LOAD_CONST, 1)]);
        code.extend_from_slice(&[0xE1, 0x00]);

        assert_eq!(
            run(&code, 1),
            Err(VmError::TruncatedInstruction {
                offset: 5,
                remaining: 2
            })
        );
    }

    #[test]
    fn cycle_advances_one_record() {
        let code = program(&[(Instr::LOAD_CONST, 3), (Instr::WRITE_MEM, 0)]);
        let mut vm = VM::new(Config::new(1).unwrap()).unwrap();
        vm.load(&code);

        vm.cycle().unwrap();
        assert_eq!(vm.ip, INSTR_SIZE);
        assert_eq!(vm.state().ac, 3);
        assert_eq!(vm.state().memory, vec![0]);

        vm.cycle().unwrap();
        assert!(vm.is_halted());
        assert_eq!(vm.state().memory, vec![3]);
    }

    #[test]
    fn result_serializes_as_memory_document() {
        let result = ExecutionResult {
            memory: vec![5, 0, 0],
        };
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"memory":[5,0,0]}"#
        );
    }

    proptest! {
        #[test]
        fn write_then_read_round_trips(value in any::<u32>(), address in 0u32..64, size in 1usize..32) {
            let code = program(&[
                (Instr::LOAD_CONST, value),
                (Instr::WRITE_MEM, address),
                (Instr::LOAD_CONST, 0),
                (Instr::READ_MEM, address),
                (Instr::WRITE_MEM, 0),
            ]);

            let result = run(&code, size).unwrap();
            prop_assert_eq!(result.memory.len(), size);
            prop_assert_eq!(result.memory[0], value);
        }

        #[test]
        fn runs_are_independent(value: u32) {
            let code = program(&[(Instr::LOAD_CONST, value), (Instr::WRITE_MEM, 0)]);

            let first = run(&code, 1).unwrap();
            let second = run(&code, 1).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
