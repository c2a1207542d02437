//! Assembler for quad bytecode
//!
//! Takes the statements produced by the parser and emits one fixed size record per
//! statement, along with a listing that records what was assembled from which line.

use std::fmt;

use log::debug;
use quad_isa::{Instr, Instruction};

use super::parser::{Ast, Statement};

/// One line of the assembly listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub line: usize,
    pub instr: Instr,
    pub operand: u32,
}

impl fmt::Display for ListingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line{}: command={}, operand={}",
            self.line, self.instr, self.operand
        )
    }
}

/// Human readable log of an assembly run, one entry per assembled line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<ListingEntry>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

/// Output of a successful assembly
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub bytecode: Vec<u8>,
    pub listing: Listing,
}

#[derive(Debug, Clone, Default)]
pub struct Assembler {
    buffer: Vec<u8>,
    listing: Listing,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    fn visit_statement(&mut self, statement: &Statement) {
        Instruction::new(statement.instr, statement.operand).encode_into(&mut self.buffer);

        self.listing.entries.push(ListingEntry {
            line: statement.line,
            instr: statement.instr,
            operand: statement.operand,
        });
    }

    pub fn assemble(&mut self, ast: &Ast) -> Assembly {
        self.buffer.clear();
        self.listing.entries.clear();

        debug!("assembler: Assembling {} statements", ast.len());
        for statement in ast {
            self.visit_statement(statement);
        }
        debug!("assembler: Total bytecode size: {}", self.buffer.len());

        Assembly {
            bytecode: std::mem::take(&mut self.buffer),
            listing: std::mem::take(&mut self.listing),
        }
    }
}
