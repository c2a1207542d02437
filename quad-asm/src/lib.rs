//! Assembler for quad bytecode
//!
//! Turns line oriented assembly source into the flat 5 byte record format understood by
//! `quad-vm`, plus a listing of what was assembled from each line.

pub mod assembler;
pub mod parser;

use thiserror::Error;

pub use assembler::{Assembler, Assembly, Listing, ListingEntry};
pub use parser::{Ast, Parser, Statement};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    #[error("unknown instruction on line {line}: {token}")]
    UnknownInstruction { line: usize, token: String },
}

/// Parse and assemble `src` in one go.
///
/// Nothing is produced unless every line assembles.
pub fn assemble(src: &str) -> Result<Assembly, AsmError> {
    let ast = Parser::new(src).parse()?;
    let mut assembler = Assembler::new();
    Ok(assembler.assemble(&ast))
}
