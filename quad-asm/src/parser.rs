//! Parser for the assembly syntax
//!
//! One instruction per line, `<COMMAND> [OPERAND]`, fields separated by single spaces.
//! Blank lines are skipped. The operand is read as the leading base 10 digits of its
//! token (`12abc` is 12, `5.7` is 5); when there are none, or they overflow a `u32`, it
//! silently becomes 0. Mnemonics are matched exactly (case sensitive).
use std::str::FromStr;

use log::trace;
use quad_isa::Instr;

use super::AsmError;

/// A parsed source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based line number in the source
    pub line: usize,
    pub instr: Instr,
    pub operand: u32,
}

pub type Ast = Vec<Statement>;

pub type ParseResult<T> = Result<T, AsmError>;

#[derive(Debug, Clone)]
pub struct Parser<'p> {
    pub src: &'p str,
}

impl<'p> Parser<'p> {
    pub fn new(src: &'p str) -> Self {
        Self { src }
    }

    fn parse_operand(token: Option<&str>) -> u32 {
        let Some(token) = token else {
            return 0;
        };

        let unsigned = token.strip_prefix('+').unwrap_or(token);
        let digits = unsigned
            .find(|c: char| !c.is_ascii_digit())
            .map_or(unsigned, |end| &unsigned[..end]);

        digits.parse().unwrap_or(0)
    }

    fn parse_line(&self, line: usize, text: &str) -> ParseResult<Statement> {
        let mut parts = text.split(' ');
        // split always yields at least one item
        let command = parts.next().unwrap_or_default();
        let operand = Self::parse_operand(parts.next());

        let instr = Instr::from_str(command).map_err(|_| AsmError::UnknownInstruction {
            line,
            token: command.to_string(),
        })?;

        trace!("parser: line {}: {} {}", line, instr, operand);

        Ok(Statement {
            line,
            instr,
            operand,
        })
    }

    pub fn parse(&self) -> ParseResult<Ast> {
        let mut ast = Vec::new();

        for (index, text) in self.src.split('\n').enumerate() {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            let statement = self.parse_line(index + 1, text)?;
            ast.push(statement);
        }

        Ok(ast)
    }
}
