use quad_isa::{DecodeError, INSTR_SIZE, Instr, Instruction, decode};

/// Print the disassembly of an instruction
pub fn disasm_instruction(instruction: &Instruction) -> String {
    match instruction.instr {
        Instr::BIT_REVERSE if instruction.operand == 0 => instruction.instr.to_string(),
        instr => format!("{} {}", instr, instruction.operand),
    }
}

/// Disassemble a whole program, one line per record.
///
/// Unlike execution this keeps going past bad records, rendering an unknown opcode
/// as `$XX`.
pub fn disasm_program(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(INSTR_SIZE)
        .enumerate()
        .map(|(i, record)| {
            let text = match decode(record, 0) {
                Ok(instruction) => disasm_instruction(&instruction),
                Err(DecodeError::UnknownOpcode { opcode, .. }) => format!("${:02X}", opcode),
                Err(DecodeError::Truncated { .. }) => "<truncated>".to_string(),
            };

            let hex: Vec<String> = record.iter().map(|b| format!("{:02X}", b)).collect();
            format!("{:04X}: {:<14} : {}", i * INSTR_SIZE, hex.join(" "), text)
        })
        .collect()
}
