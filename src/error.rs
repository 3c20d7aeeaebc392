use thiserror::Error;

/// A fatal condition raised while running a program.
///
/// Every fault stops the run. The host decides whether to reset and resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("program counter {pc:#05X} is outside addressable memory")]
    InvalidOpcodeFetch { pc: u16 },

    #[error("unknown instruction {opcode:#06X} at {pc:#05X}")]
    UnknownInstruction { pc: u16, opcode: u16 },

    #[error("call stack overflow at {pc:#05X} ({opcode:#06X})")]
    CallStackOverflow { pc: u16, opcode: u16 },

    #[error("return with an empty call stack at {pc:#05X} ({opcode:#06X})")]
    CallStackUnderflow { pc: u16, opcode: u16 },
}

impl Fault {
    /// The program counter of the instruction that failed.
    pub fn pc(&self) -> u16 {
        match *self {
            Fault::InvalidOpcodeFetch { pc }
            | Fault::UnknownInstruction { pc, .. }
            | Fault::CallStackOverflow { pc, .. }
            | Fault::CallStackUnderflow { pc, .. } => pc,
        }
    }

    /// The opcode that failed, if one could be fetched.
    pub fn opcode(&self) -> Option<u16> {
        match *self {
            Fault::InvalidOpcodeFetch { .. } => None,
            Fault::UnknownInstruction { opcode, .. }
            | Fault::CallStackOverflow { opcode, .. }
            | Fault::CallStackUnderflow { opcode, .. } => Some(opcode),
        }
    }
}

/// Loading a program into memory failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("program is {len} bytes but only {max} bytes fit above 0x200")]
    TooLarge { len: usize, max: usize },
}

/// Reading a program image failed.
#[derive(Debug, Error)]
pub enum RomError {
    #[error("error reading ROM: {0}")]
    Io(#[from] std::io::Error),

    #[error("ROM is empty")]
    Empty,

    #[error("ROM size incorrect. Max size is {max} bytes but {len} bytes were provided")]
    TooLarge { len: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no key {0:#X} on the keypad, keys are 0x0..=0xF")]
pub struct KeyError(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_reports_pc_and_opcode() {
        let fault = Fault::CallStackOverflow { pc: 0x2A0, opcode: 0x2300 };
        assert_eq!(fault.pc(), 0x2A0);
        assert_eq!(fault.opcode(), Some(0x2300));

        let fault = Fault::InvalidOpcodeFetch { pc: 0xFFF };
        assert_eq!(fault.pc(), 0xFFF);
        assert_eq!(fault.opcode(), None);
    }

    #[test]
    fn fault_messages_carry_hex_context() {
        let fault = Fault::UnknownInstruction { pc: 0x200, opcode: 0x5121 };
        assert_eq!(fault.to_string(), "unknown instruction 0x5121 at 0x200");
    }
}
