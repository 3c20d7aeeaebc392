use crate::error::LoadError;
use crate::font::{FONT, FONT_ADDR};

// Number of bytes in the machine's memory.
pub const MEM_BYTES: usize = 4096;
// Programs are loaded here and execution starts here.
pub const LOAD_ADDR: u16 = 0x200;
// Maximum allowed bytes of a program.
pub const MAX_PROGRAM_BYTES: usize = MEM_BYTES - LOAD_ADDR as usize;
pub const REGISTER_COUNT: usize = 16;
pub const STACK_DEPTH: usize = 16;
/// VF, the implicit output of arithmetic and draw instructions.
pub const FLAG: usize = 0x0F;

/// Mask for 12-bit addresses.
pub const ADDR_MASK: u16 = 0x0FFF;

/// Bounded LIFO of return addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    slots: [u16; STACK_DEPTH],
    depth: usize,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack {
            slots: [0; STACK_DEPTH],
            depth: 0,
        }
    }

    /// Pushes `addr`. Returns false, leaving the stack untouched, when full.
    #[must_use]
    pub fn push(&mut self, addr: u16) -> bool {
        if self.depth == STACK_DEPTH {
            return false;
        }
        self.slots[self.depth] = addr;
        self.depth += 1;
        true
    }

    pub fn pop(&mut self) -> Option<u16> {
        self.depth = self.depth.checked_sub(1)?;
        Some(self.slots[self.depth])
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.slots[..self.depth]
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers, memory, call stack and timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub memory: [u8; MEM_BYTES],
    pub registers: [u8; REGISTER_COUNT],
    pub stack: CallStack,
    pub pc: u16,
    pub index: u16,
    /// Delay timer.
    pub dt: u8,
    /// Sound timer.
    pub st: u8,
}

impl Machine {
    /// Returns a zeroed machine with the font loaded and pc at the load address.
    pub fn new() -> Self {
        let mut machine = Machine {
            memory: [0; MEM_BYTES],
            registers: [0; REGISTER_COUNT],
            stack: CallStack::new(),
            pc: LOAD_ADDR,
            index: 0,
            dt: 0,
            st: 0,
        };
        machine.load_font();
        machine
    }

    /// Zeroes registers, memory, stack and timers, then reloads the font.
    pub fn reset(&mut self) {
        self.memory.fill(0);
        self.registers.fill(0);
        self.stack.clear();
        self.index = 0;
        self.dt = 0;
        self.st = 0;
        self.pc = LOAD_ADDR;
        self.load_font();
        log::debug!("machine reset");
    }

    /// Copies `program` to the load address and points pc at it.
    ///
    /// Memory is left untouched if the program does not fit.
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        if program.len() > MAX_PROGRAM_BYTES {
            return Err(LoadError::TooLarge {
                len: program.len(),
                max: MAX_PROGRAM_BYTES,
            });
        }
        let start = LOAD_ADDR as usize;
        self.memory[start..start + program.len()].copy_from_slice(program);
        self.pc = LOAD_ADDR;
        log::debug!("loaded {} program bytes at {:#05X}", program.len(), LOAD_ADDR);
        Ok(())
    }

    /// Reads the big-endian word at `addr`, or None past the end of memory.
    pub fn word_at(&self, addr: u16) -> Option<u16> {
        let addr = addr as usize;
        let bytes = self.memory.get(addr..addr + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads memory at a computed address, wrapped into 12 bits.
    pub fn read(&self, addr: u16) -> u8 {
        self.memory[(addr & ADDR_MASK) as usize]
    }

    /// Writes memory at a computed address, wrapped into 12 bits.
    pub fn write(&mut self, addr: u16, value: u8) {
        self.memory[(addr & ADDR_MASK) as usize] = value;
    }

    /// Decrements both timers towards zero.
    pub fn tick_timers(&mut self) {
        self.dt = self.dt.saturating_sub(1);
        self.st = self.st.saturating_sub(1);
    }

    fn load_font(&mut self) {
        let start = FONT_ADDR as usize;
        self.memory[start..start + FONT.len()].copy_from_slice(&FONT);
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
