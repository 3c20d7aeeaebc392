use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{AwaitKey, Config};
use crate::decode::{decode, Instruction, Opcode};
use crate::display::{Display, HEIGHT, WIDTH};
use crate::error::{Fault, KeyError, LoadError};
use crate::font;
use crate::keypad::Keypad;
use crate::machine::{Machine, ADDR_MASK, FLAG, LOAD_ADDR};

// Where the program counter goes after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Skip,
    Jump(u16),
    // run the same instruction again next cycle
    Stay,
}

/// A CHIP-8 interpreter.
#[derive(Debug)]
pub struct Chip8 {
    machine: Machine,
    display: Display,
    keypad: Arc<Keypad>,
    rng: StdRng,
    await_key: AwaitKey,
    // 0NNN addresses already reported, so a loop over one logs once
    native_warned: HashSet<u16>,
}

impl Chip8 {
    /// Returns a new interpreter with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Chip8 {
            machine: Machine::new(),
            display: Display::new(),
            keypad: Arc::new(Keypad::new()),
            rng,
            await_key: config.await_key,
            native_warned: HashSet::new(),
        }
    }

    /// Loads the provided bytes at 0x200 and points the program counter at them.
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.machine.load(program)
    }

    /// Zeroes the machine, reloads the font and clears the screen.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.display.reset();
        self.keypad.release_all();
        self.native_warned.clear();
    }

    /// Moves the program counter back to the load address.
    pub fn rewind(&mut self) {
        self.machine.pc = LOAD_ADDR;
    }

    pub fn set_key(&self, key: usize, pressed: bool) -> Result<(), KeyError> {
        self.keypad.set(key, pressed)
    }

    /// A handle the host can use to write keys from another thread.
    pub fn keypad(&self) -> Arc<Keypad> {
        Arc::clone(&self.keypad)
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut Display {
        &mut self.display
    }

    /// Runs `count` fetch-decode-execute cycles, stopping at the first fault.
    pub fn run_cycles(&mut self, count: u32) -> Result<(), Fault> {
        for _ in 0..count {
            self.cycle()?;
        }
        Ok(())
    }

    /// Runs one fetch-decode-execute cycle.
    ///
    /// On a fault the program counter still points at the failing instruction.
    pub fn cycle(&mut self) -> Result<(), Fault> {
        let pc = self.machine.pc;
        let opcode = self.fetch()?;
        let instr = decode(opcode).ok_or(Fault::UnknownInstruction { pc, opcode: opcode.0 })?;
        log::trace!("{pc:#05X}: {:04X} {instr}", opcode.0);

        self.machine.pc = match self.execute(pc, opcode, instr)? {
            Flow::Next => pc + 2,
            Flow::Skip => pc + 4,
            Flow::Jump(addr) => addr,
            Flow::Stay => pc,
        };
        Ok(())
    }

    // Fetches the opcode at the program counter.
    fn fetch(&self) -> Result<Opcode, Fault> {
        let pc = self.machine.pc;
        self.machine
            .word_at(pc)
            .map(Opcode)
            .ok_or(Fault::InvalidOpcodeFetch { pc })
    }

    fn execute(&mut self, pc: u16, opcode: Opcode, instr: Instruction) -> Result<Flow, Fault> {
        let m = &mut self.machine;
        let flow = match instr {
            Instruction::Sys { nnn } => {
                if self.native_warned.insert(pc) {
                    log::warn!("{pc:#05X}: native routine call {nnn:#05X} is not supported, ignoring");
                }
                Flow::Next
            }

            Instruction::Cls => {
                self.display.reset();
                Flow::Next
            }

            // return lands after the call that pushed the address
            Instruction::Ret => {
                let from = m.stack.pop().ok_or(Fault::CallStackUnderflow {
                    pc,
                    opcode: opcode.0,
                })?;
                Flow::Jump(from + 2)
            }

            Instruction::Jump { nnn } => Flow::Jump(nnn),

            Instruction::Call { nnn } => {
                if !m.stack.push(pc) {
                    return Err(Fault::CallStackOverflow { pc, opcode: opcode.0 });
                }
                Flow::Jump(nnn)
            }

            Instruction::SkipEqImm { x, nn } => skip_if(m.registers[x] == nn),
            Instruction::SkipNeImm { x, nn } => skip_if(m.registers[x] != nn),
            Instruction::SkipEqReg { x, y } => skip_if(m.registers[x] == m.registers[y]),
            Instruction::SkipNeReg { x, y } => skip_if(m.registers[x] != m.registers[y]),

            Instruction::SetImm { x, nn } => {
                m.registers[x] = nn;
                Flow::Next
            }

            // no carry flag for the immediate add
            Instruction::AddImm { x, nn } => {
                m.registers[x] = m.registers[x].wrapping_add(nn);
                Flow::Next
            }

            Instruction::Copy { x, y } => {
                m.registers[x] = m.registers[y];
                Flow::Next
            }

            Instruction::Or { x, y } => {
                m.registers[x] |= m.registers[y];
                Flow::Next
            }

            Instruction::And { x, y } => {
                m.registers[x] &= m.registers[y];
                Flow::Next
            }

            Instruction::Xor { x, y } => {
                m.registers[x] ^= m.registers[y];
                Flow::Next
            }

            // Add and subtract write the flag last, so it wins when x is VF.
            Instruction::Add { x, y } => {
                let sum = m.registers[x] as u16 + m.registers[y] as u16;
                m.registers[x] = (sum & 0x00FF) as u8;
                m.registers[FLAG] = (sum > 0xFF) as u8;
                Flow::Next
            }

            Instruction::Sub { x, y } => {
                let (vx, vy) = (m.registers[x], m.registers[y]);
                m.registers[x] = vx.wrapping_sub(vy);
                m.registers[FLAG] = (vx >= vy) as u8;
                Flow::Next
            }

            // Shifts write the flag first and then shift whatever VX holds,
            // so with x = VF the flag itself is shifted.
            Instruction::Shr { x } => {
                m.registers[FLAG] = m.registers[x] & 0x01;
                m.registers[x] >>= 1;
                Flow::Next
            }

            Instruction::SubRev { x, y } => {
                let (vx, vy) = (m.registers[x], m.registers[y]);
                m.registers[x] = vy.wrapping_sub(vx);
                m.registers[FLAG] = (vy >= vx) as u8;
                Flow::Next
            }

            Instruction::Shl { x } => {
                m.registers[FLAG] = (m.registers[x] & 0x80) >> 7;
                m.registers[x] <<= 1;
                Flow::Next
            }

            Instruction::SetIndex { nnn } => {
                m.index = nnn;
                Flow::Next
            }

            Instruction::JumpV0 { nnn } => Flow::Jump((nnn + m.registers[0] as u16) & ADDR_MASK),

            // half-open: nn itself is never produced
            Instruction::Random { x, nn } => {
                m.registers[x] = if nn == 0 { 0 } else { self.rng.gen_range(0..nn) };
                Flow::Next
            }

            Instruction::Draw { x, y, n } => {
                let vx = m.registers[x] as usize;
                let vy = m.registers[y] as usize;
                let mut collision = false;
                for row in 0..n as u16 {
                    let sprite_row = m.read(m.index.wrapping_add(row));
                    for col in 0..8 {
                        if (sprite_row >> (7 - col)) & 0x01 == 0x01 {
                            let px = (vx + col) % WIDTH;
                            let py = (vy + row as usize) % HEIGHT;
                            collision |= self.display.toggle(px, py);
                        }
                    }
                }
                m.registers[FLAG] = collision as u8;
                Flow::Next
            }

            Instruction::SkipKey { x } => skip_if(self.keypad.is_pressed(m.registers[x])),
            Instruction::SkipNotKey { x } => skip_if(!self.keypad.is_pressed(m.registers[x])),

            Instruction::GetDelay { x } => {
                m.registers[x] = m.dt;
                Flow::Next
            }

            Instruction::AwaitKey { x } => match (self.keypad.first_pressed(), self.await_key) {
                (Some(key), AwaitKey::Block) => {
                    m.registers[x] = key;
                    Flow::Next
                }
                (None, AwaitKey::Block) => Flow::Stay,
                (Some(key), AwaitKey::Poll) => {
                    m.registers[x] = key;
                    Flow::Skip
                }
                (None, AwaitKey::Poll) => Flow::Next,
            },

            Instruction::SetDelay { x } => {
                m.dt = m.registers[x];
                Flow::Next
            }

            Instruction::SetSound { x } => {
                m.st = m.registers[x];
                Flow::Next
            }

            // VF is cleared before VX is read
            Instruction::AddIndex { x } => {
                m.registers[FLAG] = 0;
                let sum = (m.index & ADDR_MASK) + m.registers[x] as u16;
                if sum > ADDR_MASK {
                    m.registers[FLAG] = 1;
                }
                m.index = sum & ADDR_MASK;
                Flow::Next
            }

            Instruction::Font { x } => {
                m.index = font::glyph_addr(m.registers[x]);
                Flow::Next
            }

            Instruction::Bcd { x } => {
                let val = m.registers[x];
                let i = m.index;
                m.write(i, val / 100);
                m.write(i.wrapping_add(1), (val / 10) % 10);
                m.write(i.wrapping_add(2), val % 10);
                Flow::Next
            }

            Instruction::Store { x } => {
                for reg in 0..=x {
                    let value = m.registers[reg];
                    m.write(m.index.wrapping_add(reg as u16), value);
                }
                Flow::Next
            }

            Instruction::Load { x } => {
                for reg in 0..=x {
                    m.registers[reg] = m.read(m.index.wrapping_add(reg as u16));
                }
                Flow::Next
            }
        };
        Ok(flow)
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

fn skip_if(cond: bool) -> Flow {
    if cond {
        Flow::Skip
    } else {
        Flow::Next
    }
}
