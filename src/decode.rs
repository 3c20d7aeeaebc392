use std::fmt;

/// A raw 16-bit instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    pub fn x(self) -> usize {
        ((self.0 & 0x0F00) >> 8) as usize
    }

    pub fn y(self) -> usize {
        ((self.0 & 0x00F0) >> 4) as usize
    }

    pub fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    pub fn nn(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    pub fn nnn(self) -> u16 {
        self.0 & 0x0FFF
    }
}

/// Instruction families of the base CHIP-8 set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Sys,
    Cls,
    Ret,
    Jump,
    Call,
    SkipEqImm,
    SkipNeImm,
    SkipEqReg,
    SetImm,
    AddImm,
    Copy,
    Or,
    And,
    Xor,
    Add,
    Sub,
    Shr,
    SubRev,
    Shl,
    SkipNeReg,
    SetIndex,
    JumpV0,
    Random,
    Draw,
    SkipKey,
    SkipNotKey,
    GetDelay,
    AwaitKey,
    SetDelay,
    SetSound,
    AddIndex,
    Font,
    Bcd,
    Store,
    Load,
}

/// (mask, expected value, family). The first entry where
/// `opcode & mask == expected` wins, so the order is significant: 00E0 and
/// 00EE also match the 0NNN entry and must come before it.
pub const DECODE_TABLE: [(u16, u16, Family); 35] = [
    (0xFFFF, 0x00E0, Family::Cls),
    (0xFFFF, 0x00EE, Family::Ret),
    (0xF000, 0x0000, Family::Sys),
    (0xF000, 0x1000, Family::Jump),
    (0xF000, 0x2000, Family::Call),
    (0xF000, 0x3000, Family::SkipEqImm),
    (0xF000, 0x4000, Family::SkipNeImm),
    (0xF00F, 0x5000, Family::SkipEqReg),
    (0xF000, 0x6000, Family::SetImm),
    (0xF000, 0x7000, Family::AddImm),
    (0xF00F, 0x8000, Family::Copy),
    (0xF00F, 0x8001, Family::Or),
    (0xF00F, 0x8002, Family::And),
    (0xF00F, 0x8003, Family::Xor),
    (0xF00F, 0x8004, Family::Add),
    (0xF00F, 0x8005, Family::Sub),
    (0xF00F, 0x8006, Family::Shr),
    (0xF00F, 0x8007, Family::SubRev),
    (0xF00F, 0x800E, Family::Shl),
    (0xF00F, 0x9000, Family::SkipNeReg),
    (0xF000, 0xA000, Family::SetIndex),
    (0xF000, 0xB000, Family::JumpV0),
    (0xF000, 0xC000, Family::Random),
    (0xF000, 0xD000, Family::Draw),
    (0xF0FF, 0xE09E, Family::SkipKey),
    (0xF0FF, 0xE0A1, Family::SkipNotKey),
    (0xF0FF, 0xF007, Family::GetDelay),
    (0xF0FF, 0xF00A, Family::AwaitKey),
    (0xF0FF, 0xF015, Family::SetDelay),
    (0xF0FF, 0xF018, Family::SetSound),
    (0xF0FF, 0xF01E, Family::AddIndex),
    (0xF0FF, 0xF029, Family::Font),
    (0xF0FF, 0xF033, Family::Bcd),
    (0xF0FF, 0xF055, Family::Store),
    (0xF0FF, 0xF065, Family::Load),
];

/// A decoded instruction with its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 0nnn, call a native routine. Not supported, runs as a no-op.
    Sys { nnn: u16 },
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1nnn
    Jump { nnn: u16 },
    /// 2nnn
    Call { nnn: u16 },
    /// 3xnn
    SkipEqImm { x: usize, nn: u8 },
    /// 4xnn
    SkipNeImm { x: usize, nn: u8 },
    /// 5xy0
    SkipEqReg { x: usize, y: usize },
    /// 6xnn
    SetImm { x: usize, nn: u8 },
    /// 7xnn
    AddImm { x: usize, nn: u8 },
    /// 8xy0
    Copy { x: usize, y: usize },
    /// 8xy1
    Or { x: usize, y: usize },
    /// 8xy2
    And { x: usize, y: usize },
    /// 8xy3
    Xor { x: usize, y: usize },
    /// 8xy4
    Add { x: usize, y: usize },
    /// 8xy5
    Sub { x: usize, y: usize },
    /// 8xy6
    Shr { x: usize },
    /// 8xy7
    SubRev { x: usize, y: usize },
    /// 8xyE
    Shl { x: usize },
    /// 9xy0
    SkipNeReg { x: usize, y: usize },
    /// Annn
    SetIndex { nnn: u16 },
    /// Bnnn
    JumpV0 { nnn: u16 },
    /// Cxnn
    Random { x: usize, nn: u8 },
    /// Dxyn
    Draw { x: usize, y: usize, n: u8 },
    /// Ex9E
    SkipKey { x: usize },
    /// ExA1
    SkipNotKey { x: usize },
    /// Fx07
    GetDelay { x: usize },
    /// Fx0A
    AwaitKey { x: usize },
    /// Fx15
    SetDelay { x: usize },
    /// Fx18
    SetSound { x: usize },
    /// Fx1E
    AddIndex { x: usize },
    /// Fx29
    Font { x: usize },
    /// Fx33
    Bcd { x: usize },
    /// Fx55
    Store { x: usize },
    /// Fx65
    Load { x: usize },
}

/// Finds the first table entry matching `opcode`.
pub fn family(opcode: Opcode) -> Option<Family> {
    DECODE_TABLE
        .iter()
        .find(|&&(mask, value, _)| opcode.0 & mask == value)
        .map(|&(_, _, family)| family)
}

/// Decodes `opcode`, or None if no family matches.
pub fn decode(opcode: Opcode) -> Option<Instruction> {
    let (x, y, n, nn, nnn) = (opcode.x(), opcode.y(), opcode.n(), opcode.nn(), opcode.nnn());
    let instr = match family(opcode)? {
        Family::Sys => Instruction::Sys { nnn },
        Family::Cls => Instruction::Cls,
        Family::Ret => Instruction::Ret,
        Family::Jump => Instruction::Jump { nnn },
        Family::Call => Instruction::Call { nnn },
        Family::SkipEqImm => Instruction::SkipEqImm { x, nn },
        Family::SkipNeImm => Instruction::SkipNeImm { x, nn },
        Family::SkipEqReg => Instruction::SkipEqReg { x, y },
        Family::SetImm => Instruction::SetImm { x, nn },
        Family::AddImm => Instruction::AddImm { x, nn },
        Family::Copy => Instruction::Copy { x, y },
        Family::Or => Instruction::Or { x, y },
        Family::And => Instruction::And { x, y },
        Family::Xor => Instruction::Xor { x, y },
        Family::Add => Instruction::Add { x, y },
        Family::Sub => Instruction::Sub { x, y },
        Family::Shr => Instruction::Shr { x },
        Family::SubRev => Instruction::SubRev { x, y },
        Family::Shl => Instruction::Shl { x },
        Family::SkipNeReg => Instruction::SkipNeReg { x, y },
        Family::SetIndex => Instruction::SetIndex { nnn },
        Family::JumpV0 => Instruction::JumpV0 { nnn },
        Family::Random => Instruction::Random { x, nn },
        Family::Draw => Instruction::Draw { x, y, n },
        Family::SkipKey => Instruction::SkipKey { x },
        Family::SkipNotKey => Instruction::SkipNotKey { x },
        Family::GetDelay => Instruction::GetDelay { x },
        Family::AwaitKey => Instruction::AwaitKey { x },
        Family::SetDelay => Instruction::SetDelay { x },
        Family::SetSound => Instruction::SetSound { x },
        Family::AddIndex => Instruction::AddIndex { x },
        Family::Font => Instruction::Font { x },
        Family::Bcd => Instruction::Bcd { x },
        Family::Store => Instruction::Store { x },
        Family::Load => Instruction::Load { x },
    };
    Some(instr)
}

// Cowgod-style mnemonics.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Sys { nnn } => write!(f, "SYS  {nnn:#05X}"),
            Instruction::Cls => write!(f, "CLS"),
            Instruction::Ret => write!(f, "RET"),
            Instruction::Jump { nnn } => write!(f, "JP   {nnn:#05X}"),
            Instruction::Call { nnn } => write!(f, "CALL {nnn:#05X}"),
            Instruction::SkipEqImm { x, nn } => write!(f, "SE   V{x:X}, {nn:#04X}"),
            Instruction::SkipNeImm { x, nn } => write!(f, "SNE  V{x:X}, {nn:#04X}"),
            Instruction::SkipEqReg { x, y } => write!(f, "SE   V{x:X}, V{y:X}"),
            Instruction::SetImm { x, nn } => write!(f, "LD   V{x:X}, {nn:#04X}"),
            Instruction::AddImm { x, nn } => write!(f, "ADD  V{x:X}, {nn:#04X}"),
            Instruction::Copy { x, y } => write!(f, "LD   V{x:X}, V{y:X}"),
            Instruction::Or { x, y } => write!(f, "OR   V{x:X}, V{y:X}"),
            Instruction::And { x, y } => write!(f, "AND  V{x:X}, V{y:X}"),
            Instruction::Xor { x, y } => write!(f, "XOR  V{x:X}, V{y:X}"),
            Instruction::Add { x, y } => write!(f, "ADD  V{x:X}, V{y:X}"),
            Instruction::Sub { x, y } => write!(f, "SUB  V{x:X}, V{y:X}"),
            Instruction::Shr { x } => write!(f, "SHR  V{x:X}"),
            Instruction::SubRev { x, y } => write!(f, "SUBN V{x:X}, V{y:X}"),
            Instruction::Shl { x } => write!(f, "SHL  V{x:X}"),
            Instruction::SkipNeReg { x, y } => write!(f, "SNE  V{x:X}, V{y:X}"),
            Instruction::SetIndex { nnn } => write!(f, "LD   I, {nnn:#05X}"),
            Instruction::JumpV0 { nnn } => write!(f, "JP   V0, {nnn:#05X}"),
            Instruction::Random { x, nn } => write!(f, "RND  V{x:X}, {nn:#04X}"),
            Instruction::Draw { x, y, n } => write!(f, "DRW  V{x:X}, V{y:X}, {n}"),
            Instruction::SkipKey { x } => write!(f, "SKP  V{x:X}"),
            Instruction::SkipNotKey { x } => write!(f, "SKNP V{x:X}"),
            Instruction::GetDelay { x } => write!(f, "LD   V{x:X}, DT"),
            Instruction::AwaitKey { x } => write!(f, "LD   V{x:X}, K"),
            Instruction::SetDelay { x } => write!(f, "LD   DT, V{x:X}"),
            Instruction::SetSound { x } => write!(f, "LD   ST, V{x:X}"),
            Instruction::AddIndex { x } => write!(f, "ADD  I, V{x:X}"),
            Instruction::Font { x } => write!(f, "LD   F, V{x:X}"),
            Instruction::Bcd { x } => write!(f, "LD   B, V{x:X}"),
            Instruction::Store { x } => write!(f, "LD   [I], V{x:X}"),
            Instruction::Load { x } => write!(f, "LD   V{x:X}, [I]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_nibbles() {
        let op = Opcode(0xD12F);
        assert_eq!(op.x(), 0x1);
        assert_eq!(op.y(), 0x2);
        assert_eq!(op.n(), 0xF);
        assert_eq!(op.nn(), 0x2F);
        assert_eq!(op.nnn(), 0x12F);
    }

    #[test]
    fn table_order_breaks_ties() {
        // 00E0 matches both its own entry and 0NNN
        let matching: Vec<Family> = DECODE_TABLE
            .iter()
            .filter(|&&(mask, value, _)| 0x00E0 & mask == value)
            .map(|&(_, _, family)| family)
            .collect();
        assert_eq!(matching, vec![Family::Cls, Family::Sys]);
        assert_eq!(decode(Opcode(0x00E0)), Some(Instruction::Cls));
        assert_eq!(decode(Opcode(0x00EE)), Some(Instruction::Ret));
        assert_eq!(decode(Opcode(0x00E1)), Some(Instruction::Sys { nnn: 0x0E1 }));
    }

    #[test]
    fn decodes_alu_variants_by_low_nibble() {
        assert_eq!(decode(Opcode(0x8AB0)), Some(Instruction::Copy { x: 0xA, y: 0xB }));
        assert_eq!(decode(Opcode(0x8AB4)), Some(Instruction::Add { x: 0xA, y: 0xB }));
        assert_eq!(decode(Opcode(0x8AB7)), Some(Instruction::SubRev { x: 0xA, y: 0xB }));
        assert_eq!(decode(Opcode(0x8ABE)), Some(Instruction::Shl { x: 0xA }));
        assert_eq!(decode(Opcode(0x8AB8)), None);
    }

    #[test]
    fn rejects_unassigned_words() {
        for word in [0x5121, 0x9AB1, 0xE19F, 0xF0FF, 0xF166, 0x800F] {
            assert_eq!(decode(Opcode(word)), None, "{word:#06X}");
        }
    }

    #[test]
    fn every_family_has_one_entry() {
        for (i, &(_, _, a)) in DECODE_TABLE.iter().enumerate() {
            for &(_, _, b) in &DECODE_TABLE[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn every_entry_decodes_its_own_value() {
        for &(_, value, family) in &DECODE_TABLE {
            assert_eq!(super::family(Opcode(value)), Some(family), "{value:#06X}");
        }
    }

    #[test]
    fn formats_mnemonics() {
        assert_eq!(decode(Opcode(0xA22A)).unwrap().to_string(), "LD   I, 0x22A");
        assert_eq!(decode(Opcode(0xD015)).unwrap().to_string(), "DRW  V0, V1, 5");
        assert_eq!(decode(Opcode(0xFE55)).unwrap().to_string(), "LD   [I], VE");
        assert_eq!(decode(Opcode(0x7002)).unwrap().to_string(), "ADD  V0, 0x02");
    }
}
