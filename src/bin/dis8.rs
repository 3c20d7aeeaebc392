use std::fmt::Write as _;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use chip8vm::decode::{decode, Opcode};
use chip8vm::machine::{ADDR_MASK, LOAD_ADDR};
use chip8vm::rom::Rom;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// A Chip-8 disassembler.
struct Cli {
    /// The binary ROM file to disassemble
    #[arg(long, value_name = "BINARY")]
    rom: PathBuf,

    /// Address of the first byte, decimal or 0x-prefixed hex
    #[arg(long, default_value = "0x200", value_parser = parse_addr)]
    origin: u16,
}

fn parse_addr(s: &str) -> Result<u16, String> {
    let addr = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("{s:?} is not an address: {e}"))?;
    if addr > ADDR_MASK {
        return Err(format!("{addr:#X} is past the end of memory"));
    }
    Ok(addr)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Cli::parse();
    let rom = match Rom::from_file(&args.rom) {
        Ok(rom) => rom,
        Err(e) => {
            eprintln!("error reading Chip-8 ROM: {e}");
            process::exit(1);
        }
    };
    if args.origin != LOAD_ADDR {
        log::debug!("disassembling from {:#05X}", args.origin);
    }
    print!("{}", listing(&rom, args.origin));
}

// One line per word. Data and operands the interpreter would not decode show as DW.
fn listing(code: &[u8], origin: u16) -> String {
    let mut out = String::new();
    let mut addr = origin as usize;
    for chunk in code.chunks(2) {
        let _ = match *chunk {
            [hi, lo] => {
                let word = u16::from_be_bytes([hi, lo]);
                match decode(Opcode(word)) {
                    Some(instr) => writeln!(out, "{addr:03X}: {word:04X}  {instr}"),
                    None => writeln!(out, "{addr:03X}: {word:04X}  DW   {word:#06X}"),
                }
            }
            [byte] => writeln!(out, "{addr:03X}: {byte:02X}    DB   {byte:#04X}"),
            _ => Ok(()),
        };
        addr += chunk.len();
    }
    out
}
