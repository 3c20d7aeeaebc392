//! A CHIP-8 virtual machine.
//!
//! The library owns the interpreter and the state it mutates. Rendering,
//! audio, key binding and reading program files belong to the host; see
//! `src/main.rs` for the terminal host.

pub mod chip8;
pub mod clock;
pub mod config;
pub mod decode;
pub mod display;
pub mod error;
pub mod font;
pub mod keypad;
pub mod machine;
pub mod rom;

pub use chip8::Chip8;
pub use clock::{Clock, TickReport};
pub use config::{AwaitKey, Config};
pub use error::{Fault, KeyError, LoadError, RomError};
