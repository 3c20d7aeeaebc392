use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::KeyError;

pub const KEY_COUNT: usize = 16;

/// The 16-key hex keypad.
///
/// Each key is an independent flag, so the host can write keys from its
/// input thread through a shared reference while the interpreter reads them.
#[derive(Debug, Default)]
pub struct Keypad {
    keys: [AtomicBool; KEY_COUNT],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: usize, pressed: bool) -> Result<(), KeyError> {
        let flag = self.keys.get(key).ok_or(KeyError(key))?;
        flag.store(pressed, Ordering::Release);
        Ok(())
    }

    /// Whether the key in the low nibble of `key` is down.
    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0x0F) as usize].load(Ordering::Acquire)
    }

    /// The lowest-numbered key currently down.
    pub fn first_pressed(&self) -> Option<u8> {
        (0..KEY_COUNT as u8).find(|&k| self.is_pressed(k))
    }

    pub fn release_all(&self) {
        for key in &self.keys {
            key.store(false, Ordering::Release);
        }
    }
}
