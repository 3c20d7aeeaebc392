use std::fs;
use std::ops::Deref;
use std::path::Path;

use crate::error::RomError;
use crate::machine::MAX_PROGRAM_BYTES;

/// A CHIP-8 program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rom {
    code: Vec<u8>,
}

impl Rom {
    /// Returns a new ROM.
    ///
    /// This function returns Err if `code.len() > MAX_PROGRAM_BYTES || code.is_empty()`.
    pub fn with_code(code: Vec<u8>) -> Result<Self, RomError> {
        if code.is_empty() {
            return Err(RomError::Empty);
        }
        if code.len() > MAX_PROGRAM_BYTES {
            return Err(RomError::TooLarge {
                len: code.len(),
                max: MAX_PROGRAM_BYTES,
            });
        }
        Ok(Rom { code })
    }

    /// Reads and validates the ROM at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RomError> {
        let code = fs::read(path)?;
        Self::with_code(code)
    }
}

impl Deref for Rom {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.code
    }
}

impl AsRef<[u8]> for Rom {
    fn as_ref(&self) -> &[u8] {
        &self.code
    }
}
