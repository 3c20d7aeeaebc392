pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;

/// One frame of the display, row-major, one byte per cell (0 or 1).
pub type Frame = [[u8; WIDTH]; HEIGHT];

/// The 64x32 monochrome display buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    cells: Frame,
    dirty: bool,
}

impl Display {
    pub fn new() -> Self {
        Display {
            cells: [[0; WIDTH]; HEIGHT],
            dirty: false,
        }
    }

    /// Flips the cell at `(x, y)`. Coordinates must already be wrapped.
    ///
    /// Returns true if the cell went from set to unset.
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        let cell = &mut self.cells[y][x];
        *cell ^= 0x01;
        self.dirty = true;
        *cell == 0
    }

    /// Clears every cell.
    pub fn reset(&mut self) {
        self.cells.fill([0; WIDTH]);
        self.dirty = true;
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.cells[y][x] == 0x01
    }

    pub fn rows(&self) -> &Frame {
        &self.cells
    }

    pub fn snapshot(&self) -> Frame {
        self.cells
    }

    /// Returns whether the buffer changed since the last call, and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}
