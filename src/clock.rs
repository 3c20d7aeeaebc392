use std::time::{Duration, Instant};

use crate::chip8::Chip8;
use crate::config::Config;
use crate::error::{Fault, KeyError, LoadError};

// Most invocations a single poll will run to catch up after a stall.
const MAX_CATCH_UP: u32 = 4;

/// What the host needs to know after a clock invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// The sound timer was nonzero; the host should be playing its tone.
    pub tone: bool,
    /// The display changed and should be redrawn.
    pub redraw: bool,
}

/// Drives the interpreter at a fixed rate.
///
/// Each invocation decrements the timers once and then runs a fixed batch of
/// cycles, so instruction throughput does not affect timer cadence. The clock
/// does no sleeping itself: the host waits until [`Clock::next_deadline`] and
/// then calls [`Clock::poll`].
#[derive(Debug)]
pub struct Clock {
    chip8: Chip8,
    cycles_per_tick: u32,
    period: Duration,
    next_tick: Option<Instant>,
}

impl Clock {
    pub fn new(config: &Config) -> Self {
        Clock {
            chip8: Chip8::with_config(config),
            cycles_per_tick: config.cycles_per_tick,
            period: config.tick_period(),
            next_tick: None,
        }
    }

    pub fn chip8(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }

    /// Copies `program` to 0x200 without touching the rest of the machine.
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.chip8.load(program)
    }

    /// Stops, clears the screen, zeroes the machine and loads `program`.
    /// Call [`Clock::start`] afterwards to run it.
    pub fn reload(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.reset();
        self.chip8.load(program)
    }

    /// Stops the clock and zeroes the machine and display.
    pub fn reset(&mut self) {
        self.stop();
        self.chip8.reset();
    }

    pub fn set_key(&self, key: usize, pressed: bool) -> Result<(), KeyError> {
        self.chip8.set_key(key, pressed)
    }

    /// Rewinds to 0x200 and schedules the first invocation at `now`.
    /// Does nothing if already running.
    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            return;
        }
        self.chip8.rewind();
        self.next_tick = Some(now);
        log::debug!("clock started, {} cycles every {:?}", self.cycles_per_tick, self.period);
    }

    /// Continues a stopped run from the current program counter.
    pub fn resume(&mut self, now: Instant) {
        if self.is_running() {
            return;
        }
        self.next_tick = Some(now);
        log::debug!("clock resumed at {:#05X}", self.chip8.machine().pc);
    }

    /// Cancels any pending invocation. Machine state is left as is.
    pub fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            log::debug!("clock stopped at {:#05X}", self.chip8.machine().pc);
        }
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// When the next invocation is due, or None while stopped.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Runs every invocation due by `now`.
    ///
    /// Returns None if nothing was due. A fault stops the clock.
    pub fn poll(&mut self, now: Instant) -> Result<Option<TickReport>, Fault> {
        let mut report: Option<TickReport> = None;
        let mut ran = 0;
        while let Some(due) = self.next_tick {
            if due > now {
                break;
            }
            if ran == MAX_CATCH_UP {
                log::debug!("clock fell behind, skipping to {:?} from now", self.period);
                self.next_tick = Some(now + self.period);
                break;
            }
            self.next_tick = Some(due + self.period);
            let tick = self.tick()?;
            ran += 1;
            report = Some(TickReport {
                tone: tick.tone,
                redraw: tick.redraw || report.map_or(false, |r| r.redraw),
            });
        }
        Ok(report)
    }

    /// One clock invocation, whether or not the clock is running.
    pub fn tick(&mut self) -> Result<TickReport, Fault> {
        let machine = self.chip8.machine_mut();
        machine.tick_timers();
        let tone = machine.st != 0;

        if let Err(fault) = self.chip8.run_cycles(self.cycles_per_tick) {
            log::error!("{fault}");
            self.stop();
            return Err(fault);
        }
        let redraw = self.chip8.display_mut().take_dirty();
        Ok(TickReport { tone, redraw })
    }
}
