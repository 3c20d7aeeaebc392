use std::time::Duration;

/// How FX0A waits for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AwaitKey {
    /// Re-run FX0A every cycle until a key is down, then store it and move on.
    /// Timers keep ticking while waiting.
    #[default]
    Block,
    /// Look at the keypad once. If a key is down, store it and skip the next
    /// instruction; otherwise carry on without storing anything.
    Poll,
}

/// Runtime settings for the interpreter and its clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Clock invocations per second. Timers decrement once per invocation.
    pub tick_hz: u32,
    /// Interpreter cycles run inside each clock invocation.
    pub cycles_per_tick: u32,
    pub await_key: AwaitKey,
    /// Fixed seed for CXNN. None seeds from the OS.
    pub seed: Option<u64>,
}

impl Config {
    /// Time between clock invocations.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz.max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tick_hz: 60,
            // 250 instructions per second against a 60 Hz tick
            cycles_per_tick: 250 / 60,
            await_key: AwaitKey::Block,
            seed: None,
        }
    }
}
