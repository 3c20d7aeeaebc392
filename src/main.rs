use std::error::Error;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::Print;
use crossterm::{cursor, execute, queue, terminal};

use chip8vm::display::{Frame, WIDTH};
use chip8vm::keypad::{Keypad, KEY_COUNT};
use chip8vm::rom::Rom;
use chip8vm::{AwaitKey, Clock, Config, Fault};

// How long a key counts as held on terminals that never report key release.
const HOLD: Duration = Duration::from_millis(150);
// Event wait while the clock is stopped.
const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Left-hand side of a qwerty keyboard, laid out like the COSMAC VIP keypad.
const KEYMAP: [(char, u8); KEY_COUNT] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0A),
    ('c', 0x0B),
    ('4', 0x0C),
    ('r', 0x0D),
    ('f', 0x0E),
    ('v', 0x0F),
];

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// A Chip-8 virtual machine for the terminal.
///
/// Keys: 1234/qwer/asdf/zxcv. Space pauses, F5 restarts, Esc quits.
struct Cli {
    /// The binary ROM file to run
    #[arg(value_name = "ROM")]
    rom: PathBuf,

    /// Clock invocations per second; timers count down once per invocation
    #[arg(long, default_value_t = 60)]
    tick_hz: u32,

    /// Instructions run per clock invocation
    #[arg(long, default_value_t = 4)]
    cycles_per_tick: u32,

    /// How FX0A waits for a key
    #[arg(long, value_enum, default_value_t = AwaitKeyArg::Block)]
    await_key: AwaitKeyArg,

    /// Seed for the random number instruction
    #[arg(long)]
    seed: Option<u64>,

    /// Write log output to this file. Without it only errors are logged,
    /// since stderr shares the terminal with the display
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AwaitKeyArg {
    /// Halt until a key is pressed
    Block,
    /// Check once; skip the next instruction if a key is down
    Poll,
}

impl From<AwaitKeyArg> for AwaitKey {
    fn from(arg: AwaitKeyArg) -> Self {
        match arg {
            AwaitKeyArg::Block => AwaitKey::Block,
            AwaitKeyArg::Poll => AwaitKey::Poll,
        }
    }
}

fn main() {
    let args = Cli::parse();
    if let Err(e) = init_logging(args.log_file.as_deref()) {
        eprintln!("error opening log file: {e}");
        process::exit(1);
    }

    let rom = match Rom::from_file(&args.rom) {
        Ok(rom) => rom,
        Err(e) => {
            eprintln!("error reading Chip-8 ROM: {e}");
            process::exit(1);
        }
    };

    let config = Config {
        tick_hz: args.tick_hz,
        cycles_per_tick: args.cycles_per_tick,
        await_key: args.await_key.into(),
        seed: args.seed,
    };
    let mut clock = Clock::new(&config);

    if let Err(e) = run(&mut clock, &rom) {
        eprintln!("error: {e}");
        if let Some(fault) = e.downcast_ref::<Fault>() {
            let regs = clock.chip8().machine().registers;
            eprintln!("halted at {:#05X}, registers {regs:02X?}", fault.pc());
        }
        process::exit(1);
    }
}

fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let default = if log_file.is_some() { "warn" } else { "error" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default));
    if let Some(path) = log_file {
        builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();
    Ok(())
}

// Runs until Esc or a fault. The terminal is restored before this returns.
fn run(clock: &mut Clock, rom: &Rom) -> Result<(), Box<dyn Error>> {
    clock.reload(rom)?;
    let mut screen = Screen::enter()?;
    let keypad = clock.chip8().keypad();
    let mut keys = KeyHold::new(!screen.reports_release);
    let mut tone = false;

    clock.start(Instant::now());
    screen.draw(clock.chip8().display().rows())?;
    screen.status(clock.is_running())?;

    loop {
        let now = Instant::now();
        let wait = match clock.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now),
            None => IDLE_WAIT,
        };

        if event::poll(wait)? {
            match event::read()? {
                Event::Key(key) => match command(key) {
                    Command::Quit => break,
                    Command::Pause => {
                        if clock.is_running() {
                            clock.stop();
                        } else {
                            clock.resume(Instant::now());
                        }
                        screen.status(clock.is_running())?;
                    }
                    Command::Restart => {
                        clock.reload(rom)?;
                        clock.start(Instant::now());
                        screen.draw(clock.chip8().display().rows())?;
                        screen.status(clock.is_running())?;
                    }
                    Command::Key(k, true) => keys.press(&keypad, k, Instant::now()),
                    Command::Key(k, false) => keys.release(&keypad, k),
                    Command::None => {}
                },
                Event::Resize(..) => {
                    screen.draw(clock.chip8().display().rows())?;
                    screen.status(clock.is_running())?;
                }
                _ => {}
            }
        }

        let now = Instant::now();
        keys.expire(&keypad, now);
        if let Some(report) = clock.poll(now)? {
            if report.redraw {
                screen.draw(clock.chip8().display().rows())?;
            }
            if report.tone && !tone {
                screen.beep()?;
            }
            tone = report.tone;
        }
    }
    Ok(())
}

enum Command {
    Quit,
    Pause,
    Restart,
    Key(u8, bool),
    None,
}

fn command(event: KeyEvent) -> Command {
    let pressed = event.kind != KeyEventKind::Release;
    match event.code {
        KeyCode::Esc => Command::Quit,
        // raw mode swallows SIGINT
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Command::Quit,
        KeyCode::Char(' ') if pressed => Command::Pause,
        KeyCode::F(5) if pressed => Command::Restart,
        KeyCode::Char(c) => match map_key(c) {
            Some(k) => Command::Key(k, pressed),
            None => {
                log::debug!("no keypad mapping for {c:?}");
                Command::None
            }
        },
        _ => Command::None,
    }
}

fn map_key(c: char) -> Option<u8> {
    let c = c.to_ascii_lowercase();
    KEYMAP.iter().find(|&&(k, _)| k == c).map(|&(_, key)| key)
}

// Tracks when each key went down so keys can be released on terminals
// without release events.
struct KeyHold {
    pressed_at: [Option<Instant>; KEY_COUNT],
    expires: bool,
}

impl KeyHold {
    fn new(expires: bool) -> Self {
        KeyHold {
            pressed_at: [None; KEY_COUNT],
            expires,
        }
    }

    fn press(&mut self, keypad: &Keypad, key: u8, now: Instant) {
        self.pressed_at[key as usize] = Some(now);
        set_key(keypad, key as usize, true);
    }

    fn release(&mut self, keypad: &Keypad, key: u8) {
        self.pressed_at[key as usize] = None;
        set_key(keypad, key as usize, false);
    }

    fn expire(&mut self, keypad: &Keypad, now: Instant) {
        if !self.expires {
            return;
        }
        for (key, at) in self.pressed_at.iter_mut().enumerate() {
            if at.map_or(false, |t| now.duration_since(t) >= HOLD) {
                *at = None;
                set_key(keypad, key, false);
            }
        }
    }
}

fn set_key(keypad: &Keypad, key: usize, pressed: bool) {
    if let Err(e) = keypad.set(key, pressed) {
        log::warn!("{e}");
    }
}

// Raw-mode alternate screen. Restores the terminal on drop.
struct Screen {
    stdout: io::Stdout,
    enhanced: bool,
    reports_release: bool,
}

impl Screen {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide, terminal::Clear(terminal::ClearType::All))?;

        let enhanced = matches!(terminal::supports_keyboard_enhancement(), Ok(true));
        if enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        Ok(Screen {
            stdout,
            enhanced,
            reports_release: enhanced || cfg!(windows),
        })
    }

    // Two display rows per terminal line using half blocks.
    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        queue!(self.stdout, cursor::MoveTo(0, 0))?;
        for pair in frame.chunks(2) {
            let mut line = String::with_capacity(WIDTH * 3);
            for x in 0..WIDTH {
                let top = pair[0][x] == 1;
                let bottom = pair.get(1).map_or(false, |row| row[x] == 1);
                line.push(match (top, bottom) {
                    (true, true) => '\u{2588}',
                    (true, false) => '\u{2580}',
                    (false, true) => '\u{2584}',
                    (false, false) => ' ',
                });
            }
            queue!(self.stdout, Print(line), cursor::MoveToNextLine(1))?;
        }
        self.stdout.flush()
    }

    fn status(&mut self, running: bool) -> io::Result<()> {
        let state = if running { "running" } else { "paused " };
        queue!(
            self.stdout,
            cursor::MoveTo(0, 17),
            Print(format!("[{state}] space: pause  f5: restart  esc: quit"))
        )?;
        self.stdout.flush()
    }

    fn beep(&mut self) -> io::Result<()> {
        queue!(self.stdout, Print('\u{7}'))?;
        self.stdout.flush()
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(self.stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(self.stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
