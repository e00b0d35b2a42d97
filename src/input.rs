use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use log::{debug, trace};
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

/// left-hand side of a qwerty keyboard, laid out like the COSMAC VIP hex
/// keypad:
///
/// ```text
/// 1 2 3 4      1 2 3 C
/// q w e r  =>  4 5 6 D
/// a s d f      7 8 9 E
/// z x c v      A 0 B F
/// ```
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00), // x
    ('1', 0x01), // 1
    ('2', 0x02), // 2
    ('3', 0x03), // 3
    ('q', 0x04), // q
    ('w', 0x05), // w
    ('e', 0x06), // e
    ('a', 0x07), // a
    ('s', 0x08), // s
    ('d', 0x09), // d
    ('z', 0x0a), // z
    ('c', 0x0b), // c
    ('4', 0x0c), // 4
    ('r', 0x0d), // r
    ('f', 0x0e), // f
    ('v', 0x0f), // v
];

/// One of the 16 keys on the device's hex keypad. Always in `0x0..=0xF`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeypadCode(u8);

impl KeypadCode {
    pub const fn new(code: u8) -> Option<Self> {
        if code <= 0x0f {
            Some(KeypadCode(code))
        } else {
            None
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

/// physical key => keypad code
///
/// NB. `x` maps to 0x0, so "unmapped" has to be `None` and never a zero code
pub struct InputMapper {
    keymap: HashMap<char, KeypadCode>,
}

impl InputMapper {
    pub fn new() -> Self {
        InputMapper {
            keymap: CHIP8_CONVENTIONAL_KEYMAP
                .iter()
                .map(|&(key, code)| (key, KeypadCode(code)))
                .collect(),
        }
    }

    /// the keypad code for a physical key, if it has one
    pub fn lookup(&self, key: char) -> Option<KeypadCode> {
        self.keymap.get(&key).copied()
    }
}

impl Default for InputMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// user-facing playback controls
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Play,
    Pause,
    Reset,
    NextProgram,
    PreviousProgram,
    Quit,
}

/// Control keys. None of these overlap the keypad table.
pub fn control_for(key: &KeyEvent) -> Option<Control> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        // raw mode swallows SIGINT
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Control::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Enter => Some(Control::Play),
        KeyCode::Char(' ') => Some(Control::Pause),
        KeyCode::Backspace => Some(Control::Reset),
        KeyCode::Char(']') => Some(Control::NextProgram),
        KeyCode::Char('[') => Some(Control::PreviousProgram),
        KeyCode::Esc => Some(Control::Quit),
        _ => None,
    }
}

/// The keypad code a terminal key event stands for. Chords with Ctrl or Alt
/// are never keypad presses; shift doesn't make it a different physical key.
pub fn keypad_for(mapper: &InputMapper, key: &KeyEvent) -> Option<KeypadCode> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    match key.code {
        KeyCode::Char(c) => mapper.lookup(c.to_ascii_lowercase()),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Keypad { code: KeypadCode, pressed: bool },
    Control(Control),
}

/// Terminals report presses (and auto-repeats) but never releases, so a key
/// counts as held until `hold` passes without another press of it.
pub struct KeyLatch {
    hold: Duration,
    held: HashMap<KeypadCode, Instant>,
}

impl KeyLatch {
    pub fn new(hold: Duration) -> Self {
        KeyLatch {
            hold,
            held: HashMap::new(),
        }
    }

    /// record a press; true when this is a new pressed edge rather than a
    /// repeat of a key that's already held
    pub fn press(&mut self, code: KeypadCode, now: Instant) -> bool {
        self.held.insert(code, now + self.hold).is_none()
    }

    /// release every key whose hold ran out, in code order
    pub fn expire(&mut self, now: Instant) -> Vec<KeypadCode> {
        let mut released: Vec<KeypadCode> = self
            .held
            .iter()
            .filter(|&(_, until)| *until <= now)
            .map(|(&code, _)| code)
            .collect();
        released.sort();
        for code in &released {
            self.held.remove(code);
        }
        released
    }

    /// when the next held key is due to be released
    pub fn next_deadline(&self) -> Option<Instant> {
        self.held.values().min().copied()
    }

    pub fn is_held(&self, code: KeypadCode) -> bool {
        self.held.contains_key(&code)
    }
}

/// reads keypad and control events
pub trait Input {
    /// drain everything that's happened since the last call, without blocking
    fn poll_events(&mut self, now: Instant) -> Result<Vec<InputEvent>, io::Error>;

    /// the latest time the next call should happen by
    fn next_deadline(&self) -> Option<Instant>;
}

/// Input from the terminal, via crossterm in raw mode
pub struct TermInput {
    mapper: InputMapper,
    latch: KeyLatch,
}

impl TermInput {
    pub fn new(hold: Duration) -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            mapper: InputMapper::new(),
            latch: KeyLatch::new(hold),
        })
    }

    fn translate(&mut self, key: KeyEvent, now: Instant, events: &mut Vec<InputEvent>) {
        if let Some(control) = control_for(&key) {
            events.push(InputEvent::Control(control));
            return;
        }
        match keypad_for(&self.mapper, &key) {
            Some(code) => {
                if self.latch.press(code, now) {
                    events.push(InputEvent::Keypad {
                        code,
                        pressed: true,
                    });
                }
            }
            None => trace!("no keypad mapping for {:?}", key),
        }
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            debug!("failed to leave raw mode: {}", e);
        }
    }
}

impl Input for TermInput {
    fn poll_events(&mut self, now: Instant) -> Result<Vec<InputEvent>, io::Error> {
        let mut events = Vec::new();
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(key) => self.translate(key, now, &mut events),
                other => trace!("ignoring terminal event {:?}", other),
            }
        }
        events.extend(
            self.latch
                .expire(now)
                .into_iter()
                .map(|code| InputEvent::Keypad {
                    code,
                    pressed: false,
                }),
        );
        Ok(events)
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.latch.next_deadline()
    }
}

/// dummy Input implementation for testing; hands out its scripted events on
/// the first poll
pub struct DummyInput {
    events: Vec<InputEvent>,
}

impl DummyInput {
    pub fn new(events: &[InputEvent]) -> Self {
        DummyInput {
            events: Vec::from(events),
        }
    }
}

impl Input for DummyInput {
    fn poll_events(&mut self, _now: Instant) -> Result<Vec<InputEvent>, io::Error> {
        Ok(std::mem::take(&mut self.events))
    }

    fn next_deadline(&self) -> Option<Instant> {
        None
    }
}
