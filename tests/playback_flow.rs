//! Controller + adapter + host timers, driven the way the main loop drives
//! them, against a recording engine.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chip8_term::assets::{MemoryAssets, RomLoadError};
use chip8_term::display::{DummySurface, Palette, RenderSink, Resolution, SurfaceOp};
use chip8_term::engine::{DrawCallback, Engine, EngineAdapter, EngineHandle, SoundCallback};
use chip8_term::input::InputMapper;
use chip8_term::playback::{PlaybackController, PlaybackState, TickPolicy};
use chip8_term::timer::TimerQueue;
use chip8_term::{HEIGHT, WIDTH};

#[derive(Default)]
struct Recorded {
    roms: Vec<Vec<u8>>,
    keys: Vec<(u8, bool)>,
    cycles: usize,
    resets: usize,
}

/// lights cell 0 on the first cycle
struct RecordingEngine {
    log: Rc<RefCell<Recorded>>,
    draw: Option<DrawCallback>,
    sound: Option<SoundCallback>,
}

impl Engine for RecordingEngine {
    fn set_rom(&mut self, rom: Vec<u8>) {
        self.log.borrow_mut().roms.push(rom);
    }

    fn on_draw(&mut self, callback: Option<DrawCallback>) {
        self.draw = callback;
    }

    fn on_sound(&mut self, callback: Option<SoundCallback>) {
        self.sound = callback;
    }

    fn set_key(&mut self, code: u8, pressed: bool) {
        self.log.borrow_mut().keys.push((code, pressed));
    }

    fn reset(&mut self) {
        self.log.borrow_mut().resets += 1;
    }

    fn cycle(&mut self) {
        self.log.borrow_mut().cycles += 1;
        let mut frame = vec![0u8; WIDTH * HEIGHT];
        frame[0] = 1;
        if let Some(draw) = self.draw.as_mut() {
            draw(&frame);
        }
        if let Some(sound) = self.sound.as_mut() {
            sound(false);
        }
    }
}

fn setup() -> (EngineAdapter, Rc<RefCell<Recorded>>) {
    let log = Rc::new(RefCell::new(Recorded::default()));
    let engine = RecordingEngine {
        log: log.clone(),
        draw: None,
        sound: None,
    };
    let assets = MemoryAssets::new()
        .with_program("IBM", &[0x00, 0xe0, 0xa2, 0x2a])
        .with_program("PONG", &[0x6a, 0x02]);
    let adapter = EngineAdapter::new(EngineHandle::new(Box::new(engine)), Box::new(assets));
    (adapter, log)
}

/// fire everything due at `now`, like the host loop does
fn fire(
    timers: &mut TimerQueue,
    c: &mut PlaybackController,
    e: &mut EngineAdapter,
    now: Instant,
) -> usize {
    let mut cycled = 0;
    for handle in timers.expired(now) {
        if c.on_tick(handle, timers, e) {
            cycled += 1;
        }
    }
    cycled
}

fn later(ms: u64) -> Instant {
    Instant::now() + Duration::from_millis(ms)
}

#[test]
fn play_pause_play_keeps_one_timer() {
    let mut timers = TimerQueue::new();
    let mut c = PlaybackController::new(TickPolicy::default());
    c.play(&mut timers);
    c.pause(&mut timers);
    c.play(&mut timers);
    assert_eq!(timers.len(), 1);
    c.play(&mut timers);
    assert_eq!(timers.len(), 1);
}

#[test]
fn no_cycles_after_program_change_until_play() {
    let (mut e, log) = setup();
    let mut timers = TimerQueue::new();
    let mut c = PlaybackController::new(TickPolicy::FixedInterval(Duration::ZERO));

    c.change_program(&mut timers, &mut e, "IBM").unwrap();
    c.play(&mut timers);
    assert_eq!(fire(&mut timers, &mut c, &mut e, later(1)), 1);

    c.change_program(&mut timers, &mut e, "PONG").unwrap();
    assert_eq!(c.state(), PlaybackState::Stopped);
    assert!(timers.is_empty());
    assert_eq!(fire(&mut timers, &mut c, &mut e, later(50)), 0);
    assert_eq!(log.borrow().cycles, 1);
    assert_eq!(log.borrow().roms, vec![vec![0x00, 0xe0, 0xa2, 0x2a], vec![0x6a, 0x02]]);

    c.play(&mut timers);
    assert_eq!(fire(&mut timers, &mut c, &mut e, later(60)), 1);
    assert_eq!(log.borrow().cycles, 2);
}

#[test]
fn rom_load_error_reaches_nothing() {
    let (mut e, log) = setup();
    let mut timers = TimerQueue::new();
    let mut c = PlaybackController::new(TickPolicy::default());
    c.play(&mut timers);
    let err = c.change_program(&mut timers, &mut e, "MISSING").unwrap_err();
    assert!(matches!(err, RomLoadError::NotFound(_)));
    assert_eq!(c.state(), PlaybackState::Stopped);
    assert!(log.borrow().roms.is_empty());
    assert_eq!(e.current_program(), None);
}

#[test]
fn draw_callback_feeds_render_sink() {
    let (mut e, _) = setup();
    let sink = Rc::new(RefCell::new(RenderSink::new(
        DummySurface::new(),
        Resolution(WIDTH, HEIGHT),
        1,
        Palette::default(),
    )));
    let s = sink.clone();
    e.on_draw(move |frame| s.borrow_mut().render(frame).unwrap());

    let mut timers = TimerQueue::new();
    let mut c = PlaybackController::new(TickPolicy::FixedInterval(Duration::ZERO));
    c.play(&mut timers);
    fire(&mut timers, &mut c, &mut e, later(1));

    let sink = sink.borrow();
    let ops = &sink.surface().ops;
    let rects = ops.iter().filter(|op| matches!(op, SurfaceOp::Rect { .. })).count();
    assert_eq!(rects, WIDTH * HEIGHT);
    assert_eq!(ops[0], SurfaceOp::Fill(Palette::default().on));
    assert_eq!(ops[2], SurfaceOp::Fill(Palette::default().off));
}

#[test]
fn key_x_presses_keypad_zero() {
    let (mut e, log) = setup();
    let mapper = InputMapper::new();
    for key in ['x', 'g'] {
        if let Some(code) = mapper.lookup(key) {
            e.set_key(code, true);
            e.set_key(code, false);
        }
    }
    assert_eq!(log.borrow().keys, vec![(0x0, true), (0x0, false)]);
}

#[test]
fn reset_stops_and_resets() {
    let (mut e, log) = setup();
    let mut timers = TimerQueue::new();
    let mut c = PlaybackController::new(TickPolicy::default());
    c.play(&mut timers);
    c.reset(&mut timers, &mut e);
    assert_eq!(c.state(), PlaybackState::Stopped);
    assert!(timers.is_empty());
    assert_eq!(log.borrow().resets, 1);
}
