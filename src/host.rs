//! The environment: owns the engine, the controller and the host timers, and
//! runs the main loop.
//!
//! ```text
//! loop
//!  |-- input events  -> keypad edges to the engine, controls to the controller
//!  |-- expired ticks -> controller.on_tick (cycle, re-arm)
//!  `-- sleep until the next tick / key release / input poll
//! ```
//!
//! Input is handled before ticks in each pass, so a pause typed while a tick
//! was coming due wins.

use crate::engine::EngineAdapter;
use crate::input::{Control, Input, InputEvent};
use crate::playback::{PlaybackController, TickPolicy};
use crate::timer::TimerQueue;
use log::{info, warn};
use std::io;
use std::time::{Duration, Instant};

/// how often the terminal gets looked at when nothing else is due
const INPUT_POLL: Duration = Duration::from_millis(4);

pub struct Host<I: Input> {
    input: I,
    timers: TimerQueue,
    controller: PlaybackController,
    engine: EngineAdapter,
    programs: Vec<String>,
    selected: Option<usize>,
}

impl<I: Input> Host<I> {
    pub fn new(engine: EngineAdapter, input: I, policy: TickPolicy, programs: Vec<String>) -> Self {
        Host {
            input,
            timers: TimerQueue::new(),
            controller: PlaybackController::new(policy),
            engine,
            programs,
            selected: None,
        }
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn engine(&self) -> &EngineAdapter {
        &self.engine
    }

    /// Load the first program: `name` if given, otherwise the first in the
    /// catalogue. A program that won't load leaves us stopped with nothing
    /// loaded; the user can still pick another one.
    pub fn open(&mut self, name: Option<&str>, autoplay: bool) {
        let name = match name.or_else(|| self.programs.first().map(String::as_str)) {
            Some(name) => name.to_owned(),
            None => {
                warn!("no programs to load");
                return;
            }
        };
        if self.select(&name) && autoplay {
            self.controller.play(&mut self.timers);
        }
    }

    /// Run until the user quits.
    pub fn run(&mut self) -> Result<(), io::Error> {
        info!("running; {} program(s) available", self.programs.len());
        while self.pump(Instant::now())? {
            let now = Instant::now();
            let wake = [
                self.timers.next_deadline(),
                self.input.next_deadline(),
                Some(now + INPUT_POLL),
            ]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(now);
            if wake > now {
                spin_sleep::sleep(wake - now);
            }
        }
        info!("quitting");
        Ok(())
    }

    /// One pass of the loop. Returns false once the user asked to quit.
    pub fn pump(&mut self, now: Instant) -> Result<bool, io::Error> {
        for event in self.input.poll_events(now)? {
            if !self.dispatch(event) {
                return Ok(false);
            }
        }
        for handle in self.timers.expired(now) {
            self.controller
                .on_tick(handle, &mut self.timers, &mut self.engine);
        }
        Ok(true)
    }

    fn dispatch(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Keypad { code, pressed } => self.engine.set_key(code, pressed),
            InputEvent::Control(Control::Play) => self.controller.play(&mut self.timers),
            InputEvent::Control(Control::Pause) => self.controller.pause(&mut self.timers),
            InputEvent::Control(Control::Reset) => {
                self.controller.reset(&mut self.timers, &mut self.engine)
            }
            InputEvent::Control(Control::NextProgram) => self.step_program(1),
            InputEvent::Control(Control::PreviousProgram) => self.step_program(-1),
            InputEvent::Control(Control::Quit) => return false,
        }
        true
    }

    fn step_program(&mut self, delta: isize) {
        let count = self.programs.len() as isize;
        if count == 0 {
            warn!("no programs to choose from");
            return;
        }
        let next = match self.selected {
            Some(current) => (current as isize + delta).rem_euclid(count),
            None if delta < 0 => count - 1,
            None => 0,
        };
        let name = self.programs[next as usize].clone();
        self.select(&name);
    }

    /// change program; the selection only moves if the load worked
    fn select(&mut self, name: &str) -> bool {
        match self
            .controller
            .change_program(&mut self.timers, &mut self.engine, name)
        {
            Ok(()) => {
                self.selected = self.programs.iter().position(|p| p == name);
                true
            }
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }
}
