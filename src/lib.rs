//! Terminal front end for a CHIP-8 execution engine.
//!
//! ## Design
//!
//! * the engine (instructions, registers, timers, framebuffer, keypad state)
//!   is somebody else's: a native module loaded at run time and only ever
//!   called through a handful of exports
//! * this crate does everything around it: load the engine and programs, turn
//!   key presses into keypad codes, tick the engine while playing, draw the
//!   framebuffer every time the engine says it changed
//! * single threaded and cooperative; the engine's draw and sound callbacks
//!   fire synchronously from inside `cycle()`
//! * display, input and sound sit behind traits so alternatives plug in;
//!   starting with TUI in-console
//!
//! Model
//!
//! ```text
//! main
//!  |-- config, logging
//!  |-- ModuleLoader::load -> EngineHandle        (fatal if this fails)
//!  |-- EngineAdapter(handle, assets)
//!  |    |-- on_draw  -> RenderSink(TermSurface)
//!  |    `-- on_sound -> ToneSink(SimpleBeep | Mute)
//!  `-- Host(engine, TermInput, TimerQueue, PlaybackController)
//!       `-- main loop
//!            |-- keys     -> InputMapper -> engine.set_key
//!            |-- controls -> controller.play / pause / reset / change_program
//!            `-- ticks    -> controller.on_tick -> engine.cycle
//! ```

pub mod assets;
pub mod config;
pub mod display;
pub mod engine;
pub mod host;
pub mod input;
pub mod loader;
pub mod playback;
pub mod sound;
pub mod timer;

/// device display width in pixels
pub const WIDTH: usize = 64;
/// device display height in pixels
pub const HEIGHT: usize = 32;
