//! The execution engine and the typed façade the rest of the crate talks to
//! it through.
//!
//! The engine itself (instruction decode, registers, timers, framebuffer,
//! keypad state) is an external collaborator. Everything in here just passes
//! calls through and keeps track of which program was last handed over.

use crate::assets::{AssetStore, RomLoadError};
use crate::input::KeypadCode;
use log::{debug, info};

/// Called with a full framebuffer snapshot: `WIDTH * HEIGHT` cells, row
/// major, zero is off.
pub type DrawCallback = Box<dyn FnMut(&[u8])>;

/// Called whenever the tone turns on or off.
pub type SoundCallback = Box<dyn FnMut(bool)>;

/// The engine's exported entry points.
///
/// Callbacks are single-subscriber: registering replaces whatever was there,
/// `None` unregisters. They fire synchronously from inside `cycle`.
pub trait Engine {
    /// replace the loaded program and reset execution state
    fn set_rom(&mut self, rom: Vec<u8>);
    fn on_draw(&mut self, callback: Option<DrawCallback>);
    fn on_sound(&mut self, callback: Option<SoundCallback>);
    fn set_key(&mut self, code: u8, pressed: bool);
    /// reinitialise execution state and clear the framebuffer
    fn reset(&mut self);
    /// advance by one tick
    fn cycle(&mut self);
}

/// A loaded, started engine. Normally only `ModuleLoader::load` makes these.
pub struct EngineHandle {
    engine: Box<dyn Engine>,
}

impl EngineHandle {
    pub fn new(engine: Box<dyn Engine>) -> Self {
        EngineHandle { engine }
    }
}

/// Typed façade over the engine
pub struct EngineAdapter {
    engine: Box<dyn Engine>,
    assets: Box<dyn AssetStore>,
    program: Option<String>,
}

impl EngineAdapter {
    pub fn new(handle: EngineHandle, assets: Box<dyn AssetStore>) -> Self {
        EngineAdapter {
            engine: handle.engine,
            assets,
            program: None,
        }
    }

    /// Fetch a program and hand it to the engine.
    ///
    /// On error nothing reaches the engine. On success the engine replaces
    /// its program and resets itself; playback state is the caller's
    /// business.
    pub fn load_program(&mut self, name: &str) -> Result<(), RomLoadError> {
        let rom = self.assets.read_program(name)?;
        info!("program {:?} loaded ({} bytes)", name, rom.len());
        self.engine.set_rom(rom);
        self.program = Some(name.to_owned());
        Ok(())
    }

    /// the last program that made it into the engine
    pub fn current_program(&self) -> Option<&str> {
        self.program.as_deref()
    }

    pub fn on_draw(&mut self, callback: impl FnMut(&[u8]) + 'static) {
        self.engine.on_draw(Some(Box::new(callback)));
    }

    pub fn clear_draw(&mut self) {
        self.engine.on_draw(None);
    }

    pub fn on_sound(&mut self, callback: impl FnMut(bool) + 'static) {
        self.engine.on_sound(Some(Box::new(callback)));
    }

    pub fn clear_sound(&mut self) {
        self.engine.on_sound(None);
    }

    pub fn set_key(&mut self, code: KeypadCode, pressed: bool) {
        debug!("key 0x{:x} {}", code.value(), if pressed { "down" } else { "up" });
        self.engine.set_key(code.value(), pressed);
    }

    pub fn reset(&mut self) {
        debug!("engine reset");
        self.engine.reset();
    }

    pub fn cycle(&mut self) {
        self.engine.cycle();
    }
}
