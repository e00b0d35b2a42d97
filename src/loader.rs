//! Loading the execution engine.
//!
//! The engine ships as a native shared library (`cdylib`) exporting a small C
//! ABI:
//!
//! ```text
//! chip8_start(bridge: *const HostBridge) -> i32     entrypoint, 0 is success
//! chip8_set_rom(data: *const u8, len: usize)        engine copies the bytes
//! chip8_on_draw(cb, ctx)                            cb(ctx, cells, len)
//! chip8_on_sound(cb, ctx)                           cb(ctx, tone_on)
//! chip8_set_key(code: u8, pressed: bool)
//! chip8_reset()
//! chip8_cycle()
//! ```
//!
//! Callbacks only ever fire from inside `chip8_cycle`, on the calling thread.

use crate::engine::{DrawCallback, Engine, EngineHandle, SoundCallback};
use libloading::Library;
use log::{debug, error, info, trace, warn};
use std::ffi::{c_char, c_void, CStr};
use std::path::{Path, PathBuf};
use std::ptr;
use std::slice;
use thiserror::Error;

/// Fatal: without an engine nothing else can run.
#[derive(Debug, Error)]
pub enum ModuleLoadError {
    #[error("engine module not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to instantiate engine module {}: {source}", .path.display())]
    Instantiate {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("engine module does not export `{0}`")]
    MissingExport(&'static str),
    #[error("engine entrypoint failed with status {0}")]
    Entrypoint(i32),
}

/// bumped whenever `HostBridge` changes shape
pub const HOST_BRIDGE_VERSION: u32 = 1;

/// What the host hands the engine at start-up.
#[repr(C)]
pub struct HostBridge {
    pub version: u32,
    /// `level`: 0 error, 1 warn, 2 info, 3 debug, anything else trace
    pub log: extern "C" fn(level: u32, message: *const c_char),
}

/// routes engine diagnostics into our logger
extern "C" fn bridge_log(level: u32, message: *const c_char) {
    if message.is_null() {
        return;
    }
    // SAFETY: the engine promises a NUL-terminated string that lives for the
    // duration of the call
    let text = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    match level {
        0 => error!(target: "engine", "{}", text),
        1 => warn!(target: "engine", "{}", text),
        2 => info!(target: "engine", "{}", text),
        3 => debug!(target: "engine", "{}", text),
        _ => trace!(target: "engine", "{}", text),
    }
}

type DrawTrampoline = unsafe extern "C" fn(ctx: *mut c_void, cells: *const u8, len: usize);
type SoundTrampoline = unsafe extern "C" fn(ctx: *mut c_void, on: bool);

type StartFn = unsafe extern "C" fn(bridge: *const HostBridge) -> i32;
type SetRomFn = unsafe extern "C" fn(data: *const u8, len: usize);
type OnDrawFn = unsafe extern "C" fn(cb: Option<DrawTrampoline>, ctx: *mut c_void);
type OnSoundFn = unsafe extern "C" fn(cb: Option<SoundTrampoline>, ctx: *mut c_void);
type SetKeyFn = unsafe extern "C" fn(code: u8, pressed: bool);
type VoidFn = unsafe extern "C" fn();

unsafe extern "C" fn draw_trampoline(ctx: *mut c_void, cells: *const u8, len: usize) {
    if ctx.is_null() || cells.is_null() {
        return;
    }
    // SAFETY: ctx is the boxed callback registered in `on_draw`, kept alive
    // until the engine has been told to drop it
    let callback = &mut *(ctx as *mut DrawCallback);
    callback(slice::from_raw_parts(cells, len));
}

unsafe extern "C" fn sound_trampoline(ctx: *mut c_void, on: bool) {
    if ctx.is_null() {
        return;
    }
    // SAFETY: as for draw_trampoline
    let callback = &mut *(ctx as *mut SoundCallback);
    callback(on);
}

struct Exports {
    start: StartFn,
    set_rom: SetRomFn,
    on_draw: OnDrawFn,
    on_sound: OnSoundFn,
    set_key: SetKeyFn,
    reset: VoidFn,
    cycle: VoidFn,
}

/// copy a function pointer out of the library
///
/// SAFETY: `T` must match the symbol's real signature
unsafe fn export<T: Copy>(library: &Library, name: &'static str) -> Result<T, ModuleLoadError> {
    library
        .get::<T>(name.as_bytes())
        .map(|symbol| *symbol)
        .map_err(|e| {
            debug!("resolving {}: {}", name, e);
            ModuleLoadError::MissingExport(name)
        })
}

impl Exports {
    /// SAFETY: the library must implement the ABI in the module docs
    unsafe fn resolve(library: &Library) -> Result<Self, ModuleLoadError> {
        Ok(Exports {
            start: export(library, "chip8_start")?,
            set_rom: export(library, "chip8_set_rom")?,
            on_draw: export(library, "chip8_on_draw")?,
            on_sound: export(library, "chip8_on_sound")?,
            set_key: export(library, "chip8_set_key")?,
            reset: export(library, "chip8_reset")?,
            cycle: export(library, "chip8_cycle")?,
        })
    }
}

/// An engine living in a shared library
struct NativeEngine {
    exports: Exports,
    // boxed twice so the engine holds a thin pointer that survives moves
    draw: Option<Box<DrawCallback>>,
    sound: Option<Box<SoundCallback>>,
    bridge: Box<HostBridge>,
    // dropped last: every fn pointer above points into it
    _library: Library,
}

impl NativeEngine {
    fn start(&mut self) -> Result<(), ModuleLoadError> {
        // SAFETY: bridge is boxed and outlives the library
        let status = unsafe { (self.exports.start)(&*self.bridge) };
        if status != 0 {
            return Err(ModuleLoadError::Entrypoint(status));
        }
        Ok(())
    }
}

impl Engine for NativeEngine {
    fn set_rom(&mut self, rom: Vec<u8>) {
        // SAFETY: the engine copies the bytes before returning
        unsafe { (self.exports.set_rom)(rom.as_ptr(), rom.len()) }
    }

    fn on_draw(&mut self, callback: Option<DrawCallback>) {
        match callback {
            Some(callback) => {
                let mut boxed = Box::new(callback);
                let ctx = &mut *boxed as *mut DrawCallback as *mut c_void;
                // SAFETY: switch the engine over before the old box is freed
                unsafe { (self.exports.on_draw)(Some(draw_trampoline), ctx) };
                self.draw = Some(boxed);
            }
            None => {
                unsafe { (self.exports.on_draw)(None, ptr::null_mut()) };
                self.draw = None;
            }
        }
    }

    fn on_sound(&mut self, callback: Option<SoundCallback>) {
        match callback {
            Some(callback) => {
                let mut boxed = Box::new(callback);
                let ctx = &mut *boxed as *mut SoundCallback as *mut c_void;
                unsafe { (self.exports.on_sound)(Some(sound_trampoline), ctx) };
                self.sound = Some(boxed);
            }
            None => {
                unsafe { (self.exports.on_sound)(None, ptr::null_mut()) };
                self.sound = None;
            }
        }
    }

    fn set_key(&mut self, code: u8, pressed: bool) {
        unsafe { (self.exports.set_key)(code, pressed) }
    }

    fn reset(&mut self) {
        unsafe { (self.exports.reset)() }
    }

    fn cycle(&mut self) {
        unsafe { (self.exports.cycle)() }
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        // don't leave the engine pointing at callbacks we're about to free
        unsafe {
            (self.exports.on_draw)(None, ptr::null_mut());
            (self.exports.on_sound)(None, ptr::null_mut());
        }
        let (draw, sound) = (self.draw.take(), self.sound.take());
        trace!(
            "releasing engine callbacks (draw: {}, sound: {})",
            draw.is_some(),
            sound.is_some()
        );
    }
}

/// Gets the engine from disk to ready. One shot: `load` consumes the loader,
/// and the only way to reach the engine is the handle it returns.
pub struct ModuleLoader {
    path: PathBuf,
}

impl ModuleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ModuleLoader { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(self) -> Result<EngineHandle, ModuleLoadError> {
        if !self.path.is_file() {
            return Err(ModuleLoadError::NotFound(self.path));
        }
        info!("loading engine module {}", self.path.display());

        // SAFETY: running the library's initialisers is the point of loading
        // it; we trust the module we were pointed at
        let library = match unsafe { Library::new(&self.path) } {
            Ok(library) => library,
            Err(source) => {
                return Err(ModuleLoadError::Instantiate {
                    path: self.path,
                    source,
                })
            }
        };
        let exports = unsafe { Exports::resolve(&library)? };
        let mut engine = NativeEngine {
            exports,
            draw: None,
            sound: None,
            bridge: Box::new(HostBridge {
                version: HOST_BRIDGE_VERSION,
                log: bridge_log,
            }),
            _library: library,
        };
        engine.start()?;
        info!("engine ready");
        Ok(EngineHandle::new(Box::new(engine)))
    }
}
