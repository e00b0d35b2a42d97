//! A tiny engine with the chip8_* ABI, for exercising the module loader.
//!
//! Each cycle lights one more cell from the top-left, and the last cell
//! mirrors keypad 0. The tone is on during odd cycles. `set_rom` and
//! `reset` start the count over.

use std::ffi::{c_char, c_void};
use std::sync::Mutex;

const CELLS: usize = 64 * 32;

#[repr(C)]
pub struct HostBridge {
    pub version: u32,
    pub log: extern "C" fn(level: u32, message: *const c_char),
}

type DrawFn = unsafe extern "C" fn(ctx: *mut c_void, cells: *const u8, len: usize);
type SoundFn = unsafe extern "C" fn(ctx: *mut c_void, on: bool);

// contexts are kept as addresses so the state can sit in a static
struct State {
    cycles: usize,
    keys: [bool; 16],
    draw: Option<(DrawFn, usize)>,
    sound: Option<(SoundFn, usize)>,
}

static STATE: Mutex<State> = Mutex::new(State {
    cycles: 0,
    keys: [false; 16],
    draw: None,
    sound: None,
});

fn state() -> std::sync::MutexGuard<'static, State> {
    STATE.lock().unwrap_or_else(|e| e.into_inner())
}

#[no_mangle]
pub unsafe extern "C" fn chip8_start(bridge: *const HostBridge) -> i32 {
    if cfg!(feature = "failing-start") {
        return 7;
    }
    if bridge.is_null() || (*bridge).version != 1 {
        return -1;
    }
    ((*bridge).log)(2, b"test engine up\0".as_ptr() as *const c_char);
    let mut s = state();
    s.cycles = 0;
    s.keys = [false; 16];
    0
}

#[no_mangle]
pub unsafe extern "C" fn chip8_set_rom(_data: *const u8, _len: usize) {
    state().cycles = 0;
}

#[no_mangle]
pub extern "C" fn chip8_on_draw(cb: Option<DrawFn>, ctx: *mut c_void) {
    state().draw = cb.map(|cb| (cb, ctx as usize));
}

#[no_mangle]
pub extern "C" fn chip8_on_sound(cb: Option<SoundFn>, ctx: *mut c_void) {
    state().sound = cb.map(|cb| (cb, ctx as usize));
}

#[no_mangle]
pub extern "C" fn chip8_set_key(code: u8, pressed: bool) {
    if let Some(key) = state().keys.get_mut(code as usize) {
        *key = pressed;
    }
}

#[no_mangle]
pub extern "C" fn chip8_reset() {
    let mut s = state();
    s.cycles = 0;
    s.keys = [false; 16];
}

#[cfg(not(feature = "missing-cycle"))]
#[no_mangle]
pub unsafe extern "C" fn chip8_cycle() {
    // callbacks run without the lock held
    let (frame, tone, draw, sound) = {
        let mut s = state();
        s.cycles += 1;
        let mut frame = vec![0u8; CELLS];
        for cell in frame.iter_mut().take(s.cycles.min(CELLS - 1)) {
            *cell = 1;
        }
        frame[CELLS - 1] = s.keys[0] as u8;
        (frame, s.cycles % 2 == 1, s.draw, s.sound)
    };
    if let Some((cb, ctx)) = draw {
        cb(ctx as *mut c_void, frame.as_ptr(), frame.len());
    }
    if let Some((cb, ctx)) = sound {
        cb(ctx as *mut c_void, tone);
    }
}
