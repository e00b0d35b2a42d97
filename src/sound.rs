use beep::beep;
use log::{debug, warn};
use std::error::Error;

pub trait Sound {
    fn beep(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// the PC speaker, via the beep crate
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        beep(SIMPLEBEEP_PITCH)?;
        self.is_beeping = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_beeping {
            beep(0)?;
            self.is_beeping = false;
        }
        Ok(())
    }
}

impl Drop for SimpleBeep {
    fn drop(&mut self) {
        // a speaker left on outlives the process
        if let Err(e) = self.stop() {
            debug!("failed to silence speaker: {}", e);
        }
    }
}

#[derive(Default)]
pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// Turns the engine's tone on/off notifications into beeps. Repeats of the
/// current state are dropped, and a failing speaker never stops playback.
pub struct ToneSink {
    sound: Box<dyn Sound>,
    on: bool,
}

impl ToneSink {
    pub fn new(sound: Box<dyn Sound>) -> Self {
        ToneSink { sound, on: false }
    }

    pub fn tone(&mut self, on: bool) {
        if on == self.on {
            return;
        }
        let result = if on {
            self.sound.beep()
        } else {
            self.sound.stop()
        };
        match result {
            Ok(()) => self.on = on,
            Err(e) => warn!("failed to turn tone {}: {}", if on { "on" } else { "off" }, e),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// counts calls, optionally failing them
    struct Counting {
        beeps: Rc<RefCell<(usize, usize)>>,
        fail: bool,
    }

    impl Sound for Counting {
        fn beep(&mut self) -> Result<(), Box<dyn Error>> {
            self.beeps.borrow_mut().0 += 1;
            if self.fail {
                return Err("no speaker".into());
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), Box<dyn Error>> {
            self.beeps.borrow_mut().1 += 1;
            Ok(())
        }
    }

    #[test]
    fn test_mute() -> Result<(), Box<dyn Error>> {
        let mut m = Mute::new();
        m.beep()?;
        m.stop()
    }

    #[test]
    fn test_tone_transitions_only() {
        let counts = Rc::new(RefCell::new((0, 0)));
        let mut t = ToneSink::new(Box::new(Counting {
            beeps: counts.clone(),
            fail: false,
        }));
        t.tone(false);
        t.tone(true);
        t.tone(true);
        assert!(t.is_on());
        t.tone(false);
        t.tone(false);
        assert!(!t.is_on());
        assert_eq!(*counts.borrow(), (1, 1));
    }

    #[test]
    fn test_failing_speaker_is_not_fatal() {
        let counts = Rc::new(RefCell::new((0, 0)));
        let mut t = ToneSink::new(Box::new(Counting {
            beeps: counts.clone(),
            fail: true,
        }));
        t.tone(true);
        assert!(!t.is_on());
        // still off, so the next "on" tries again
        t.tone(true);
        assert_eq!(counts.borrow().0, 2);
    }
}
