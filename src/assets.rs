//! Named binary resources: program images and the engine module.
//!
//! Assets live under one root directory:
//!
//! ```text
//! <root>/roms/<program name>
//! <root>/engine/<platform name for "chip8_engine">   e.g. libchip8_engine.so
//! ```

use log::debug;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Biggest program the device can hold: 4K of RAM, programs load at 0x200.
pub const MAX_PROGRAM_BYTES: usize = 0x1000 - 0x200;

/// Base name of the engine shared library, before platform decoration.
pub const ENGINE_LIBRARY_NAME: &str = "chip8_engine";

/// Recoverable: nothing was handed to the engine, the previous program is
/// still loaded.
#[derive(Debug, Error)]
pub enum RomLoadError {
    #[error("program `{0}` not found")]
    NotFound(String),
    #[error("`{0}` is not a valid program name")]
    InvalidName(String),
    #[error("program `{name}` is {len} bytes, more than the {} that fit in memory", MAX_PROGRAM_BYTES)]
    TooLarge { name: String, len: usize },
    #[error("failed to read program `{name}`: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Where programs come from
pub trait AssetStore {
    /// fetch the raw bytes of a named program
    fn read_program(&self, name: &str) -> Result<Vec<u8>, RomLoadError>;

    /// names of every program available, sorted
    fn programs(&self) -> Result<Vec<String>, io::Error>;
}

fn check_size(name: &str, rom: Vec<u8>) -> Result<Vec<u8>, RomLoadError> {
    if rom.len() > MAX_PROGRAM_BYTES {
        return Err(RomLoadError::TooLarge {
            name: name.to_owned(),
            len: rom.len(),
        });
    }
    Ok(rom)
}

/// assets in a directory on disk
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirAssets { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn roms_dir(&self) -> PathBuf {
        self.root.join("roms")
    }

    /// where the engine module is expected unless told otherwise
    pub fn default_engine_path(&self) -> PathBuf {
        self.root
            .join("engine")
            .join(libloading::library_filename(ENGINE_LIBRARY_NAME))
    }
}

impl AssetStore for DirAssets {
    fn read_program(&self, name: &str) -> Result<Vec<u8>, RomLoadError> {
        // names are plain file names; don't let them wander out of roms/
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(RomLoadError::InvalidName(name.to_owned()));
        }
        let path = self.roms_dir().join(name);
        debug!("reading program {}", path.display());
        let mut f = File::open(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => RomLoadError::NotFound(name.to_owned()),
            _ => RomLoadError::Read {
                name: name.to_owned(),
                source,
            },
        })?;
        let mut rom = Vec::new();
        f.read_to_end(&mut rom)
            .map_err(|source| RomLoadError::Read {
                name: name.to_owned(),
                source,
            })?;
        check_size(name, rom)
    }

    fn programs(&self) -> Result<Vec<String>, io::Error> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.roms_dir())? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// in-memory assets, useful for testing
#[derive(Default)]
pub struct MemoryAssets {
    programs: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, name: &str, rom: &[u8]) -> Self {
        self.programs.insert(name.to_owned(), Vec::from(rom));
        self
    }
}

impl AssetStore for MemoryAssets {
    fn read_program(&self, name: &str) -> Result<Vec<u8>, RomLoadError> {
        let rom = self
            .programs
            .get(name)
            .cloned()
            .ok_or_else(|| RomLoadError::NotFound(name.to_owned()))?;
        check_size(name, rom)
    }

    fn programs(&self) -> Result<Vec<String>, io::Error> {
        let mut names: Vec<String> = self.programs.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
