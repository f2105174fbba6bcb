//! An EEPROM image kept in a host file.
//!
//! Every write goes straight to the file and is synced, so the image on disk
//! always matches what a real part would hold after the same writes.  A new
//! image is created fully erased (`0xFF`).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use weather_core::storage::{check_bounds, ERASED_BYTE};
use weather_core::{NvError, NvMemory};

#[derive(Debug)]
pub struct FileEeprom {
    path: PathBuf,
    file: File,
    capacity: usize,
}

impl FileEeprom {
    /// Opens the image at `path`, creating an erased one of `capacity` bytes
    /// if it does not exist.  A shorter existing image is extended with
    /// erased bytes.
    ///
    /// # Errors
    ///
    /// [`NvError::Unreachable`] if the file cannot be opened or sized, or if
    /// an existing image is larger than `capacity`.
    pub fn open(path: &Path, capacity: usize) -> Result<Self, NvError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| unreachable(path, "open", &e))?;

        let current = file
            .metadata()
            .map_err(|e| unreachable(path, "stat", &e))?
            .len() as usize;

        if current > capacity {
            return Err(NvError::Unreachable(format!(
                "{}: image is {current} bytes, expected at most {capacity}",
                path.display()
            )));
        }
        if current < capacity {
            file.seek(SeekFrom::Start(current as u64))
                .and_then(|_| file.write_all(&vec![ERASED_BYTE; capacity - current]))
                .and_then(|_| file.sync_data())
                .map_err(|e| unreachable(path, "erase", &e))?;
            if current == 0 {
                info!(path = %path.display(), capacity, "created erased EEPROM image");
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            capacity,
        })
    }
}

impl NvMemory for FileEeprom {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&self, address: usize, buf: &mut [u8]) -> Result<(), NvError> {
        check_bounds(address, buf.len(), self.capacity)?;
        let mut file = &self.file;
        file.seek(SeekFrom::Start(address as u64))
            .and_then(|_| file.read_exact(buf))
            .map_err(|e| unreachable(&self.path, "read", &e))
    }

    fn write(&mut self, address: usize, data: &[u8]) -> Result<(), NvError> {
        check_bounds(address, data.len(), self.capacity)?;
        self.file
            .seek(SeekFrom::Start(address as u64))
            .and_then(|_| self.file.write_all(data))
            .and_then(|_| self.file.sync_data())
            .map_err(|e| unreachable(&self.path, "write", &e))
    }
}

fn unreachable(path: &Path, op: &str, err: &std::io::Error) -> NvError {
    NvError::Unreachable(format!("{op} {}: {err}", path.display()))
}
