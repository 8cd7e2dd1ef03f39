//! volumes kept in memory, for tests and embedders without a disk
use std::{
    collections::{BTreeMap, HashMap},
    io,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{check_index, BlockDevice, Disk};
use crate::fs::Block;

/// only written blocks are stored, the rest read as zeros
type SparseImage = Arc<Mutex<BTreeMap<usize, Box<Block>>>>;

/// A set of named in-memory volumes.
///
/// Clones share the same volumes, so a volume written through one clone
/// can be opened through another.
#[derive(Debug, Default, Clone)]
pub struct MemoryDisk {
    volumes: Arc<Mutex<HashMap<String, SparseImage>>>,
}

impl MemoryDisk {
    fn volumes(&self) -> io::Result<MutexGuard<'_, HashMap<String, SparseImage>>> {
        self.volumes.lock().map_err(|_| poisoned())
    }

    /// number of blocks ever written to volume `name`
    pub fn written_blocks(&self, name: &str) -> io::Result<usize> {
        let volumes = self.volumes()?;
        let image = volumes.get(name).ok_or_else(|| missing(name))?;
        let blocks = image.lock().map_err(|_| poisoned())?;
        Ok(blocks.len())
    }
}

impl Disk for MemoryDisk {
    type Device = MemoryDevice;

    fn create_store(&mut self, name: &str) -> io::Result<()> {
        self.volumes()?.insert(name.to_string(), SparseImage::default());
        Ok(())
    }

    fn open_store(&mut self, name: &str) -> io::Result<MemoryDevice> {
        let volumes = self.volumes()?;
        let blocks = volumes.get(name).ok_or_else(|| missing(name))?;
        Ok(MemoryDevice {
            blocks: Arc::clone(blocks),
        })
    }
}

/// An opened in-memory volume.
#[derive(Debug)]
pub struct MemoryDevice {
    blocks: SparseImage,
}

impl BlockDevice for MemoryDevice {
    fn read_block(&self, index: usize, buf: &mut Block) -> io::Result<()> {
        check_index(index)?;
        let blocks = self.blocks.lock().map_err(|_| poisoned())?;
        match blocks.get(&index) {
            Some(block) => buf.copy_from_slice(block.as_slice()),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &Block) -> io::Result<()> {
        check_index(index)?;
        let mut blocks = self.blocks.lock().map_err(|_| poisoned())?;
        blocks.insert(index, Box::new(*buf));
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        Ok(())
    }
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "memory disk lock poisoned")
}

fn missing(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no volume named {name}"))
}
