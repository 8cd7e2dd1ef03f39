//! the block device our filesystem lives on
//!
//! A [Disk] knows how to create and open named stores;
//! an opened store is a [BlockDevice] addressed by a dense block index
//! in `[0, TOTAL_BLOCKS)`.
mod image;
mod memory;
pub use image::{ImageDevice, ImageDisk};
pub use memory::{MemoryDevice, MemoryDisk};

use std::io::{self, ErrorKind};

use crate::fs::{Block, TOTAL_BLOCKS};

/// An opened store, read and written one whole block at a time.
pub trait BlockDevice {
    /// read block `index` into `buf`
    fn read_block(&self, index: usize, buf: &mut Block) -> io::Result<()>;

    /// write `buf` to block `index`
    fn write_block(&mut self, index: usize, buf: &Block) -> io::Result<()>;

    /// flush and release the store
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}

/// Creates and opens named stores.
pub trait Disk {
    type Device: BlockDevice;

    /// create an empty, zeroed store named `name`,
    /// replacing any store of the same name
    fn create_store(&mut self, name: &str) -> io::Result<()>;

    /// open an existing store
    fn open_store(&mut self, name: &str) -> io::Result<Self::Device>;
}

/// reject block indices outside the device
pub(crate) fn check_index(index: usize) -> io::Result<()> {
    if index >= TOTAL_BLOCKS {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("block {index} is out of range, device has {TOTAL_BLOCKS} blocks"),
        ));
    }
    Ok(())
}
