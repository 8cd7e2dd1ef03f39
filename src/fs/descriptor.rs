//! open-file handles, kept in memory only
use std::fmt;

use crate::error::{FsError, Result};

use super::FILE_DESCRIPTORS;

/// A handle returned by [ChainFs::open](crate::ChainFs::open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(usize);

impl FileHandle {
    /// wrap a raw descriptor number, it is only checked when used
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileDescriptor {
    pub used: bool,
    /// slot of the open file in the directory table
    pub directory_index: usize,
    /// byte cursor
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct DescriptorTable {
    slots: Vec<FileDescriptor>,
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self {
            slots: vec![FileDescriptor::default(); FILE_DESCRIPTORS],
        }
    }

    /// claim the lowest free slot for the file at `directory_index`
    pub fn allocate(&mut self, directory_index: usize) -> Result<FileHandle> {
        let (raw, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, d)| !d.used)
            .ok_or(FsError::DescriptorTableFull)?;
        *slot = FileDescriptor {
            used: true,
            directory_index,
            offset: 0,
        };
        Ok(FileHandle(raw))
    }

    pub fn get(&self, handle: FileHandle) -> Result<&FileDescriptor> {
        self.slots
            .get(handle.0)
            .filter(|d| d.used)
            .ok_or(FsError::InvalidHandle)
    }

    pub fn get_mut(&mut self, handle: FileHandle) -> Result<&mut FileDescriptor> {
        self.slots
            .get_mut(handle.0)
            .filter(|d| d.used)
            .ok_or(FsError::InvalidHandle)
    }

    /// free the slot of `handle`
    /// # Returns
    /// the directory slot the handle referred to
    pub fn release(&mut self, handle: FileHandle) -> Result<usize> {
        let slot = self.get_mut(handle)?;
        let directory_index = slot.directory_index;
        *slot = FileDescriptor::default();
        Ok(directory_index)
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|d| d.used).count()
    }
}
