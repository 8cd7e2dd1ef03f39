//! the allocation table: one record per data block,
//! linking blocks into per-file chains and marking the free pool
use log::trace;
use serde::{Deserialize, Serialize};

use crate::{
    error::{FsError, Result},
    utils::traits::FixedRecord,
};

use super::{DATA_BLOCKS, FAT_RECORD_SIZE};

/// `next` of a chain's terminal block
pub const END_OF_CHAIN: u32 = u32::MAX;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationEntry {
    /// successor in the chain, or [END_OF_CHAIN]
    pub next: u32,
    pub used: bool,
    /// bytes of this block that belong to the file
    pub valid_bytes: u32,
}

impl Default for AllocationEntry {
    fn default() -> Self {
        Self {
            next: END_OF_CHAIN,
            used: false,
            valid_bytes: 0,
        }
    }
}

impl FixedRecord for AllocationEntry {
    const RECORD_SIZE: usize = FAT_RECORD_SIZE;
}

/// The in-memory allocation table.
///
/// There is no free list, free blocks are the entries with `used == false`
/// and are found by scanning.
#[derive(Debug, Clone)]
pub struct AllocationTable {
    entries: Vec<AllocationEntry>,
    free_blocks: usize,
}

impl Default for AllocationTable {
    fn default() -> Self {
        Self::new()
    }
}

/// construction and inspection
impl AllocationTable {
    /// an all-free table
    pub fn new() -> Self {
        Self {
            entries: vec![AllocationEntry::default(); DATA_BLOCKS],
            free_blocks: DATA_BLOCKS,
        }
    }

    /// adopt entries read from disk, the free counter is recounted
    pub fn from_entries(entries: Vec<AllocationEntry>) -> Result<Self> {
        if entries.len() != DATA_BLOCKS {
            return Err(FsError::Corrupted(format!(
                "allocation table has {} entries, expected {DATA_BLOCKS}",
                entries.len()
            )));
        }
        let free_blocks = entries.iter().filter(|e| !e.used).count();
        Ok(Self {
            entries,
            free_blocks,
        })
    }

    #[inline]
    pub fn entries(&self) -> &[AllocationEntry] {
        &self.entries
    }

    #[inline]
    pub fn entry(&self, index: u32) -> Option<&AllocationEntry> {
        self.entries.get(index as usize)
    }

    #[inline]
    pub fn free_blocks(&self) -> usize {
        self.free_blocks
    }

    #[inline]
    fn is_used(&self, index: u32) -> bool {
        self.entry(index).is_some_and(|e| e.used)
    }
}

/// block allocation and chain maintenance
impl AllocationTable {
    /// take the first free block off the pool
    pub fn allocate_one(&mut self) -> Result<u32> {
        let index = self
            .entries
            .iter()
            .position(|e| !e.used)
            .ok_or(FsError::OutOfSpace)?;
        self.entries[index] = AllocationEntry {
            next: END_OF_CHAIN,
            used: true,
            valid_bytes: 0,
        };
        self.free_blocks -= 1;
        Ok(index as u32)
    }

    /// count the nodes of the chain starting at `head`
    ///
    /// the walk stops at the end sentinel or at a free entry,
    /// and never takes more than [DATA_BLOCKS] hops
    pub fn chain_length(&self, head: u32) -> usize {
        let mut count = 0;
        let mut index = head;
        while count < DATA_BLOCKS && self.is_used(index) {
            count += 1;
            index = self.entries[index as usize].next;
        }
        count
    }

    /// the blocks of the chain starting at `head`, in order
    ///
    /// fails with [FsError::InvalidHandle] if `head` is free,
    /// or if the chain runs into a free block or loops before its terminal
    pub fn chain(&self, head: u32) -> Result<Vec<u32>> {
        let mut blocks = Vec::new();
        let mut index = head;
        while blocks.len() < DATA_BLOCKS {
            if !self.is_used(index) {
                return Err(FsError::InvalidHandle);
            }
            blocks.push(index);
            let next = self.entries[index as usize].next;
            if next == END_OF_CHAIN {
                return Ok(blocks);
            }
            index = next;
        }
        Err(FsError::InvalidHandle)
    }

    /// adjust the chain at `head` to exactly `target_blocks` nodes
    /// # Returns
    /// the change in chain length: positive when grown, negative when shrunk.
    ///
    /// Growth stops early when the pool runs dry, so a positive result may be
    /// smaller than requested; callers must compare it with what they asked for.
    pub fn resize(&mut self, head: u32, target_blocks: usize) -> Result<isize> {
        if target_blocks == 0 {
            return Err(FsError::InvalidArgument(
                "a chain keeps at least its head block".into(),
            ));
        }
        let chain = self.chain(head)?;
        let current = chain.len();

        if current < target_blocks {
            let mut tail = chain[current - 1];
            let mut appended = 0usize;
            while current + appended < target_blocks {
                let Ok(block) = self.allocate_one() else {
                    break;
                };
                self.entries[tail as usize].next = block;
                tail = block;
                appended += 1;
            }
            trace!(
                "chain {head} grown by {appended} of {} blocks",
                target_blocks - current
            );
            Ok(appended as isize)
        } else if current > target_blocks {
            let new_tail = chain[target_blocks - 1];
            self.entries[new_tail as usize].next = END_OF_CHAIN;
            for &block in &chain[target_blocks..] {
                self.release(block);
            }
            let removed = current - target_blocks;
            trace!("chain {head} shrunk by {removed} blocks");
            Ok(-(removed as isize))
        } else {
            Ok(0)
        }
    }

    /// return every block of the chain at `head` to the pool
    /// # Returns
    /// how many blocks were freed
    pub fn free_chain(&mut self, head: u32) -> usize {
        let mut freed = 0;
        let mut index = head;
        while freed < DATA_BLOCKS && self.is_used(index) {
            let next = self.entries[index as usize].next;
            self.release(index);
            freed += 1;
            index = next;
        }
        freed
    }

    /// record how many bytes of `block` belong to its file
    pub fn set_valid_bytes(&mut self, block: u32, valid_bytes: usize) {
        if let Some(entry) = self.entries.get_mut(block as usize) {
            entry.valid_bytes = valid_bytes as u32;
        }
    }

    fn release(&mut self, block: u32) {
        self.entries[block as usize] = AllocationEntry::default();
        self.free_blocks += 1;
    }
}
