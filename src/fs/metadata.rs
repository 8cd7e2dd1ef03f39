//! moving the superblock, allocation table and directory table
//! between memory and their reserved blocks
use log::warn;

use crate::{
    device::BlockDevice,
    error::{FsError, Result},
    utils::traits::{FixedRecord, SerializeAndDigest},
};

use super::{
    AllocationEntry, AllocationTable, Block, DirectoryEntry, DirectoryTable, SuperBlock,
    BLOCK_SIZE, DATA_BLOCKS, DIR_ENTRIES, SUPERBLOCK_INDEX,
};

/// write all metadata of a volume
pub(crate) fn write_metadata<B: BlockDevice>(
    device: &mut B,
    superblock: &mut SuperBlock,
    fat: &AllocationTable,
    directory: &DirectoryTable,
) -> Result<()> {
    let mut block: Block = [0u8; BLOCK_SIZE];
    superblock.serialize_into(&mut block)?;
    device.write_block(SUPERBLOCK_INDEX, &block)?;

    let fat_bytes = AllocationEntry::encode_table(fat.entries())?;
    write_span(
        device,
        superblock.fat_start as usize,
        superblock.fat_len as usize,
        &fat_bytes,
    )?;

    let dir_bytes = DirectoryEntry::encode_table(directory.entries())?;
    write_span(
        device,
        superblock.dir_start as usize,
        superblock.dir_len as usize,
        &dir_bytes,
    )
}

/// read and check the superblock
pub(crate) fn read_superblock<B: BlockDevice>(device: &B) -> Result<SuperBlock> {
    let mut block: Block = [0u8; BLOCK_SIZE];
    device.read_block(SUPERBLOCK_INDEX, &mut block)?;
    let mut superblock = SuperBlock::deserialize(&block)?;
    if let Err(e) = superblock.validate() {
        warn!("refusing superblock: {e}");
        return Err(e);
    }
    Ok(superblock)
}

/// read the allocation table span named by `superblock`
pub(crate) fn read_fat<B: BlockDevice>(
    device: &B,
    superblock: &SuperBlock,
) -> Result<AllocationTable> {
    let bytes = read_span(
        device,
        superblock.fat_start as usize,
        superblock.fat_len as usize,
    )?;
    AllocationTable::from_entries(AllocationEntry::decode_table(&bytes, DATA_BLOCKS)?)
}

/// read the directory table span named by `superblock`
pub(crate) fn read_directory<B: BlockDevice>(
    device: &B,
    superblock: &SuperBlock,
) -> Result<DirectoryTable> {
    let bytes = read_span(
        device,
        superblock.dir_start as usize,
        superblock.dir_len as usize,
    )?;
    let entries = DirectoryEntry::decode_table(&bytes, DIR_ENTRIES)?;
    for (index, entry) in entries.iter().enumerate() {
        if entry.used != (entry.name.is_some() && entry.head.is_some()) {
            return Err(FsError::Corrupted(format!(
                "directory entry {index} is half used"
            )));
        }
    }
    DirectoryTable::from_entries(entries)
}

/// write `bytes` over `len` blocks from `start`, zero padding the last one
fn write_span<B: BlockDevice>(device: &mut B, start: usize, len: usize, bytes: &[u8]) -> Result<()> {
    if bytes.len() > len * BLOCK_SIZE {
        return Err(FsError::Corrupted(format!(
            "{} bytes do not fit {len} reserved blocks",
            bytes.len()
        )));
    }
    let mut block: Block = [0u8; BLOCK_SIZE];
    for (i, index) in (start..start + len).enumerate() {
        block.fill(0);
        let chunk = bytes
            .get(i * BLOCK_SIZE..)
            .map(|rest| &rest[..rest.len().min(BLOCK_SIZE)])
            .unwrap_or_default();
        block[..chunk.len()].copy_from_slice(chunk);
        device.write_block(index, &block)?;
    }
    Ok(())
}

fn read_span<B: BlockDevice>(device: &B, start: usize, len: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(len * BLOCK_SIZE);
    let mut block: Block = [0u8; BLOCK_SIZE];
    for index in start..start + len {
        device.read_block(index, &mut block)?;
        bytes.extend_from_slice(&block);
    }
    Ok(bytes)
}
