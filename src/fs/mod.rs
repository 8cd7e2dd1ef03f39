//! our flat-namespace filesystem
//!
//! On-disk layout, fixed at build time:
//! - block `0`: superblock
//! - blocks `[FAT_START, FAT_START + FAT_BLOCKS)`: allocation table, one record per data block
//! - block `DIR_START`: directory table, one record per namespace slot
//! - blocks `[DATA_BIAS, DATA_BIAS + DATA_BLOCKS)`: file data
pub mod descriptor;
pub mod directory;
pub mod fat;
mod fs_api_impl;
pub mod fs_layout;
mod metadata;
pub mod superblock;
pub use descriptor::*;
pub use directory::*;
pub use fat::*;
pub use fs_api_impl::{FileInfo, FsStats};
pub use fs_layout::*;
pub use superblock::*;

/// size of every device block in bytes
pub const BLOCK_SIZE: usize = 4096;
/// number of data blocks, and so of allocation table records
pub const DATA_BLOCKS: usize = 4096;
/// namespace capacity
pub const DIR_ENTRIES: usize = 64;
/// how many files may be open at once
pub const FILE_DESCRIPTORS: usize = 32;
/// longest file name, in bytes
pub const MAX_NAME_LEN: usize = 15;
/// device index of data block `0`
pub const DATA_BIAS: usize = 4096;
/// format marker stored in the superblock
pub const FS_VERSION: u32 = 1;

pub const SUPERBLOCK_INDEX: usize = 0;
pub const FAT_START: usize = 1;
pub const FAT_RECORD_SIZE: usize = 12;
pub const FAT_BLOCKS: usize = (DATA_BLOCKS * FAT_RECORD_SIZE).div_ceil(BLOCK_SIZE);
pub const DIR_START: usize = FAT_START + FAT_BLOCKS;
pub const DIR_RECORD_SIZE: usize = 40;
pub const DIR_BLOCKS: usize = (DIR_ENTRIES * DIR_RECORD_SIZE).div_ceil(BLOCK_SIZE);
/// blocks a volume needs on its device
pub const TOTAL_BLOCKS: usize = DATA_BIAS + DATA_BLOCKS;

const _: () = assert!(DIR_BLOCKS == 1, "directory table must fit one block");
const _: () = assert!(DIR_START + DIR_BLOCKS <= DATA_BIAS, "metadata overlaps data");
const _: () = assert!(DATA_BLOCKS < u32::MAX as usize, "block index must fit a record");

/// one device block
pub type Block = [u8; BLOCK_SIZE];
