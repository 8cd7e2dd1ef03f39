use serde::{Deserialize, Serialize};

use crate::{
    error::{FsError, Result},
    utils::{
        digest,
        time_util::{self, TimeDurationStruct},
        traits::{DigestInSelf, SerializeAndDigest},
    },
};

use super::{DATA_BIAS, DATA_BLOCKS, DIR_BLOCKS, DIR_START, FAT_BLOCKS, FAT_START, FS_VERSION};

/// The superblock of this filesystem, stored in block `0`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperBlock {
    /// format marker, must equal [FS_VERSION]
    pub version: u32,
    /// first block of the allocation table
    pub fat_start: u32,
    /// blocks reserved for the allocation table
    pub fat_len: u32,
    /// first block of the directory table
    pub dir_start: u32,
    pub dir_len: u32,
    /// device index of data block `0`
    pub data_start: u32,
    pub data_blocks: u32,
    pub formatted_at: TimeDurationStruct,
    /// to verify the integrity of this superblock
    pub digest: [u8; 32],
}

impl SuperBlock {
    /// a superblock describing the build-time layout
    pub fn new() -> Result<Self> {
        let mut superblock = Self {
            version: FS_VERSION,
            fat_start: FAT_START as u32,
            fat_len: FAT_BLOCKS as u32,
            dir_start: DIR_START as u32,
            dir_len: DIR_BLOCKS as u32,
            data_start: DATA_BIAS as u32,
            data_blocks: DATA_BLOCKS as u32,
            formatted_at: time_util::now(),
            digest: [0u8; 32],
        };
        superblock.digest()?;
        Ok(superblock)
    }

    /// check a decoded superblock before trusting its layout
    ///
    /// the version is checked first, so a zeroed or foreign device
    /// reports a version mismatch rather than a bad digest
    pub fn validate(&mut self) -> Result<()> {
        if self.version != FS_VERSION {
            return Err(FsError::VersionMismatch {
                found: self.version,
                expected: FS_VERSION,
            });
        }
        if !self.verify_digest()? {
            return Err(FsError::Corrupted("superblock digest mismatch".into()));
        }
        let layout = (
            self.fat_start as usize,
            self.fat_len as usize,
            self.dir_start as usize,
            self.dir_len as usize,
            self.data_start as usize,
            self.data_blocks as usize,
        );
        if layout != (FAT_START, FAT_BLOCKS, DIR_START, DIR_BLOCKS, DATA_BIAS, DATA_BLOCKS) {
            return Err(FsError::Corrupted(format!(
                "superblock describes a foreign layout {layout:?}"
            )));
        }
        Ok(())
    }
}

impl DigestInSelf for SuperBlock {
    fn digest(&mut self) -> Result<()> {
        self.digest = [0u8; 32];
        self.digest = digest::digest(&*self)?;
        Ok(())
    }

    fn verify_digest(&mut self) -> Result<bool> {
        // get digest from itself
        let stored = self.digest;
        // clear the digest from struct
        self.digest = [0u8; 32];
        let computed = digest::digest(&*self);
        // put the stored digest back whatever happened
        self.digest = stored;
        Ok(computed? == stored)
    }
}

impl SerializeAndDigest for SuperBlock {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{Block, BLOCK_SIZE};

    #[test]
    fn test_superblock_in_a_block() -> anyhow::Result<()> {
        let mut superblock = SuperBlock::new()?;
        let mut block: Block = [0u8; BLOCK_SIZE];
        let written = superblock.serialize_into(&mut block)?;
        assert!(written < BLOCK_SIZE);

        let mut decoded = <SuperBlock as SerializeAndDigest>::deserialize(&block)?;
        decoded.validate()?;
        assert_eq!(decoded, superblock);
        assert_eq!(decoded.fat_start, 1);
        assert_eq!(decoded.fat_len, 12);
        assert_eq!(decoded.dir_start, 13);
        Ok(())
    }

    #[test]
    fn test_zeroed_block_is_version_mismatch() {
        let block: Block = [0u8; BLOCK_SIZE];
        let mut decoded = <SuperBlock as SerializeAndDigest>::deserialize(&block).unwrap();
        assert!(matches!(
            decoded.validate(),
            Err(FsError::VersionMismatch { found: 0, expected: 1 })
        ));
    }

    #[test]
    fn test_tampered_superblock_is_corrupted() {
        let mut superblock = SuperBlock::new().unwrap();
        let mut block: Block = [0u8; BLOCK_SIZE];
        superblock.serialize_into(&mut block).unwrap();
        // `dir_start` lives right after version, fat_start and fat_len
        block[12] ^= 0xff;
        let mut decoded = <SuperBlock as SerializeAndDigest>::deserialize(&block).unwrap();
        assert!(matches!(decoded.validate(), Err(FsError::Corrupted(_))));
    }

    #[test]
    fn test_foreign_layout_is_corrupted() {
        let mut superblock = SuperBlock::new().unwrap();
        superblock.fat_len = 3;
        superblock.digest().unwrap();
        assert!(matches!(superblock.validate(), Err(FsError::Corrupted(_))));
    }
}
