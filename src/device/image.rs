//! volumes stored as sparse image files, mapped into memory
use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
};

use log::debug;
use memmap2::MmapMut;

use super::{check_index, BlockDevice, Disk};
use crate::fs::{Block, BLOCK_SIZE, TOTAL_BLOCKS};

/// Image files resolved relative to `root`.
///
/// An absolute volume name ignores `root`.
#[derive(Debug, Default, Clone)]
pub struct ImageDisk {
    root: PathBuf,
}

impl ImageDisk {
    pub fn new<P>(root: P) -> Self
    where
        P: AsRef<Path>,
    {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// where the image of `name` lives
    pub fn image_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Disk for ImageDisk {
    type Device = ImageDevice;

    fn create_store(&mut self, name: &str) -> io::Result<()> {
        let path = self.image_path(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        // all blocks are zero after `set_len`
        file.set_len((TOTAL_BLOCKS * BLOCK_SIZE) as u64)?;
        debug!("created image {path:?}");
        Ok(())
    }

    fn open_store(&mut self, name: &str) -> io::Result<ImageDevice> {
        let path = self.image_path(name);
        // open the "device" for read and write
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        if file.metadata()?.len() < (TOTAL_BLOCKS * BLOCK_SIZE) as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("image {path:?} is smaller than a volume"),
            ));
        }
        // Safety
        // the mapping is only valid while nobody else truncates the image file,
        // the same contract any block device driver has with its disk.
        // from https://docs.rs/memmap2/0.5.10/memmap2/struct.MmapMut.html
        let map = unsafe { MmapMut::map_mut(&file)? };
        debug!("opened image {path:?}");
        Ok(ImageDevice { map })
    }
}

/// An opened image file.
#[derive(Debug)]
pub struct ImageDevice {
    map: MmapMut,
}

impl BlockDevice for ImageDevice {
    fn read_block(&self, index: usize, buf: &mut Block) -> io::Result<()> {
        check_index(index)?;
        let start = index * BLOCK_SIZE;
        buf.copy_from_slice(&self.map[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &Block) -> io::Result<()> {
        check_index(index)?;
        let start = index * BLOCK_SIZE;
        self.map[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        self.map.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_survives_reopen() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut disk = ImageDisk::new(dir.path());
        disk.create_store("vol.img")?;
        assert_eq!(
            std::fs::metadata(disk.image_path("vol.img"))?.len(),
            (TOTAL_BLOCKS * BLOCK_SIZE) as u64
        );

        let mut device = disk.open_store("vol.img")?;
        device.write_block(7, &[0xab; BLOCK_SIZE])?;
        device.close()?;

        let device = disk.open_store("vol.img")?;
        let mut buf = [0u8; BLOCK_SIZE];
        device.read_block(7, &mut buf)?;
        assert_eq!(buf, [0xab; BLOCK_SIZE]);
        device.read_block(8, &mut buf)?;
        assert_eq!(buf, [0; BLOCK_SIZE]);
        Ok(())
    }

    #[test]
    fn test_open_missing_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut disk = ImageDisk::new(dir.path());
        let err = disk.open_store("missing.img").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_out_of_range_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut disk = ImageDisk::new(dir.path());
        disk.create_store("vol.img").unwrap();
        let mut device = disk.open_store("vol.img").unwrap();
        let err = device
            .write_block(TOTAL_BLOCKS, &[0; BLOCK_SIZE])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
