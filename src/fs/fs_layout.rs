//! what does our filesystem look like in the memory

use log::{info, warn};

use crate::{
    device::{BlockDevice, Disk},
    error::{FsError, Result},
};

use super::{
    metadata, AllocationTable, DescriptorTable, DirectoryTable, SuperBlock, DATA_BLOCKS,
};

/// A filesystem session over the stores of one [Disk].
///
/// It has the following states:
/// - unmounted: only [format](ChainFs::format) and [mount](ChainFs::mount) work
/// - mounted: metadata of one volume lives in memory,
///   every file operation works on it until [unmount](ChainFs::unmount)
pub struct ChainFs<D: Disk> {
    /// where volumes are created and opened
    disk: D,
    /// the mounted volume, if any
    volume: Option<Volume<D::Device>>,
}

/// in-memory state of a mounted volume
#[derive(Debug)]
pub(crate) struct Volume<B> {
    pub(crate) name: String,
    pub(crate) superblock: SuperBlock,
    pub(crate) fat: AllocationTable,
    pub(crate) directory: DirectoryTable,
    pub(crate) descriptors: DescriptorTable,
    pub(crate) device: B,
}

impl<D: Disk> ChainFs<D> {
    /// a session with nothing mounted
    pub fn new(disk: D) -> Self {
        Self { disk, volume: None }
    }

    /// give the disk back, a mounted volume is unmounted first
    pub fn into_disk(mut self) -> Result<D> {
        if let Some(name) = self.mounted_volume().map(str::to_owned) {
            self.unmount(&name)?;
        }
        Ok(self.disk)
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.volume.is_some()
    }

    /// name of the mounted volume
    #[inline]
    pub fn mounted_volume(&self) -> Option<&str> {
        self.volume.as_ref().map(|v| v.name.as_str())
    }

    #[inline]
    pub(crate) fn volume(&self) -> Result<&Volume<D::Device>> {
        self.volume.as_ref().ok_or(FsError::NotMounted)
    }

    #[inline]
    pub(crate) fn volume_mut(&mut self) -> Result<&mut Volume<D::Device>> {
        self.volume.as_mut().ok_or(FsError::NotMounted)
    }
}

/// volume management
impl<D: Disk> ChainFs<D> {
    /// create a new, empty volume named `name`
    ///
    /// an existing volume of that name is wiped, unless it is the mounted one
    pub fn format(&mut self, name: &str) -> Result<()> {
        if self.mounted_volume() == Some(name) {
            return Err(FsError::AlreadyMounted(name.to_string()));
        }
        self.disk.create_store(name)?;
        let mut device = self.disk.open_store(name)?;

        let mut superblock = SuperBlock::new()?;
        let fat = AllocationTable::new();
        let directory = DirectoryTable::new();
        metadata::write_metadata(&mut device, &mut superblock, &fat, &directory)?;
        device.close()?;

        info!("formatted volume {name} with {DATA_BLOCKS} data blocks");
        Ok(())
    }

    /// load the metadata of volume `name` into memory
    pub fn mount(&mut self, name: &str) -> Result<()> {
        if let Some(mounted) = self.mounted_volume() {
            return Err(FsError::AlreadyMounted(mounted.to_string()));
        }
        let device = self.disk.open_store(name)?;
        let superblock = metadata::read_superblock(&device)?;
        let fat = metadata::read_fat(&device, &superblock)?;
        let mut directory = metadata::read_directory(&device, &superblock)?;
        // open counts can only be stale here
        directory.reset_open_counts();

        info!(
            "mounted volume {name}: {} files, {} of {DATA_BLOCKS} blocks free",
            directory.file_count(),
            fat.free_blocks()
        );
        self.volume = Some(Volume {
            name: name.to_string(),
            superblock,
            fat,
            directory,
            descriptors: DescriptorTable::new(),
            device,
        });
        Ok(())
    }

    /// write the metadata back and close volume `name`
    ///
    /// open descriptors are dropped. The volume is released even when
    /// writing the metadata fails, that error is still returned.
    pub fn unmount(&mut self, name: &str) -> Result<()> {
        if self.mounted_volume() != Some(name) {
            return Err(FsError::NotMounted);
        }
        let Some(mut volume) = self.volume.take() else {
            return Err(FsError::NotMounted);
        };
        let open = volume.descriptors.open_count();
        if open > 0 {
            warn!("unmounting {name} with {open} descriptor(s) still open");
        }
        volume.directory.reset_open_counts();
        let persisted = metadata::write_metadata(
            &mut volume.device,
            &mut volume.superblock,
            &volume.fat,
            &volume.directory,
        );
        let closed = volume.device.close();
        persisted?;
        closed?;

        info!("unmounted volume {name}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
    };

    use crate::{
        device::{ImageDisk, MemoryDevice, MemoryDisk},
        fs::{Block, FileName, BLOCK_SIZE, DIR_ENTRIES, FS_VERSION, SUPERBLOCK_INDEX},
        utils::traits::{DigestInSelf, SerializeAndDigest},
    };

    #[test]
    fn test_format_then_mount_is_empty() -> anyhow::Result<()> {
        let mut fs = ChainFs::new(MemoryDisk::default());
        fs.format("vol")?;
        assert!(!fs.is_mounted());
        fs.mount("vol")?;
        assert_eq!(fs.mounted_volume(), Some("vol"));

        let volume = fs.volume()?;
        assert_eq!(volume.directory.file_count(), 0);
        assert_eq!(volume.fat.free_blocks(), DATA_BLOCKS);
        assert_eq!(volume.superblock.version, FS_VERSION);
        fs.unmount("vol")?;
        assert!(!fs.is_mounted());
        Ok(())
    }

    #[test]
    fn test_mount_missing_volume_is_device_error() {
        let mut fs = ChainFs::new(MemoryDisk::default());
        assert!(matches!(fs.mount("nope"), Err(FsError::DeviceError(_))));
        assert!(!fs.is_mounted());
    }

    #[test]
    fn test_mount_rejects_other_version() {
        let disk = MemoryDisk::default();
        let mut fs = ChainFs::new(disk.clone());
        fs.format("vol").unwrap();

        let mut superblock = SuperBlock::new().unwrap();
        superblock.version = FS_VERSION + 1;
        superblock.digest().unwrap();
        let mut block: Block = [0u8; BLOCK_SIZE];
        superblock.serialize_into(&mut block).unwrap();
        let mut raw = disk.clone();
        raw.open_store("vol")
            .unwrap()
            .write_block(SUPERBLOCK_INDEX, &block)
            .unwrap();

        assert!(matches!(
            fs.mount("vol"),
            Err(FsError::VersionMismatch { found: 2, expected: 1 })
        ));
        assert!(!fs.is_mounted());
    }

    #[test]
    fn test_mount_unformatted_store_is_version_mismatch() {
        let mut disk = MemoryDisk::default();
        disk.create_store("blank").unwrap();
        let mut fs = ChainFs::new(disk);
        assert!(matches!(
            fs.mount("blank"),
            Err(FsError::VersionMismatch { found: 0, .. })
        ));
    }

    #[test]
    fn test_single_mount_per_session() {
        let mut fs = ChainFs::new(MemoryDisk::default());
        fs.format("a").unwrap();
        fs.format("b").unwrap();
        fs.mount("a").unwrap();
        assert!(matches!(fs.mount("b"), Err(FsError::AlreadyMounted(name)) if name == "a"));
        assert!(matches!(fs.format("a"), Err(FsError::AlreadyMounted(_))));
        assert!(matches!(fs.unmount("b"), Err(FsError::NotMounted)));
        fs.unmount("a").unwrap();
        assert!(matches!(fs.unmount("a"), Err(FsError::NotMounted)));
    }

    #[test]
    fn test_unmount_persists_tables() -> anyhow::Result<()> {
        let mut fs = ChainFs::new(MemoryDisk::default());
        fs.format("vol")?;
        fs.mount("vol")?;
        {
            let volume = fs.volume_mut()?;
            let head = volume.fat.allocate_one()?;
            volume.fat.resize(head, 4)?;
            volume.directory.occupy(2, FileName::new("kept")?, head);
            volume.directory.get_mut(2).unwrap().open_count = 5;
        }
        fs.unmount("vol")?;

        fs.mount("vol")?;
        let volume = fs.volume()?;
        assert_eq!(volume.fat.free_blocks(), DATA_BLOCKS - 4);
        assert_eq!(volume.directory.find("kept"), Some(2));
        assert_eq!(volume.directory.get(2).unwrap().open_count, 0);
        assert_eq!(volume.directory.entries().len(), DIR_ENTRIES);
        Ok(())
    }

    #[test]
    fn test_reformat_wipes_volume() -> anyhow::Result<()> {
        let mut fs = ChainFs::new(MemoryDisk::default());
        fs.format("vol")?;
        fs.mount("vol")?;
        let head = fs.volume_mut()?.fat.allocate_one()?;
        fs.volume_mut()?
            .directory
            .occupy(0, FileName::new("gone")?, head);
        fs.unmount("vol")?;

        fs.format("vol")?;
        fs.mount("vol")?;
        assert_eq!(fs.volume()?.directory.file_count(), 0);
        assert_eq!(fs.volume()?.fat.free_blocks(), DATA_BLOCKS);
        Ok(())
    }

    #[test]
    fn test_image_file_volume() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut fs = ChainFs::new(ImageDisk::new(dir.path()));
        fs.format("disk.img")?;
        fs.mount("disk.img")?;
        let disk = fs.into_disk()?;
        assert!(disk.image_path("disk.img").exists());
        Ok(())
    }

    /// a memory disk whose devices can be told to fail every write
    #[derive(Default, Clone)]
    struct FailingDisk {
        inner: MemoryDisk,
        fail_writes: Arc<AtomicBool>,
        closed: Arc<AtomicBool>,
    }

    struct FailingDevice {
        inner: MemoryDevice,
        fail_writes: Arc<AtomicBool>,
        closed: Arc<AtomicBool>,
    }

    impl Disk for FailingDisk {
        type Device = FailingDevice;

        fn create_store(&mut self, name: &str) -> io::Result<()> {
            self.inner.create_store(name)
        }

        fn open_store(&mut self, name: &str) -> io::Result<FailingDevice> {
            Ok(FailingDevice {
                inner: self.inner.open_store(name)?,
                fail_writes: Arc::clone(&self.fail_writes),
                closed: Arc::clone(&self.closed),
            })
        }
    }

    impl BlockDevice for FailingDevice {
        fn read_block(&self, index: usize, buf: &mut Block) -> io::Result<()> {
            self.inner.read_block(index, buf)
        }

        fn write_block(&mut self, index: usize, buf: &Block) -> io::Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "write refused"));
            }
            self.inner.write_block(index, buf)
        }

        fn close(self) -> io::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            self.inner.close()
        }
    }

    #[test]
    fn test_unmount_releases_volume_when_persisting_fails() -> anyhow::Result<()> {
        let disk = FailingDisk::default();
        let mut fs = ChainFs::new(disk.clone());
        fs.format("vol")?;
        fs.mount("vol")?;
        disk.closed.store(false, Ordering::SeqCst);
        disk.fail_writes.store(true, Ordering::SeqCst);

        assert!(matches!(fs.unmount("vol"), Err(FsError::DeviceError(_))));
        assert!(!fs.is_mounted());
        assert!(disk.closed.load(Ordering::SeqCst));

        // the volume on disk is still the formatted one and mounts again
        disk.fail_writes.store(false, Ordering::SeqCst);
        fs.mount("vol")?;
        assert_eq!(fs.mounted_volume(), Some("vol"));
        Ok(())
    }
}
