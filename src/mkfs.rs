//! create our filesystem
use anyhow::{anyhow, Ok};
use byte_unit::Byte;
use log::info;
use std::path::Path;

use crate::{device::ImageDisk, utils::fs_size_calculator::volume_size, ChainFs};

/// create a new volume image at `image_file_path`
/// # Params
/// - `image_file_path`: the path of the image file, it must not exist yet
///
/// # Return
/// an [anyhow::Result] type to indicate whether the operation is successful
pub fn mkfs<P>(image_file_path: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let path = image_file_path.as_ref();
    if path.exists() {
        return Err(anyhow!("image file {path:?} already exists"));
    }
    let name = volume_name(path)?;
    let mut fs = ChainFs::new(ImageDisk::default());
    fs.format(name)?;
    info!(
        "created {path:?}, {}",
        Byte::from_bytes(volume_size() as _).get_appropriate_unit(true)
    );
    Ok(())
}

/// the volume name an image path is opened under
pub(crate) fn volume_name(path: &Path) -> anyhow::Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("image path {path:?} is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{BLOCK_SIZE, DATA_BLOCKS, TOTAL_BLOCKS};

    #[test]
    fn test_mkfs() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("new_fs.img");
        mkfs(&image)?;
        assert_eq!(
            std::fs::metadata(&image)?.len(),
            (TOTAL_BLOCKS * BLOCK_SIZE) as u64
        );

        let mut fs = ChainFs::new(ImageDisk::default());
        fs.mount(volume_name(&image)?)?;
        let stats = fs.stats()?;
        assert_eq!(stats.files, 0);
        assert_eq!(stats.free_blocks, DATA_BLOCKS);
        Ok(())
    }

    #[test]
    fn test_mkfs_keeps_existing_image() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("taken.img");
        std::fs::write(&image, b"not a volume")?;
        assert!(mkfs(&image).is_err());
        assert_eq!(std::fs::read(&image)?, b"not a volume");
        Ok(())
    }
}
