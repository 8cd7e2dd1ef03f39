//! mount a volume image for the span of one command
use anyhow::anyhow;
use log::warn;
use std::path::Path;

use crate::{device::ImageDisk, mkfs::volume_name, ChainFs};

/// mount the image at `image_path`, run `action` on it, then unmount
///
/// the volume is unmounted whether `action` succeeds or not,
/// an error of `action` wins over one from unmounting
pub fn with_mounted<P, T, F>(image_path: P, action: F) -> anyhow::Result<T>
where
    P: AsRef<Path>,
    F: FnOnce(&mut ChainFs<ImageDisk>) -> anyhow::Result<T>,
{
    let name = volume_name(image_path.as_ref())?;
    let mut fs = ChainFs::new(ImageDisk::default());
    fs.mount(name)?;
    let result = action(&mut fs);
    let unmounted = fs.unmount(name);
    match (result, unmounted) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), unmounted) => {
            if let Err(unmount_error) = unmounted {
                warn!("unmount after a failed command also failed: {unmount_error}");
            }
            Err(e)
        }
    }
}

/// store `content` as file `name`, replacing what it held before
///
/// a short write is an error here, the shortened file stays on the volume
pub fn put_file(fs: &mut ChainFs<ImageDisk>, name: &str, content: &[u8]) -> anyhow::Result<()> {
    if !fs.files()?.iter().any(|f| f.name == name) {
        fs.create(name)?;
    }
    let fd = fs.open(name)?;
    let written = fs
        .truncate(fd, 0)
        .and_then(|_| fs.write(fd, content));
    fs.close(fd)?;
    let written = written?;
    if written < content.len() {
        return Err(anyhow!(
            "volume is full: only {written} of {} bytes of {name} were stored",
            content.len()
        ));
    }
    Ok(())
}

/// the whole content of file `name`
pub fn get_file(fs: &mut ChainFs<ImageDisk>, name: &str) -> anyhow::Result<Vec<u8>> {
    let fd = fs.open(name)?;
    let content = fs.size(fd).and_then(|size| fs.read(fd, size));
    fs.close(fd)?;
    Ok(content?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mkfs::mkfs, FsError};

    #[test]
    fn test_put_get_across_mounts() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("vol.img");
        mkfs(&image)?;

        with_mounted(&image, |fs| put_file(fs, "notes", b"first version, long"))?;
        with_mounted(&image, |fs| put_file(fs, "notes", b"second"))?;
        let content = with_mounted(&image, |fs| get_file(fs, "notes"))?;
        assert_eq!(content, b"second");

        let files = with_mounted(&image, |fs| Ok(fs.files()?))?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 6);
        Ok(())
    }

    #[test]
    fn test_failed_action_still_unmounts() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("vol.img");
        mkfs(&image)?;

        let err = with_mounted(&image, |fs| get_file(fs, "missing")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FsError>(),
            Some(FsError::NotFound { .. })
        ));
        // the volume can be mounted again
        with_mounted(&image, |fs| {
            fs.create("after")?;
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        assert!(with_mounted(dir.path().join("none.img"), |_| Ok(())).is_err());
    }
}
