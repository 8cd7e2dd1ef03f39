use std::time::SystemTime;

use log::{debug, warn};

use crate::{
    device::{BlockDevice, Disk},
    error::{FsError, Result},
    utils::fs_size_calculator::{blocks_for, terminal_valid_bytes},
};

use super::{
    fs_layout::Volume, Block, ChainFs, FileHandle, FileName, BLOCK_SIZE, DATA_BIAS, DATA_BLOCKS,
    DIR_ENTRIES, FILE_DESCRIPTORS,
};

/// what `ls` shows about one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: usize,
    /// length of the file's chain
    pub blocks: usize,
    pub open_count: u32,
}

/// what `stat` shows about a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsStats {
    pub total_blocks: usize,
    pub free_blocks: usize,
    pub files: usize,
    pub max_files: usize,
    pub open_descriptors: usize,
    pub max_descriptors: usize,
    pub formatted_at: SystemTime,
}

/// chain walking on a mounted volume
impl<B: BlockDevice> Volume<B> {
    /// chain head of the used entry at directory slot `index`
    fn head_of(&self, index: usize) -> Result<u32> {
        self.directory
            .get(index)
            .filter(|e| e.used)
            .and_then(|e| e.head)
            .ok_or(FsError::InvalidHandle)
    }

    /// full blocks for every node but the terminal, plus its valid bytes
    fn file_size(&self, head: u32) -> Result<usize> {
        let chain = self.fat.chain(head)?;
        let terminal = chain[chain.len() - 1];
        let valid = self
            .fat
            .entry(terminal)
            .map_or(0, |e| (e.valid_bytes as usize).min(BLOCK_SIZE));
        Ok((chain.len() - 1) * BLOCK_SIZE + valid)
    }

    /// read the whole content of the file at `head`
    fn load_file(&self, head: u32) -> Result<Vec<u8>> {
        let chain = self.fat.chain(head)?;
        let mut content = Vec::with_capacity(chain.len() * BLOCK_SIZE);
        let mut block: Block = [0u8; BLOCK_SIZE];
        for (i, &index) in chain.iter().enumerate() {
            let valid = if i + 1 == chain.len() {
                self.fat
                    .entry(index)
                    .map_or(0, |e| (e.valid_bytes as usize).min(BLOCK_SIZE))
            } else {
                BLOCK_SIZE
            };
            self.device.read_block(DATA_BIAS + index as usize, &mut block)?;
            content.extend_from_slice(&block[..valid]);
        }
        Ok(content)
    }

    /// write `content` over the chain at `head`, one block per node
    ///
    /// the chain must already have exactly `blocks_for(content.len())` nodes
    fn store_file(&mut self, head: u32, content: &[u8]) -> Result<()> {
        let chain = self.fat.chain(head)?;
        if chain.len() != blocks_for(content.len()) {
            return Err(FsError::Corrupted(format!(
                "chain {head} has {} blocks for {} bytes",
                chain.len(),
                content.len()
            )));
        }
        let mut block: Block = [0u8; BLOCK_SIZE];
        for (i, &index) in chain.iter().enumerate() {
            let chunk = content
                .get(i * BLOCK_SIZE..)
                .map(|rest| &rest[..rest.len().min(BLOCK_SIZE)])
                .unwrap_or_default();
            block.fill(0);
            block[..chunk.len()].copy_from_slice(chunk);
            self.device.write_block(DATA_BIAS + index as usize, &block)?;

            let valid = if i + 1 == chain.len() {
                terminal_valid_bytes(content.len())
            } else {
                BLOCK_SIZE
            };
            self.fat.set_valid_bytes(index, valid);
        }
        Ok(())
    }

    /// descriptor cursor and chain head behind `handle`
    fn open_file(&self, handle: FileHandle) -> Result<(usize, u32)> {
        let descriptor = self.descriptors.get(handle)?;
        let head = self.head_of(descriptor.directory_index)?;
        Ok((descriptor.offset, head))
    }
}

/// namespace operations
impl<D: Disk> ChainFs<D> {
    /// create an empty file named `name`, owning a one-block chain
    pub fn create(&mut self, name: &str) -> Result<()> {
        let volume = self.volume_mut()?;
        let name = FileName::new(name)?;
        if volume.directory.find(name.as_str()).is_some() {
            return Err(FsError::AlreadyExists {
                name: name.to_string(),
            });
        }
        let slot = volume
            .directory
            .free_slot()
            .ok_or(FsError::NamespaceFull)?;
        let head = volume.fat.allocate_one()?;
        debug!("create {name} in slot {slot}, chain head {head}");
        volume.directory.occupy(slot, name, head);
        Ok(())
    }

    /// remove the file named `name` and free its chain
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let volume = self.volume_mut()?;
        let slot = volume.directory.find(name).ok_or_else(|| FsError::NotFound {
            name: name.to_string(),
        })?;
        let entry = volume.directory.get(slot).ok_or(FsError::InvalidHandle)?;
        if entry.open_count > 0 {
            return Err(FsError::BusyOnDelete {
                name: name.to_string(),
                open_count: entry.open_count,
            });
        }
        let freed = match entry.head {
            Some(head) => volume.fat.free_chain(head),
            None => 0,
        };
        volume.directory.vacate(slot);
        debug!("delete {name}, {freed} blocks freed");
        Ok(())
    }

    /// open the file named `name` with its cursor at `0`
    pub fn open(&mut self, name: &str) -> Result<FileHandle> {
        let volume = self.volume_mut()?;
        let slot = volume.directory.find(name).ok_or_else(|| FsError::NotFound {
            name: name.to_string(),
        })?;
        let handle = volume.descriptors.allocate(slot)?;
        if let Some(entry) = volume.directory.get_mut(slot) {
            entry.open_count += 1;
        }
        debug!("open {name} as {handle}");
        Ok(handle)
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        let volume = self.volume_mut()?;
        let slot = volume.descriptors.release(handle)?;
        if let Some(entry) = volume.directory.get_mut(slot) {
            entry.open_count = entry.open_count.saturating_sub(1);
        }
        debug!("close {handle}");
        Ok(())
    }

    /// every file of the volume, in directory order
    pub fn files(&self) -> Result<Vec<FileInfo>> {
        let volume = self.volume()?;
        volume
            .directory
            .used()
            .map(|(_, entry)| -> Result<FileInfo> {
                let head = entry.head.ok_or(FsError::InvalidHandle)?;
                Ok(FileInfo {
                    name: entry
                        .name
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    size: volume.file_size(head)?,
                    blocks: volume.fat.chain_length(head),
                    open_count: entry.open_count,
                })
            })
            .collect()
    }

    pub fn stats(&self) -> Result<FsStats> {
        let volume = self.volume()?;
        Ok(FsStats {
            total_blocks: DATA_BLOCKS,
            free_blocks: volume.fat.free_blocks(),
            files: volume.directory.file_count(),
            max_files: DIR_ENTRIES,
            open_descriptors: volume.descriptors.open_count(),
            max_descriptors: FILE_DESCRIPTORS,
            formatted_at: volume.superblock.formatted_at.into(),
        })
    }
}

/// file content operations
impl<D: Disk> ChainFs<D> {
    /// size of the open file in bytes
    pub fn size(&self, handle: FileHandle) -> Result<usize> {
        let volume = self.volume()?;
        let (_, head) = volume.open_file(handle)?;
        volume.file_size(head)
    }

    /// current cursor of `handle`
    pub fn position(&self, handle: FileHandle) -> Result<usize> {
        Ok(self.volume()?.descriptors.get(handle)?.offset)
    }

    /// read up to `count` bytes at the cursor and advance it
    ///
    /// an empty result means end of file
    pub fn read(&mut self, handle: FileHandle, count: usize) -> Result<Vec<u8>> {
        let volume = self.volume_mut()?;
        let (offset, head) = volume.open_file(handle)?;
        let content = volume.load_file(head)?;
        let start = offset.min(content.len());
        let end = start + count.min(content.len() - start);
        volume.descriptors.get_mut(handle)?.offset = offset + (end - start);
        debug!("read {handle}: {} of {count} bytes at {offset}", end - start);
        Ok(content[start..end].to_vec())
    }

    /// write `data` at the cursor and advance it
    /// # Returns
    /// how many bytes were written. This is less than `data.len()` when the
    /// volume ran out of blocks, which is not an error.
    ///
    /// An empty `data` is accepted and returns `0` without touching the file,
    /// it is not rejected as an invalid length.
    pub fn write(&mut self, handle: FileHandle, data: &[u8]) -> Result<usize> {
        let volume = self.volume_mut()?;
        let (offset, head) = volume.open_file(handle)?;
        if data.is_empty() {
            return Ok(0);
        }
        let mut content = volume.load_file(head)?;
        let size = content.len();

        let current_blocks = volume.fat.chain_length(head);
        let target_blocks = blocks_for(size.max(offset + data.len()));
        let grown = volume.fat.resize(head, target_blocks)?;
        let missing = target_blocks.saturating_sub(current_blocks + grown.max(0) as usize);
        let written = data.len().saturating_sub(missing * BLOCK_SIZE);
        if missing > 0 {
            warn!(
                "short write on {handle}: {written} of {} bytes, {missing} blocks missing",
                data.len()
            );
        }

        if written > 0 {
            // a cursor past the end leaves a zero-filled gap
            content.resize(size.max(offset + written), 0);
            content[offset..offset + written].copy_from_slice(&data[..written]);
        }
        // hand back blocks the shortened content does not need
        volume.fat.resize(head, blocks_for(content.len()))?;
        volume.store_file(head, &content)?;

        volume.descriptors.get_mut(handle)?.offset = offset + written;
        debug!("write {handle}: {written} bytes at {offset}");
        Ok(written)
    }

    /// move the cursor of `handle` to `offset`, which must lie in `[0, size]`
    pub fn seek(&mut self, handle: FileHandle, offset: i64) -> Result<()> {
        let volume = self.volume_mut()?;
        let (_, head) = volume.open_file(handle)?;
        let size = volume.file_size(head)?;
        let offset = usize::try_from(offset)
            .ok()
            .filter(|&o| o <= size)
            .ok_or_else(|| {
                FsError::InvalidArgument(format!("seek to {offset} outside [0, {size}]"))
            })?;
        volume.descriptors.get_mut(handle)?.offset = offset;
        Ok(())
    }

    /// cut the file down to `length` bytes, freeing blocks past the new end
    ///
    /// no cursor is moved, not even the one of `handle`
    pub fn truncate(&mut self, handle: FileHandle, length: usize) -> Result<()> {
        let volume = self.volume_mut()?;
        let (_, head) = volume.open_file(handle)?;
        let mut content = volume.load_file(head)?;
        if length > content.len() {
            return Err(FsError::InvalidArgument(format!(
                "cannot truncate {} bytes to {length}",
                content.len()
            )));
        }
        content.truncate(length);
        volume.fat.resize(head, blocks_for(length))?;
        volume.store_file(head, &content)?;
        debug!("truncate {handle} to {length} bytes");
        Ok(())
    }
}
