use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    error::{FsError, Result},
    utils::traits::FixedRecord,
};

use super::{DIR_ENTRIES, DIR_RECORD_SIZE, MAX_NAME_LEN};

/// A file name, at most [MAX_NAME_LEN] bytes and never empty.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(String);

impl FileName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.len() > MAX_NAME_LEN {
            return Err(FsError::NameTooLong {
                len: name.len(),
                max: MAX_NAME_LEN,
            });
        }
        if name.is_empty() {
            return Err(FsError::InvalidArgument("file name is empty".into()));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FileName {
    type Error = FsError;
    fn try_from(value: String) -> Result<Self> {
        FileName::new(value)
    }
}

impl From<FileName> for String {
    fn from(name: FileName) -> Self {
        name.0
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One namespace slot.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub used: bool,
    pub name: Option<FileName>,
    /// first block of the file's chain
    pub head: Option<u32>,
    /// descriptors currently open on this file
    pub open_count: u32,
}

impl FixedRecord for DirectoryEntry {
    const RECORD_SIZE: usize = DIR_RECORD_SIZE;
}

/// The fixed-capacity table of all files.
#[derive(Debug, Clone)]
pub struct DirectoryTable {
    entries: Vec<DirectoryEntry>,
}

impl Default for DirectoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTable {
    pub fn new() -> Self {
        Self {
            entries: vec![DirectoryEntry::default(); DIR_ENTRIES],
        }
    }

    pub fn from_entries(entries: Vec<DirectoryEntry>) -> Result<Self> {
        if entries.len() != DIR_ENTRIES {
            return Err(FsError::Corrupted(format!(
                "directory table has {} entries, expected {DIR_ENTRIES}",
                entries.len()
            )));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// slot index of the used entry called `name`
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| {
            e.used && e.name.as_ref().is_some_and(|n| n.as_str() == name)
        })
    }

    pub fn get(&self, index: usize) -> Option<&DirectoryEntry> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DirectoryEntry> {
        self.entries.get_mut(index)
    }

    /// first free slot, if any
    pub fn free_slot(&self) -> Option<usize> {
        self.entries.iter().position(|e| !e.used)
    }

    /// fill slot `index` with a fresh, closed file
    pub fn occupy(&mut self, index: usize, name: FileName, head: u32) {
        self.entries[index] = DirectoryEntry {
            used: true,
            name: Some(name),
            head: Some(head),
            open_count: 0,
        };
    }

    /// clear slot `index` back to free
    pub fn vacate(&mut self, index: usize) {
        self.entries[index] = DirectoryEntry::default();
    }

    /// used entries with their slot index
    pub fn used(&self) -> impl Iterator<Item = (usize, &DirectoryEntry)> {
        self.entries.iter().enumerate().filter(|(_, e)| e.used)
    }

    pub fn file_count(&self) -> usize {
        self.used().count()
    }

    /// drop any open state, descriptors never outlive a mount
    pub fn reset_open_counts(&mut self) {
        for entry in &mut self.entries {
            entry.open_count = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::BLOCK_SIZE;

    #[test]
    fn test_file_name_bounds() {
        assert!(FileName::new("a.txt").is_ok());
        assert!(FileName::new("x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(matches!(
            FileName::new("x".repeat(MAX_NAME_LEN + 1)),
            Err(FsError::NameTooLong { len: 16, max: 15 })
        ));
        assert!(matches!(
            FileName::new(""),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_find_skips_free_slots() {
        let mut dir = DirectoryTable::new();
        dir.occupy(3, FileName::new("a.txt").unwrap(), 7);
        assert_eq!(dir.find("a.txt"), Some(3));
        assert_eq!(dir.find("b.txt"), None);
        assert_eq!(dir.free_slot(), Some(0));

        dir.vacate(3);
        assert_eq!(dir.find("a.txt"), None);
        assert_eq!(dir.file_count(), 0);
    }

    #[test]
    fn test_full_table_has_no_free_slot() {
        let mut dir = DirectoryTable::new();
        for i in 0..DIR_ENTRIES {
            dir.occupy(i, FileName::new(format!("f{i}")).unwrap(), i as u32);
        }
        assert_eq!(dir.free_slot(), None);
        assert_eq!(dir.file_count(), DIR_ENTRIES);
    }

    #[test]
    fn test_table_fits_one_block() -> anyhow::Result<()> {
        let mut dir = DirectoryTable::new();
        for i in 0..DIR_ENTRIES {
            dir.occupy(i, FileName::new("y".repeat(MAX_NAME_LEN))?, u32::MAX - 1);
            dir.get_mut(i).unwrap().open_count = u32::MAX;
        }
        let bytes = DirectoryEntry::encode_table(dir.entries())?;
        assert!(bytes.len() <= BLOCK_SIZE);

        let decoded = DirectoryEntry::decode_table(&bytes, DIR_ENTRIES)?;
        assert_eq!(decoded, dir.entries());
        Ok(())
    }

    #[test]
    fn test_overlong_name_on_disk_is_corrupted() {
        #[derive(Serialize)]
        struct RawEntry {
            used: bool,
            name: Option<String>,
            head: Option<u32>,
            open_count: u32,
        }
        let raw = RawEntry {
            used: true,
            name: Some("z".repeat(MAX_NAME_LEN + 1)),
            head: Some(0),
            open_count: 0,
        };
        let bytes = bincode::serde::encode_to_vec(&raw, bincode::config::legacy()).unwrap();
        assert!(matches!(
            DirectoryEntry::decode_record(&bytes),
            Err(FsError::Corrupted(_))
        ));
    }

    #[test]
    fn test_reset_open_counts() {
        let mut dir = DirectoryTable::new();
        dir.occupy(0, FileName::new("a").unwrap(), 0);
        dir.get_mut(0).unwrap().open_count = 3;
        dir.reset_open_counts();
        assert_eq!(dir.get(0).unwrap().open_count, 0);
    }
}
