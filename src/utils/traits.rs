use serde::{de::DeserializeOwned, Serialize};

use crate::error::{FsError, Result};

/// Trait for digesting an object which stores digest in the object itself
pub trait DigestInSelf {
    fn digest(&mut self) -> Result<()>;
    fn verify_digest(&mut self) -> Result<bool>;
}

/// Trait for serializing and deserializing an object which stores digest in the object itself
/// # Note
/// Serializing refreshes the digest first; deserializing does **not** verify it,
/// callers decide in which order to check the decoded fields and the digest.
pub trait SerializeAndDigest: Serialize + DeserializeOwned + DigestInSelf {
    /// serialize into the front of `buf`
    /// # Returns
    /// The number of bytes written if successful
    fn serialize_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.digest()?;
        let config = bincode::config::legacy();
        Ok(bincode::serde::encode_into_slice(&*self, buf, config)?)
    }

    /// deserialize from the front of `buf`
    fn deserialize(buf: &[u8]) -> Result<Self> {
        let config = bincode::config::legacy();
        let (object, _bytes_read): (Self, usize) = bincode::serde::decode_from_slice(buf, config)?;
        Ok(object)
    }
}

/// A record stored in a fixed-size slot of an on-disk table.
pub trait FixedRecord: Serialize + DeserializeOwned + Sized {
    /// slot size in bytes, the encoding is zero padded up to it
    const RECORD_SIZE: usize;

    fn encode_record(&self, slot: &mut [u8]) -> Result<()> {
        debug_assert_eq!(slot.len(), Self::RECORD_SIZE);
        slot.fill(0);
        let config = bincode::config::legacy();
        bincode::serde::encode_into_slice(self, slot, config)?;
        Ok(())
    }

    fn decode_record(slot: &[u8]) -> Result<Self> {
        let config = bincode::config::legacy();
        let (record, _): (Self, usize) = bincode::serde::decode_from_slice(slot, config)?;
        Ok(record)
    }

    /// encode `records` back to back, one slot each
    fn encode_table(records: &[Self]) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; records.len() * Self::RECORD_SIZE];
        for (record, slot) in records.iter().zip(bytes.chunks_exact_mut(Self::RECORD_SIZE)) {
            record.encode_record(slot)?;
        }
        Ok(bytes)
    }

    /// decode `count` records from the front of `bytes`
    fn decode_table(bytes: &[u8], count: usize) -> Result<Vec<Self>> {
        if bytes.len() < count * Self::RECORD_SIZE {
            return Err(FsError::Corrupted(format!(
                "table needs {} bytes, only {} read",
                count * Self::RECORD_SIZE,
                bytes.len()
            )));
        }
        bytes
            .chunks_exact(Self::RECORD_SIZE)
            .take(count)
            .map(Self::decode_record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Pair {
        a: u32,
        b: bool,
    }

    impl FixedRecord for Pair {
        const RECORD_SIZE: usize = 8;
    }

    #[test]
    fn test_table_is_slot_aligned() -> anyhow::Result<()> {
        let records = vec![Pair { a: 1, b: true }, Pair { a: 2, b: false }];
        let bytes = Pair::encode_table(&records)?;
        assert_eq!(bytes.len(), 16);
        // second record starts exactly one slot in
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
        assert_eq!(Pair::decode_table(&bytes, 2)?, records);
        Ok(())
    }

    #[test]
    fn test_short_table_is_corrupted() {
        let err = Pair::decode_table(&[0u8; 12], 2).unwrap_err();
        assert!(matches!(err, FsError::Corrupted(_)));
    }

    #[test]
    fn test_record_larger_than_slot_fails() {
        #[derive(Serialize, Deserialize)]
        struct Wide(u64, u64);
        impl FixedRecord for Wide {
            const RECORD_SIZE: usize = 8;
        }
        let mut slot = [0u8; 8];
        assert!(Wide(1, 2).encode_record(&mut slot).is_err());
    }
}
