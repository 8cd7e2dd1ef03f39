//! This module contains functions to calculate the size of differennt fs components

use crate::fs::{BLOCK_SIZE, TOTAL_BLOCKS};

/// calculate how many chain blocks a file of `len` bytes occupies
/// # Arguments
/// - `len`: the file size in bytes
/// # Return
/// the block count, never less than 1 since every file owns its chain head
/// # Example
/// ```
/// use chainfs::utils::fs_size_calculator::blocks_for;
/// use chainfs::BLOCK_SIZE;
/// assert_eq!(blocks_for(0), 1);
/// assert_eq!(blocks_for(BLOCK_SIZE), 1);
/// assert_eq!(blocks_for(5000), 2);
/// ```
pub const fn blocks_for(len: usize) -> usize {
    if len == 0 {
        1
    } else {
        len.div_ceil(BLOCK_SIZE)
    }
}

/// calculate how many bytes of the terminal block belong to a file of `len` bytes
/// # Example
/// ```
/// use chainfs::utils::fs_size_calculator::terminal_valid_bytes;
/// use chainfs::BLOCK_SIZE;
/// assert_eq!(terminal_valid_bytes(0), 0);
/// assert_eq!(terminal_valid_bytes(5000), 904);
/// assert_eq!(terminal_valid_bytes(2 * BLOCK_SIZE), BLOCK_SIZE);
/// ```
pub const fn terminal_valid_bytes(len: usize) -> usize {
    match len % BLOCK_SIZE {
        0 if len > 0 => BLOCK_SIZE,
        rest => rest,
    }
}

/// calculate the size of a volume's backing store
/// # Example
/// ```
/// use chainfs::utils::fs_size_calculator::volume_size;
/// assert_eq!(volume_size(), 32 << 20);
/// ```
pub const fn volume_size() -> u64 {
    (TOTAL_BLOCKS * BLOCK_SIZE) as u64
}
