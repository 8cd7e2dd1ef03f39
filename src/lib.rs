pub mod cli_interface;
pub mod device;
pub mod error;
mod fs;
pub mod mkfs;
pub mod mount;
pub mod utils;
pub use error::{FsError, Result};
pub use fs::*;
