use crate::{device::MemoryDisk, ChainFs};

pub const TEST_VOLUME: &str = "test_volume";

/// a freshly formatted volume, already mounted as [TEST_VOLUME]
pub fn init_test_environment() -> ChainFs<MemoryDisk> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut fs = ChainFs::new(MemoryDisk::default());
    fs.format(TEST_VOLUME).expect("Failed to format test volume");
    fs.mount(TEST_VOLUME).expect("Failed to mount test volume");
    fs
}
