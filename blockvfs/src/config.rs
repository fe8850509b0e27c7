use log::warn;

/// Every block holds exactly this many bytes.
pub const BLOCK_SIZE: usize = 512;
/// Longest name, in characters, a file or directory may carry.
pub const MAX_NAME_LEN: usize = 50;

pub const DEFAULT_BLOCK_COUNT: usize = 1024;
pub const MIN_BLOCK_COUNT: usize = 1;
pub const MAX_BLOCK_COUNT: usize = 5000;

/// Startup geometry of a file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    /// Total number of blocks in the store, always within
    /// `MIN_BLOCK_COUNT..=MAX_BLOCK_COUNT`.
    pub block_count: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            block_count: DEFAULT_BLOCK_COUNT,
        }
    }
}

impl FsConfig {
    /// Builds a config from an operator supplied capacity. A missing or
    /// non-positive request falls back to the default; anything above the
    /// ceiling is clamped to it.
    pub fn from_requested(requested: Option<i64>) -> Self {
        let block_count = match requested {
            None => DEFAULT_BLOCK_COUNT,
            Some(n) if n < MIN_BLOCK_COUNT as i64 => {
                warn!(
                    "requested capacity {} is not positive, using {} blocks",
                    n, DEFAULT_BLOCK_COUNT
                );
                DEFAULT_BLOCK_COUNT
            }
            Some(n) if n > MAX_BLOCK_COUNT as i64 => {
                warn!(
                    "requested capacity {} exceeds the limit, using {} blocks",
                    n, MAX_BLOCK_COUNT
                );
                MAX_BLOCK_COUNT
            }
            Some(n) => n as usize,
        };
        Self { block_count }
    }

    /// Total bytes addressable across every block.
    pub fn capacity_bytes(&self) -> usize {
        self.block_count * BLOCK_SIZE
    }
}
