use crate::config::BLOCK_SIZE;
use crate::io::block::{BlockNumber, BlockStorage};
use std::io::ErrorKind;
use zerocopy::{AsBytes, FromBytes};

/// A single fixed-size unit of storage.
#[repr(C)]
#[derive(AsBytes, FromBytes, Clone, Copy)]
pub(crate) struct Block {
    bytes: [u8; BLOCK_SIZE],
}

impl Block {
    pub(crate) fn zeroed() -> Self {
        Self {
            bytes: [0; BLOCK_SIZE],
        }
    }
}

/// Emulates block storage in process memory. Nothing outlives the store; it is
/// meant as the backing device for a file system that lives for one session.
pub struct MemoryBlockStore {
    blocks: Vec<Block>,
}

impl MemoryBlockStore {
    fn check_range(&self, blocknr: BlockNumber) -> std::io::Result<()> {
        if blocknr >= self.blocks.len() {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block out of range",
            ));
        }
        Ok(())
    }
}

impl BlockStorage for MemoryBlockStore {
    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn read_block(&self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()> {
        self.check_range(blocknr)?;
        if buf.len() < BLOCK_SIZE {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "buffer does not contain enough space to read block",
            ));
        }
        buf[..BLOCK_SIZE].copy_from_slice(self.blocks[blocknr].as_bytes());
        Ok(())
    }

    /// This method truncates writes that exceed the total block size.
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()> {
        self.check_range(blocknr)?;
        let max = buf.len().min(BLOCK_SIZE);
        self.blocks[blocknr].as_bytes_mut()[..max].copy_from_slice(&buf[..max]);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlockStoreBuilder {
    block_count: usize,
}

impl MemoryBlockStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of desired blocks in the block store device.
    pub fn with_block_count(mut self, blocks: usize) -> Self {
        self.block_count = blocks;
        self
    }

    /// Allocates and zero fills the whole store up front. Returns an
    /// `OutOfMemory` error if the store cannot be reserved.
    pub fn build(self) -> std::io::Result<MemoryBlockStore> {
        if self.block_count == 0 {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block store needs at least one block",
            ));
        }

        let mut blocks = Vec::new();
        blocks.try_reserve_exact(self.block_count).map_err(|_| {
            std::io::Error::new(
                ErrorKind::OutOfMemory,
                format!("could not reserve {} blocks", self.block_count),
            )
        })?;
        blocks.resize(self.block_count, Block::zeroed());
        Ok(MemoryBlockStore { blocks })
    }
}
