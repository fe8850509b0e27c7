mod block;
mod memory;

pub use block::{BlockNumber, BlockStorage};
pub(crate) use memory::Block;
pub use memory::{MemoryBlockStore, MemoryBlockStoreBuilder};
