use std::fmt;

use crate::alloc::{FreePool, Usage};
use crate::config::{FsConfig, BLOCK_SIZE};
use crate::error::{Result, VfsError};
use crate::io::{Block, BlockNumber, BlockStorage, MemoryBlockStore, MemoryBlockStoreBuilder};
use crate::node::{Kind, NodeId, Tree};

use log::{debug, info, warn};
use zerocopy::AsBytes;

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: Kind,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Directory => write!(f, "{}/", self.name),
            Kind::File => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The payload was stored; holds its length in bytes.
    Written(usize),
    /// An empty payload released every block the file held.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(Vec<u8>),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub kind: Kind,
    /// Content length in bytes, 0 for directories.
    pub len: usize,
    /// Blocks owned, 0 for directories.
    pub blocks: usize,
}

/// What `Vfs::shutdown` released.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Teardown {
    pub files: usize,
    /// Includes the root.
    pub directories: usize,
    pub blocks_reclaimed: usize,
}

/// An in-memory hierarchical file system over a fixed pool of blocks.
///
/// Every command resolves names against the current directory only; there is
/// no multi-segment path lookup.
pub struct Vfs<T: BlockStorage> {
    dev: T,
    pool: FreePool,
    tree: Tree,
    cwd: NodeId,
}

impl Vfs<MemoryBlockStore> {
    /// Builds a zero-filled memory store sized by `config` and a file system
    /// on top of it.
    pub fn in_memory(config: FsConfig) -> Result<Self> {
        let dev = MemoryBlockStoreBuilder::new()
            .with_block_count(config.block_count)
            .build()?;
        Ok(Vfs::create(dev))
    }
}

impl<T: BlockStorage> Vfs<T> {
    /// Initializes an empty file system onto owned block storage. Every block
    /// starts in the free pool and the current directory is the root.
    pub fn create(dev: T) -> Self {
        let pool = FreePool::new(dev.block_count());
        let tree = Tree::new();
        let cwd = tree.root();
        info!("file system ready with {} blocks", pool.total());
        Vfs {
            dev,
            pool,
            tree,
            cwd,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn cwd(&self) -> NodeId {
        self.cwd
    }

    pub fn mkdir(&mut self, name: &str) -> Result<NodeId> {
        self.tree.create_child(self.cwd, name, Kind::Directory)
    }

    /// Creates an empty file in the current directory.
    pub fn create_file(&mut self, name: &str) -> Result<NodeId> {
        self.tree.create_child(self.cwd, name, Kind::File)
    }

    pub fn ls(&self) -> Vec<Entry> {
        self.tree
            .children(self.cwd)
            .map(|id| {
                let node = &self.tree[id];
                Entry {
                    name: node.name().to_owned(),
                    kind: node.kind(),
                }
            })
            .collect()
    }

    pub fn stat(&self, name: &str) -> Result<Stat> {
        let id = self.tree.find_child(self.cwd, name)?;
        let node = &self.tree[id];
        let (len, blocks) = node
            .as_file()
            .map_or((0, 0), |file| (file.len(), file.blocks().len()));
        Ok(Stat {
            kind: node.kind(),
            len,
            blocks,
        })
    }

    fn lookup_file(&self, name: &str) -> Result<NodeId> {
        let id = self.tree.find_child(self.cwd, name)?;
        if self.tree[id].is_dir() {
            return Err(VfsError::NotAFile(name.to_owned()));
        }
        Ok(id)
    }

    /// Takes every block away from a file and returns them to the pool.
    fn release_blocks(&mut self, id: NodeId) -> usize {
        let blocks = match self.tree[id].as_file_mut() {
            Some(file) => {
                file.len = 0;
                std::mem::take(&mut file.blocks)
            }
            None => return 0,
        };
        for &blocknr in &blocks {
            self.pool.reclaim(blocknr);
        }
        blocks.len()
    }

    /// Replaces the whole content of `name` with `data`.
    ///
    /// Capacity is checked against the free pool before the file's current
    /// blocks are released, so rewriting a file in place needs room for the new
    /// content on top of the old. On `DiskFull` the file is left untouched.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<WriteOutcome> {
        let id = self.lookup_file(name)?;

        let needed = (data.len() + BLOCK_SIZE - 1) / BLOCK_SIZE;
        let free = self.pool.len();
        if needed > free {
            warn!(
                "write to '{}' needs {} blocks but only {} are free",
                name, needed, free
            );
            return Err(VfsError::DiskFull { needed, free });
        }

        let released = self.release_blocks(id);
        debug!("released {} blocks held by '{}'", released, name);
        if data.is_empty() {
            return Ok(WriteOutcome::Empty);
        }

        let blocks = (0..needed)
            .map(|_| self.pool.issue())
            .collect::<Result<Vec<BlockNumber>>>()?;
        let file = match self.tree[id].as_file_mut() {
            Some(file) => file,
            None => return Err(VfsError::NotAFile(name.to_owned())),
        };
        // Owned before written: a failed block write must not leak blocks.
        file.blocks = blocks;
        file.len = data.len();

        for (&blocknr, chunk) in file.blocks.iter().zip(data.chunks(BLOCK_SIZE)) {
            let mut block = Block::zeroed();
            block.as_bytes_mut()[..chunk.len()].copy_from_slice(chunk);
            self.dev.write_block(blocknr, block.as_bytes())?;
        }
        info!("wrote {} bytes to '{}' in {} blocks", data.len(), name, needed);
        Ok(WriteOutcome::Written(data.len()))
    }

    /// Returns exactly the bytes last written to `name`.
    pub fn read(&self, name: &str) -> Result<ReadOutcome> {
        let id = self.lookup_file(name)?;
        let file = match self.tree[id].as_file() {
            Some(file) if !file.blocks().is_empty() => file,
            _ => return Ok(ReadOutcome::Empty),
        };

        let mut content = Vec::with_capacity(file.len());
        let mut buf = [0; BLOCK_SIZE];
        let mut remain = file.len();
        for &blocknr in file.blocks() {
            self.dev.read_block(blocknr, &mut buf)?;
            let chunk = remain.min(BLOCK_SIZE);
            content.extend_from_slice(&buf[..chunk]);
            remain -= chunk;
        }
        Ok(ReadOutcome::Data(content))
    }

    /// Removes a file, returning how many blocks went back to the pool.
    pub fn delete(&mut self, name: &str) -> Result<usize> {
        let id = self.lookup_file(name)?;
        let reclaimed = self.release_blocks(id);
        self.tree.detach(self.cwd, id);
        self.tree.remove(id);
        info!("deleted '{}', reclaimed {} blocks", name, reclaimed);
        Ok(reclaimed)
    }

    /// Removes an empty directory.
    pub fn rmdir(&mut self, name: &str) -> Result<()> {
        let id = self.tree.find_child(self.cwd, name)?;
        let node = &self.tree[id];
        if !node.is_dir() {
            return Err(VfsError::NotADirectory(name.to_owned()));
        }
        if node.child_count() > 0 {
            return Err(VfsError::DirectoryNotEmpty(name.to_owned()));
        }

        self.tree.detach(self.cwd, id);
        self.tree.remove(id);
        info!("removed directory '{}'", name);
        Ok(())
    }

    /// Moves the current directory by one token (`/`, `..` or a child name)
    /// and returns the new absolute path. Leaves the current directory alone
    /// on error.
    pub fn cd(&mut self, token: &str) -> Result<String> {
        self.cwd = self.tree.resolve(self.cwd, token)?;
        let path = self.pwd();
        info!("moved to {}", path);
        Ok(path)
    }

    pub fn pwd(&self) -> String {
        self.tree.path(self.cwd)
    }

    pub fn df(&self) -> Usage {
        self.pool.usage()
    }

    /// Sum of blocks owned by every live file. Together with the free pool
    /// this always accounts for every block in the store.
    pub fn owned_blocks(&self) -> usize {
        self.tree
            .post_order(self.tree.root())
            .into_iter()
            .filter_map(|id| self.tree[id].as_file())
            .map(|file| file.blocks().len())
            .sum()
    }

    /// Releases everything: every node bottom up with its blocks returned to
    /// the pool, then the pool, then the block store.
    pub fn shutdown(self) -> Teardown {
        let Vfs {
            dev,
            mut pool,
            mut tree,
            ..
        } = self;

        let mut report = Teardown::default();
        for id in tree.post_order(tree.root()) {
            let node = match tree.remove(id) {
                Some(node) => node,
                None => continue,
            };
            match node.as_file() {
                Some(file) => {
                    for &blocknr in file.blocks() {
                        pool.reclaim(blocknr);
                    }
                    report.files += 1;
                    report.blocks_reclaimed += file.blocks().len();
                }
                None => report.directories += 1,
            }
        }
        debug!(
            "released {} files and {} directories, {} of {} blocks free",
            report.files,
            report.directories,
            pool.len(),
            pool.total()
        );

        drop(pool);
        drop(dev);
        report
    }
}
