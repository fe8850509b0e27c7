//! An in-memory, block addressed file system: a tree of files and directories
//! whose file content lives in a fixed pool of 512 byte blocks.
//!
//! # Layout
//! ==========================================================================
//! | Free pool (FIFO of block numbers) | Block store (N * 512 bytes) | Tree |
//! ==========================================================================
mod alloc;
pub mod config;
mod error;
mod fs;
pub mod io;
mod node;

pub use crate::alloc::{FreePool, Usage};
pub use crate::config::FsConfig;
pub use crate::error::{Result, VfsError};
pub use crate::fs::{Entry, ReadOutcome, Stat, Teardown, Vfs, WriteOutcome};
pub use crate::node::{Kind, NodeId, Tree};
