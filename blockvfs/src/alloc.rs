use crate::error::{Result, VfsError};
use crate::io::BlockNumber;
use log::debug;
use std::collections::VecDeque;

/// Implements a first-in first-out allocation policy for data blocks. Blocks are
/// issued oldest-enqueued first and reclaimed blocks join the back of the queue,
/// so a freed block is only reused once every block still waiting ahead of it
/// has been handed out.
///
/// ## Other Allocation Policies
///
/// 1. Next-available scanning over a bitmap, which reuses low block numbers
///    immediately after they are freed.
/// 2. Allocation that attempts to find enough contiguous available blocks so
///    data can be allocated close together.
#[derive(Debug)]
pub struct FreePool {
    /// Indices not currently owned by any file, oldest at the front.
    queue: VecDeque<BlockNumber>,
    /// The number of blocks in the store backing this pool.
    total: usize,
}

/// A snapshot of how much of the store is in use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Usage {
    pub total: usize,
    pub used: usize,
    pub free: usize,
    pub percent_used: f64,
}

impl FreePool {
    /// Seeds the pool with every index in `0..total`, ascending.
    pub fn new(total: usize) -> Self {
        Self {
            queue: (0..total).collect(),
            total,
        }
    }

    /// Removes and returns the oldest free index.
    pub fn issue(&mut self) -> Result<BlockNumber> {
        let blocknr = self.queue.pop_front().ok_or(VfsError::Exhausted)?;
        debug!("issued block {}, {} left free", blocknr, self.queue.len());
        Ok(blocknr)
    }

    /// Returns `blocknr` to the back of the pool. The caller must currently own
    /// the block; reclaiming the same index twice corrupts the pool.
    pub fn reclaim(&mut self, blocknr: BlockNumber) {
        debug_assert!(blocknr < self.total, "reclaimed block out of range");
        debug_assert!(
            self.queue.len() < self.total,
            "reclaimed more blocks than were issued"
        );
        self.queue.push_back(blocknr);
        debug!("reclaimed block {}, {} free", blocknr, self.queue.len());
    }

    /// Number of indices available to issue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn usage(&self) -> Usage {
        let free = self.queue.len();
        let used = self.total - free;
        let percent_used = if self.total == 0 {
            0.0
        } else {
            used as f64 / self.total as f64 * 100.0
        };
        Usage {
            total: self.total,
            used,
            free,
            percent_used,
        }
    }
}
