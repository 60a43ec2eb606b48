//! Shared set of regions awaiting a re-render.
//!
//! Everything that notices a world change, whether a block edit pushed
//! from the game loop or an mtime sweep, converges here. Marks at any
//! granularity coarsen to the region: re-rendering a whole region is
//! cheap relative to tracking finer dirt, and the scan reads border
//! columns from neighbours anyway.
//!
//! Every fresh mark nudges the attached waker, so the processor's run
//! loop starts a cycle promptly instead of waiting out its interval.

use dashmap::DashSet;
use tokio::sync::Notify;

use crate::coord::{ChunkCoord, ColumnCoord, RegionCoord};

/// Lock-free set of dirty regions, deduplicating marks between
/// processor cycles.
#[derive(Debug, Default)]
pub struct DirtyRegions {
    regions: DashSet<RegionCoord>,
    waker: Notify,
}

impl DirtyRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the region containing a single modified column.
    pub fn mark_column(&self, column: ColumnCoord) {
        self.mark_region(column.region());
    }

    /// Mark the region containing a modified chunk.
    pub fn mark_chunk(&self, chunk: ChunkCoord) {
        self.mark_region(chunk.region());
    }

    /// Mark a whole region. A mark that is new to the set wakes any
    /// waiter; a duplicate does not.
    pub fn mark_region(&self, region: RegionCoord) {
        if self.regions.insert(region) {
            self.waker.notify_one();
        }
    }

    /// Completes when a mark has arrived since the last wait. A mark
    /// made while nobody was waiting is not lost; the stored wake-up
    /// completes the next wait immediately.
    pub async fn notified(&self) {
        self.waker.notified().await;
    }

    /// Wake a waiter without marking anything.
    pub fn notify(&self) {
        self.waker.notify_one();
    }

    /// Take every queued region, leaving the set empty.
    ///
    /// Marks arriving during the drain land in the set for the next
    /// cycle rather than being lost.
    pub fn drain(&self) -> Vec<RegionCoord> {
        let drained: Vec<RegionCoord> = self.regions.iter().map(|r| *r).collect();
        for region in &drained {
            self.regions.remove(region);
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
