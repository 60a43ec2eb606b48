//! Bounded worker pools for the scan pipeline.
//!
//! Rendering is CPU-bound and saving is IO-bound, so they draw from
//! separate semaphores: a slow disk never idles the render workers,
//! and a burst of renders never floods the disk with concurrent
//! writes.

use std::sync::Arc;

use tokio::sync::Semaphore;

/// Concurrency limits for the two pipeline stages.
#[derive(Debug, Clone)]
pub struct WorkerPools {
    render: Arc<Semaphore>,
    io: Arc<Semaphore>,
}

impl WorkerPools {
    /// Pools with the given stage widths. Widths of zero are clamped
    /// to one so the pipeline can always make progress.
    pub fn new(render_workers: usize, io_workers: usize) -> Self {
        Self {
            render: Arc::new(Semaphore::new(render_workers.max(1))),
            io: Arc::new(Semaphore::new(io_workers.max(1))),
        }
    }

    pub fn render(&self) -> Arc<Semaphore> {
        Arc::clone(&self.render)
    }

    pub fn io(&self) -> Arc<Semaphore> {
        Arc::clone(&self.io)
    }
}
