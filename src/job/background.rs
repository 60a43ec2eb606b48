//! Continuous background rendering as a job.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::processor::{ProcessorState, RegionProcessor};

use super::ProgressReport;

/// Runs a [`RegionProcessor`] as a pausable, cancellable job.
///
/// The processor keeps cycling until cancelled; pausing parks the
/// timer loop and the pause gate inside any in-flight scans. Silent by
/// default, matching its role as an always-on service.
pub struct BackgroundRenderJob {
    processor: Arc<RegionProcessor>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundRenderJob {
    pub fn new(processor: Arc<RegionProcessor>) -> Self {
        Self {
            processor,
            handle: Mutex::new(None),
        }
    }

    /// Spawn the processor's run loop. Calling twice is a no-op while
    /// the first loop is still running.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let processor = Arc::clone(&self.processor);
        *handle = Some(tokio::spawn(async move {
            processor.run().await;
        }));
    }

    pub fn pause(&self) {
        self.processor.control().set_paused(true);
        info!("background rendering paused");
    }

    pub fn resume(&self) {
        self.processor.control().set_paused(false);
        self.processor.wake();
        info!("background rendering resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.processor.control().is_paused()
    }

    /// Stop the run loop. In-flight regions finish; nothing new
    /// starts. Forced cancels stay silent.
    pub fn cancel(&self, forced: bool) {
        self.processor.control().cancel();
        if !forced {
            info!("background rendering cancelled");
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.processor.state()
    }

    pub fn progress(&self) -> ProgressReport {
        self.processor.progress().snapshot()
    }

    /// Wait for the run loop to exit after a cancel.
    pub async fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
